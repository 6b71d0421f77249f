//! # Worker Thread
//!
//! ```text
//!             ┌──────────── WORK ────────────┐
//!             │                              ▼
//!   ┌──────┐  │   ┌───────────┐  ok   ┌───────────┐
//!   │ Idle │──┴──>│ Rendering │──────>│ Reporting │──┐
//!   └──────┘      └───────────┘       └───────────┘  │
//!     ▲ │               │ world error/panic          │
//!     │ │ EXIT          ▼                            │
//!     │ │ WORK_ERROR ┌────────────┐                  │
//!     │ └───────────>│ Terminated │                  │
//!     │              └────────────┘                  │
//!     └──────────────────────────────────────────────┘
//! ```
//!
//! A failing worker reports and stops; the rest of the pool carries on.
//!
//! While the pool is paused a worker sits in `Paused` before taking its next
//! job, or right after `pop` if it was already waiting there. EXIT is never
//! held back by a pause.

use crate::aggregator::AggregatorHandle;
use crate::error::{panic_message, RenderResult};
use crate::job::{Job, JobCommand, Priority, PriorityJobQueue};
use crate::progress::RenderProgress;
use crate::sync::PauseGate;
use crate::thread::{join_role, spawn_role, Lifecycle, ThreadRole};
use crate::world::World;
use lumen_shared::Region;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

/// Where a worker is in its job cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum WorkerState {
    /// Waiting in `pop`.
    Idle = 0,
    /// Inside the World.
    Rendering = 1,
    /// Handing samples to the aggregator.
    Reporting = 2,
    /// Left the job loop. Terminal.
    Terminated = 3,
    /// Held at the pause gate.
    Paused = 4,
}

impl WorkerState {
    const fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Idle,
            1 => Self::Rendering,
            2 => Self::Reporting,
            4 => Self::Paused,
            _ => Self::Terminated,
        }
    }
}

/// Lock-free cell the pool reads to inspect a worker.
#[derive(Debug)]
pub(crate) struct StateCell(AtomicU8);

impl StateCell {
    pub(crate) fn new() -> Self {
        Self(AtomicU8::new(WorkerState::Idle as u8))
    }

    pub(crate) fn get(&self) -> WorkerState {
        WorkerState::from_u8(self.0.load(Ordering::Acquire))
    }

    fn set(&self, state: WorkerState) {
        self.0.store(state as u8, Ordering::Release);
    }
}

/// How a worker left its loop.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WorkerExit {
    /// Popped an EXIT job.
    Exited,
    /// Terminated on an error.
    Failed(String),
}

/// Everything one worker thread owns.
pub(crate) struct Worker<W: World> {
    pub(crate) id: usize,
    pub(crate) queue: Arc<PriorityJobQueue>,
    pub(crate) world: Arc<W>,
    pub(crate) results: AggregatorHandle,
    pub(crate) progress: Arc<RenderProgress>,
    pub(crate) state: Arc<StateCell>,
    pub(crate) gate: Arc<PauseGate>,
}

impl<W: World> Worker<W> {
    fn run(self) -> WorkerExit {
        self.report(JobCommand::Started, "");
        tracing::debug!(worker = self.id, "worker started");

        let exit = loop {
            self.pass_gate();
            self.state.set(WorkerState::Idle);
            let job = self.queue.pop();
            if job.command() != JobCommand::Exit {
                self.pass_gate();
            }

            match job.command() {
                JobCommand::Exit => break WorkerExit::Exited,
                JobCommand::Noop => {}
                JobCommand::Started => {
                    tracing::debug!(worker = self.id, arg = job.argument(), "started marker");
                }
                JobCommand::WorkError => break self.fail(job.argument().to_string()),
                JobCommand::Work => {
                    let Some(region) = job.region() else {
                        tracing::warn!(worker = self.id, "WORK job without a region");
                        continue;
                    };
                    if let Err(message) = self.render(region) {
                        break self.fail(message);
                    }
                }
            }
        };

        self.state.set(WorkerState::Terminated);
        self.report(JobCommand::Exit, "");
        tracing::debug!(worker = self.id, ?exit, "worker terminated");
        exit
    }

    /// Waits out a pause.
    fn pass_gate(&self) {
        if !self.gate.is_closed() {
            return;
        }
        self.state.set(WorkerState::Paused);
        tracing::debug!(worker = self.id, "worker paused");
        if self.gate.wait_open() {
            tracing::debug!(worker = self.id, "worker resumed");
        }
    }

    /// Renders one region and forwards its samples.
    fn render(&self, region: &Region) -> Result<(), String> {
        self.state.set(WorkerState::Rendering);

        let world = &self.world;
        let samples = match panic::catch_unwind(AssertUnwindSafe(|| world.render_region(region))) {
            Ok(Ok(samples)) => samples,
            Ok(Err(err)) => return Err(format!("region {region}: {err}")),
            Err(payload) => {
                return Err(format!(
                    "world panicked on region {region}: {}",
                    panic_message(payload.as_ref())
                ))
            }
        };

        self.state.set(WorkerState::Reporting);
        let count = samples.len();
        self.results.push_batch(samples);
        self.progress.record_completed(count);
        tracing::trace!(worker = self.id, %region, count, "region rendered");
        Ok(())
    }

    fn fail(&self, message: String) -> WorkerExit {
        tracing::error!(worker = self.id, %message, "worker failed");
        self.progress.record_failure();
        self.report(JobCommand::WorkError, &message);
        WorkerExit::Failed(message)
    }

    fn report(&self, command: JobCommand, text: &str) {
        if let Err(err) = self.queue.report(command, text, self.id) {
            tracing::warn!(worker = self.id, ?command, error = %err, "status report dropped");
        }
    }
}

/// A running worker thread.
pub struct WorkerThread {
    id: usize,
    queue: Arc<PriorityJobQueue>,
    handle: JoinHandle<WorkerExit>,
}

impl WorkerThread {
    pub(crate) fn spawn<W: World>(worker: Worker<W>) -> RenderResult<Self> {
        let id = worker.id;
        let queue = Arc::clone(&worker.queue);
        let handle = spawn_role(ThreadRole::Worker(id), move || worker.run())?;
        Ok(Self { id, queue, handle })
    }
}

impl Lifecycle for WorkerThread {
    type Exit = WorkerExit;

    fn role(&self) -> ThreadRole {
        ThreadRole::Worker(self.id)
    }

    /// Posts one EXIT job behind all queued work.
    fn request_stop(&self) {
        self.queue.add_job(Job::exit(), Priority::Idle);
    }

    fn join(self) -> RenderResult<WorkerExit> {
        join_role(ThreadRole::Worker(self.id), self.handle)
    }
}

impl std::fmt::Debug for WorkerThread {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerThread")
            .field("id", &self.id)
            .field("finished", &self.handle.is_finished())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::ResultAggregator;
    use crate::error::WorldError;
    use crate::sink::ChannelSink;
    use lumen_shared::{PixelSample, RenderEvent, Rgb};
    use std::time::Duration;

    #[derive(Clone)]
    struct Checker {
        fail_at_x: Option<u32>,
        panic_at_x: Option<u32>,
    }

    impl World for Checker {
        fn render_region(&self, region: &Region) -> Result<Vec<PixelSample>, WorldError> {
            if self.fail_at_x == Some(region.origin.x) {
                return Err(WorldError::Failed("bad material".into()));
            }
            if self.panic_at_x == Some(region.origin.x) {
                panic!("divide by zero in BVH");
            }
            Ok(region
                .points()
                .map(|p| PixelSample::new(p.x, p.y, Rgb::new(255, 255, 255)))
                .collect())
        }
    }

    struct Harness {
        queue: Arc<PriorityJobQueue>,
        aggregator: ResultAggregator,
        progress: Arc<RenderProgress>,
        gate: Arc<PauseGate>,
        rx: crossbeam_channel::Receiver<RenderEvent>,
    }

    fn harness() -> Harness {
        let (sink, rx) = ChannelSink::unbounded();
        let sink: Arc<dyn crate::sink::RenderSink> = Arc::new(sink);
        let progress = Arc::new(RenderProgress::new());
        let aggregator =
            ResultAggregator::start(Duration::from_secs(3600), Arc::clone(&sink), Arc::clone(&progress))
                .unwrap();
        Harness {
            queue: Arc::new(PriorityJobQueue::new(sink)),
            aggregator,
            progress,
            gate: Arc::new(PauseGate::new()),
            rx,
        }
    }

    fn spawn(h: &Harness, world: Checker) -> (WorkerThread, Arc<StateCell>) {
        let state = Arc::new(StateCell::new());
        let worker = Worker {
            id: 0,
            queue: Arc::clone(&h.queue),
            world: Arc::new(world),
            results: h.aggregator.handle(),
            progress: Arc::clone(&h.progress),
            state: Arc::clone(&state),
            gate: Arc::clone(&h.gate),
        };
        (WorkerThread::spawn(worker).unwrap(), state)
    }

    const HEALTHY: Checker = Checker {
        fail_at_x: None,
        panic_at_x: None,
    };

    #[test]
    fn test_work_then_exit() {
        let h = harness();
        h.queue.add_job(Job::work(Region::from_size(0, 0, 4, 4)), Priority::Normal);
        h.queue.add_job(Job::noop(), Priority::Normal);
        h.queue.add_job(Job::started("hello"), Priority::Normal);
        let (thread, state) = spawn(&h, HEALTHY);
        thread.request_stop();

        assert_eq!(thread.join().unwrap(), WorkerExit::Exited);
        assert_eq!(state.get(), WorkerState::Terminated);
        assert_eq!(h.progress.snapshot().samples_produced, 16);
        assert_eq!(h.aggregator.handle().buffered(), 16);

        let events: Vec<_> = h.rx.try_iter().collect();
        assert_eq!(events.first(), Some(&RenderEvent::JobStarted { worker: 0 }));
        assert_eq!(events.last(), Some(&RenderEvent::WorkerExited { worker: 0 }));
    }

    #[test]
    fn test_work_error_job_terminates_worker() {
        let h = harness();
        h.queue.add_job(Job::work_error("scene file corrupt"), Priority::Highest);
        let (thread, state) = spawn(&h, HEALTHY);

        assert_eq!(
            thread.join().unwrap(),
            WorkerExit::Failed("scene file corrupt".into())
        );
        assert_eq!(state.get(), WorkerState::Terminated);
        assert_eq!(h.progress.snapshot().failed_workers, 1);

        let events: Vec<_> = h.rx.try_iter().collect();
        assert!(events.contains(&RenderEvent::JobError {
            worker: 0,
            message: "scene file corrupt".into()
        }));
    }

    #[test]
    fn test_world_error_is_caught() {
        let h = harness();
        h.queue.add_job(Job::work(Region::from_size(8, 0, 2, 2)), Priority::Normal);
        let world = Checker {
            fail_at_x: Some(8),
            panic_at_x: None,
        };
        let (thread, _) = spawn(&h, world);

        match thread.join().unwrap() {
            WorkerExit::Failed(message) => assert!(message.contains("bad material")),
            other => panic!("expected failure, got {other:?}"),
        }
        assert_eq!(h.queue.size(), 0);
    }

    #[test]
    fn test_world_panic_is_caught() {
        let h = harness();
        h.queue.add_job(Job::work(Region::from_size(3, 0, 2, 2)), Priority::Normal);
        h.queue.add_job(Job::work(Region::from_size(5, 0, 2, 2)), Priority::Normal);
        let world = Checker {
            fail_at_x: None,
            panic_at_x: Some(3),
        };
        let (thread, _) = spawn(&h, world);

        match thread.join().unwrap() {
            WorkerExit::Failed(message) => assert!(message.contains("divide by zero in BVH")),
            other => panic!("expected failure, got {other:?}"),
        }
        // The second job is untouched and the queue count still matches it.
        assert_eq!(h.queue.size(), 1);
        assert!(h.queue.try_pop().is_some());
    }

    #[test]
    fn test_paused_worker_holds_jobs_until_resumed() {
        let h = harness();
        h.gate.close();
        let (thread, state) = spawn(&h, HEALTHY);
        h.queue.add_job(Job::work(Region::from_size(0, 0, 2, 2)), Priority::Normal);
        h.queue.add_job(Job::work(Region::from_size(2, 0, 2, 2)), Priority::Normal);

        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        while state.get() != WorkerState::Paused && std::time::Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(1));
        }
        assert_eq!(state.get(), WorkerState::Paused);
        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(h.progress.snapshot().jobs_completed, 0);
        assert_eq!(h.queue.size(), 2);

        h.gate.open();
        thread.request_stop();
        assert_eq!(thread.join().unwrap(), WorkerExit::Exited);
        assert_eq!(h.progress.snapshot().jobs_completed, 2);
        assert_eq!(h.aggregator.handle().buffered(), 8);
    }
}
