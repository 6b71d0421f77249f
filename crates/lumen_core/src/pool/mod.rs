//! # Worker Pool
//!
//! Owns the job queue, N worker threads and the aggregator for one render.
//!
//! ## Architecture
//!
//! ```text
//!  producer ──add_job──> [PriorityJobQueue] ──pop──> Worker 0..N ──> World
//!                                                        │
//!                                              push_batch│
//!                                                        ▼
//!                        Sink <──── flush ──── [ResultAggregator]
//! ```
//!
//! ## Shutdown
//!
//! `stop()` posts one EXIT per worker at [`Priority::Idle`], so everything
//! already queued drains first. It then joins every worker, lets the
//! aggregator run its final flush, and returns the render summary. The
//! aggregator sends `RenderCompleted` to the sink before `stop()` returns.
//!
//! The worker count is fixed for the lifetime of the pool.
//!
//! ## Pause
//!
//! `pause()` closes a gate workers pass before taking a job. A job already
//! being rendered finishes; queued jobs stay queued (a worker that was
//! already blocked in `pop` holds at most one job at the gate). The
//! aggregator keeps flushing whatever arrived. `resume()` opens the gate.
//! `stop()` on a paused pool resumes it first so the queue can drain.

mod worker;

pub use worker::{WorkerExit, WorkerState, WorkerThread};

use crate::aggregator::ResultAggregator;
use crate::config::RenderConfig;
use crate::error::{RenderError, RenderResult};
use crate::job::{Job, JobCommand, Priority, PriorityJobQueue};
use crate::progress::{ProgressSnapshot, RenderProgress};
use crate::sink::RenderSink;
use crate::sync::PauseGate;
use crate::thread::{Lifecycle, RenderThread, ThreadExit};
use crate::world::{SceneMode, World};
use lumen_shared::{Region, RenderSummary, DEFAULT_FLUSH_INTERVAL_MS};
use std::sync::Arc;
use std::time::Duration;
use worker::{StateCell, Worker};

/// Pool configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PoolConfig {
    /// Number of worker threads.
    pub workers: usize,
    /// How workers get their scene.
    pub scene_mode: SceneMode,
    /// Aggregator flush interval.
    pub flush_interval: Duration,
}

impl PoolConfig {
    /// `workers` threads, replicated scenes, default flush interval.
    #[must_use]
    pub const fn new(workers: usize) -> Self {
        Self {
            workers,
            scene_mode: SceneMode::Replicated,
            flush_interval: Duration::from_millis(DEFAULT_FLUSH_INTERVAL_MS),
        }
    }

    /// Sets the scene mode.
    #[must_use]
    pub fn with_scene_mode(mut self, scene_mode: SceneMode) -> Self {
        self.scene_mode = scene_mode;
        self
    }

    /// Sets the flush interval.
    #[must_use]
    pub fn with_flush_interval(mut self, flush_interval: Duration) -> Self {
        self.flush_interval = flush_interval;
        self
    }
}

impl From<&RenderConfig> for PoolConfig {
    fn from(config: &RenderConfig) -> Self {
        Self {
            workers: config.worker_count(),
            scene_mode: config.scene_mode,
            flush_interval: config.flush_interval(),
        }
    }
}

/// A running pool of render workers.
pub struct WorkerPool {
    queue: Arc<PriorityJobQueue>,
    /// Workers first, aggregator last. Emptied by shutdown.
    threads: Vec<RenderThread>,
    states: Vec<Arc<StateCell>>,
    progress: Arc<RenderProgress>,
    gate: Arc<PauseGate>,
}

impl WorkerPool {
    /// Spawns the aggregator and `config.workers` workers.
    ///
    /// Each worker reports STARTED to `sink` once its loop begins.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::NoWorkers`] for a zero worker count and
    /// [`RenderError::Spawn`] if a thread cannot be created. Threads started
    /// before the failure are shut down first.
    pub fn start<W: World>(
        config: &PoolConfig,
        scene: Arc<W>,
        sink: Arc<dyn RenderSink>,
    ) -> RenderResult<Self> {
        if config.workers == 0 {
            return Err(RenderError::NoWorkers);
        }

        let progress = Arc::new(RenderProgress::new());
        let queue = Arc::new(PriorityJobQueue::new(Arc::clone(&sink)));
        let aggregator = ResultAggregator::start(config.flush_interval, sink, Arc::clone(&progress))?;
        let results = aggregator.handle();

        let mut pool = Self {
            queue,
            threads: Vec::with_capacity(config.workers + 1),
            states: Vec::with_capacity(config.workers),
            progress,
            gate: Arc::new(PauseGate::new()),
        };

        for id in 0..config.workers {
            let state = Arc::new(StateCell::new());
            let worker = Worker {
                id,
                queue: Arc::clone(&pool.queue),
                world: config.scene_mode.bind(&scene),
                results: results.clone(),
                progress: Arc::clone(&pool.progress),
                state: Arc::clone(&state),
                gate: Arc::clone(&pool.gate),
            };
            match WorkerThread::spawn(worker) {
                Ok(thread) => {
                    pool.threads.push(RenderThread::Worker(thread));
                    pool.states.push(state);
                }
                Err(err) => {
                    tracing::error!(worker = id, error = %err, "worker spawn failed");
                    pool.threads.push(RenderThread::Aggregator(aggregator));
                    if let Err(stop_err) = pool.shutdown() {
                        tracing::warn!(error = %stop_err, "partial pool shutdown failed");
                    }
                    return Err(err);
                }
            }
        }
        pool.threads.push(RenderThread::Aggregator(aggregator));

        tracing::info!(
            workers = config.workers,
            scene_mode = ?config.scene_mode,
            flush_ms = config.flush_interval.as_millis() as u64,
            "worker pool started"
        );
        Ok(pool)
    }

    /// Queues a job.
    pub fn add_job(&self, job: Job, priority: Priority) {
        if job.command() == JobCommand::Work {
            self.progress.record_submitted();
        }
        self.queue.add_job(job, priority);
    }

    /// Queues a WORK job for `region`.
    pub fn submit_region(&self, region: Region, priority: Priority) {
        self.add_job(Job::work(region), priority);
    }

    /// Queues a WORK job for every region.
    pub fn submit_regions<I>(&self, regions: I, priority: Priority)
    where
        I: IntoIterator<Item = Region>,
    {
        for region in regions {
            self.submit_region(region, priority);
        }
    }

    /// Jobs currently queued (diagnostic).
    #[must_use]
    pub fn size(&self) -> usize {
        self.queue.size()
    }

    /// Number of worker threads.
    #[must_use]
    pub fn worker_count(&self) -> usize {
        self.states.len()
    }

    /// Current state of every worker, indexed by worker id.
    #[must_use]
    pub fn worker_states(&self) -> Vec<WorkerState> {
        self.states.iter().map(|s| s.get()).collect()
    }

    /// Live progress counters.
    #[must_use]
    pub fn progress(&self) -> ProgressSnapshot {
        self.progress.snapshot()
    }

    /// Holds workers before their next job. Returns false if already paused.
    pub fn pause(&self) -> bool {
        let paused = self.gate.close();
        if paused {
            tracing::info!(queued = self.queue.size(), "render paused");
        }
        paused
    }

    /// Lets paused workers continue. Returns false if not paused.
    pub fn resume(&self) -> bool {
        let resumed = self.gate.open();
        if resumed {
            tracing::info!(queued = self.queue.size(), "render resumed");
        }
        resumed
    }

    /// Returns true while paused.
    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.gate.is_closed()
    }

    /// Drains the queue, joins every worker, flushes the aggregator.
    ///
    /// Blocks until every worker has taken its EXIT job and the aggregator
    /// has delivered `RenderCompleted`. With a bounded sink this must not
    /// run on the thread that drains the sink's receiver: workers block in
    /// their status reports and the aggregator in its delivery, and the join
    /// never returns. Call it from another thread, or use an unbounded sink.
    /// The same holds for dropping the pool.
    ///
    /// # Errors
    ///
    /// Returns the first thread panic or sink failure encountered. Every
    /// thread is joined regardless.
    pub fn stop(mut self) -> RenderResult<RenderSummary> {
        self.shutdown()
    }

    fn shutdown(&mut self) -> RenderResult<RenderSummary> {
        let threads = std::mem::take(&mut self.threads);
        tracing::info!(queued = self.queue.size(), "stopping worker pool");
        if self.gate.open() {
            tracing::info!("resuming paused pool to drain the queue");
        }

        // One EXIT per worker, all posted before the first join.
        for thread in threads.iter().filter(|t| matches!(t, RenderThread::Worker(_))) {
            thread.request_stop();
        }

        let mut first_error = None;
        let mut summary = None;
        for thread in threads {
            let role = thread.role();
            if let RenderThread::Aggregator(_) = thread {
                // Workers are all joined by now; nothing else can push.
                thread.request_stop();
            }
            match thread.join() {
                Ok(ThreadExit::Worker(exit)) => {
                    tracing::debug!(%role, ?exit, "joined");
                }
                Ok(ThreadExit::Aggregator(report)) => {
                    summary = Some(report.summary);
                }
                Err(err) => {
                    tracing::error!(%role, error = %err, "thread ended abnormally");
                    if let RenderError::ThreadPanicked { .. } = err {
                        self.progress.record_failure();
                    }
                    first_error.get_or_insert(err);
                }
            }
        }

        match (first_error, summary) {
            (Some(err), _) => Err(err),
            (None, Some(summary)) => {
                tracing::info!(
                    complete = summary.complete,
                    jobs = summary.jobs_completed,
                    samples = summary.samples_delivered,
                    elapsed_ms = summary.elapsed.as_millis() as u64,
                    "render finished"
                );
                Ok(summary)
            }
            // Already shut down.
            (None, None) => Ok(self.progress.summary(0)),
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        if self.threads.is_empty() {
            return;
        }
        if let Err(err) = self.shutdown() {
            tracing::warn!(error = %err, "worker pool dropped with errors");
        }
    }
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("workers", &self.states.len())
            .field("queued", &self.queue.size())
            .field("paused", &self.gate.is_closed())
            .field("progress", &self.progress.snapshot())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::WorldError;
    use crate::sink::ChannelSink;
    use lumen_shared::{PixelSample, RenderEvent, Rgb};
    use std::thread;
    use std::time::Instant;

    #[derive(Clone)]
    struct Gradient;

    impl World for Gradient {
        fn render_region(&self, region: &Region) -> Result<Vec<PixelSample>, WorldError> {
            Ok(region
                .points()
                .map(|p| PixelSample::new(p.x, p.y, Rgb::new(p.x as u8, p.y as u8, 0)))
                .collect())
        }
    }

    fn config(workers: usize) -> PoolConfig {
        PoolConfig::new(workers).with_flush_interval(Duration::from_millis(10))
    }

    #[test]
    fn test_zero_workers_rejected() {
        let (sink, _rx) = ChannelSink::unbounded();
        let result = WorkerPool::start(&config(0), Arc::new(Gradient), Arc::new(sink));
        assert!(matches!(result, Err(RenderError::NoWorkers)));
    }

    #[test]
    fn test_workers_idle_after_start() {
        let (sink, rx) = ChannelSink::unbounded();
        let pool = WorkerPool::start(&config(3), Arc::new(Gradient), Arc::new(sink)).unwrap();
        assert_eq!(pool.worker_count(), 3);

        // Each worker says hello once.
        let deadline = Instant::now() + Duration::from_secs(5);
        let mut started = 0;
        while started < 3 && Instant::now() < deadline {
            if let Ok(RenderEvent::JobStarted { .. }) = rx.recv_timeout(Duration::from_millis(50)) {
                started += 1;
            }
        }
        assert_eq!(started, 3);
        assert!(pool
            .worker_states()
            .iter()
            .all(|s| matches!(s, WorkerState::Idle | WorkerState::Rendering)));

        let summary = pool.stop().unwrap();
        assert!(summary.complete);
        assert_eq!(summary.jobs_submitted, 0);
    }

    #[test]
    fn test_stop_drains_queue_before_exit() {
        let (sink, rx) = ChannelSink::unbounded();
        let pool = WorkerPool::start(
            &config(4).with_scene_mode(SceneMode::Shared),
            Arc::new(Gradient),
            Arc::new(sink),
        )
        .unwrap();

        for i in 0..32 {
            pool.submit_region(Region::from_size(i * 4, 0, 4, 4), Priority::Low);
        }
        let summary = pool.stop().unwrap();

        assert!(summary.complete);
        assert_eq!(summary.jobs_submitted, 32);
        assert_eq!(summary.jobs_completed, 32);
        assert_eq!(summary.samples_delivered, 32 * 16);

        let events: Vec<_> = rx.try_iter().collect();
        let exits = events
            .iter()
            .filter(|e| matches!(e, RenderEvent::WorkerExited { .. }))
            .count();
        assert_eq!(exits, 4);
        assert!(matches!(events.last(), Some(RenderEvent::RenderCompleted(_))));
    }

    #[test]
    fn test_drop_shuts_down() {
        let (sink, rx) = ChannelSink::unbounded();
        {
            let pool = WorkerPool::start(&config(2), Arc::new(Gradient), Arc::new(sink)).unwrap();
            pool.submit_region(Region::from_size(0, 0, 2, 2), Priority::Normal);
        }
        let completed = rx
            .try_iter()
            .any(|e| matches!(e, RenderEvent::RenderCompleted(_)));
        assert!(completed);
    }

    #[test]
    fn test_pause_holds_samples_until_resume() {
        let (sink, rx) = ChannelSink::unbounded();
        let pool = WorkerPool::start(&config(3), Arc::new(Gradient), Arc::new(sink)).unwrap();
        assert!(pool.pause());
        assert!(!pool.pause());
        assert!(pool.is_paused());

        for i in 0..12 {
            pool.submit_region(Region::from_size(i * 2, 0, 2, 2), Priority::Normal);
        }
        thread::sleep(Duration::from_millis(60));

        let early: Vec<_> = rx.try_iter().collect();
        assert!(!early
            .iter()
            .any(|e| matches!(e, RenderEvent::PixelBatchReady(_))));
        assert_eq!(pool.progress().jobs_completed, 0);

        assert!(pool.resume());
        assert!(!pool.is_paused());
        let summary = pool.stop().unwrap();
        assert!(summary.complete);
        assert_eq!(summary.samples_delivered, 12 * 4);

        let delivered: usize = rx
            .try_iter()
            .filter_map(|e| match e {
                RenderEvent::PixelBatchReady(batch) => Some(batch.len()),
                _ => None,
            })
            .sum();
        assert_eq!(delivered, 12 * 4);
    }

    #[test]
    fn test_stop_while_paused_drains_queue() {
        let (sink, _rx) = ChannelSink::unbounded();
        let pool = WorkerPool::start(&config(2), Arc::new(Gradient), Arc::new(sink)).unwrap();
        pool.pause();
        pool.submit_regions((0..6).map(|i| Region::from_size(i, 0, 1, 1)), Priority::Low);

        let summary = pool.stop().unwrap();
        assert!(summary.complete);
        assert_eq!(summary.jobs_completed, 6);
    }

    #[test]
    fn test_zero_flush_interval_is_usable() {
        let (sink, _rx) = ChannelSink::unbounded();
        let pool = WorkerPool::start(
            &PoolConfig::new(2).with_flush_interval(Duration::ZERO),
            Arc::new(Gradient),
            Arc::new(sink),
        )
        .unwrap();
        pool.submit_region(Region::from_size(0, 0, 3, 3), Priority::Normal);
        let summary = pool.stop().unwrap();
        assert!(summary.complete);
        assert_eq!(summary.samples_delivered, 9);
    }
}
