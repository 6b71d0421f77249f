//! # Priority Job Queue
//!
//! One FIFO per priority class, indexed by ordinal, behind a single mutex.
//! A counting semaphore tracks how many jobs are queued and gates `pop`.
//!
//! ```text
//!   Highest     [ j7 ]
//!   Higher      [ ]
//!   Normal      [ j3, j4 ]          pop() → j7, j3, j4, j1, j2, exit...
//!   BelowNormal [ ]
//!   Low         [ j1, j2 ]
//!   Idle        [ exit, exit ]
//! ```
//!
//! Depth is unbounded. Producers are expected to throttle themselves.

use crate::error::RenderResult;
use crate::job::{Job, JobCommand, Priority};
use crate::sink::RenderSink;
use crate::sync::Semaphore;
use lumen_shared::{RenderEvent, PRIORITY_LEVELS};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

type Buckets = [VecDeque<Job>; PRIORITY_LEVELS];

/// Thread-safe priority queue with blocking pop.
pub struct PriorityJobQueue {
    /// Per-priority FIFOs.
    buckets: Mutex<Buckets>,
    /// One permit per queued job.
    pending: Semaphore,
    /// Where `report` sends status events.
    sink: Arc<dyn RenderSink>,
}

impl PriorityJobQueue {
    /// Creates an empty queue reporting to `sink`.
    #[must_use]
    pub fn new(sink: Arc<dyn RenderSink>) -> Self {
        Self {
            buckets: Mutex::new(std::array::from_fn(|_| VecDeque::new())),
            pending: Semaphore::new(0),
            sink,
        }
    }

    /// Appends `job` to the tail of its priority class and wakes one waiter.
    pub fn add_job(&self, job: Job, priority: Priority) {
        tracing::trace!(command = ?job.command(), ?priority, "job queued");
        self.buckets.lock()[priority.ordinal()].push_back(job);
        // Permit goes out only after the job is visible.
        self.pending.release();
    }

    /// Blocks until a job is queued, then removes and returns the head of
    /// the most urgent non-empty class.
    pub fn pop(&self) -> Job {
        self.pending.acquire();
        self.take_front().unwrap_or_else(|| {
            // Unreachable while permits and jobs stay paired.
            tracing::error!("queue permit without a job; returning NOOP");
            Job::noop()
        })
    }

    /// Removes and returns the next job if one is queued right now.
    pub fn try_pop(&self) -> Option<Job> {
        if !self.pending.try_acquire() {
            return None;
        }
        self.take_front()
    }

    fn take_front(&self) -> Option<Job> {
        let mut buckets = self.buckets.lock();
        buckets.iter_mut().find_map(VecDeque::pop_front)
    }

    /// Number of queued jobs. Diagnostic only: stale under concurrent use.
    #[must_use]
    pub fn size(&self) -> usize {
        self.buckets.lock().iter().map(VecDeque::len).sum()
    }

    /// Number of queued jobs in one priority class.
    #[must_use]
    pub fn size_of(&self, priority: Priority) -> usize {
        self.buckets.lock()[priority.ordinal()].len()
    }

    /// Sends a status notification for worker `code` to the sink.
    ///
    /// STARTED, WORK_ERROR and EXIT map to [`RenderEvent::JobStarted`],
    /// [`RenderEvent::JobError`] and [`RenderEvent::WorkerExited`]. Other
    /// commands carry nothing the consumer acts on and are only logged.
    ///
    /// # Errors
    ///
    /// Returns the sink's error if the consumer is gone.
    pub fn report(&self, command: JobCommand, text: &str, code: usize) -> RenderResult<()> {
        let event = match command {
            JobCommand::Started => RenderEvent::JobStarted { worker: code },
            JobCommand::WorkError => RenderEvent::JobError {
                worker: code,
                message: text.to_string(),
            },
            JobCommand::Exit => RenderEvent::WorkerExited { worker: code },
            JobCommand::Noop | JobCommand::Work => {
                tracing::trace!(worker = code, ?command, text, "status report");
                return Ok(());
            }
        };
        self.sink.deliver(event)
    }
}

impl std::fmt::Debug for PriorityJobQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PriorityJobQueue")
            .field("size", &self.size())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::ChannelSink;
    use lumen_shared::Region;
    use std::collections::HashSet;
    use std::thread;

    fn queue() -> PriorityJobQueue {
        let (sink, _rx) = ChannelSink::unbounded();
        PriorityJobQueue::new(Arc::new(sink))
    }

    fn tile(i: u32) -> Job {
        Job::work(Region::from_size(i, 0, 1, 1))
    }

    #[test]
    fn test_higher_priority_pops_first() {
        let q = queue();
        q.add_job(tile(1), Priority::Low);
        q.add_job(tile(2), Priority::Highest);

        assert_eq!(q.pop(), tile(2));
        assert_eq!(q.pop(), tile(1));
    }

    #[test]
    fn test_fifo_within_priority() {
        let q = queue();
        q.add_job(tile(3), Priority::Normal);
        q.add_job(tile(4), Priority::Normal);

        assert_eq!(q.pop(), tile(3));
        assert_eq!(q.pop(), tile(4));
    }

    #[test]
    fn test_pop_order_is_non_decreasing_priority() {
        let q = queue();
        let mut expected = Vec::new();
        for i in 0..60u32 {
            let priority = Priority::ALL[(i as usize * 7) % Priority::ALL.len()];
            q.add_job(tile(i), priority);
            expected.push((priority, i));
        }
        // Stable sort keeps submission order inside each class.
        expected.sort_by_key(|(priority, _)| *priority);

        for (_, i) in expected {
            assert_eq!(q.pop(), tile(i));
        }
        assert_eq!(q.size(), 0);
    }

    #[test]
    fn test_size_tracks_adds_and_pops() {
        let q = queue();
        for i in 0..10 {
            q.add_job(tile(i), Priority::Normal);
        }
        for _ in 0..4 {
            q.pop();
        }
        assert_eq!(q.size(), 6);
        assert_eq!(q.size_of(Priority::Normal), 6);
        assert_eq!(q.size_of(Priority::Idle), 0);
    }

    #[test]
    fn test_try_pop_empty_keeps_pairing() {
        let q = queue();
        assert!(q.try_pop().is_none());
        q.add_job(Job::exit(), Priority::Idle);
        assert_eq!(q.try_pop(), Some(Job::exit()));
        assert!(q.try_pop().is_none());
    }

    #[test]
    fn test_pop_blocks_until_job_arrives() {
        let q = Arc::new(queue());
        let popper = {
            let q = Arc::clone(&q);
            thread::spawn(move || q.pop())
        };

        thread::sleep(std::time::Duration::from_millis(20));
        assert!(!popper.is_finished());

        q.add_job(Job::exit(), Priority::Highest);
        assert_eq!(popper.join().unwrap(), Job::exit());
    }

    #[test]
    fn test_concurrent_pops_never_duplicate() {
        let q = Arc::new(queue());
        let producers = 4u32;
        let per_producer = 500u32;
        let consumers = 4;

        let consumer_handles: Vec<_> = (0..consumers)
            .map(|_| {
                let q = Arc::clone(&q);
                thread::spawn(move || {
                    let mut seen = Vec::new();
                    loop {
                        let job = q.pop();
                        match job.command() {
                            JobCommand::Exit => return seen,
                            _ => seen.push(job.region().map(|r| r.origin.x).unwrap()),
                        }
                    }
                })
            })
            .collect();

        let producer_handles: Vec<_> = (0..producers)
            .map(|p| {
                let q = Arc::clone(&q);
                thread::spawn(move || {
                    for i in 0..per_producer {
                        q.add_job(tile(p * per_producer + i), Priority::ALL[(i % 6) as usize]);
                    }
                })
            })
            .collect();

        for h in producer_handles {
            h.join().unwrap();
        }
        // Exits go last so every work job is drained first.
        for _ in 0..consumers {
            q.add_job(Job::exit(), Priority::Idle);
        }

        let mut all = HashSet::new();
        let mut total = 0;
        for h in consumer_handles {
            for id in h.join().unwrap() {
                total += 1;
                assert!(all.insert(id), "job {id} popped twice");
            }
        }
        assert_eq!(total, (producers * per_producer) as usize);
        assert_eq!(q.size(), 0);
    }

    #[test]
    fn test_report_maps_commands_to_events() {
        let (sink, rx) = ChannelSink::unbounded();
        let q = PriorityJobQueue::new(Arc::new(sink));

        q.report(JobCommand::Started, "", 2).unwrap();
        q.report(JobCommand::Noop, "ignored", 2).unwrap();
        q.report(JobCommand::WorkError, "bad tile", 2).unwrap();
        q.report(JobCommand::Exit, "", 2).unwrap();

        let events: Vec<_> = rx.try_iter().collect();
        assert_eq!(
            events,
            vec![
                RenderEvent::JobStarted { worker: 2 },
                RenderEvent::JobError {
                    worker: 2,
                    message: "bad tile".into()
                },
                RenderEvent::WorkerExited { worker: 2 },
            ]
        );
    }
}
