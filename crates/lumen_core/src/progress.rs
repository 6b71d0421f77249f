//! Render progress counters shared by the pool, its workers and the
//! aggregator.

use lumen_shared::RenderSummary;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Live counters for one render.
#[derive(Debug)]
pub struct RenderProgress {
    started: Instant,
    jobs_submitted: AtomicU64,
    jobs_completed: AtomicU64,
    samples_produced: AtomicU64,
    failed_workers: AtomicU32,
}

/// A point-in-time copy of [`RenderProgress`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ProgressSnapshot {
    /// WORK jobs queued so far.
    pub jobs_submitted: u64,
    /// WORK jobs fully rendered.
    pub jobs_completed: u64,
    /// Samples handed to the aggregator.
    pub samples_produced: u64,
    /// Workers that terminated on an error.
    pub failed_workers: u32,
    /// Time since the render started.
    pub elapsed: Duration,
}

impl ProgressSnapshot {
    /// Fraction of submitted jobs completed, in `[0, 1]`.
    #[must_use]
    pub fn fraction(&self) -> f64 {
        if self.jobs_submitted == 0 {
            return 0.0;
        }
        self.jobs_completed as f64 / self.jobs_submitted as f64
    }
}

impl RenderProgress {
    /// Starts the clock.
    #[must_use]
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            jobs_submitted: AtomicU64::new(0),
            jobs_completed: AtomicU64::new(0),
            samples_produced: AtomicU64::new(0),
            failed_workers: AtomicU32::new(0),
        }
    }

    pub(crate) fn record_submitted(&self) {
        self.jobs_submitted.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_completed(&self, samples: usize) {
        self.samples_produced
            .fetch_add(samples as u64, Ordering::Relaxed);
        self.jobs_completed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_failure(&self) {
        self.failed_workers.fetch_add(1, Ordering::Relaxed);
    }

    /// Copies the counters.
    #[must_use]
    pub fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            jobs_submitted: self.jobs_submitted.load(Ordering::Relaxed),
            jobs_completed: self.jobs_completed.load(Ordering::Relaxed),
            samples_produced: self.samples_produced.load(Ordering::Relaxed),
            failed_workers: self.failed_workers.load(Ordering::Relaxed),
            elapsed: self.started.elapsed(),
        }
    }

    /// Builds the final summary once every worker has stopped.
    #[must_use]
    pub fn summary(&self, samples_delivered: u64) -> RenderSummary {
        let snap = self.snapshot();
        RenderSummary {
            jobs_submitted: snap.jobs_submitted,
            jobs_completed: snap.jobs_completed,
            failed_workers: snap.failed_workers,
            samples_delivered,
            elapsed: snap.elapsed,
            complete: snap.failed_workers == 0
                && snap.jobs_completed == snap.jobs_submitted
                && samples_delivered == snap.samples_produced,
        }
    }
}

impl Default for RenderProgress {
    fn default() -> Self {
        Self::new()
    }
}
