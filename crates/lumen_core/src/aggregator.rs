//! # Result Aggregator
//!
//! **Throttled batch delivery for a slow consumer**
//!
//! Workers produce pixels far faster than a UI thread can repaint. Instead
//! of sending every tile the moment it is done, we:
//! 1. Append samples to one buffer under its own mutex
//! 2. Wake once per flush interval on a dedicated thread
//! 3. Swap the buffer out, release the lock, then deliver the copy
//! 4. Flush whatever is left one last time on shutdown
//!
//! ## Architecture
//!
//! ```text
//!   Worker 1 ──┐
//!   Worker 2 ──┼──> [Buffer (Mutex)] ──> [Aggregator Thread] ──> Sink
//!   Worker N ──┘      (append only)        (one batch / tick)
//! ```
//!
//! The buffer lock is held only for an append or a swap. Delivery happens
//! outside it, so a blocked sink never stalls a worker.

use crate::error::{RenderError, RenderResult};
use crate::progress::RenderProgress;
use crate::sink::RenderSink;
use crate::thread::{join_role, spawn_role, Lifecycle, ThreadRole};
use lumen_shared::{PixelSample, RenderEvent, RenderSummary};
use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

/// Shortest flush interval the timer will run with.
pub const MIN_FLUSH_INTERVAL: Duration = Duration::from_millis(1);

/// Statistics for one aggregator run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AggregatorStats {
    /// Samples pushed by workers.
    pub samples_received: u64,
    /// Samples handed to the sink.
    pub samples_delivered: u64,
    /// Samples that could not be delivered because the sink failed.
    pub samples_dropped: u64,
    /// Batches delivered on timer ticks.
    pub timed_flushes: u64,
    /// Size of the shutdown batch (0 if nothing was left).
    pub final_batch: usize,
    /// Largest batch delivered.
    pub largest_batch: usize,
}

/// What the aggregator thread hands back when it ends.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AggregatorReport {
    /// Delivery statistics.
    pub stats: AggregatorStats,
    /// The summary sent with `RenderCompleted`.
    pub summary: RenderSummary,
}

/// State shared between the aggregator thread and its producers.
#[derive(Debug)]
struct Shared {
    /// Pending samples.
    buffer: Mutex<Vec<PixelSample>>,
    /// Total samples ever pushed.
    received: AtomicU64,
    /// Stop flag for the timer wait.
    stop: Mutex<bool>,
    /// Wakes the timer wait early on stop.
    wake: Condvar,
}

impl Shared {
    fn new() -> Self {
        Self {
            buffer: Mutex::new(Vec::new()),
            received: AtomicU64::new(0),
            stop: Mutex::new(false),
            wake: Condvar::new(),
        }
    }

    /// Sleeps until `deadline` or a stop request. Returns true if stopping.
    ///
    /// A `None` deadline lies beyond what `Instant` can represent; only a
    /// stop request ends that wait.
    fn wait_for_tick(&self, deadline: Option<Instant>) -> bool {
        let mut stop = self.stop.lock();
        while !*stop {
            match deadline {
                Some(deadline) => {
                    if self.wake.wait_until(&mut stop, deadline).timed_out() {
                        break;
                    }
                }
                None => self.wake.wait(&mut stop),
            }
        }
        *stop
    }

    fn request_stop(&self) {
        *self.stop.lock() = true;
        self.wake.notify_all();
    }

    fn take_batch(&self) -> Vec<PixelSample> {
        std::mem::take(&mut *self.buffer.lock())
    }
}

/// Producer handle given to workers.
#[derive(Clone, Debug)]
pub struct AggregatorHandle {
    shared: Arc<Shared>,
}

impl AggregatorHandle {
    /// Buffers a single sample.
    pub fn push_pixel(&self, sample: PixelSample) {
        self.shared.buffer.lock().push(sample);
        self.shared.received.fetch_add(1, Ordering::Relaxed);
    }

    /// Buffers a batch of samples.
    pub fn push_batch(&self, batch: Vec<PixelSample>) {
        if batch.is_empty() {
            return;
        }
        let count = batch.len() as u64;
        {
            let mut buffer = self.shared.buffer.lock();
            if buffer.is_empty() {
                *buffer = batch;
            } else {
                buffer.extend(batch);
            }
        }
        self.shared.received.fetch_add(count, Ordering::Relaxed);
    }

    /// Samples waiting for the next flush.
    #[must_use]
    pub fn buffered(&self) -> usize {
        self.shared.buffer.lock().len()
    }
}

/// Thread body.
struct FlushLoop {
    shared: Arc<Shared>,
    sink: Arc<dyn RenderSink>,
    progress: Arc<RenderProgress>,
    interval: Duration,
    stats: AggregatorStats,
    failure: Option<RenderError>,
}

impl FlushLoop {
    fn run(mut self) -> RenderResult<AggregatorReport> {
        tracing::debug!(interval_ms = self.interval.as_millis() as u64, "aggregator started");
        let mut last_flush = Instant::now();

        while !self.shared.wait_for_tick(last_flush.checked_add(self.interval)) {
            if self.flush() > 0 {
                self.stats.timed_flushes += 1;
            }
            last_flush = Instant::now();
        }

        // Final flush on shutdown
        self.stats.final_batch = self.flush();
        self.stats.samples_received = self.shared.received.load(Ordering::Relaxed);

        let summary = self.progress.summary(self.stats.samples_delivered);
        if let Some(err) = self.failure {
            tracing::error!(
                dropped = self.stats.samples_dropped,
                "aggregator lost its sink; render incomplete"
            );
            return Err(err);
        }

        self.sink
            .deliver(RenderEvent::RenderCompleted(summary.clone()))?;
        tracing::info!(
            delivered = self.stats.samples_delivered,
            batches = self.stats.timed_flushes,
            final_batch = self.stats.final_batch,
            "aggregator finished"
        );

        Ok(AggregatorReport {
            stats: self.stats,
            summary,
        })
    }

    /// Swaps the buffer out and delivers it. Returns the batch size.
    fn flush(&mut self) -> usize {
        let batch = self.shared.take_batch();
        let size = batch.len();
        if size == 0 {
            return 0;
        }

        if self.failure.is_some() {
            self.stats.samples_dropped += size as u64;
            return size;
        }

        match self.sink.deliver(RenderEvent::PixelBatchReady(batch)) {
            Ok(()) => {
                self.stats.samples_delivered += size as u64;
                self.stats.largest_batch = self.stats.largest_batch.max(size);
                tracing::trace!(size, "batch delivered");
            }
            Err(err) => {
                tracing::error!(size, error = %err, "batch delivery failed");
                self.stats.samples_dropped += size as u64;
                self.failure = Some(err);
            }
        }
        size
    }
}

/// The aggregator thread.
pub struct ResultAggregator {
    shared: Arc<Shared>,
    handle: JoinHandle<RenderResult<AggregatorReport>>,
}

impl ResultAggregator {
    /// Spawns the aggregator thread.
    ///
    /// Intervals below [`MIN_FLUSH_INTERVAL`] are raised to it. An interval
    /// too large to schedule means only the shutdown flush runs.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::Spawn`] if the OS refuses the thread.
    pub fn start(
        flush_interval: Duration,
        sink: Arc<dyn RenderSink>,
        progress: Arc<RenderProgress>,
    ) -> RenderResult<Self> {
        if flush_interval < MIN_FLUSH_INTERVAL {
            tracing::debug!(
                requested_us = flush_interval.as_micros() as u64,
                "flush interval raised to the minimum"
            );
        }
        let shared = Arc::new(Shared::new());
        let body = FlushLoop {
            shared: Arc::clone(&shared),
            sink,
            progress,
            interval: flush_interval.max(MIN_FLUSH_INTERVAL),
            stats: AggregatorStats::default(),
            failure: None,
        };
        let handle = spawn_role(ThreadRole::Aggregator, move || body.run())?;
        Ok(Self { shared, handle })
    }

    /// A producer handle for workers.
    #[must_use]
    pub fn handle(&self) -> AggregatorHandle {
        AggregatorHandle {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Stops the thread after its final flush and returns its report.
    ///
    /// # Errors
    ///
    /// Returns the sink's error if any delivery failed.
    pub fn finish(self) -> RenderResult<AggregatorReport> {
        self.request_stop();
        self.join()
    }
}

impl Lifecycle for ResultAggregator {
    type Exit = AggregatorReport;

    fn role(&self) -> ThreadRole {
        ThreadRole::Aggregator
    }

    fn request_stop(&self) {
        self.shared.request_stop();
    }

    fn join(self) -> RenderResult<AggregatorReport> {
        join_role(ThreadRole::Aggregator, self.handle)?
    }
}

impl std::fmt::Debug for ResultAggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultAggregator")
            .field("buffered", &self.shared.buffer.lock().len())
            .field("finished", &self.handle.is_finished())
            .finish()
    }
}
