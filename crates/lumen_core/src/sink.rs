//! # Event Sinks
//!
//! The engine talks to its consumer only through [`RenderSink`]. The queue,
//! the workers and the aggregator all hold the same `Arc<dyn RenderSink>` and
//! never know what sits behind it.
//!
//! ```text
//!   Worker 0 ──┐  report()
//!   Worker N ──┼──────────────┐
//!              │              ▼
//!   Aggregator ┴─ flush ─> [RenderSink] ─> consumer thread
//! ```

use crate::error::{RenderError, RenderResult};
use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use lumen_shared::RenderEvent;

/// Receives render events.
///
/// Implementations must be callable from any engine thread. Delivery is a
/// message send; an implementation must not run consumer logic inline on the
/// calling worker.
pub trait RenderSink: Send + Sync {
    /// Delivers one event.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::SinkDisconnected`] if the consumer is gone.
    fn deliver(&self, event: RenderEvent) -> RenderResult<()>;
}

/// A sink backed by a crossbeam channel.
///
/// The receiving half goes to the consumer thread. With a bounded channel a
/// slow consumer stalls the aggregator's flush, not the workers.
#[derive(Clone, Debug)]
pub struct ChannelSink {
    tx: Sender<RenderEvent>,
}

impl ChannelSink {
    /// Creates a sink and its receiver.
    ///
    /// A `capacity` of 0 means unbounded. With a bounded channel, keep
    /// draining the receiver until `RenderCompleted` while the pool stops:
    /// calling [`WorkerPool::stop`](crate::WorkerPool::stop) or dropping the
    /// pool on the receiving thread deadlocks once the channel fills.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> (Self, Receiver<RenderEvent>) {
        let (tx, rx) = if capacity == 0 {
            unbounded()
        } else {
            bounded(capacity)
        };
        (Self { tx }, rx)
    }

    /// Creates an unbounded sink and its receiver.
    #[must_use]
    pub fn unbounded() -> (Self, Receiver<RenderEvent>) {
        Self::with_capacity(0)
    }
}

impl RenderSink for ChannelSink {
    fn deliver(&self, event: RenderEvent) -> RenderResult<()> {
        self.tx.send(event).map_err(|err| {
            let dropped = match err.0 {
                RenderEvent::PixelBatchReady(samples) => samples.len(),
                _ => 0,
            };
            RenderError::SinkDisconnected { dropped }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumen_shared::{PixelSample, Rgb};

    #[test]
    fn test_channel_sink_delivers_in_order() {
        let (sink, rx) = ChannelSink::unbounded();
        sink.deliver(RenderEvent::JobStarted { worker: 0 }).unwrap();
        sink.deliver(RenderEvent::WorkerExited { worker: 0 }).unwrap();

        assert_eq!(rx.recv().unwrap(), RenderEvent::JobStarted { worker: 0 });
        assert_eq!(rx.recv().unwrap(), RenderEvent::WorkerExited { worker: 0 });
    }

    #[test]
    fn test_disconnected_sink_counts_dropped_samples() {
        let (sink, rx) = ChannelSink::with_capacity(4);
        drop(rx);

        let batch = vec![PixelSample::new(0, 0, Rgb::BLACK); 3];
        match sink.deliver(RenderEvent::PixelBatchReady(batch)) {
            Err(RenderError::SinkDisconnected { dropped }) => assert_eq!(dropped, 3),
            other => panic!("expected SinkDisconnected, got {other:?}"),
        }
    }
}
