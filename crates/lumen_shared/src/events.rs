//! Events delivered from the render engine to its single consumer.
//!
//! The engine never touches consumer state directly. Everything the consumer
//! learns about a render arrives as one of these, in order, on one thread.

use crate::pixel::PixelSample;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Event type discriminator
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventType {
    /// A worker entered its job loop
    JobStarted = 0,
    /// A worker failed and is terminating
    JobError = 1,
    /// A worker left its job loop
    WorkerExited = 2,
    /// A batch of pixels is ready
    PixelBatchReady = 3,
    /// The render is over
    RenderCompleted = 4,
}

/// Final accounting of one render.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderSummary {
    /// WORK jobs handed to the queue.
    pub jobs_submitted: u64,
    /// WORK jobs whose samples reached the aggregator.
    pub jobs_completed: u64,
    /// Workers that terminated on an error.
    pub failed_workers: u32,
    /// Samples delivered to the sink across all batches.
    pub samples_delivered: u64,
    /// Wall time from pool start to the final flush.
    pub elapsed: Duration,
    /// False if any worker failed or any submitted job went unrendered.
    pub complete: bool,
}

/// Events emitted by the render engine.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum RenderEvent {
    /// A worker is ready and waiting for jobs.
    JobStarted {
        /// Worker index.
        worker: usize,
    },

    /// A worker hit an error and is terminating.
    JobError {
        /// Worker index.
        worker: usize,
        /// What went wrong.
        message: String,
    },

    /// A worker left its loop (normally or after an error).
    WorkerExited {
        /// Worker index.
        worker: usize,
    },

    /// A throttled batch of rendered pixels.
    PixelBatchReady(Vec<PixelSample>),

    /// Every worker has terminated and the final batch has been sent.
    RenderCompleted(RenderSummary),
}

impl RenderEvent {
    /// Returns the event type
    #[must_use]
    pub const fn event_type(&self) -> EventType {
        match self {
            Self::JobStarted { .. } => EventType::JobStarted,
            Self::JobError { .. } => EventType::JobError,
            Self::WorkerExited { .. } => EventType::WorkerExited,
            Self::PixelBatchReady(_) => EventType::PixelBatchReady,
            Self::RenderCompleted(_) => EventType::RenderCompleted,
        }
    }

    /// Returns the worker this event is about, if any.
    #[must_use]
    pub const fn worker(&self) -> Option<usize> {
        match self {
            Self::JobStarted { worker }
            | Self::JobError { worker, .. }
            | Self::WorkerExited { worker } => Some(*worker),
            Self::PixelBatchReady(_) | Self::RenderCompleted(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pixel::Rgb;

    #[test]
    fn test_event_type() {
        let event = RenderEvent::PixelBatchReady(vec![PixelSample::new(1, 2, Rgb::BLACK)]);
        assert_eq!(event.event_type(), EventType::PixelBatchReady);
        assert_eq!(event.worker(), None);
    }

    #[test]
    fn test_event_worker() {
        let event = RenderEvent::JobError {
            worker: 3,
            message: "boom".into(),
        };
        assert_eq!(event.event_type(), EventType::JobError);
        assert_eq!(event.worker(), Some(3));
    }
}
