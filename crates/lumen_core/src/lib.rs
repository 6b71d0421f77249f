//! # LUMEN Core Engine
//!
//! Distributes ray-trace work across threads and streams the results back
//! to a single consumer:
//! - Priority job queue with a blocking pop
//! - Fixed-size worker pool with an EXIT-job shutdown protocol
//! - Result aggregator that batches pixels and delivers them on a timer
//!
//! ## Architecture Rules
//!
//! 1. **One consumer** - every event leaves through a [`RenderSink`]; the
//!    engine never touches consumer state
//! 2. **No lost jobs** - the queue's semaphore count always equals its
//!    queued job count
//! 3. **No lost pixels** - every sample pushed to the aggregator is
//!    delivered exactly once, including the final partial batch
//!
//! ## Example
//!
//! ```rust,ignore
//! use lumen_core::{ChannelSink, PoolConfig, Priority, RegionSplitter, WorkerPool};
//!
//! let (sink, events) = ChannelSink::unbounded();
//! let pool = WorkerPool::start(&PoolConfig::new(8), Arc::new(scene), Arc::new(sink))?;
//! pool.submit_regions(RegionSplitter::new(400, 400, 10).regions(), Priority::Normal);
//! let summary = pool.stop()?;
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod aggregator;
pub mod canvas;
pub mod config;
pub mod error;
pub mod job;
pub mod pool;
pub mod progress;
pub mod sink;
pub mod splitter;
pub mod sync;
pub mod thread;
pub mod world;

pub use aggregator::{
    AggregatorHandle, AggregatorReport, AggregatorStats, ResultAggregator, MIN_FLUSH_INTERVAL,
};
pub use canvas::{Canvas, CanvasUpdate};
pub use config::RenderConfig;
pub use error::{ConfigError, RenderError, RenderResult, WorldError};
pub use job::{Job, JobCommand, Priority, PriorityJobQueue};
pub use pool::{PoolConfig, WorkerExit, WorkerPool, WorkerState, WorkerThread};
pub use progress::{ProgressSnapshot, RenderProgress};
pub use sink::{ChannelSink, RenderSink};
pub use splitter::RegionSplitter;
pub use sync::{PauseGate, Semaphore};
pub use thread::{Lifecycle, RenderThread, ThreadExit, ThreadRole};
pub use world::{SceneMode, World};
