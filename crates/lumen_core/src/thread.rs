//! # Render Threads
//!
//! Every OS thread the engine owns plays one of two roles and goes through
//! the same lifecycle:
//!
//! ```text
//!   spawn ──> running ──request_stop()──> draining ──join()──> exit value
//! ```
//!
//! | Role       | `request_stop`                      | Exit value        |
//! |------------|-------------------------------------|-------------------|
//! | Worker     | posts one EXIT job to the queue     | [`WorkerExit`]    |
//! | Aggregator | sets the stop flag, wakes the timer | [`AggregatorReport`] |

use crate::aggregator::{AggregatorReport, ResultAggregator};
use crate::error::{panic_message, RenderError, RenderResult};
use crate::pool::{WorkerExit, WorkerThread};
use std::fmt;
use std::thread::{Builder, JoinHandle};

/// What a thread does.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ThreadRole {
    /// Pops and renders jobs.
    Worker(usize),
    /// Batches and delivers samples.
    Aggregator,
}

impl ThreadRole {
    /// OS-level thread name.
    #[must_use]
    pub fn thread_name(self) -> String {
        match self {
            Self::Worker(id) => format!("lumen-worker-{id}"),
            Self::Aggregator => "lumen-aggregator".to_string(),
        }
    }
}

impl fmt::Display for ThreadRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Worker(id) => write!(f, "worker {id}"),
            Self::Aggregator => f.write_str("aggregator"),
        }
    }
}

/// The lifecycle every engine thread shares.
pub trait Lifecycle {
    /// Value the thread produces when it ends.
    type Exit;

    /// The thread's role.
    fn role(&self) -> ThreadRole;

    /// Asks the thread to wind down. Does not block.
    fn request_stop(&self);

    /// Blocks until the thread ends.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::ThreadPanicked`] if the thread panicked outside
    /// its guarded sections, or the thread's own error.
    fn join(self) -> RenderResult<Self::Exit>;
}

/// How a thread ended.
#[derive(Debug)]
pub enum ThreadExit {
    /// A worker left its job loop.
    Worker(WorkerExit),
    /// The aggregator delivered its final batch.
    Aggregator(AggregatorReport),
}

/// Any engine thread.
#[derive(Debug)]
pub enum RenderThread {
    /// A worker thread.
    Worker(WorkerThread),
    /// The aggregator thread.
    Aggregator(ResultAggregator),
}

impl Lifecycle for RenderThread {
    type Exit = ThreadExit;

    fn role(&self) -> ThreadRole {
        match self {
            Self::Worker(w) => w.role(),
            Self::Aggregator(a) => a.role(),
        }
    }

    fn request_stop(&self) {
        match self {
            Self::Worker(w) => w.request_stop(),
            Self::Aggregator(a) => a.request_stop(),
        }
    }

    fn join(self) -> RenderResult<ThreadExit> {
        match self {
            Self::Worker(w) => w.join().map(ThreadExit::Worker),
            Self::Aggregator(a) => a.join().map(ThreadExit::Aggregator),
        }
    }
}

/// Spawns a named OS thread for `role`.
pub(crate) fn spawn_role<T, F>(role: ThreadRole, f: F) -> RenderResult<JoinHandle<T>>
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    Builder::new()
        .name(role.thread_name())
        .spawn(f)
        .map_err(|source| RenderError::Spawn {
            role: role.to_string(),
            source,
        })
}

/// Joins a handle, turning a panic into [`RenderError::ThreadPanicked`].
pub(crate) fn join_role<T>(role: ThreadRole, handle: JoinHandle<T>) -> RenderResult<T> {
    handle.join().map_err(|payload| RenderError::ThreadPanicked {
        role: role.to_string(),
        message: panic_message(payload.as_ref()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_names() {
        assert_eq!(ThreadRole::Worker(3).thread_name(), "lumen-worker-3");
        assert_eq!(ThreadRole::Aggregator.thread_name(), "lumen-aggregator");
        assert_eq!(ThreadRole::Worker(3).to_string(), "worker 3");
    }

    #[test]
    fn test_spawn_role_names_thread() {
        let handle = spawn_role(ThreadRole::Worker(7), || {
            std::thread::current().name().map(str::to_string)
        })
        .unwrap();
        let name = join_role(ThreadRole::Worker(7), handle).unwrap();
        assert_eq!(name.as_deref(), Some("lumen-worker-7"));
    }

    #[test]
    fn test_join_role_reports_panic() {
        let handle = spawn_role(ThreadRole::Aggregator, || -> u32 { panic!("flush exploded") }).unwrap();
        match join_role(ThreadRole::Aggregator, handle) {
            Err(RenderError::ThreadPanicked { role, message }) => {
                assert_eq!(role, "aggregator");
                assert_eq!(message, "flush exploded");
            }
            other => panic!("expected ThreadPanicked, got {other:?}"),
        }
    }
}
