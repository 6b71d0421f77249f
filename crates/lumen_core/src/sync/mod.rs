//! # Synchronization Primitives
//!
//! The job queue needs a wait primitive whose count moves in lockstep with
//! its buckets:
//!
//! ```text
//! add_job:  lock buckets → push → unlock → release()   (+1 permit)
//! pop:      acquire()    → lock buckets → pop → unlock (-1 permit)
//! ```
//!
//! A permit only exists after its job is visible in a bucket, so a thread
//! that wins a permit always finds a job. No lost wakeups, no spurious pops.

//!
//! Pausing uses a separate [`PauseGate`] that workers pass before and after
//! `pop`. It never touches the semaphore, so the pairing above holds while
//! paused.

mod gate;
mod semaphore;

pub use gate::PauseGate;
pub use semaphore::Semaphore;
