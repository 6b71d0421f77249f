//! # Jobs
//!
//! A [`Job`] is what a worker pops: a command plus, for WORK, the region to
//! render. Jobs are immutable once built; the only way to get one is through
//! the constructors, so a WORK job always carries a region.

mod queue;

pub use queue::PriorityJobQueue;

use lumen_shared::{Region, PRIORITY_LEVELS};

/// What a worker should do with a job.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum JobCommand {
    /// Leave the job loop.
    Exit,
    /// No effect.
    Noop,
    /// Informational: a worker is ready.
    Started,
    /// Render the job's region.
    Work,
    /// Report the job's argument as an error, then leave the job loop.
    WorkError,
}

/// Priority classes. Lower ordinal is served first.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum Priority {
    /// Served before everything else.
    Highest = 0,
    /// Above normal.
    Higher = 1,
    /// Normal.
    Normal = 2,
    /// Below normal.
    BelowNormal = 3,
    /// Low. The default for render tiles.
    #[default]
    Low = 4,
    /// Served only when nothing else is queued.
    Idle = 5,
}

impl Priority {
    /// Every class, most urgent first.
    pub const ALL: [Self; PRIORITY_LEVELS] = [
        Self::Highest,
        Self::Higher,
        Self::Normal,
        Self::BelowNormal,
        Self::Low,
        Self::Idle,
    ];

    /// Bucket index of this class.
    #[inline]
    #[must_use]
    pub const fn ordinal(self) -> usize {
        self as usize
    }
}

/// A unit of work for the pool.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Job {
    command: JobCommand,
    region: Option<Region>,
    argument: String,
}

impl Job {
    /// Tells the worker that pops it to exit.
    #[must_use]
    pub fn exit() -> Self {
        Self::control(JobCommand::Exit, String::new())
    }

    /// A job with no effect.
    #[must_use]
    pub fn noop() -> Self {
        Self::control(JobCommand::Noop, String::new())
    }

    /// An informational marker.
    #[must_use]
    pub fn started(argument: impl Into<String>) -> Self {
        Self::control(JobCommand::Started, argument.into())
    }

    /// Render `region`.
    #[must_use]
    pub fn work(region: Region) -> Self {
        Self {
            command: JobCommand::Work,
            region: Some(region),
            argument: String::new(),
        }
    }

    /// Makes the worker that pops it report `message` and terminate.
    #[must_use]
    pub fn work_error(message: impl Into<String>) -> Self {
        Self::control(JobCommand::WorkError, message.into())
    }

    fn control(command: JobCommand, argument: String) -> Self {
        Self {
            command,
            region: None,
            argument,
        }
    }

    /// The job's command.
    #[inline]
    #[must_use]
    pub const fn command(&self) -> JobCommand {
        self.command
    }

    /// The region to render (WORK jobs only).
    #[inline]
    #[must_use]
    pub const fn region(&self) -> Option<&Region> {
        self.region.as_ref()
    }

    /// Free-form argument (error text for WORK_ERROR).
    #[inline]
    #[must_use]
    pub fn argument(&self) -> &str {
        &self.argument
    }
}
