//! # Render Error Types
//!
//! All errors that can occur while driving a render.

use std::path::PathBuf;
use thiserror::Error;

/// Errors returned by a [`World`](crate::world::World) when it cannot render a region.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WorldError {
    /// The region lies (partly) outside the scene's image.
    #[error("region {x0},{y0}..{x1},{y1} is outside the {width}x{height} image")]
    RegionOutOfBounds {
        /// Region origin column.
        x0: u32,
        /// Region origin row.
        y0: u32,
        /// Region end column.
        x1: u32,
        /// Region end row.
        y1: u32,
        /// Image width.
        width: u32,
        /// Image height.
        height: u32,
    },

    /// The renderer failed for a scene-specific reason.
    #[error("render failed: {0}")]
    Failed(String),
}

/// Errors raised while loading or validating a [`RenderConfig`](crate::config::RenderConfig).
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read config {path}: {source}")]
    Io {
        /// File that was being read.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The config file is not valid TOML for this schema.
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value is out of its allowed range.
    #[error("invalid config value for `{key}`: {reason}")]
    Invalid {
        /// Offending key.
        key: &'static str,
        /// Why it was rejected.
        reason: String,
    },
}

/// Errors that can occur in the render engine.
#[derive(Error, Debug)]
pub enum RenderError {
    /// An OS thread could not be spawned.
    #[error("failed to spawn {role} thread: {source}")]
    Spawn {
        /// Role of the thread that failed to start.
        role: String,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// A thread panicked outside the guarded render path.
    #[error("{role} thread panicked: {message}")]
    ThreadPanicked {
        /// Role of the thread.
        role: String,
        /// Panic payload, if it was a string.
        message: String,
    },

    /// The sink stopped accepting events (consumer hung up).
    #[error("sink disconnected, {dropped} samples could not be delivered")]
    SinkDisconnected {
        /// Samples that were in flight when delivery failed.
        dropped: usize,
    },

    /// The pool was asked to start with zero workers.
    #[error("worker pool needs at least one worker")]
    NoWorkers,

    /// Invalid configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Result type for render engine operations.
pub type RenderResult<T> = Result<T, RenderError>;

/// Extracts a readable message from a panic payload.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
