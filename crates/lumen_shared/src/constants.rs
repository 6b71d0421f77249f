//! # Render Defaults
//!
//! Values used when a config file leaves a key out.

// =============================================================================
// IMAGE
// =============================================================================

/// Default image width in pixels.
pub const DEFAULT_WIDTH: u32 = 400;

/// Default image height in pixels.
pub const DEFAULT_HEIGHT: u32 = 400;

/// Default number of tiles along each image axis.
///
/// The image is split into `DEFAULT_DIVISIONS * DEFAULT_DIVISIONS` jobs.
pub const DEFAULT_DIVISIONS: u32 = 10;

// =============================================================================
// SCHEDULING
// =============================================================================

/// Number of priority classes in the job queue (highest to idle).
pub const PRIORITY_LEVELS: usize = 6;

/// Default aggregator flush interval.
///
/// A UI thread repainting at ~10Hz keeps up with this comfortably.
pub const DEFAULT_FLUSH_INTERVAL_MS: u64 = 100;

/// Default capacity of the event channel. 0 means unbounded.
pub const DEFAULT_EVENT_CAPACITY: usize = 0;
