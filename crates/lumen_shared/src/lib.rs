//! # LUMEN Shared
//!
//! Plain data used by the render engine and by whoever consumes its output.
//!
//! ## CRITICAL RULE
//!
//! This crate must NEVER spawn threads or take locks. Anything with a
//! lifecycle belongs in `lumen_core`.

#![deny(missing_docs)]
#![deny(unsafe_code)]

pub mod constants;
pub mod events;
pub mod pixel;

pub use constants::{
    DEFAULT_DIVISIONS, DEFAULT_EVENT_CAPACITY, DEFAULT_FLUSH_INTERVAL_MS, DEFAULT_HEIGHT,
    DEFAULT_WIDTH, PRIORITY_LEVELS,
};
pub use events::{EventType, RenderEvent, RenderSummary};
pub use pixel::{PixelPoint, PixelSample, Region, Rgb};
