//! # LUMEN
//!
//! Headless driver for the render engine.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        lumen_render                          │
//! │                                                              │
//! │  RenderConfig ──> RegionSplitter ──> WorkerPool ──> Sink     │
//! │                                          │            │      │
//! │                                    SphereScene     Canvas    │
//! │                                     (World)     (main thread)│
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - `driver`: one render end to end, consumer loop, ASCII preview
//! - `logging`: tracing subscriber setup
//! - `scene`: the built-in sphere scene

#![deny(missing_docs)]
#![deny(unsafe_code)]

pub mod driver;
pub mod logging;
pub mod scene;

pub use driver::{ascii_preview, run_render, RenderOutcome};
pub use logging::init_logging;
pub use scene::{Sphere, SphereScene};

// Re-export the engine crates
pub use lumen_core as core;
pub use lumen_shared as shared;
