//! # World Adapter
//!
//! The engine does not know how to trace rays. It only knows how to hand a
//! [`Region`] to something that implements [`World`] and collect the
//! samples that come back.
//!
//! ## Scene sharing
//!
//! ```text
//!   SceneMode::Replicated           SceneMode::Shared
//!
//!   W0 ──> [scene copy 0]           W0 ──┐
//!   W1 ──> [scene copy 1]           W1 ──┼──> [scene]  (Arc, read-only)
//!   W2 ──> [scene copy 2]           W2 ──┘
//! ```
//!
//! Replication costs one clone per worker at start-up and removes any
//! read contention inside the renderer. Sharing costs nothing but requires
//! `render_region` to be safe under concurrent calls, which `Sync` enforces.

use crate::error::WorldError;
use lumen_shared::{PixelSample, Region};
use serde::Deserialize;
use std::sync::Arc;

/// Renders pixel regions into samples.
///
/// Called from every worker thread. `Clone` is the replication capability
/// used by [`SceneMode::Replicated`].
pub trait World: Send + Sync + Clone + 'static {
    /// Renders every pixel of `region` exactly once.
    ///
    /// # Errors
    ///
    /// Returns a [`WorldError`] if the region cannot be rendered. Panics are
    /// also tolerated: the calling worker catches them and reports them the
    /// same way.
    fn render_region(&self, region: &Region) -> Result<Vec<PixelSample>, WorldError>;
}

/// How workers get their scene.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SceneMode {
    /// Every worker owns an independent clone.
    #[default]
    Replicated,
    /// Every worker holds the same immutable scene.
    Shared,
}

impl SceneMode {
    /// Produces the scene handle for one worker.
    #[must_use]
    pub fn bind<W: World>(self, scene: &Arc<W>) -> Arc<W> {
        match self {
            Self::Replicated => Arc::new(W::clone(scene)),
            Self::Shared => Arc::clone(scene),
        }
    }
}
