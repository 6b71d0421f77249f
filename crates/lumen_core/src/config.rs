//! # Render Configuration
//!
//! Loaded once at startup from TOML. Every key is optional:
//!
//! ```toml
//! width = 640
//! height = 480
//! divisions = 12          # 12 x 12 tiles
//! workers = 0             # 0 = one per available core
//! scene_mode = "shared"   # or "replicated"
//! flush_interval_ms = 100
//! event_capacity = 0      # 0 = unbounded event channel
//! ```

use crate::error::ConfigError;
use crate::splitter::RegionSplitter;
use crate::world::SceneMode;
use lumen_shared::{
    DEFAULT_DIVISIONS, DEFAULT_EVENT_CAPACITY, DEFAULT_FLUSH_INTERVAL_MS, DEFAULT_HEIGHT,
    DEFAULT_WIDTH,
};
use serde::Deserialize;
use std::num::NonZeroUsize;
use std::path::Path;
use std::time::Duration;

/// Everything needed to set up one render.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RenderConfig {
    /// Image width in pixels.
    pub width: u32,
    /// Image height in pixels.
    pub height: u32,
    /// Tiles per axis.
    pub divisions: u32,
    /// Worker threads. 0 means one per available core.
    pub workers: usize,
    /// How workers get their scene.
    pub scene_mode: SceneMode,
    /// Aggregator flush interval in milliseconds.
    pub flush_interval_ms: u64,
    /// Event channel capacity. 0 means unbounded.
    pub event_capacity: usize,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            divisions: DEFAULT_DIVISIONS,
            workers: 0,
            scene_mode: SceneMode::default(),
            flush_interval_ms: DEFAULT_FLUSH_INTERVAL_MS,
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

impl RenderConfig {
    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed TOML or unknown keys and
    /// [`ConfigError::Invalid`] for out-of-range values.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, otherwise as
    /// [`RenderConfig::from_toml_str`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&source)?;
        tracing::debug!(path = %path.display(), ?config, "config loaded");
        Ok(config)
    }

    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first bad key.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |key: &'static str, reason: String| Err(ConfigError::Invalid { key, reason });

        if self.width == 0 {
            return invalid("width", "must be at least 1".into());
        }
        if self.height == 0 {
            return invalid("height", "must be at least 1".into());
        }
        if self.divisions == 0 {
            return invalid("divisions", "must be at least 1".into());
        }
        let smallest_side = self.width.min(self.height);
        if self.divisions > smallest_side {
            return invalid(
                "divisions",
                format!("{} tiles per axis do not fit a {smallest_side} pixel side", self.divisions),
            );
        }
        if self.flush_interval_ms == 0 {
            return invalid("flush_interval_ms", "must be at least 1".into());
        }
        Ok(())
    }

    /// Resolved worker count.
    #[must_use]
    pub fn worker_count(&self) -> usize {
        if self.workers > 0 {
            return self.workers;
        }
        std::thread::available_parallelism().map_or(1, NonZeroUsize::get)
    }

    /// Flush interval as a [`Duration`].
    #[must_use]
    pub const fn flush_interval(&self) -> Duration {
        Duration::from_millis(self.flush_interval_ms)
    }

    /// Tile splitter for the configured image.
    #[must_use]
    pub fn splitter(&self) -> RegionSplitter {
        RegionSplitter::new(self.width, self.height, self.divisions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = RenderConfig::from_toml_str("").unwrap();
        assert_eq!(config, RenderConfig::default());
        assert!(config.worker_count() >= 1);
        assert_eq!(config.flush_interval(), Duration::from_millis(100));
    }

    #[test]
    fn test_full_document() {
        let config = RenderConfig::from_toml_str(
            r#"
            width = 64
            height = 32
            divisions = 4
            workers = 3
            scene_mode = "shared"
            flush_interval_ms = 25
            event_capacity = 128
            "#,
        )
        .unwrap();

        assert_eq!(config.width, 64);
        assert_eq!(config.worker_count(), 3);
        assert_eq!(config.scene_mode, SceneMode::Shared);
        assert_eq!(config.event_capacity, 128);
        assert_eq!(config.splitter().tile_count(), 16);
    }

    #[test]
    fn test_unknown_key_rejected() {
        let err = RenderConfig::from_toml_str("threads = 4").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_out_of_range_values_rejected() {
        let err = RenderConfig::from_toml_str("width = 0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "width", .. }));

        let err = RenderConfig::from_toml_str("width = 8\nheight = 8\ndivisions = 9").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "divisions", .. }));

        let err = RenderConfig::from_toml_str("flush_interval_ms = 0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "flush_interval_ms", .. }));
    }

    #[test]
    fn test_load_missing_file() {
        let err = RenderConfig::load("/definitely/not/here.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
