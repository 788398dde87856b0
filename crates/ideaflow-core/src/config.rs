//! Editor tuning knobs.

use crate::error::ConfigError;
use crate::viewport::{MAX_SCALE, MIN_SCALE, ZOOM_STEP, ZoomLimits};
use serde::Deserialize;
use std::time::Duration;

/// Configuration for an editor session.
///
/// Every field has a default, so a partial JSON object (or `{}`) is valid.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EditorConfig {
    pub min_scale: f64,
    pub max_scale: f64,
    /// Multiplicative zoom per wheel notch. Must be `> 1`.
    pub zoom_step: f64,
    /// Regions drawn smaller than this on either axis are discarded.
    pub min_region_size: f64,
    /// Resizing never shrinks a node below this on either axis.
    pub min_node_size: f64,
    /// Pick radius for connection and resize handles, in screen pixels.
    pub handle_radius: f64,
    /// Quiet period before queued position updates are flushed.
    pub autosave_debounce_ms: u64,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            min_scale: MIN_SCALE,
            max_scale: MAX_SCALE,
            zoom_step: ZOOM_STEP,
            min_region_size: 20.0,
            min_node_size: 20.0,
            handle_radius: 8.0,
            autosave_debounce_ms: 1000,
        }
    }
}

impl EditorConfig {
    /// Parse and validate a JSON config.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.min_scale > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "minScale must be positive, got {}",
                self.min_scale
            )));
        }
        if self.min_scale > self.max_scale {
            return Err(ConfigError::Invalid(format!(
                "minScale {} exceeds maxScale {}",
                self.min_scale, self.max_scale
            )));
        }
        if !(self.zoom_step > 1.0) {
            return Err(ConfigError::Invalid(format!(
                "zoomStep must be greater than 1, got {}",
                self.zoom_step
            )));
        }
        for (name, v) in [
            ("minRegionSize", self.min_region_size),
            ("minNodeSize", self.min_node_size),
            ("handleRadius", self.handle_radius),
        ] {
            if !(v >= 0.0) {
                return Err(ConfigError::Invalid(format!("{name} must be >= 0, got {v}")));
            }
        }
        Ok(())
    }

    pub fn zoom_limits(&self) -> ZoomLimits {
        ZoomLimits {
            min_scale: self.min_scale,
            max_scale: self.max_scale,
            step: self.zoom_step,
        }
    }

    pub fn autosave_debounce(&self) -> Duration {
        Duration::from_millis(self.autosave_debounce_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_is_default() {
        assert_eq!(EditorConfig::from_json("{}").unwrap(), EditorConfig::default());
    }

    #[test]
    fn partial_override() {
        let c = EditorConfig::from_json(r#"{"autosaveDebounceMs": 250, "maxScale": 8}"#).unwrap();
        assert_eq!(c.autosave_debounce(), Duration::from_millis(250));
        assert_eq!(c.max_scale, 8.0);
        assert_eq!(c.min_region_size, 20.0);
    }

    #[test]
    fn rejects_inverted_scale_range() {
        let err = EditorConfig::from_json(r#"{"minScale": 5, "maxScale": 2}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_non_growing_zoom_step() {
        assert!(EditorConfig::from_json(r#"{"zoomStep": 1.0}"#).is_err());
        assert!(matches!(
            EditorConfig::from_json("{not json").unwrap_err(),
            ConfigError::Parse(_)
        ));
    }
}
