use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, ScrubError};
use crate::geometry::EdgeInsets;

const DEFAULT_ZOOM_SCALE: f64 = 1.5;
const DEFAULT_SHADE_ALPHA: f64 = 0.5;

/// Appearance and interaction settings for one scrubber.
///
/// Only `zoom_scale` and `corner_insets` influence the engine. The shade and
/// corner radius values are carried for the rendering layer.
///
/// # Example
/// ```
/// use scrubber::ScrubberConfig;
///
/// let config = ScrubberConfig::from_json_str(r#"{ "zoom_scale": 1.0 }"#).expect("valid");
/// assert_eq!(config.zoom_scale, 1.0);
/// assert_eq!(config.shade_alpha, 0.5);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScrubberConfig {
    /// Thumb scale while dragging. `1.0` disables the grow/shrink signal.
    pub zoom_scale: f64,
    pub shade_alpha: f64,
    pub corner_radius: f64,
    /// Margins between the host bounds and the thumbnail strip.
    pub corner_insets: EdgeInsets,
}

impl Default for ScrubberConfig {
    fn default() -> Self {
        Self {
            zoom_scale: DEFAULT_ZOOM_SCALE,
            shade_alpha: DEFAULT_SHADE_ALPHA,
            corner_radius: 0.0,
            corner_insets: EdgeInsets::default(),
        }
    }
}

impl ScrubberConfig {
    /// Parses and validates a JSON document.
    pub fn from_json_str(input: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(input).map_err(|err| ScrubError::InvalidConfig {
            reason: err.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ScrubError::ConfigIo {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self =
            serde_json::from_str(&text).map_err(|source| ScrubError::ConfigSerialization {
                path: path.to_path_buf(),
                source,
            })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.zoom_scale.is_finite() || self.zoom_scale < 1.0 {
            return Err(invalid(format!(
                "zoom_scale must be at least 1.0, got {}",
                self.zoom_scale
            )));
        }
        if !(0.0..=1.0).contains(&self.shade_alpha) {
            return Err(invalid(format!(
                "shade_alpha must be within 0..=1, got {}",
                self.shade_alpha
            )));
        }
        if !self.corner_radius.is_finite() || self.corner_radius < 0.0 {
            return Err(invalid(format!(
                "corner_radius must be non-negative, got {}",
                self.corner_radius
            )));
        }
        if !self.corner_insets.is_valid() {
            return Err(invalid(String::from(
                "corner_insets must be finite and non-negative",
            )));
        }
        Ok(())
    }

    /// True when drag start/end should be signalled to the renderer.
    pub fn emphasizes_drag(&self) -> bool {
        self.zoom_scale > 1.0
    }
}

fn invalid(reason: String) -> ScrubError {
    ScrubError::InvalidConfig { reason }
}
