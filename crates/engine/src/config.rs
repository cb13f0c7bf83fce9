//! Engine configuration
//!
//! Session-level settings supplied by the application state collaborator.
//! Serializable so the host can persist them alongside its other
//! preferences.

use serde::{Deserialize, Serialize};

fn default_cache_capacity() -> usize {
    32
}

fn default_dpr_cap() -> f32 {
    2.0
}

fn default_true() -> bool {
    true
}

fn default_zoom_animation_ms() -> u64 {
    300
}

fn default_zoom_ladder() -> Vec<f32> {
    vec![1.5, 2.0]
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Texture cache capacity in entries.
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,

    /// Upper bound applied to the display's device pixel ratio when sizing
    /// render targets.
    #[serde(default = "default_dpr_cap")]
    pub max_device_pixel_ratio: f32,

    /// Whether to attempt GPU rendering at all. When false the session runs
    /// on the software path from the start.
    #[serde(default = "default_true")]
    pub gpu_enabled: bool,

    /// Whether double-click zoom animates or jumps in a single step.
    #[serde(default = "default_true")]
    pub zoom_animation_enabled: bool,

    /// Zoom animation length in milliseconds.
    #[serde(default = "default_zoom_animation_ms")]
    pub zoom_animation_ms: u64,

    /// Zoom ladder multipliers relative to the base scale.
    #[serde(default = "default_zoom_ladder")]
    pub zoom_ladder: Vec<f32>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cache_capacity: default_cache_capacity(),
            max_device_pixel_ratio: default_dpr_cap(),
            gpu_enabled: true,
            zoom_animation_enabled: true,
            zoom_animation_ms: default_zoom_animation_ms(),
            zoom_ladder: default_zoom_ladder(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.cache_capacity, 32);
        assert_eq!(config.max_device_pixel_ratio, 2.0);
        assert!(config.gpu_enabled);
        assert!(config.zoom_animation_enabled);
    }

    #[test]
    fn test_partial_json_round_trip() {
        let config: EngineConfig =
            serde_json::from_str(r#"{"cache_capacity": 8, "gpu_enabled": false}"#)
                .expect("partial config should deserialize");

        assert_eq!(config.cache_capacity, 8);
        assert!(!config.gpu_enabled);
        // Unspecified fields take their defaults.
        assert_eq!(config.zoom_animation_ms, 300);
        assert_eq!(config.zoom_ladder, vec![1.5, 2.0]);

        let json = serde_json::to_string(&config).expect("config should serialize");
        let back: EngineConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }
}
