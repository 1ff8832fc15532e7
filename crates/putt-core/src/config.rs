//! JSON configuration for the whole device core.

use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

use crate::distance::CameraParams;
use crate::impact::ImpactParams;
use crate::selector::SelectorParams;
use crate::sensor::AdcParams;

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Inclusive grayscale window, `(low, high)`.
pub type IntensityRange = (u8, u8);

/// Intensity windows handed to the vision collaborator for segmentation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentationThresholds {
    /// Very bright pixels: the ball.
    pub ball: IntensityRange,
    /// Very dark pixels: the cup.
    pub hole: IntensityRange,
}

impl Default for SegmentationThresholds {
    fn default() -> Self {
        Self {
            ball: (200, 255),
            hole: (0, 60),
        }
    }
}

fn default_device_name() -> String {
    "ESP32PERFECTPUTT".to_string()
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryParams {
    /// Minimum wall time between two sensor-stream packets.
    pub sensor_period_ms: u64,
    #[serde(default = "default_device_name")]
    pub device_name: String,
}

impl Default for TelemetryParams {
    fn default() -> Self {
        Self {
            sensor_period_ms: 100,
            device_name: default_device_name(),
        }
    }
}

/// Every tunable number of the core in one value.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PuttConfig {
    pub selector: SelectorParams,
    pub segmentation: SegmentationThresholds,
    pub camera: CameraParams,
    pub impact: ImpactParams,
    pub sensor: AdcParams,
    pub telemetry: TelemetryParams,
}

impl PuttConfig {
    /// Load a JSON config from disk. Missing sections fall back to defaults.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path)?;
        let cfg: Self = serde_json::from_str(&raw)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Write this config to disk as pretty JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let cam = &self.camera;
        if !(cam.focal_px.is_finite() && cam.focal_px > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "camera.focal_px must be > 0 (got {})",
                cam.focal_px
            )));
        }
        if cam.image_width == 0 || cam.image_height == 0 {
            return Err(ConfigError::Invalid(format!(
                "camera image size must be non-zero (got {}x{})",
                cam.image_width, cam.image_height
            )));
        }
        for (name, d) in [
            ("ball_diameter_m", cam.ball_diameter_m),
            ("hole_diameter_m", cam.hole_diameter_m),
        ] {
            if !(d.is_finite() && d > 0.0) {
                return Err(ConfigError::Invalid(format!(
                    "camera.{name} must be > 0 (got {d})"
                )));
            }
        }
        let sel = &self.selector;
        for (name, v) in [
            ("roundness_weight", sel.roundness_weight),
            ("elongation_weight", sel.elongation_weight),
            ("pixel_weight", sel.pixel_weight),
            ("hole_min_aspect", sel.hole_min_aspect),
            ("hole_min_elongation", sel.hole_min_elongation),
        ] {
            if !v.is_finite() {
                return Err(ConfigError::Invalid(format!(
                    "selector.{name} must be finite (got {v})"
                )));
            }
        }
        let threshold = self.impact.threshold_v;
        if !(threshold.is_finite() && threshold > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "impact.threshold_v must be > 0 (got {threshold})"
            )));
        }
        if self.telemetry.sensor_period_ms == 0 {
            return Err(ConfigError::Invalid(
                "telemetry.sensor_period_ms must be > 0".into(),
            ));
        }
        if !(1..=16).contains(&self.sensor.resolution_bits) {
            return Err(ConfigError::Invalid(format!(
                "sensor.resolution_bits must be in 1..=16 (got {})",
                self.sensor.resolution_bits
            )));
        }
        let seg = &self.segmentation;
        if seg.ball.0 > seg.ball.1 || seg.hole.0 > seg.hole.1 {
            return Err(ConfigError::Invalid(
                "segmentation ranges must be (low, high) with low <= high".into(),
            ));
        }
        if self.telemetry.device_name.is_empty() {
            return Err(ConfigError::Invalid("telemetry.device_name is empty".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let cfg = PuttConfig::default();
        cfg.validate().expect("default config");
        assert_eq!(cfg.selector.ball_min_pixels, 225);
        assert_eq!(cfg.impact.cooldown_ms, 500);
        assert_eq!(cfg.telemetry.sensor_period_ms, 100);
        assert_eq!(cfg.camera.focal_px, 146.0);
    }

    #[test]
    fn partial_json_fills_defaults() {
        let cfg: PuttConfig =
            serde_json::from_str(r#"{ "impact": { "cooldown_ms": 250 } }"#).expect("parse");
        assert_eq!(cfg.impact.cooldown_ms, 250);
        assert_eq!(cfg.impact.threshold_v, 3.1);
        assert_eq!(cfg.selector, SelectorParams::default());
        assert_eq!(cfg.telemetry.device_name, "ESP32PERFECTPUTT");
    }

    #[test]
    fn rejects_bad_focal_length() {
        let mut cfg = PuttConfig::default();
        cfg.camera.focal_px = 0.0;
        assert!(matches!(cfg.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn rejects_non_finite_selector_values() {
        let mut cfg = PuttConfig::default();
        cfg.selector.roundness_weight = f32::NAN;
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("selector.roundness_weight"));

        let mut cfg = PuttConfig::default();
        cfg.selector.hole_min_aspect = f32::INFINITY;
        assert!(matches!(cfg.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn rejects_non_positive_threshold_and_period() {
        let mut cfg = PuttConfig::default();
        cfg.impact.threshold_v = -0.5;
        assert!(matches!(cfg.validate(), Err(ConfigError::Invalid(_))));

        let mut cfg = PuttConfig::default();
        cfg.telemetry.sensor_period_ms = 0;
        assert!(matches!(cfg.validate(), Err(ConfigError::Invalid(_))));

        // A zero cooldown is a legal "no debounce" setting.
        let mut cfg = PuttConfig::default();
        cfg.impact.cooldown_ms = 0;
        cfg.validate().expect("zero cooldown");
    }

    #[test]
    fn json_file_round_trip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("putt.json");
        let mut cfg = PuttConfig::default();
        cfg.camera.focal_px = 152.5;
        cfg.write_json(&path).expect("write");
        let back = PuttConfig::load_json(&path).expect("load");
        assert_eq!(back, cfg);
    }

    #[test]
    fn load_reports_io_error() {
        let err = PuttConfig::load_json("/definitely/not/here.json").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
