//! Configuration for the gazemark annotation session.
//!
//! All thresholds and landmark-derived constants live in an immutable
//! configuration value constructed once per session and handed to both
//! trackers. Blink policy selection is a closed enum rather than a string
//! compared at run time.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Blink detection policy, fixed for the lifetime of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum BlinkPolicy {
    /// Single threshold with debounce counters on both transitions.
    Time,
    /// Two-threshold hysteresis band, transitions fire immediately.
    Hysteresis,
    /// Hysteresis band with debounce counters on both sides.
    #[default]
    Combined,
}

/// Eye aperture tracker configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EyeConfig {
    /// Rolling baseline span in seconds.
    pub history_secs: f64,
    /// Minimum baseline span before warm-up completes, in seconds.
    pub min_history_secs: f64,
    /// Sustained-closed time required before the closed state latches.
    pub close_time_secs: f64,
    /// Sustained-open time required before the open state latches.
    pub open_time_secs: f64,
    /// Single-threshold fraction of the baseline (time policy).
    pub thresh_ratio: f64,
    /// Close-side fraction of the baseline (hysteresis band).
    pub close_thresh_ratio: f64,
    /// Open-side fraction of the baseline (hysteresis band).
    pub open_thresh_ratio: f64,
    /// Which blink detection policy to run.
    pub policy: BlinkPolicy,
}

impl Default for EyeConfig {
    fn default() -> Self {
        Self {
            history_secs: 2.0,
            min_history_secs: 0.5,
            close_time_secs: 0.07,
            open_time_secs: 0.10,
            thresh_ratio: 0.70,
            close_thresh_ratio: 0.65,
            open_thresh_ratio: 0.75,
            policy: BlinkPolicy::Combined,
        }
    }
}

/// Posture tracker configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostureConfig {
    /// Exponential moving average weight for new scores.
    pub ema_alpha: f64,
    /// Accepted samples required before calibration completes.
    pub calibration_samples: usize,
    /// Plausible face height range in pixels.
    pub min_face_px: f64,
    pub max_face_px: f64,
    /// Minimum usable shoulder width in pixels.
    pub min_shoulder_px: f64,
    /// Nose-to-shoulder offset (face-height relative) considered upright.
    pub good_center_rel: f64,
    /// Exponential response steepness.
    pub sensitivity: f64,
    /// Score scale; raw scores are clamped to [0, scale_factor].
    pub scale_factor: f64,
    /// Fusion weights for face height vs shoulder width.
    pub face_weight: f64,
    pub shoulder_weight: f64,
    /// Smoothed score at or above this maps to Straight.
    pub straight_cutoff: f64,
    /// Initial smoothed score before any usable frame.
    pub neutral_score: f64,
    /// Distance below this many centimeters maps to Hunched in fallback.
    pub dist_hunched_below_cm: f64,
    /// Fixed score injected by the fallback for each verdict.
    pub fallback_straight_score: f64,
    pub fallback_hunched_score: f64,
    /// Pinhole model: observed outer-eye width at 50 cm, and the real
    /// facial width it corresponds to.
    pub face_width_at_50cm_px: f64,
    pub real_face_width_cm: f64,
    /// Outer-eye spans below this many pixels are too small to trust.
    pub min_eye_span_px: f64,
}

impl Default for PostureConfig {
    fn default() -> Self {
        Self {
            ema_alpha: 0.3,
            calibration_samples: 60,
            min_face_px: 60.0,
            max_face_px: 800.0,
            min_shoulder_px: 40.0,
            good_center_rel: -0.85,
            sensitivity: 5.0,
            scale_factor: 2.5,
            face_weight: 0.7,
            shoulder_weight: 0.3,
            straight_cutoff: 1.30,
            neutral_score: 1.25,
            dist_hunched_below_cm: 50.0,
            fallback_straight_score: 2.0,
            fallback_hunched_score: 0.5,
            face_width_at_50cm_px: 120.0,
            real_face_width_cm: 14.0,
            min_eye_span_px: 20.0,
        }
    }
}

impl PostureConfig {
    /// Focal length implied by the calibrated width-at-50cm observation.
    pub fn focal_length_px(&self) -> f64 {
        (self.face_width_at_50cm_px * 50.0) / self.real_face_width_cm
    }
}

/// Full session configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionConfig {
    pub eye: EyeConfig,
    pub posture: PostureConfig,
}

impl SessionConfig {
    /// Load configuration from the default location, falling back to
    /// defaults when no file exists.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_path();

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)
                .map_err(|e| ConfigError::IoError(e.to_string()))?;
            let config: SessionConfig = serde_json::from_str(&content)
                .map_err(|e| ConfigError::ParseError(e.to_string()))?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        let config_path = Self::config_path();

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::IoError(e.to_string()))?;
        }

        let content = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        std::fs::write(&config_path, content).map_err(|e| ConfigError::IoError(e.to_string()))?;

        Ok(())
    }

    /// Get the path to the configuration file.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("gazemark")
            .join("config.json")
    }
}

/// Configuration errors.
#[derive(Debug)]
pub enum ConfigError {
    IoError(String),
    ParseError(String),
    SerializeError(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "IO error: {e}"),
            ConfigError::ParseError(e) => write!(f, "Parse error: {e}"),
            ConfigError::SerializeError(e) => write!(f, "Serialize error: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SessionConfig::default();
        assert_eq!(config.eye.policy, BlinkPolicy::Combined);
        assert!(config.eye.close_thresh_ratio < config.eye.open_thresh_ratio);
        assert_eq!(config.posture.calibration_samples, 60);
    }

    #[test]
    fn test_focal_length_derivation() {
        let posture = PostureConfig::default();
        // 120 px at 50 cm with a 14 cm real width
        assert!((posture.focal_length_px() - 428.571).abs() < 0.01);
    }

    #[test]
    fn test_config_round_trip() {
        let config = SessionConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let parsed: SessionConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.eye.policy, config.eye.policy);
        assert_eq!(
            parsed.posture.calibration_samples,
            config.posture.calibration_samples
        );
    }

    #[test]
    fn test_policy_serde_names() {
        let json = serde_json::to_string(&BlinkPolicy::Combined).unwrap();
        assert_eq!(json, "\"combined\"");
        let parsed: BlinkPolicy = serde_json::from_str("\"hysteresis\"").unwrap();
        assert_eq!(parsed, BlinkPolicy::Hysteresis);
    }
}
