//! Posture tracking against a one-time calibrated reference.
//!
//! Calibration records the subject's face height and shoulder width while
//! they are known to be seated upright, taking the median of the accepted
//! samples for outlier robustness. Scoring fuses the two measurements
//! (face height alone is sensitive to head tilt, shoulder width alone is
//! blind to forward lean) and normalizes by their ratio to the reference,
//! compensating for the subject moving closer to or farther from the
//! camera since calibration. When shoulders are unusable, a monocular
//! pinhole distance estimate stands in; both paths feed the same
//! exponential moving average so mode switches never produce a score jump.

use crate::config::PostureConfig;
use crate::landmarks::{FaceLandmarks, PoseLandmarks};
use serde::{Deserialize, Serialize};
use statrs::statistics::{Data, OrderStatistics};

/// Posture state reported for a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PostureStatus {
    Straight,
    Hunched,
    /// No facial keypoints were supplied for the frame.
    NoFace,
    /// Face height outside the plausible pixel range.
    TooCloseOrFar,
    /// Outer-eye span too small for the distance estimate.
    FaceTooSmall,
}

/// Result of scoring one frame.
#[derive(Debug, Clone, Copy)]
pub struct PostureStep {
    pub status: PostureStatus,
    /// Raw score for the frame, before smoothing. 0 on diagnostic frames.
    pub score: f64,
    pub smoothed_score: f64,
    /// Pinhole distance estimate, set only on fallback frames.
    pub distance_cm: Option<f64>,
}

fn median(values: &[f64]) -> f64 {
    let mut data = Data::new(values.to_vec());
    data.median()
}

/// Posture tracker state, owned exclusively by one session.
pub struct PostureTracker {
    config: PostureConfig,
    face_height_ref: Option<f64>,
    shoulder_width_ref: Option<f64>,
    smoothed_score: f64,
    calibrated: bool,
    calib_face: Vec<f64>,
    calib_shoulder: Vec<f64>,
}

impl PostureTracker {
    pub fn new(config: &PostureConfig) -> Self {
        Self {
            config: config.clone(),
            face_height_ref: None,
            shoulder_width_ref: None,
            smoothed_score: config.neutral_score,
            calibrated: false,
            calib_face: Vec::new(),
            calib_shoulder: Vec::new(),
        }
    }

    pub fn calibrated(&self) -> bool {
        self.calibrated
    }

    pub fn smoothed_score(&self) -> f64 {
        self.smoothed_score
    }

    /// Accepted calibration samples so far.
    pub fn accepted_samples(&self) -> usize {
        self.calib_face.len()
    }

    pub fn calibration_target(&self) -> usize {
        self.config.calibration_samples
    }

    fn blend(&self, raw: f64) -> f64 {
        self.config.ema_alpha * raw + (1.0 - self.config.ema_alpha) * self.smoothed_score
    }

    fn face_plausible(&self, face_height: f64) -> bool {
        face_height >= self.config.min_face_px && face_height <= self.config.max_face_px
    }

    /// Feed one calibration frame. Returns whether calibration is complete.
    ///
    /// Requires both keypoint sets; implausible measurements (occlusion,
    /// extreme distance) are skipped silently rather than treated as
    /// errors. Once complete, further calls are no-ops.
    pub fn calibrate(
        &mut self,
        face: Option<&FaceLandmarks>,
        pose: Option<&PoseLandmarks>,
    ) -> bool {
        if self.calibrated {
            return true;
        }
        let (Some(face), Some(pose)) = (face, pose) else {
            return false;
        };

        let face_height = face.face_height();
        let shoulder_width = pose.shoulder_width();

        if self.face_plausible(face_height) && shoulder_width >= self.config.min_shoulder_px {
            self.calib_face.push(face_height);
            self.calib_shoulder.push(shoulder_width);
        }

        if self.calib_face.len() >= self.config.calibration_samples {
            self.face_height_ref = Some(median(&self.calib_face));
            self.shoulder_width_ref = Some(median(&self.calib_shoulder));
            self.calib_face.clear();
            self.calib_shoulder.clear();
            self.calibrated = true;
            tracing::debug!(
                face_height_ref = self.face_height_ref,
                shoulder_width_ref = self.shoulder_width_ref,
                "posture calibration complete"
            );
        }

        self.calibrated
    }

    /// Score one frame.
    ///
    /// Diagnostic frames (no face, implausible face height, unusable eye
    /// span) leave the moving average untouched.
    pub fn score(
        &mut self,
        face: Option<&FaceLandmarks>,
        pose: Option<&PoseLandmarks>,
    ) -> PostureStep {
        let Some(face) = face else {
            return self.diagnostic(PostureStatus::NoFace);
        };

        let face_height = face.face_height();
        if !self.face_plausible(face_height) {
            return self.diagnostic(PostureStatus::TooCloseOrFar);
        }

        if let Some(pose) = pose {
            if let (Some(face_ref), Some(shoulder_ref)) =
                (self.face_height_ref, self.shoulder_width_ref)
            {
                let shoulder_width = pose.shoulder_width();
                if shoulder_width >= self.config.min_shoulder_px {
                    return self.score_fused(
                        face,
                        pose,
                        face_height,
                        shoulder_width,
                        face_ref,
                        shoulder_ref,
                    );
                }
            }
        }

        match self.estimate_distance(face) {
            Some(distance_cm) => self.score_from_distance(distance_cm),
            None => self.diagnostic(PostureStatus::FaceTooSmall),
        }
    }

    fn diagnostic(&self, status: PostureStatus) -> PostureStep {
        PostureStep {
            status,
            score: 0.0,
            smoothed_score: self.smoothed_score,
            distance_cm: None,
        }
    }

    /// Primary path: fused face/shoulder measurement, scale-normalized
    /// against the calibrated reference.
    fn score_fused(
        &mut self,
        face: &FaceLandmarks,
        pose: &PoseLandmarks,
        face_height: f64,
        shoulder_width: f64,
        face_ref: f64,
        shoulder_ref: f64,
    ) -> PostureStep {
        let reference =
            self.config.face_weight * face_ref + self.config.shoulder_weight * shoulder_ref;
        let current =
            self.config.face_weight * face_height + self.config.shoulder_weight * shoulder_width;
        let scale = if current > 0.0 {
            reference / current
        } else {
            1.0
        };

        let mid_shoulder = pose.shoulder_midpoint();
        let ratio = (face.nose_tip().y - mid_shoulder.y) / face_height * scale;
        let shifted = ratio - self.config.good_center_rel;
        let raw = (self.config.scale_factor * (-self.config.sensitivity * shifted).exp())
            .clamp(0.0, self.config.scale_factor);

        self.smoothed_score = self.blend(raw);
        let status = if self.smoothed_score >= self.config.straight_cutoff {
            PostureStatus::Straight
        } else {
            PostureStatus::Hunched
        };

        PostureStep {
            status,
            score: raw,
            smoothed_score: self.smoothed_score,
            distance_cm: None,
        }
    }

    /// Fallback path: fixed score per distance verdict, blended through
    /// the same moving average to preserve score continuity.
    fn score_from_distance(&mut self, distance_cm: f64) -> PostureStep {
        let (status, fixed) = if distance_cm >= self.config.dist_hunched_below_cm {
            (PostureStatus::Straight, self.config.fallback_straight_score)
        } else {
            (PostureStatus::Hunched, self.config.fallback_hunched_score)
        };

        self.smoothed_score = self.blend(fixed);

        PostureStep {
            status,
            score: fixed,
            smoothed_score: self.smoothed_score,
            distance_cm: Some(distance_cm),
        }
    }

    /// Monocular pinhole estimate from the outer-eye span.
    fn estimate_distance(&self, face: &FaceLandmarks) -> Option<f64> {
        let span = face.outer_eye_span();
        if span < self.config.min_eye_span_px {
            return None;
        }
        Some(self.config.real_face_width_cm * self.config.focal_length_px() / span)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::testutil::{
        degenerate_face, face_with, face_with_aperture, pose_with, upright_pose, EYE_SPAN,
        FACE_HEIGHT, NOSE_Y,
    };

    fn calibrated_tracker(config: &PostureConfig) -> PostureTracker {
        let mut tracker = PostureTracker::new(config);
        let face = face_with_aperture(0.3);
        let pose = upright_pose();
        while !tracker.calibrate(Some(&face), Some(&pose)) {}
        tracker
    }

    #[test]
    fn test_calibration_requires_both_sets() {
        let mut tracker = PostureTracker::new(&PostureConfig::default());
        let face = face_with_aperture(0.3);

        for _ in 0..200 {
            assert!(!tracker.calibrate(Some(&face), None));
            assert!(!tracker.calibrate(None, Some(&upright_pose())));
        }
        assert_eq!(tracker.accepted_samples(), 0);
    }

    #[test]
    fn test_calibration_skips_implausible_samples() {
        let mut tracker = PostureTracker::new(&PostureConfig::default());
        // Face height 30 px is below the plausible minimum.
        let tiny = face_with(0.3, 50.0, 30.0, EYE_SPAN);
        let narrow = pose_with(340.0, 10.0);
        let face = face_with_aperture(0.3);

        tracker.calibrate(Some(&tiny), Some(&upright_pose()));
        tracker.calibrate(Some(&face), Some(&narrow));
        assert_eq!(tracker.accepted_samples(), 0);

        tracker.calibrate(Some(&face), Some(&upright_pose()));
        assert_eq!(tracker.accepted_samples(), 1);
    }

    #[test]
    fn test_calibration_completes_at_target() {
        let config = PostureConfig {
            calibration_samples: 5,
            ..PostureConfig::default()
        };
        let mut tracker = PostureTracker::new(&config);
        let face = face_with_aperture(0.3);
        let pose = upright_pose();

        for i in 0..4 {
            assert!(!tracker.calibrate(Some(&face), Some(&pose)), "at sample {i}");
        }
        assert!(tracker.calibrate(Some(&face), Some(&pose)));
        assert!(tracker.calibrated());
        // Buffers cleared the instant calibration succeeds.
        assert_eq!(tracker.accepted_samples(), 0);
        // Further calls stay complete.
        assert!(tracker.calibrate(Some(&face), Some(&pose)));
    }

    #[test]
    fn test_uncalibrated_scoring_uses_distance_fallback() {
        let mut tracker = PostureTracker::new(&PostureConfig::default());
        // Default span of 60 px puts the subject at 100 cm.
        let step = tracker.score(Some(&face_with_aperture(0.3)), Some(&upright_pose()));
        assert_eq!(step.status, PostureStatus::Straight);
        assert!((step.distance_cm.unwrap() - 100.0).abs() < 0.01);
    }

    #[test]
    fn test_fused_scoring_upright_is_straight() {
        let config = PostureConfig {
            calibration_samples: 5,
            ..PostureConfig::default()
        };
        let mut tracker = calibrated_tracker(&config);

        let step = tracker.score(Some(&face_with_aperture(0.3)), Some(&upright_pose()));
        assert_eq!(step.status, PostureStatus::Straight);
        assert!(step.distance_cm.is_none());
        // Upright geometry saturates the clamped response.
        assert!((step.score - config.scale_factor).abs() < 1e-9);
    }

    #[test]
    fn test_fused_scoring_slumped_is_hunched() {
        let config = PostureConfig {
            calibration_samples: 5,
            ..PostureConfig::default()
        };
        let mut tracker = calibrated_tracker(&config);

        // Nose dropped toward the shoulder line.
        let slumped = face_with(0.3, 240.0, FACE_HEIGHT, EYE_SPAN);
        let step = tracker.score(Some(&slumped), Some(&upright_pose()));
        assert_eq!(step.status, PostureStatus::Hunched);
        assert!(step.smoothed_score < config.straight_cutoff);
    }

    #[test]
    fn test_diagnostic_frames_do_not_touch_ema() {
        let config = PostureConfig {
            calibration_samples: 5,
            ..PostureConfig::default()
        };
        let mut tracker = calibrated_tracker(&config);
        tracker.score(Some(&face_with_aperture(0.3)), Some(&upright_pose()));
        let smoothed = tracker.smoothed_score();

        let step = tracker.score(None, None);
        assert_eq!(step.status, PostureStatus::NoFace);
        assert_eq!(tracker.smoothed_score(), smoothed);

        // Face height 900 px is beyond the plausible maximum.
        let huge = face_with(0.3, 500.0, 900.0, EYE_SPAN);
        let step = tracker.score(Some(&huge), None);
        assert_eq!(step.status, PostureStatus::TooCloseOrFar);
        assert_eq!(tracker.smoothed_score(), smoothed);

        let step = tracker.score(Some(&degenerate_face()), None);
        assert_eq!(step.status, PostureStatus::TooCloseOrFar);
        assert_eq!(tracker.smoothed_score(), smoothed);
    }

    #[test]
    fn test_face_too_small_when_eye_span_unusable() {
        let mut tracker = PostureTracker::new(&PostureConfig::default());
        // Plausible face height but a 10 px eye span.
        let pinched = face_with(0.3, NOSE_Y, FACE_HEIGHT, 10.0);
        let before = tracker.smoothed_score();

        let step = tracker.score(Some(&pinched), None);
        assert_eq!(step.status, PostureStatus::FaceTooSmall);
        assert_eq!(tracker.smoothed_score(), before);
    }

    #[test]
    fn test_close_subject_falls_back_to_hunched() {
        let mut tracker = PostureTracker::new(&PostureConfig::default());
        // A 200 px span puts the subject at 30 cm.
        let close = face_with(0.3, NOSE_Y, FACE_HEIGHT, 200.0);
        let step = tracker.score(Some(&close), None);
        assert_eq!(step.status, PostureStatus::Hunched);
        assert!(step.distance_cm.unwrap() < 50.0);
    }

    #[test]
    fn test_mode_switch_is_one_ema_step() {
        let config = PostureConfig {
            calibration_samples: 5,
            ..PostureConfig::default()
        };
        let mut tracker = calibrated_tracker(&config);
        tracker.score(Some(&face_with_aperture(0.3)), Some(&upright_pose()));
        let previous = tracker.smoothed_score();

        // Shoulders drop out; the fallback injects its fixed score.
        let step = tracker.score(Some(&face_with_aperture(0.3)), None);
        let expected =
            config.ema_alpha * config.fallback_straight_score + (1.0 - config.ema_alpha) * previous;
        assert!((step.smoothed_score - expected).abs() < 1e-9);
    }
}
