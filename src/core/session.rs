//! Two-phase annotation session over a recorded frame sequence.
//!
//! A session makes two passes over the same frames. The first pass warms
//! up the eye tracker's baseline and calibrates the posture reference;
//! the second pass rewinds to the start and classifies every frame with
//! the same tracker instances, so calibration and blink state carry over.
//! A source that runs out before setup completes is a fatal session
//! condition, surfaced with its distinguishing cause and never retried:
//! replaying the same footage would fail the same way.

use crate::config::SessionConfig;
use crate::core::eye::{EyeStatus, EyeTracker};
use crate::core::posture::{PostureStatus, PostureTracker};
use crate::landmarks::FrameCursor;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use std::collections::BTreeMap;

/// Labels for one classified frame. Immutable once emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerFrameLabel {
    pub eye_state: EyeStatus,
    pub posture: PostureStatus,
}

/// Aggregate statistics for one processed video.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStats {
    pub total_frames: u64,
    pub blink_count: u32,
    pub warmed_up: bool,
    pub calibrated: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    /// Smoothed score per classified frame; summarized below at
    /// finalization, not serialized.
    #[serde(skip)]
    pub posture_scores: Vec<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_posture_score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_posture_score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_posture_score: Option<f64>,
}

impl SessionStats {
    fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            total_frames: 0,
            blink_count: 0,
            warmed_up: false,
            calibrated: false,
            started_at,
            finished_at: None,
            posture_scores: Vec::new(),
            avg_posture_score: None,
            min_posture_score: None,
            max_posture_score: None,
        }
    }

    /// Compute the score summary. Absent when no scores were recorded.
    fn finalize(&mut self) {
        if !self.posture_scores.is_empty() {
            self.avg_posture_score = Some((&self.posture_scores).mean());
            self.min_posture_score = Some((&self.posture_scores).min());
            self.max_posture_score = Some((&self.posture_scores).max());
        }
        self.finished_at = Some(Utc::now());
    }
}

/// The complete output of a classified session.
#[derive(Debug, Clone)]
pub struct SessionOutcome {
    /// One label per frame, keyed by zero-based frame index.
    pub labels: BTreeMap<u64, PerFrameLabel>,
    pub stats: SessionStats,
}

/// Fatal setup failures. Warm-up is checked before calibration, so a
/// session failing both reports the warm-up cause.
#[derive(Debug)]
pub enum SessionError {
    WarmupIncomplete {
        frames_collected: usize,
        frames_needed: usize,
    },
    CalibrationIncomplete {
        samples_accepted: usize,
        samples_needed: usize,
    },
}

impl std::fmt::Display for SessionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionError::WarmupIncomplete {
                frames_collected,
                frames_needed,
            } => write!(
                f,
                "eye warm-up incomplete: {frames_collected}/{frames_needed} baseline frames before the source ended"
            ),
            SessionError::CalibrationIncomplete {
                samples_accepted,
                samples_needed,
            } => write!(
                f,
                "posture calibration incomplete: {samples_accepted}/{samples_needed} accepted samples before the source ended"
            ),
        }
    }
}

impl std::error::Error for SessionError {}

/// Drives both trackers through the two-phase protocol and assembles the
/// per-frame labels and aggregate statistics.
pub struct SessionOrchestrator {
    eye: EyeTracker,
    posture: PostureTracker,
}

impl SessionOrchestrator {
    pub fn new(config: &SessionConfig, fps: f64) -> Self {
        Self {
            eye: EyeTracker::new(&config.eye, fps),
            posture: PostureTracker::new(&config.posture),
        }
    }

    /// Run a full session. Consumes the orchestrator: a session is one
    /// continuous state evolution and is never reused.
    pub fn run(mut self, cursor: &mut dyn FrameCursor) -> Result<SessionOutcome, SessionError> {
        let started_at = Utc::now();

        // Phase 1: warm-up and calibration over the same frames.
        let mut setup_frames: u64 = 0;
        let mut calibrated = self.posture.calibrated();
        while !(self.eye.warmed_up() && calibrated) {
            let Some(frame) = cursor.next_frame() else {
                break;
            };
            setup_frames += 1;
            self.eye.step(frame.face.as_ref());
            calibrated = self.posture.calibrate(frame.face.as_ref(), frame.pose.as_ref());
        }

        if !self.eye.warmed_up() {
            tracing::warn!(setup_frames, "session failed: eye warm-up incomplete");
            return Err(SessionError::WarmupIncomplete {
                frames_collected: self.eye.history_len(),
                frames_needed: self.eye.min_history_frames(),
            });
        }
        if !calibrated {
            tracing::warn!(setup_frames, "session failed: posture calibration incomplete");
            return Err(SessionError::CalibrationIncomplete {
                samples_accepted: self.posture.accepted_samples(),
                samples_needed: self.posture.calibration_target(),
            });
        }

        tracing::info!(setup_frames, "setup complete, rewinding for classification pass");
        cursor.rewind();

        // Phase 2: classify every frame with the now-primed trackers.
        let mut stats = SessionStats::new(started_at);
        stats.warmed_up = true;
        stats.calibrated = true;

        let mut labels = BTreeMap::new();
        let mut frame_index: u64 = 0;
        while let Some(frame) = cursor.next_frame() {
            let eye = self.eye.step(frame.face.as_ref());
            let posture = self.posture.score(frame.face.as_ref(), frame.pose.as_ref());

            labels.insert(
                frame_index,
                PerFrameLabel {
                    eye_state: eye.status,
                    posture: posture.status,
                },
            );
            stats.blink_count = self.eye.blink_count();
            stats.posture_scores.push(posture.smoothed_score);
            frame_index += 1;
        }

        stats.total_frames = frame_index;
        stats.finalize();
        tracing::info!(
            total_frames = stats.total_frames,
            blink_count = stats.blink_count,
            "classification pass complete"
        );

        Ok(SessionOutcome { labels, stats })
    }
}
