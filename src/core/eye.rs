//! Eye aperture tracking and blink detection.
//!
//! The tracker turns a noisy per-frame aperture ratio into a debounced
//! open/closed signal and a blink count. The "fully open" reference is not
//! a fixed constant: it is the median of a rolling history of confirmed
//! open samples, so thresholds adapt to the subject and lighting over the
//! session. During a real blink the history is left untouched, which keeps
//! the baseline from drifting downward.

use crate::config::{BlinkPolicy, EyeConfig};
use crate::landmarks::{face_indices, FaceLandmarks};
use serde::{Deserialize, Serialize};
use statrs::statistics::{Data, OrderStatistics};
use std::collections::VecDeque;

/// Eye state reported for a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EyeStatus {
    Open,
    Closed,
    /// No facial keypoints were supplied for the frame.
    NoFace,
    /// The rolling baseline is still filling; blink logic has not run yet.
    Warming,
}

/// Result of stepping the tracker over one frame.
#[derive(Debug, Clone, Copy)]
pub struct EyeStep {
    pub status: EyeStatus,
    pub aperture_ratio: f64,
    /// 1 on the single frame where a blink is confirmed, 0 otherwise.
    pub blink_increment: u8,
}

impl EyeStep {
    fn without_face() -> Self {
        Self {
            status: EyeStatus::NoFace,
            aperture_ratio: 0.0,
            blink_increment: 0,
        }
    }
}

/// Aperture ratio for one eye: summed vertical lid distances over twice the
/// horizontal corner distance. A degenerate horizontal span contributes 0
/// instead of dividing by zero.
fn single_eye_ratio(face: &FaceLandmarks, contour: &[usize; 6]) -> f64 {
    let vertical = face.point(contour[1]).distance(&face.point(contour[5]))
        + face.point(contour[2]).distance(&face.point(contour[4]));
    let horizontal = face.point(contour[0]).distance(&face.point(contour[3]));
    if horizontal > 0.0 {
        vertical / (2.0 * horizontal)
    } else {
        0.0
    }
}

/// Mean aperture ratio over both eyes.
pub fn aperture_ratio(face: &FaceLandmarks) -> f64 {
    let left = single_eye_ratio(face, &face_indices::LEFT_EYE);
    let right = single_eye_ratio(face, &face_indices::RIGHT_EYE);
    (left + right) / 2.0
}

/// Debounced blink detector with a self-calibrating rolling baseline.
///
/// Owned exclusively by one session; the orchestrator is its sole mutator.
pub struct EyeTracker {
    policy: BlinkPolicy,
    thresh_ratio: f64,
    close_thresh_ratio: f64,
    open_thresh_ratio: f64,

    history_frames: usize,
    min_history_frames: usize,
    consecutive_closed_frames: u32,
    consecutive_open_frames: u32,

    aperture_history: VecDeque<f64>,
    blink_count: u32,
    closed_streak: u32,
    open_streak: u32,
    eyes_closed: bool,
    warmed_up: bool,
}

impl EyeTracker {
    /// Derive frame-count thresholds from the nominal frame rate. Rates
    /// below 1 fps are clamped; every derived count is at least 1, and the
    /// warm-up minimum never exceeds the history capacity.
    pub fn new(config: &EyeConfig, fps: f64) -> Self {
        let fps = fps.max(1.0);
        let history_frames = ((fps * config.history_secs) as usize).max(1);
        let min_history_frames = ((fps * config.min_history_secs) as usize)
            .max(10)
            .min(history_frames);

        Self {
            policy: config.policy,
            thresh_ratio: config.thresh_ratio,
            close_thresh_ratio: config.close_thresh_ratio,
            open_thresh_ratio: config.open_thresh_ratio,
            history_frames,
            min_history_frames,
            consecutive_closed_frames: ((fps * config.close_time_secs) as u32).max(1),
            consecutive_open_frames: ((fps * config.open_time_secs) as u32).max(1),
            aperture_history: VecDeque::with_capacity(history_frames),
            blink_count: 0,
            closed_streak: 0,
            open_streak: 0,
            eyes_closed: false,
            warmed_up: false,
        }
    }

    pub fn blink_count(&self) -> u32 {
        self.blink_count
    }

    pub fn warmed_up(&self) -> bool {
        self.warmed_up
    }

    pub fn history_len(&self) -> usize {
        self.aperture_history.len()
    }

    pub fn history_frames(&self) -> usize {
        self.history_frames
    }

    pub fn min_history_frames(&self) -> usize {
        self.min_history_frames
    }

    pub fn consecutive_closed_frames(&self) -> u32 {
        self.consecutive_closed_frames
    }

    pub fn consecutive_open_frames(&self) -> u32 {
        self.consecutive_open_frames
    }

    /// Median of the rolling history; the adaptive "eyes open" reference.
    pub fn baseline(&self) -> f64 {
        let mut data = Data::new(self.aperture_history.iter().copied().collect::<Vec<_>>());
        data.median()
    }

    fn push_history(&mut self, ratio: f64) {
        if self.aperture_history.len() == self.history_frames {
            self.aperture_history.pop_front();
        }
        self.aperture_history.push_back(ratio);
    }

    /// Process one frame. Without facial keypoints, no state mutates.
    pub fn step(&mut self, face: Option<&FaceLandmarks>) -> EyeStep {
        let Some(face) = face else {
            return EyeStep::without_face();
        };

        let ratio = aperture_ratio(face);

        if !self.warmed_up {
            self.push_history(ratio);
            if self.aperture_history.len() >= self.min_history_frames {
                self.warmed_up = true;
                tracing::debug!(
                    frames = self.aperture_history.len(),
                    baseline = self.baseline(),
                    "eye baseline warm-up complete"
                );
            }
            return EyeStep {
                status: EyeStatus::Warming,
                aperture_ratio: ratio,
                blink_increment: 0,
            };
        }

        let baseline = self.baseline();
        let blink_increment = match self.policy {
            BlinkPolicy::Time => self.step_time(ratio, baseline),
            BlinkPolicy::Hysteresis => self.step_hysteresis(ratio, baseline),
            BlinkPolicy::Combined => self.step_combined(ratio, baseline),
        };

        EyeStep {
            status: if self.eyes_closed {
                EyeStatus::Closed
            } else {
                EyeStatus::Open
            },
            aperture_ratio: ratio,
            blink_increment,
        }
    }

    /// Single threshold; both transitions are debounced.
    fn step_time(&mut self, ratio: f64, baseline: f64) -> u8 {
        let threshold = baseline * self.thresh_ratio;
        let mut increment = 0;

        if ratio < threshold {
            self.closed_streak += 1;
            self.open_streak = 0;
            if self.closed_streak >= self.consecutive_closed_frames {
                self.eyes_closed = true;
            }
        } else {
            self.open_streak += 1;
            self.closed_streak = 0;
            if self.open_streak >= self.consecutive_open_frames {
                if self.eyes_closed {
                    self.blink_count += 1;
                    increment = 1;
                }
                self.eyes_closed = false;
                self.push_history(ratio);
            }
        }

        increment
    }

    /// Two thresholds; transitions fire on the first crossing.
    fn step_hysteresis(&mut self, ratio: f64, baseline: f64) -> u8 {
        let close_threshold = baseline * self.close_thresh_ratio;
        let open_threshold = baseline * self.open_thresh_ratio;
        let mut increment = 0;

        if ratio < close_threshold && !self.eyes_closed {
            self.eyes_closed = true;
        } else if ratio > open_threshold && self.eyes_closed {
            self.eyes_closed = false;
            self.blink_count += 1;
            increment = 1;
            self.push_history(ratio);
        } else if !self.eyes_closed && ratio > open_threshold {
            self.push_history(ratio);
        }

        increment
    }

    /// Hysteresis band with debounce counters on each side. Only frames
    /// confirmed above the open threshold re-enter the baseline history.
    fn step_combined(&mut self, ratio: f64, baseline: f64) -> u8 {
        let close_threshold = baseline * self.close_thresh_ratio;
        let open_threshold = baseline * self.open_thresh_ratio;
        let mut increment = 0;

        if !self.eyes_closed {
            if ratio < close_threshold {
                self.closed_streak += 1;
                self.open_streak = 0;
                if self.closed_streak >= self.consecutive_closed_frames {
                    self.eyes_closed = true;
                }
            } else {
                self.closed_streak = 0;
                if ratio > open_threshold {
                    self.push_history(ratio);
                }
            }
        } else if ratio > open_threshold {
            self.open_streak += 1;
            self.closed_streak = 0;
            if self.open_streak >= self.consecutive_open_frames {
                self.eyes_closed = false;
                self.blink_count += 1;
                increment = 1;
                self.push_history(ratio);
            }
        } else {
            self.open_streak = 0;
        }

        increment
    }
}
