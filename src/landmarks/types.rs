//! Landmark types for the gazemark annotation pipeline.
//!
//! A landmark source (MediaPipe-style face mesh and body pose) supplies,
//! per frame, zero or one facial keypoint set and zero or one body keypoint
//! set. Coordinates arrive normalized to [0, 1] and are projected into
//! pixel space against the known frame dimensions at this boundary, since
//! every downstream measurement (face height, shoulder width, eye span) is
//! specified in pixels.

use serde::{Deserialize, Serialize};

/// Number of points in a full face mesh landmark set.
pub const FACE_LANDMARK_COUNT: usize = 468;

/// Number of points in a full body pose landmark set.
pub const POSE_LANDMARK_COUNT: usize = 33;

/// Face mesh indices used by the trackers.
pub mod face_indices {
    /// Six-point eye contours: [outer corner, top 1, top 2, inner corner, bottom 2, bottom 1].
    pub const LEFT_EYE: [usize; 6] = [33, 160, 158, 133, 153, 144];
    pub const RIGHT_EYE: [usize; 6] = [362, 385, 387, 263, 373, 380];

    pub const CHIN: usize = 152;
    pub const FOREHEAD: usize = 10;
    pub const NOSE_TIP: usize = 1;

    /// Outer eye corners, used as the known-width reference for the
    /// pinhole distance estimate.
    pub const LEFT_EYE_OUTER: usize = 33;
    pub const RIGHT_EYE_OUTER: usize = 263;
}

/// Body pose indices used by the trackers.
pub mod pose_indices {
    pub const LEFT_SHOULDER: usize = 11;
    pub const RIGHT_SHOULDER: usize = 12;
}

/// A 2D point in pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point.
    pub fn distance(&self, other: &Point) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// Errors raised when a landmark set fails boundary validation.
///
/// A truncated set is a caller error, distinct from "not detected":
/// absence is expressed by omitting the set entirely.
#[derive(Debug)]
pub enum LandmarkError {
    TruncatedFace { got: usize },
    TruncatedPose { got: usize },
}

impl std::fmt::Display for LandmarkError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LandmarkError::TruncatedFace { got } => write!(
                f,
                "face landmark set has {got} points, expected at least {FACE_LANDMARK_COUNT}"
            ),
            LandmarkError::TruncatedPose { got } => write!(
                f,
                "pose landmark set has {got} points, expected at least {POSE_LANDMARK_COUNT}"
            ),
        }
    }
}

impl std::error::Error for LandmarkError {}

/// A validated facial landmark set in pixel space.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FaceLandmarks {
    points: Vec<Point>,
}

impl FaceLandmarks {
    /// Build from normalized coordinates and frame dimensions.
    pub fn from_normalized(
        normalized: &[[f64; 2]],
        frame_width: f64,
        frame_height: f64,
    ) -> Result<Self, LandmarkError> {
        if normalized.len() < FACE_LANDMARK_COUNT {
            return Err(LandmarkError::TruncatedFace {
                got: normalized.len(),
            });
        }
        let points = normalized
            .iter()
            .map(|[x, y]| Point::new(x * frame_width, y * frame_height))
            .collect();
        Ok(Self { points })
    }

    /// Build from pixel-space points that are already validated upstream.
    pub fn from_pixels(points: Vec<Point>) -> Result<Self, LandmarkError> {
        if points.len() < FACE_LANDMARK_COUNT {
            return Err(LandmarkError::TruncatedFace { got: points.len() });
        }
        Ok(Self { points })
    }

    pub fn point(&self, index: usize) -> Point {
        self.points[index]
    }

    /// Vertical span between forehead and chin.
    pub fn face_height(&self) -> f64 {
        (self.point(face_indices::CHIN).y - self.point(face_indices::FOREHEAD).y).abs()
    }

    pub fn nose_tip(&self) -> Point {
        self.point(face_indices::NOSE_TIP)
    }

    /// Horizontal span between the outer eye corners.
    pub fn outer_eye_span(&self) -> f64 {
        (self.point(face_indices::LEFT_EYE_OUTER).x - self.point(face_indices::RIGHT_EYE_OUTER).x)
            .abs()
    }
}

/// A validated body pose landmark set in pixel space.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoseLandmarks {
    points: Vec<Point>,
}

impl PoseLandmarks {
    /// Build from normalized coordinates and frame dimensions.
    pub fn from_normalized(
        normalized: &[[f64; 2]],
        frame_width: f64,
        frame_height: f64,
    ) -> Result<Self, LandmarkError> {
        if normalized.len() < POSE_LANDMARK_COUNT {
            return Err(LandmarkError::TruncatedPose {
                got: normalized.len(),
            });
        }
        let points = normalized
            .iter()
            .map(|[x, y]| Point::new(x * frame_width, y * frame_height))
            .collect();
        Ok(Self { points })
    }

    /// Build from pixel-space points that are already validated upstream.
    pub fn from_pixels(points: Vec<Point>) -> Result<Self, LandmarkError> {
        if points.len() < POSE_LANDMARK_COUNT {
            return Err(LandmarkError::TruncatedPose { got: points.len() });
        }
        Ok(Self { points })
    }

    pub fn left_shoulder(&self) -> Point {
        self.points[pose_indices::LEFT_SHOULDER]
    }

    pub fn right_shoulder(&self) -> Point {
        self.points[pose_indices::RIGHT_SHOULDER]
    }

    /// Horizontal span between the shoulders.
    pub fn shoulder_width(&self) -> f64 {
        (self.left_shoulder().x - self.right_shoulder().x).abs()
    }

    /// Midpoint between the shoulders.
    pub fn shoulder_midpoint(&self) -> Point {
        let l = self.left_shoulder();
        let r = self.right_shoulder();
        Point::new((l.x + r.x) / 2.0, (l.y + r.y) / 2.0)
    }
}

/// One frame's worth of landmark detections.
///
/// `None` means the detector reported nothing for that set; it is never
/// used to smuggle a partial or degenerate detection through.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FrameObservation {
    pub face: Option<FaceLandmarks>,
    pub pose: Option<PoseLandmarks>,
}

impl FrameObservation {
    pub fn new(face: Option<FaceLandmarks>, pose: Option<PoseLandmarks>) -> Self {
        Self { face, pose }
    }
}
