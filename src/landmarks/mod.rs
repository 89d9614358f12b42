//! Landmark source boundary for the gazemark pipeline.
//!
//! This module defines the contract between the external landmark
//! extraction engine and the tracker layer: validated per-frame keypoint
//! sets and a rewindable cursor over a recorded frame sequence.

pub mod cursor;
pub mod types;

// Re-export commonly used types
pub use cursor::{FrameCursor, FrameRecord, RecordedFrames};
pub use types::{
    face_indices, pose_indices, FaceLandmarks, FrameObservation, LandmarkError, Point,
    PoseLandmarks, FACE_LANDMARK_COUNT, POSE_LANDMARK_COUNT,
};
