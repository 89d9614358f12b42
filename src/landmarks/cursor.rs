//! Rewindable frame cursors.
//!
//! The session protocol makes two sequential passes over the same frame
//! sequence. Rather than re-opening an external resource between passes,
//! both passes consume a [`FrameCursor`], a resumable producer that can be
//! rewound to its start.

use crate::landmarks::types::{FaceLandmarks, FrameObservation, LandmarkError, PoseLandmarks};
use serde::{Deserialize, Serialize};

/// A rewindable, frame-ordered producer of landmark observations.
///
/// Implementations must yield frames in stable index order and, after
/// `rewind`, reproduce the identical sequence from the start.
pub trait FrameCursor {
    /// Produce the next frame, or `None` when the sequence is exhausted.
    fn next_frame(&mut self) -> Option<FrameObservation>;

    /// Reset the cursor to the first frame.
    fn rewind(&mut self);

    /// Nominal frame rate of the underlying sequence.
    fn frames_per_second(&self) -> f64;
}

/// One frame of landmark data as it arrives from a file or HTTP request:
/// normalized coordinates, with absence expressed by omitting the set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FrameRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub face: Option<Vec<[f64; 2]>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pose: Option<Vec<[f64; 2]>>,
}

impl FrameRecord {
    /// Validate and project this record into pixel space.
    pub fn into_observation(
        &self,
        frame_width: f64,
        frame_height: f64,
    ) -> Result<FrameObservation, LandmarkError> {
        let face = self
            .face
            .as_deref()
            .map(|pts| FaceLandmarks::from_normalized(pts, frame_width, frame_height))
            .transpose()?;
        let pose = self
            .pose
            .as_deref()
            .map(|pts| PoseLandmarks::from_normalized(pts, frame_width, frame_height))
            .transpose()?;
        Ok(FrameObservation::new(face, pose))
    }
}

/// An in-memory frame sequence, the cursor used for recorded sessions.
#[derive(Debug, Clone)]
pub struct RecordedFrames {
    frames: Vec<FrameObservation>,
    position: usize,
    fps: f64,
}

impl RecordedFrames {
    pub fn new(frames: Vec<FrameObservation>, fps: f64) -> Self {
        Self {
            frames,
            position: 0,
            fps,
        }
    }

    /// Validate a batch of raw records against the frame dimensions and
    /// collect them into a cursor. Fails on the first malformed record.
    pub fn from_records(
        records: &[FrameRecord],
        frame_width: f64,
        frame_height: f64,
        fps: f64,
    ) -> Result<Self, LandmarkError> {
        let frames = records
            .iter()
            .map(|r| r.into_observation(frame_width, frame_height))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(frames, fps))
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

impl FrameCursor for RecordedFrames {
    fn next_frame(&mut self) -> Option<FrameObservation> {
        let frame = self.frames.get(self.position).cloned()?;
        self.position += 1;
        Some(frame)
    }

    fn rewind(&mut self) {
        self.position = 0;
    }

    fn frames_per_second(&self) -> f64 {
        self.fps
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rewind_replays_identically() {
        let frames = vec![FrameObservation::default(); 3];
        let mut cursor = RecordedFrames::new(frames, 30.0);

        let mut first_pass = 0;
        while cursor.next_frame().is_some() {
            first_pass += 1;
        }
        assert_eq!(first_pass, 3);
        assert!(cursor.next_frame().is_none());

        cursor.rewind();
        let mut second_pass = 0;
        while cursor.next_frame().is_some() {
            second_pass += 1;
        }
        assert_eq!(second_pass, 3);
    }

    #[test]
    fn test_from_records_rejects_truncated_set() {
        let records = vec![FrameRecord {
            face: Some(vec![[0.5, 0.5]; 4]),
            pose: None,
        }];
        assert!(RecordedFrames::from_records(&records, 640.0, 480.0, 30.0).is_err());
    }

    #[test]
    fn test_absent_sets_pass_through() {
        let records = vec![FrameRecord::default()];
        let mut cursor = RecordedFrames::from_records(&records, 640.0, 480.0, 30.0).unwrap();
        let frame = cursor.next_frame().unwrap();
        assert!(frame.face.is_none());
        assert!(frame.pose.is_none());
    }
}
