//! Synthetic landmark fixtures shared by the core test modules.
//!
//! Geometry is laid out in a nominal 640x480 pixel frame: forehead at
//! y=40, chin at y=240 (face height 200), nose tip at y=140, outer eye
//! corners 60 px apart, shoulders 200 px apart at y=340.

use crate::landmarks::{
    face_indices, pose_indices, FaceLandmarks, FrameObservation, Point, PoseLandmarks,
    FACE_LANDMARK_COUNT, POSE_LANDMARK_COUNT,
};

pub const FACE_HEIGHT: f64 = 200.0;
pub const NOSE_Y: f64 = 140.0;
pub const SHOULDER_Y: f64 = 340.0;
pub const SHOULDER_WIDTH: f64 = 200.0;
pub const EYE_SPAN: f64 = 60.0;

fn eye_contour(points: &mut [Point], contour: &[usize; 6], corner_x: f64, aperture: f64) {
    let center_y = 100.0;
    let half_gap = 15.0 * aperture;
    // Corners 30 px apart; each vertical pair is separated by 30 * aperture,
    // so the two-eye mean ratio computes to exactly `aperture`.
    points[contour[0]] = Point::new(corner_x, center_y);
    points[contour[3]] = Point::new(corner_x + 30.0, center_y);
    points[contour[1]] = Point::new(corner_x + 10.0, center_y - half_gap);
    points[contour[5]] = Point::new(corner_x + 10.0, center_y + half_gap);
    points[contour[2]] = Point::new(corner_x + 20.0, center_y - half_gap);
    points[contour[4]] = Point::new(corner_x + 20.0, center_y + half_gap);
}

/// A face whose aperture ratio computes to exactly `aperture`, with the
/// default upright geometry.
pub fn face_with_aperture(aperture: f64) -> FaceLandmarks {
    face_with(aperture, NOSE_Y, FACE_HEIGHT, EYE_SPAN)
}

/// A face with explicit nose height, face height, and outer-eye span.
pub fn face_with(aperture: f64, nose_y: f64, face_height: f64, eye_span: f64) -> FaceLandmarks {
    let mut points = vec![Point::new(0.0, 0.0); FACE_LANDMARK_COUNT];
    points[face_indices::FOREHEAD] = Point::new(320.0, 40.0);
    points[face_indices::CHIN] = Point::new(320.0, 40.0 + face_height);
    points[face_indices::NOSE_TIP] = Point::new(320.0, nose_y);

    // Landmark 33 doubles as the left contour corner; the right contour is
    // positioned so landmark 263 sits `eye_span` px to its right.
    eye_contour(&mut points, &face_indices::LEFT_EYE, 290.0, aperture);
    eye_contour(
        &mut points,
        &face_indices::RIGHT_EYE,
        290.0 + eye_span - 30.0,
        aperture,
    );

    FaceLandmarks::from_pixels(points).expect("fixture face is full size")
}

/// A face where every landmark sits at the origin: degenerate eye spans,
/// zero face height.
pub fn degenerate_face() -> FaceLandmarks {
    FaceLandmarks::from_pixels(vec![Point::new(0.0, 0.0); FACE_LANDMARK_COUNT])
        .expect("fixture face is full size")
}

/// Shoulders with the default upright geometry.
pub fn upright_pose() -> PoseLandmarks {
    pose_with(SHOULDER_Y, SHOULDER_WIDTH)
}

/// Shoulders at an explicit height and width.
pub fn pose_with(shoulder_y: f64, shoulder_width: f64) -> PoseLandmarks {
    let mut points = vec![Point::new(0.0, 0.0); POSE_LANDMARK_COUNT];
    points[pose_indices::LEFT_SHOULDER] = Point::new(320.0 - shoulder_width / 2.0, shoulder_y);
    points[pose_indices::RIGHT_SHOULDER] = Point::new(320.0 + shoulder_width / 2.0, shoulder_y);
    PoseLandmarks::from_pixels(points).expect("fixture pose is full size")
}

/// A full upright frame: open eyes, face and shoulders present.
pub fn upright_frame(aperture: f64) -> FrameObservation {
    FrameObservation::new(Some(face_with_aperture(aperture)), Some(upright_pose()))
}

/// A frame with a face but no body detection.
pub fn face_only_frame(aperture: f64) -> FrameObservation {
    FrameObservation::new(Some(face_with_aperture(aperture)), None)
}
