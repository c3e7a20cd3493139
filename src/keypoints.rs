//! Landmark types and the fixed-size keypoint vector stored per frame.
//!
//! Every frame is flattened into a vector of [`KEYPOINT_VECTOR_LEN`] values:
//!
//! | group      | landmarks | values each          | length |
//! |------------|-----------|----------------------|--------|
//! | pose       | 33        | x, y, z, visibility  | 132    |
//! | face       | 468       | x, y, z              | 1404   |
//! | left hand  | 21        | x, y, z              | 63     |
//! | right hand | 21        | x, y, z              | 63     |
//!
//! A group missing from the frame is written as zeros so that the vector
//! length never changes.

use crate::constants::{
    COORDS_PER_LANDMARK, FACE_VECTOR_LEN, HAND_VECTOR_LEN, KEYPOINT_VECTOR_LEN, NUM_FACE_LANDMARKS,
    NUM_HAND_LANDMARKS, NUM_POSE_LANDMARKS, POSE_VALUES_PER_LANDMARK, POSE_VECTOR_LEN,
};
use ndarray::{s, Array1, ArrayViewMut1};

/// A single landmark in frame-normalised coordinates
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Landmark {
    /// X coordinate (0.0 to 1.0, normalised to image width)
    pub x: f32,
    /// Y coordinate (0.0 to 1.0, normalised to image height)
    pub y: f32,
    /// Depth, same scale as `x`
    pub z: f32,
    /// Likelihood of the landmark being visible (pose only)
    pub visibility: f32,
}

impl Landmark {
    /// Landmark without a visibility score
    #[must_use]
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z, visibility: 0.0 }
    }

    /// Pixel position of the landmark in a frame of the given size
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn to_pixel(&self, width: i32, height: i32) -> (f32, f32) {
        (self.x * width as f32, self.y * height as f32)
    }
}

/// Landmark groups detected in one frame
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HolisticLandmarks {
    /// Body pose landmarks
    pub pose: Option<Vec<Landmark>>,
    /// Face mesh landmarks
    pub face: Option<Vec<Landmark>>,
    /// Subject's left hand
    pub left_hand: Option<Vec<Landmark>>,
    /// Subject's right hand
    pub right_hand: Option<Vec<Landmark>>,
}

impl HolisticLandmarks {
    /// Whether no landmark group was detected
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pose.is_none() && self.face.is_none() && self.left_hand.is_none() && self.right_hand.is_none()
    }
}

/// Flatten the detected landmarks into the fixed-length keypoint vector
#[must_use]
pub fn extract_keypoints(landmarks: &HolisticLandmarks) -> Array1<f32> {
    let mut keypoints = Array1::<f32>::zeros(KEYPOINT_VECTOR_LEN);

    let face_start = POSE_VECTOR_LEN;
    let left_start = face_start + FACE_VECTOR_LEN;
    let right_start = left_start + HAND_VECTOR_LEN;

    if let Some(pose) = &landmarks.pose {
        fill_group(
            keypoints.slice_mut(s![..face_start]),
            pose,
            NUM_POSE_LANDMARKS,
            POSE_VALUES_PER_LANDMARK,
        );
    }
    if let Some(face) = &landmarks.face {
        fill_group(
            keypoints.slice_mut(s![face_start..left_start]),
            face,
            NUM_FACE_LANDMARKS,
            COORDS_PER_LANDMARK,
        );
    }
    if let Some(hand) = &landmarks.left_hand {
        fill_group(
            keypoints.slice_mut(s![left_start..right_start]),
            hand,
            NUM_HAND_LANDMARKS,
            COORDS_PER_LANDMARK,
        );
    }
    if let Some(hand) = &landmarks.right_hand {
        fill_group(
            keypoints.slice_mut(s![right_start..]),
            hand,
            NUM_HAND_LANDMARKS,
            COORDS_PER_LANDMARK,
        );
    }

    keypoints
}

/// Write up to `count` landmarks into `target`; extra landmarks are ignored
/// and missing ones stay zero.
fn fill_group(mut target: ArrayViewMut1<'_, f32>, group: &[Landmark], count: usize, values_per_landmark: usize) {
    for (i, lm) in group.iter().take(count).enumerate() {
        let base = i * values_per_landmark;
        target[base] = lm.x;
        target[base + 1] = lm.y;
        target[base + 2] = lm.z;
        if values_per_landmark == POSE_VALUES_PER_LANDMARK {
            target[base + 3] = lm.visibility;
        }
    }
}
