//! Holistic landmark estimation: body pose, face mesh and both hands.
//!
//! The pose model runs on the whole frame. Face and hand regions are then
//! derived from the pose landmarks, cropped, and passed to the face-mesh and
//! hand models, whose outputs are mapped back into frame-normalised space.

use crate::{
    config::Config,
    constants::{NUM_FACE_LANDMARKS, NUM_HAND_LANDMARKS, NUM_POSE_LANDMARKS},
    keypoints::{HolisticLandmarks, Landmark},
    utils::{image_conversion::bgr_to_nhwc_tensor, landmark_bounds, normalize_score, roi_to_frame, sigmoid, square_roi},
    Error, Result,
};
use log::{debug, info};
use ndarray::CowArray;
use opencv::core::{Mat, Rect};
use opencv::prelude::*;
use ort::{Environment, Session, Value};
use std::path::Path;
use std::sync::Arc;

/// Pose model input size
const POSE_INPUT_SIZE: usize = 256;

/// Face mesh model input size
const FACE_INPUT_SIZE: usize = 192;

/// Hand landmark model input size
const HAND_INPUT_SIZE: usize = 224;

/// Raw values per landmark emitted by the pose model (x, y, z, visibility, presence)
const POSE_RAW_VALUES: usize = 5;

/// Face region expansion around the pose face points
const FACE_ROI_SCALE: f32 = 2.0;

/// Hand region expansion around wrist, index and pinky knuckles
const HAND_ROI_SCALE: f32 = 3.0;

/// Indices into the 33-point pose skeleton
pub mod pose_index {
    pub const NOSE: usize = 0;
    pub const RIGHT_EAR: usize = 8;
    pub const MOUTH_RIGHT: usize = 10;
    pub const LEFT_WRIST: usize = 15;
    pub const RIGHT_WRIST: usize = 16;
    pub const LEFT_PINKY: usize = 17;
    pub const RIGHT_PINKY: usize = 18;
    pub const LEFT_INDEX: usize = 19;
    pub const RIGHT_INDEX: usize = 20;
}

/// Estimates landmark groups for a single frame
pub trait LandmarkDetector: Send {
    /// Detect landmarks in a BGR frame
    fn detect(&mut self, frame: &Mat) -> Result<HolisticLandmarks>;

    /// Forget tracking state carried between frames
    fn reset(&mut self) {}
}

/// Which hand a region belongs to, from the subject's point of view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandSide {
    /// Subject's left hand
    Left,
    /// Subject's right hand
    Right,
}

impl HandSide {
    fn anchor_indices(self) -> [usize; 3] {
        match self {
            Self::Left => [pose_index::LEFT_WRIST, pose_index::LEFT_PINKY, pose_index::LEFT_INDEX],
            Self::Right => [pose_index::RIGHT_WRIST, pose_index::RIGHT_PINKY, pose_index::RIGHT_INDEX],
        }
    }
}

/// Square face region derived from the pose face points (nose to mouth corners)
#[must_use]
pub fn face_region(pose: &[Landmark], width: i32, height: i32) -> Option<Rect> {
    let face_points = pose.get(pose_index::NOSE..=pose_index::MOUTH_RIGHT)?;
    let bounds = landmark_bounds(face_points, width, height)?;
    square_roi(bounds, FACE_ROI_SCALE, width, height)
}

/// Square hand region derived from the wrist and knuckle pose points
///
/// Returns `None` when the wrist is less visible than `min_visibility`.
#[must_use]
pub fn hand_region(pose: &[Landmark], side: HandSide, width: i32, height: i32, min_visibility: f32) -> Option<Rect> {
    let indices = side.anchor_indices();
    let anchors: Vec<Landmark> = indices.iter().filter_map(|&i| pose.get(i).copied()).collect();
    if anchors.len() != indices.len() || anchors[0].visibility < min_visibility {
        return None;
    }
    let bounds = landmark_bounds(&anchors, width, height)?;
    square_roi(bounds, HAND_ROI_SCALE, width, height)
}

/// Raw output of one landmark model
#[derive(Debug, Clone)]
struct ModelOutput {
    /// Landmarks normalised to the model input
    landmarks: Vec<Landmark>,
    /// Presence score in `[0, 1]`
    score: f32,
}

/// A single-input landmark regression model
struct LandmarkModel {
    session: Session,
    name: &'static str,
    input_size: usize,
    num_landmarks: usize,
    values_per_landmark: usize,
}

impl LandmarkModel {
    fn new<P: AsRef<Path>>(
        model_path: P,
        name: &'static str,
        input_size: usize,
        num_landmarks: usize,
        values_per_landmark: usize,
    ) -> Result<Self> {
        let model_path = model_path.as_ref();
        if !model_path.exists() {
            return Err(Error::ModelError(format!("{name} model not found: {}", model_path.display())));
        }
        info!("Loading {name} model: {}", model_path.display());
        let environment = Arc::new(
            Environment::builder()
                .with_name(name)
                .with_log_level(ort::LoggingLevel::Warning)
                .build()?,
        );

        let session = ort::SessionBuilder::new(&environment)?
            .with_optimization_level(ort::GraphOptimizationLevel::Level3)?
            .with_model_from_file(model_path)?;

        if session.outputs.is_empty() {
            return Err(Error::ModelOutputError(format!("{name} model has no outputs")));
        }

        Ok(Self {
            session,
            name,
            input_size,
            num_landmarks,
            values_per_landmark,
        })
    }

    fn infer(&self, image: &Mat) -> Result<ModelOutput> {
        let input = bgr_to_nhwc_tensor(image, self.input_size)?;
        let cow_array = CowArray::from(input.into_dyn());
        let input_tensor = Value::from_array(self.session.allocator(), &cow_array)?;

        let outputs = self.session.run(vec![input_tensor])?;

        let landmarks_output = outputs
            .first()
            .ok_or_else(|| Error::ModelOutputError(format!("No output from {} model", self.name)))?;
        let landmarks_tensor = landmarks_output.try_extract::<f32>()?;
        let landmarks_view = landmarks_tensor.view();
        let raw: Vec<f32> = landmarks_view.iter().copied().collect();

        let expected = self.num_landmarks * self.values_per_landmark;
        if raw.len() < expected {
            return Err(Error::ModelOutputError(format!(
                "{} model returned {} values, expected at least {expected}",
                self.name,
                raw.len()
            )));
        }

        // Models without a presence head are trusted unconditionally
        let score = match outputs.get(1) {
            Some(score_output) => {
                let score_tensor = score_output.try_extract::<f32>()?;
                let score_view = score_tensor.view();
                score_view.iter().next().copied().map_or(1.0, normalize_score)
            }
            None => 1.0,
        };

        #[allow(clippy::cast_precision_loss)]
        let scale = self.input_size as f32;
        let landmarks = raw
            .chunks_exact(self.values_per_landmark)
            .take(self.num_landmarks)
            .map(|values| Landmark {
                x: values[0] / scale,
                y: values[1] / scale,
                z: values[2] / scale,
                visibility: values.get(3).copied().map_or(0.0, sigmoid),
            })
            .collect();

        Ok(ModelOutput { landmarks, score })
    }
}

/// Groups that were present on the previous frame
#[derive(Debug, Clone, Copy, Default)]
struct TrackingState {
    pose: bool,
    face: bool,
    left_hand: bool,
    right_hand: bool,
}

/// Pose, face-mesh and hand landmark estimator backed by ONNX Runtime
pub struct HolisticDetector {
    pose_model: LandmarkModel,
    face_model: LandmarkModel,
    hand_model: LandmarkModel,
    min_detection_confidence: f32,
    min_tracking_confidence: f32,
    tracked: TrackingState,
}

impl HolisticDetector {
    /// Load the three landmark models named in the configuration
    ///
    /// # Errors
    ///
    /// Returns an error if any model cannot be loaded
    pub fn from_config(config: &Config) -> Result<Self> {
        let pose_model = LandmarkModel::new(
            &config.models.pose_landmark,
            "pose_landmark",
            POSE_INPUT_SIZE,
            NUM_POSE_LANDMARKS,
            POSE_RAW_VALUES,
        )?;
        let face_model = LandmarkModel::new(
            &config.models.face_landmark,
            "face_landmark",
            FACE_INPUT_SIZE,
            NUM_FACE_LANDMARKS,
            3,
        )?;
        let hand_model = LandmarkModel::new(
            &config.models.hand_landmark,
            "hand_landmark",
            HAND_INPUT_SIZE,
            NUM_HAND_LANDMARKS,
            3,
        )?;

        Ok(Self {
            pose_model,
            face_model,
            hand_model,
            min_detection_confidence: config.min_detection_confidence,
            min_tracking_confidence: config.min_tracking_confidence,
            tracked: TrackingState::default(),
        })
    }

    /// Score a group must reach, lower while it is being tracked
    fn threshold(&self, tracked: bool) -> f32 {
        if tracked {
            self.min_tracking_confidence
        } else {
            self.min_detection_confidence
        }
    }

    /// Run a region model on a crop of the frame and map the result back
    fn detect_region(&self, model: &LandmarkModel, frame: &Mat, roi: Rect, tracked: bool) -> Result<Option<Vec<Landmark>>> {
        let crop = Mat::roi(frame, roi)?.try_clone()?;
        let output = model.infer(&crop)?;
        if output.score < self.threshold(tracked) {
            debug!("{} rejected with score {:.2}", model.name, output.score);
            return Ok(None);
        }

        let (width, height) = (frame.cols(), frame.rows());
        Ok(Some(
            output
                .landmarks
                .into_iter()
                .map(|lm| roi_to_frame(lm, roi, width, height))
                .collect(),
        ))
    }
}

impl LandmarkDetector for HolisticDetector {
    fn detect(&mut self, frame: &Mat) -> Result<HolisticLandmarks> {
        let pose_output = self.pose_model.infer(frame)?;
        if pose_output.score < self.threshold(self.tracked.pose) {
            self.tracked = TrackingState::default();
            return Ok(HolisticLandmarks::default());
        }
        let pose = pose_output.landmarks;
        let (width, height) = (frame.cols(), frame.rows());

        let face = match face_region(&pose, width, height) {
            Some(roi) => self.detect_region(&self.face_model, frame, roi, self.tracked.face)?,
            None => None,
        };

        let wrist_visibility = self.min_detection_confidence;
        let left_hand = match hand_region(&pose, HandSide::Left, width, height, wrist_visibility) {
            Some(roi) => self.detect_region(&self.hand_model, frame, roi, self.tracked.left_hand)?,
            None => None,
        };
        let right_hand = match hand_region(&pose, HandSide::Right, width, height, wrist_visibility) {
            Some(roi) => self.detect_region(&self.hand_model, frame, roi, self.tracked.right_hand)?,
            None => None,
        };

        self.tracked = TrackingState {
            pose: true,
            face: face.is_some(),
            left_hand: left_hand.is_some(),
            right_hand: right_hand.is_some(),
        };

        Ok(HolisticLandmarks {
            pose: Some(pose),
            face,
            left_hand,
            right_hand,
        })
    }

    fn reset(&mut self) {
        self.tracked = TrackingState::default();
    }
}
