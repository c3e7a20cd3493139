//! Property tests for keypoint vector extraction

use landmark_collector::{
    constants::{FACE_VECTOR_LEN, HAND_VECTOR_LEN, KEYPOINT_VECTOR_LEN, POSE_VECTOR_LEN},
    keypoints::{extract_keypoints, HolisticLandmarks, Landmark},
};
use proptest::prelude::*;

fn group(len: usize, value: f32) -> Vec<Landmark> {
    vec![
        Landmark {
            x: value,
            y: value,
            z: value,
            visibility: value,
        };
        len
    ]
}

fn maybe_group() -> impl Strategy<Value = Option<usize>> {
    prop::option::of(0usize..600)
}

proptest! {
    #[test]
    fn prop_vector_length_is_fixed(
        pose in maybe_group(),
        face in maybe_group(),
        left in maybe_group(),
        right in maybe_group(),
    ) {
        let landmarks = HolisticLandmarks {
            pose: pose.map(|n| group(n, 0.5)),
            face: face.map(|n| group(n, 0.5)),
            left_hand: left.map(|n| group(n, 0.5)),
            right_hand: right.map(|n| group(n, 0.5)),
        };
        prop_assert_eq!(extract_keypoints(&landmarks).len(), KEYPOINT_VECTOR_LEN);
    }

    #[test]
    fn prop_missing_groups_are_zero(left_present in any::<bool>(), value in 0.01f32..1.0) {
        let landmarks = HolisticLandmarks {
            pose: None,
            face: Some(group(468, value)),
            left_hand: left_present.then(|| group(21, value)),
            right_hand: None,
        };
        let keypoints = extract_keypoints(&landmarks);

        let face_start = POSE_VECTOR_LEN;
        let left_start = face_start + FACE_VECTOR_LEN;
        let right_start = left_start + HAND_VECTOR_LEN;

        prop_assert!(keypoints.iter().take(POSE_VECTOR_LEN).all(|&v| v == 0.0));
        prop_assert!(keypoints.iter().skip(face_start).take(FACE_VECTOR_LEN).all(|&v| v == value));
        prop_assert!(keypoints
            .iter()
            .skip(left_start)
            .take(HAND_VECTOR_LEN)
            .all(|&v| v == if left_present { value } else { 0.0 }));
        prop_assert!(keypoints.iter().skip(right_start).all(|&v| v == 0.0));
    }
}

#[test]
fn test_group_lengths_sum_to_vector_length() {
    assert_eq!(POSE_VECTOR_LEN, 132);
    assert_eq!(FACE_VECTOR_LEN, 1404);
    assert_eq!(HAND_VECTOR_LEN, 63);
    assert_eq!(KEYPOINT_VECTOR_LEN, 1662);
}

#[test]
fn test_empty_detection_is_all_zero() {
    let keypoints = extract_keypoints(&HolisticLandmarks::default());
    assert!(keypoints.iter().all(|&v| v == 0.0));
}
