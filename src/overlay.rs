//! Drawing of landmark overlays and collection captions onto preview frames.

use crate::{keypoints::HolisticLandmarks, keypoints::Landmark, utils::safe_cast::f32_to_i32_clamp, Result};
use opencv::{
    core::{Mat, Point, Scalar, VecN},
    imgproc::{self, FONT_HERSHEY_SIMPLEX, LINE_AA},
    prelude::*,
};

/// Pose skeleton edges (33-point topology)
pub const POSE_CONNECTIONS: [(usize, usize); 35] = [
    (0, 1), (1, 2), (2, 3), (3, 7), (0, 4), (4, 5), (5, 6), (6, 8), (9, 10),
    (11, 12), (11, 13), (13, 15), (15, 17), (15, 19), (15, 21), (17, 19),
    (12, 14), (14, 16), (16, 18), (16, 20), (16, 22), (18, 20),
    (11, 23), (12, 24), (23, 24), (23, 25), (24, 26), (25, 27), (26, 28),
    (27, 29), (28, 30), (29, 31), (30, 32), (27, 31), (28, 32),
];

/// Hand skeleton edges (21-point topology)
pub const HAND_CONNECTIONS: [(usize, usize); 21] = [
    (0, 1), (1, 2), (2, 3), (3, 4),
    (0, 5), (5, 6), (6, 7), (7, 8),
    (5, 9), (9, 10), (10, 11), (11, 12),
    (9, 13), (13, 14), (14, 15), (15, 16),
    (13, 17), (0, 17), (17, 18), (18, 19), (19, 20),
];

/// Colour, thickness and point radius for one landmark group
#[derive(Debug, Clone, Copy)]
pub struct DrawingSpec {
    /// BGR colour
    pub color: Scalar,
    /// Line thickness
    pub thickness: i32,
    /// Point radius
    pub circle_radius: i32,
}

impl DrawingSpec {
    const fn new(b: f64, g: f64, r: f64, thickness: i32, circle_radius: i32) -> Self {
        Self {
            color: VecN([b, g, r, 0.0]),
            thickness,
            circle_radius,
        }
    }
}

/// Landmark and connection styles for one group
#[derive(Debug, Clone, Copy)]
pub struct GroupStyle {
    /// Style of the landmark points
    pub landmark: DrawingSpec,
    /// Style of the connections between points
    pub connection: DrawingSpec,
}

pub const FACE_STYLE: GroupStyle = GroupStyle {
    landmark: DrawingSpec::new(80.0, 110.0, 10.0, 1, 1),
    connection: DrawingSpec::new(80.0, 255.0, 121.0, 1, 1),
};

pub const POSE_STYLE: GroupStyle = GroupStyle {
    landmark: DrawingSpec::new(80.0, 22.0, 10.0, 2, 4),
    connection: DrawingSpec::new(80.0, 44.0, 121.0, 2, 2),
};

pub const LEFT_HAND_STYLE: GroupStyle = GroupStyle {
    landmark: DrawingSpec::new(121.0, 22.0, 76.0, 2, 4),
    connection: DrawingSpec::new(121.0, 44.0, 250.0, 2, 2),
};

pub const RIGHT_HAND_STYLE: GroupStyle = GroupStyle {
    landmark: DrawingSpec::new(245.0, 117.0, 66.0, 2, 4),
    connection: DrawingSpec::new(245.0, 66.0, 230.0, 2, 2),
};

/// Pixel position of a landmark, clamped to the frame
fn to_point(lm: &Landmark, width: i32, height: i32) -> Point {
    let (x, y) = lm.to_pixel(width, height);
    Point::new(f32_to_i32_clamp(x, 0, width - 1), f32_to_i32_clamp(y, 0, height - 1))
}

/// Draw one landmark group with its connections
pub fn draw_landmarks(
    image: &mut Mat,
    landmarks: &[Landmark],
    connections: &[(usize, usize)],
    style: &GroupStyle,
) -> Result<()> {
    let (width, height) = (image.cols(), image.rows());
    if width <= 0 || height <= 0 {
        return Ok(());
    }

    for &(a, b) in connections {
        if let (Some(start), Some(end)) = (landmarks.get(a), landmarks.get(b)) {
            imgproc::line(
                image,
                to_point(start, width, height),
                to_point(end, width, height),
                style.connection.color,
                style.connection.thickness,
                LINE_AA,
                0,
            )?;
        }
    }

    for lm in landmarks {
        imgproc::circle(
            image,
            to_point(lm, width, height),
            style.landmark.circle_radius,
            style.landmark.color,
            style.landmark.thickness,
            LINE_AA,
            0,
        )?;
    }

    Ok(())
}

/// Draw every detected group in the collector's house style
pub fn draw_styled_landmarks(image: &mut Mat, landmarks: &HolisticLandmarks) -> Result<()> {
    // The tesselation is too dense for a live preview; the mesh points alone read fine
    if let Some(face) = &landmarks.face {
        draw_landmarks(image, face, &[], &FACE_STYLE)?;
    }
    if let Some(pose) = &landmarks.pose {
        draw_landmarks(image, pose, &POSE_CONNECTIONS, &POSE_STYLE)?;
    }
    if let Some(hand) = &landmarks.left_hand {
        draw_landmarks(image, hand, &HAND_CONNECTIONS, &LEFT_HAND_STYLE)?;
    }
    if let Some(hand) = &landmarks.right_hand {
        draw_landmarks(image, hand, &HAND_CONNECTIONS, &RIGHT_HAND_STYLE)?;
    }
    Ok(())
}

/// Caption shown on every collected frame
#[must_use]
pub fn collection_caption(action: &str, sequence: usize) -> String {
    format!("Collecting frames for {action} Video Number {sequence}")
}

/// Draw the collection caption, plus the start banner on a sequence's first frame
pub fn draw_collection_banner(image: &mut Mat, action: &str, sequence: usize, first_frame: bool) -> Result<()> {
    if first_frame {
        imgproc::put_text(
            image,
            "STARTING COLLECTION",
            Point::new(120, 200),
            FONT_HERSHEY_SIMPLEX,
            1.0,
            Scalar::new(0.0, 255.0, 0.0, 0.0),
            4,
            LINE_AA,
            false,
        )?;
    }

    imgproc::put_text(
        image,
        &collection_caption(action, sequence),
        Point::new(15, 12),
        FONT_HERSHEY_SIMPLEX,
        0.5,
        Scalar::new(0.0, 0.0, 255.0, 0.0),
        1,
        LINE_AA,
        false,
    )?;

    Ok(())
}
