//! Utility functions for region-of-interest geometry and numeric conversions.

pub mod image_conversion;
pub mod safe_cast;

use crate::keypoints::Landmark;
use opencv::core::Rect;
use safe_cast::f32_to_i32_clamp;

/// Logistic function, maps raw model logits to `[0, 1]`
#[must_use]
pub fn sigmoid(value: f32) -> f32 {
    1.0 / (1.0 + (-value).exp())
}

/// Normalise a model score: values already in `[0, 1]` pass through,
/// anything else is treated as a logit
#[must_use]
pub fn normalize_score(value: f32) -> f32 {
    if (0.0..=1.0).contains(&value) {
        value
    } else {
        sigmoid(value)
    }
}

/// Pixel bounding box around a set of frame-normalised landmarks
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn landmark_bounds(landmarks: &[Landmark], width: i32, height: i32) -> Option<Rect> {
    if landmarks.is_empty() || width <= 0 || height <= 0 {
        return None;
    }

    let (mut min_x, mut min_y) = (f32::INFINITY, f32::INFINITY);
    let (mut max_x, mut max_y) = (f32::NEG_INFINITY, f32::NEG_INFINITY);
    for lm in landmarks {
        let (x, y) = lm.to_pixel(width, height);
        min_x = min_x.min(x);
        min_y = min_y.min(y);
        max_x = max_x.max(x);
        max_y = max_y.max(y);
    }

    let x0 = f32_to_i32_clamp(min_x, 0, width);
    let y0 = f32_to_i32_clamp(min_y, 0, height);
    let x1 = f32_to_i32_clamp(max_x, 0, width);
    let y1 = f32_to_i32_clamp(max_y, 0, height);

    Some(Rect::new(x0, y0, (x1 - x0).max(1), (y1 - y0).max(1)))
}

/// Expand a box by `scale` around its centre, make it square and keep it
/// inside the image
///
/// Returns `None` when nothing of the box remains inside the image.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn square_roi(bbox: Rect, scale: f32, max_width: i32, max_height: i32) -> Option<Rect> {
    if max_width <= 0 || max_height <= 0 {
        return None;
    }

    let center_x = bbox.x as f32 + bbox.width as f32 / 2.0;
    let center_y = bbox.y as f32 + bbox.height as f32 / 2.0;
    let side = (bbox.width.max(bbox.height) as f32 * scale).max(1.0);
    let side = f32_to_i32_clamp(side, 1, max_width.min(max_height));

    let x = f32_to_i32_clamp(center_x - side as f32 / 2.0, 0, max_width - side);
    let y = f32_to_i32_clamp(center_y - side as f32 / 2.0, 0, max_height - side);

    if center_x < 0.0 || center_y < 0.0 || center_x > max_width as f32 || center_y > max_height as f32 {
        return None;
    }

    Some(Rect::new(x, y, side, side))
}

/// Map a landmark predicted inside `roi` (normalised to the model input)
/// back to frame-normalised coordinates
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn roi_to_frame(local: Landmark, roi: Rect, width: i32, height: i32) -> Landmark {
    let (w, h) = (width as f32, height as f32);
    Landmark {
        x: (roi.x as f32 + local.x * roi.width as f32) / w,
        y: (roi.y as f32 + local.y * roi.height as f32) / h,
        z: local.z * roi.width as f32 / w,
        visibility: local.visibility,
    }
}
