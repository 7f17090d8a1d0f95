//! Mapping face rectangles onto a responsively scaled image.
//!
//! Pure functions of `(FaceRect, DisplaySize)`; no rounding happens here.

use spylab_view::DisplaySize;

use crate::model::{FaceBox, FaceRect};

/// A face rectangle in rendered-pixel space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaledRect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl ScaledRect {
    /// Check if a rendered-pixel point is inside the rectangle.
    pub fn contains(&self, px: f64, py: f64) -> bool {
        px >= self.left
            && px <= self.left + self.width
            && py >= self.top
            && py <= self.top + self.height
    }

    /// Position as a percentage of the rendered image size.
    ///
    /// Percentages stay valid across later resizes, which lets a host place
    /// boxes with CSS without listening to every layout change.
    pub fn to_percent(&self, size: &DisplaySize) -> Option<ScaledRect> {
        if size.client_width <= 0.0 || size.client_height <= 0.0 {
            return None;
        }
        Some(ScaledRect {
            left: self.left * 100.0 / size.client_width,
            top: self.top * 100.0 / size.client_height,
            width: self.width * 100.0 / size.client_width,
            height: self.height * 100.0 / size.client_height,
        })
    }
}

/// Map one rectangle into rendered space.
///
/// `None` while the image is not loaded or has a zero natural dimension, so
/// callers never see `Infinity`/`NaN` coordinates.
pub fn scale_rect(rect: &FaceRect, size: &DisplaySize) -> Option<ScaledRect> {
    if !size.is_ready() {
        return None;
    }
    Some(ScaledRect {
        left: rect.x * size.client_width / size.natural_width,
        top: rect.y * size.client_height / size.natural_height,
        width: rect.w * size.client_width / size.natural_width,
        height: rect.h * size.client_height / size.natural_height,
    })
}

/// A box together with where it is drawn.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedBox {
    pub face: FaceBox,
    pub scaled: ScaledRect,
}

/// Place every box on the rendered image, in display order.
///
/// Empty while the image is not ready, regardless of `boxes`.
pub fn place_boxes(boxes: &[FaceBox], size: &DisplaySize) -> Vec<PlacedBox> {
    if !size.is_ready() {
        return Vec::new();
    }
    boxes
        .iter()
        .filter_map(|face| {
            scale_rect(&face.rect, size).map(|scaled| PlacedBox {
                face: face.clone(),
                scaled,
            })
        })
        .collect()
}

/// Index of the box under a rendered-pixel point.
///
/// Overlapping boxes resolve to the smallest one; on equal area the one drawn
/// last (on top) wins.
pub fn hit_test(placed: &[PlacedBox], px: f64, py: f64) -> Option<usize> {
    placed
        .iter()
        .enumerate()
        .filter(|(_, b)| b.scaled.contains(px, py))
        .fold(None, |best: Option<(usize, f64)>, (i, b)| {
            let area = b.scaled.width * b.scaled.height;
            match best {
                Some((_, best_area)) if best_area < area => best,
                _ => Some((i, area)),
            }
        })
        .map(|(i, _)| i)
}
