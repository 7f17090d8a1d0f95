//! Face rectangles and their view decorations.

use serde::{Deserialize, Serialize};

/// Axis-aligned face region in original image pixels.
///
/// Top-left corner plus width/height. Compared field by field, which is how
/// the selected face is recognised among a list of detected boxes.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FaceRect {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

impl FaceRect {
    /// Create a new rectangle.
    pub fn new(x: f64, y: f64, w: f64, h: f64) -> Self {
        Self { x, y, w, h }
    }

    /// Multipart form fields describing this region, as the backend expects them.
    pub fn form_fields(&self) -> [(&'static str, String); 4] {
        [
            ("x", self.x.to_string()),
            ("y", self.y.to_string()),
            ("w", self.w.to_string()),
            ("h", self.h.to_string()),
        ]
    }
}

/// RGB border color for an overlay box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoxColor(pub [u8; 3]);

impl BoxColor {
    /// CSS `lightgreen`.
    pub const LIGHT_GREEN: BoxColor = BoxColor([144, 238, 144]);
    /// CSS `red`.
    pub const RED: BoxColor = BoxColor([255, 0, 0]);

    /// CSS color string, e.g. `rgb(144, 238, 144)`.
    pub fn to_css(self) -> String {
        let [r, g, b] = self.0;
        format!("rgb({}, {}, {})", r, g, b)
    }
}

impl Default for BoxColor {
    fn default() -> Self {
        BoxColor::LIGHT_GREEN
    }
}

/// A face rectangle as shown on screen.
///
/// `is_strong`, `color` and `tooltip` are derived by the view and never
/// sent back to the backend.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FaceBox {
    pub rect: FaceRect,
    pub is_strong: bool,
    pub color: Option<BoxColor>,
    pub tooltip: Option<String>,
}

impl FaceBox {
    /// A plain box with no decoration.
    pub fn new(rect: FaceRect) -> Self {
        Self {
            rect,
            ..Self::default()
        }
    }

    pub fn with_color(mut self, color: BoxColor) -> Self {
        self.color = Some(color);
        self
    }

    pub fn with_tooltip(mut self, tooltip: impl Into<String>) -> Self {
        self.tooltip = Some(tooltip.into());
        self
    }

    /// Border color, falling back to the default.
    pub fn border_color(&self) -> BoxColor {
        self.color.unwrap_or_default()
    }
}

impl From<FaceRect> for FaceBox {
    fn from(rect: FaceRect) -> Self {
        Self::new(rect)
    }
}

/// Mark the box equal to `selected` as strong and clear all others.
///
/// At most one box is marked, even if the list holds duplicates.
/// Returns true if any flag changed.
pub fn mark_selected(boxes: &mut [FaceBox], selected: Option<&FaceRect>) -> bool {
    let mut changed = false;
    let mut found = false;
    for face in boxes.iter_mut() {
        let strong = !found && selected == Some(&face.rect);
        found |= strong;
        if face.is_strong != strong {
            face.is_strong = strong;
            changed = true;
        }
    }
    changed
}
