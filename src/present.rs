//! Display decorations for boxes and result rows.

use crate::constants::{DEFAULT_DISTANCE_DECIMALS, MAX_DISTANCE_DECIMALS};
use crate::model::{AnalyzeBox, BoxColor, Face, FaceBox, SimilarFace};

/// Color for a detected face: green when the index already holds similar faces.
pub fn box_color(similar_faces: u32) -> BoxColor {
    if similar_faces > 0 {
        BoxColor::LIGHT_GREEN
    } else {
        BoxColor::RED
    }
}

/// Turn analyzed boxes into overlay boxes, keeping their order.
pub fn decorate(boxes: &[AnalyzeBox]) -> Vec<FaceBox> {
    boxes
        .iter()
        .map(|b| {
            FaceBox::new(b.rect())
                .with_color(box_color(b.similar_faces))
                .with_tooltip(format!("Found similarities: {}", b.similar_faces))
        })
        .collect()
}

/// Round to a fixed number of decimals, at most [`MAX_DISTANCE_DECIMALS`].
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals.min(MAX_DISTANCE_DECIMALS) as i32);
    let scaled = value * factor;
    if !scaled.is_finite() {
        return value;
    }
    scaled.round() / factor
}

/// `"{w}×{h}"` of a face region.
pub fn region_size(face: &Face) -> String {
    format!("{}×{}", face.w, face.h)
}

/// Title of the detail view for a face.
pub fn detail_title(face: &Face) -> String {
    format!("Full size: {}×{}px", face.w, face.h)
}

/// One row of the similarity results table.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct ResultRow {
    pub id: u64,
    pub file_name: String,
    /// Rounded distance
    pub distance: String,
    /// Unrounded distance, shown on hover
    pub distance_full: String,
    pub quality: Option<i64>,
    pub good_quality: bool,
    pub confidence: String,
    pub region: String,
    pub model: String,
    pub preview_url: String,
    pub is_same: bool,
}

impl ResultRow {
    pub fn new(hit: &SimilarFace, distance_decimals: u32) -> Self {
        let quality = hit.quality.filter(|q| q.is_finite());
        Self {
            id: hit.face.id,
            file_name: hit.face.file_name.clone(),
            distance: round_to(hit.distance, distance_decimals).to_string(),
            distance_full: hit.distance.to_string(),
            quality: quality.map(|q| q.round() as i64),
            good_quality: quality.is_some_and(|q| q > 0.0),
            confidence: format!("{}%", hit.face.confidence),
            region: region_size(&hit.face),
            model: hit.face.model.clone(),
            preview_url: hit.face.preview_url.clone(),
            is_same: hit.is_same,
        }
    }
}

impl From<&SimilarFace> for ResultRow {
    fn from(hit: &SimilarFace) -> Self {
        Self::new(hit, DEFAULT_DISTANCE_DECIMALS)
    }
}
