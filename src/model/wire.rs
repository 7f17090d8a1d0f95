//! Backend request/response types.
//!
//! Field names follow the JSON produced by the face service, which is why
//! `Face::file_name` is renamed from `fn`.

use serde::{Deserialize, Serialize};

use super::rect::FaceRect;

/// One detected face in an analyzed upload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzeBox {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
    /// Detector confidence that the region is a face
    #[serde(default)]
    pub face_confidence: f64,
    /// Number of indexed faces similar to this one
    #[serde(default)]
    pub similar_faces: u32,
}

impl AnalyzeBox {
    pub fn rect(&self) -> FaceRect {
        FaceRect::new(self.x, self.y, self.w, self.h)
    }
}

/// Response of `POST /analyze`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzeResponse {
    pub preview_url: String,
    pub source_url: String,
    pub boxes: Vec<AnalyzeBox>,
}

/// An indexed face, as returned by `GET /list` and `GET /detail`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Face {
    pub id: u64,
    /// Source file name
    #[serde(rename = "fn")]
    pub file_name: String,
    /// Embedding model that produced this face
    pub model: String,
    pub confidence: f64,
    #[serde(default)]
    pub preview_path: Option<String>,
    #[serde(default)]
    pub source_filepath: Option<String>,
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
    pub preview_url: String,
    pub source_url: String,
}

impl Face {
    pub fn rect(&self) -> FaceRect {
        FaceRect::new(self.x, self.y, self.w, self.h)
    }
}

/// One ranked hit of `POST /similar-to-image`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarFace {
    #[serde(flatten)]
    pub face: Face,
    /// Embedding distance; lower is more similar
    pub distance: f64,
    #[serde(default)]
    pub quality: Option<f64>,
    pub is_same: bool,
}

/// Optional filters sent along with a similarity query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SimilarityFilters {
    /// Minimum face quality (`1` = high quality only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality: Option<i64>,
}

impl SimilarityFilters {
    /// Filters for the "high quality only" switch.
    pub fn high_quality(enabled: bool) -> Self {
        Self {
            quality: enabled.then_some(1),
        }
    }

    /// Extra multipart form fields for these filters.
    pub fn form_fields(&self) -> Vec<(&'static str, String)> {
        self.quality
            .map(|q| ("quality", q.to_string()))
            .into_iter()
            .collect()
    }

    /// Whether a face passes these filters.
    pub fn accepts(&self, face: &SimilarFace) -> bool {
        match self.quality {
            Some(min) => face.quality.is_some_and(|q| q >= min as f64),
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SIMILAR_JSON: &str = r#"[
        {
            "id": 7,
            "fn": "party.jpg",
            "model": "Facenet512",
            "confidence": 0.98,
            "preview_path": "7.jpg",
            "source_filepath": "party.jpg",
            "x": 12, "y": 30, "w": 64, "h": 64,
            "preview_url": "http://api/preview/7.jpg",
            "source_url": "http://api/source_img/party.jpg",
            "distance": 0.31234,
            "quality": 2.6,
            "is_same": true
        }
    ]"#;

    #[test]
    fn test_parse_similar_faces() {
        let faces: Vec<SimilarFace> = serde_json::from_str(SIMILAR_JSON).unwrap();

        assert_eq!(faces.len(), 1);
        let hit = &faces[0];
        assert_eq!(hit.face.file_name, "party.jpg");
        assert_eq!(hit.face.rect(), FaceRect::new(12.0, 30.0, 64.0, 64.0));
        assert_eq!(hit.quality, Some(2.6));
        assert!(hit.is_same);
    }

    #[test]
    fn test_parse_analyze_response() {
        let json = r#"{
            "preview_url": "http://api/preview/",
            "source_url": "http://api/source_img/",
            "boxes": [
                {"x": 10, "y": 10, "w": 50, "h": 50, "face_confidence": 0.99, "similar_faces": 3}
            ]
        }"#;
        let resp: AnalyzeResponse = serde_json::from_str(json).unwrap();

        assert_eq!(resp.boxes[0].rect(), FaceRect::new(10.0, 10.0, 50.0, 50.0));
        assert_eq!(resp.boxes[0].similar_faces, 3);
    }

    #[test]
    fn test_missing_quality_is_none() {
        let json = SIMILAR_JSON.replace("\"quality\": 2.6,", "");
        let faces: Vec<SimilarFace> = serde_json::from_str(&json).unwrap();
        assert_eq!(faces[0].quality, None);
    }

    #[test]
    fn test_high_quality_filter() {
        let mut faces: Vec<SimilarFace> = serde_json::from_str(SIMILAR_JSON).unwrap();
        let filters = SimilarityFilters::high_quality(true);

        assert!(filters.accepts(&faces[0]));
        faces[0].quality = Some(0.0);
        assert!(!filters.accepts(&faces[0]));
        faces[0].quality = None;
        assert!(!filters.accepts(&faces[0]));
        assert!(SimilarityFilters::default().accepts(&faces[0]));
    }

    #[test]
    fn test_filter_form_fields() {
        assert!(SimilarityFilters::default().form_fields().is_empty());
        assert_eq!(
            SimilarityFilters::high_quality(true).form_fields(),
            vec![("quality", "1".to_string())]
        );
    }
}
