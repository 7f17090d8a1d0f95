//! Session-level tests of the face finder and shared fixtures.

mod scenario_tests;

use crate::model::{Face, SimilarFace};

/// A similarity hit with a 30x40 face at (1, 2).
pub(crate) fn similar_face(id: u64, distance: f64, quality: Option<f64>) -> SimilarFace {
    SimilarFace {
        face: Face {
            id,
            file_name: format!("{}.jpg", id),
            model: "Facenet512".to_string(),
            confidence: 0.99,
            preview_path: None,
            source_filepath: None,
            x: 1.0,
            y: 2.0,
            w: 30.0,
            h: 40.0,
            preview_url: format!("http://api/preview/{}.jpg", id),
            source_url: format!("http://api/source_img/{}.jpg", id),
        },
        distance,
        quality,
        is_same: distance < 0.4,
    }
}
