//! Data models for the face finder.

mod rect;
mod wire;

pub use rect::{mark_selected, BoxColor, FaceBox, FaceRect};
pub use wire::{AnalyzeBox, AnalyzeResponse, Face, SimilarFace, SimilarityFilters};
