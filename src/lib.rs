//! SpyLab - face finder
//!
//! Upload an image, let the backend detect the faces in it, click one and
//! browse the indexed faces most similar to it. The crate holds the page
//! logic shared by the browser host (`wasm` module) and the native replay
//! tool: mapping face rectangles onto the responsively scaled image, and
//! keeping the similarity results consistent with the current selection.

pub mod config;
pub mod constants;
pub mod error;
pub mod finder;
pub mod geometry;
pub mod model;
pub mod overlay;
pub mod present;
pub mod selection;
pub mod service;

#[cfg(not(target_arch = "wasm32"))]
pub mod native;
#[cfg(not(target_arch = "wasm32"))]
pub mod render;

#[cfg(test)]
mod tests;

pub use config::AppConfig;
pub use error::SpylabError;
pub use finder::{execute, Command, FaceFinder, Message};
pub use geometry::{scale_rect, ScaledRect};
pub use model::{FaceBox, FaceRect};
pub use overlay::ImageBoxOverlay;
pub use selection::{SelectionController, SimilarityResults, Ticket};
pub use service::{FaceService, RecordedService, ServiceError, UploadFile};
pub use spylab_view::DisplaySize;

// WASM entry point
#[cfg(target_arch = "wasm32")]
mod wasm;

#[cfg(target_arch = "wasm32")]
pub use wasm::*;
