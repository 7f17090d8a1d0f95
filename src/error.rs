//! Top-level error type for the native host.

use thiserror::Error;

pub use crate::config::ConfigError;
#[cfg(not(target_arch = "wasm32"))]
pub use crate::render::RenderError;
pub use crate::service::ServiceError;
pub use spylab_view::ViewError;

/// Any error the face finder can surface to a user.
#[derive(Error, Debug)]
pub enum SpylabError {
    #[error(transparent)]
    Service(#[from] ServiceError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    View(#[from] ViewError),

    #[cfg(not(target_arch = "wasm32"))]
    #[error(transparent)]
    Render(#[from] RenderError),

    #[cfg(not(target_arch = "wasm32"))]
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Face detection did not produce boxes
    #[error("Face analysis failed: {0}")]
    Analysis(String),

    /// A command-line argument was out of range
    #[error("{0}")]
    InvalidArgument(String),
}

pub type Result<T, E = SpylabError> = std::result::Result<T, E>;
