//! The boundary to the face search backend.
//!
//! The core never speaks HTTP itself. Hosts provide a [`FaceService`]: the
//! browser host forwards to the page's API client (which owns bearer tokens
//! and refresh-on-401), the native host replays recorded responses.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;

use crate::model::{AnalyzeResponse, FaceRect, SimilarFace, SimilarityFilters};

/// Errors reported by a [`FaceService`].
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ServiceError {
    /// The backend answered with a non-success status
    #[error("Request to {endpoint} failed with status {status}: {message}")]
    Http {
        endpoint: String,
        status: u16,
        message: String,
    },

    /// The request never produced a response
    #[error("Network error: {0}")]
    Network(String),

    /// The response body did not match the expected shape
    #[error("Invalid response from {endpoint}: {message}")]
    InvalidResponse { endpoint: String, message: String },

    /// No recorded response exists for this endpoint
    #[error("No recorded response for {0}")]
    NotRecorded(String),

    /// Reading a recording from disk failed
    #[error("Failed to read recording {path:?}: {message}")]
    Recording { path: PathBuf, message: String },
}

impl ServiceError {
    pub fn http(endpoint: impl Into<String>, status: u16, message: impl Into<String>) -> Self {
        Self::Http {
            endpoint: endpoint.into(),
            status,
            message: message.into(),
        }
    }

    pub fn invalid_response(endpoint: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidResponse {
            endpoint: endpoint.into(),
            message: message.into(),
        }
    }
}

/// Backend endpoint paths.
pub mod endpoints {
    pub const ANALYZE: &str = "/analyze";
    pub const SIMILAR_TO_IMAGE: &str = "/similar-to-image";
}

/// A file picked or dropped by the user.
pub trait UploadFile: Clone {
    /// File name shown to the user.
    fn name(&self) -> String;

    /// Size in bytes.
    fn size(&self) -> u64;

    /// Empty files are never uploaded.
    fn is_empty(&self) -> bool {
        self.size() == 0
    }
}

/// An in-memory upload, used by the native host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageFile {
    pub name: String,
    pub bytes: Arc<[u8]>,
}

impl ImageFile {
    pub fn new(name: impl Into<String>, bytes: impl Into<Arc<[u8]>>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }

    /// Read a file from disk.
    pub fn read(path: &Path) -> std::io::Result<Self> {
        let bytes = std::fs::read(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self::new(name, bytes))
    }
}

impl UploadFile for ImageFile {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// The two backend operations the face finder depends on.
///
/// Futures are awaited on the UI thread and need not be `Send`.
#[expect(async_fn_in_trait)]
pub trait FaceService<F: UploadFile> {
    /// `POST /analyze`: detect faces in an upload.
    async fn analyze(&self, file: &F) -> Result<AnalyzeResponse, ServiceError>;

    /// `POST /similar-to-image`: rank indexed faces by similarity to one region.
    async fn similar_to_image(
        &self,
        file: &F,
        rect: &FaceRect,
        filters: &SimilarityFilters,
    ) -> Result<Vec<SimilarFace>, ServiceError>;
}

/// Replays backend responses captured as JSON files.
#[derive(Debug, Clone, Default)]
pub struct RecordedService {
    analysis: Option<AnalyzeResponse>,
    similar: Option<Vec<SimilarFace>>,
}

impl RecordedService {
    pub fn new(analysis: Option<AnalyzeResponse>, similar: Option<Vec<SimilarFace>>) -> Self {
        Self { analysis, similar }
    }

    /// Load recordings from disk; the similarity recording is optional.
    pub fn from_files(analysis: &Path, similar: Option<&Path>) -> Result<Self, ServiceError> {
        let analysis = read_json(analysis)?;
        let similar = similar.map(read_json).transpose()?;
        Ok(Self::new(Some(analysis), similar))
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ServiceError> {
    let recording_error = |message: String| ServiceError::Recording {
        path: path.to_path_buf(),
        message,
    };
    let json = std::fs::read_to_string(path).map_err(|e| recording_error(e.to_string()))?;
    serde_json::from_str(&json).map_err(|e| recording_error(e.to_string()))
}

impl<F: UploadFile> FaceService<F> for RecordedService {
    async fn analyze(&self, file: &F) -> Result<AnalyzeResponse, ServiceError> {
        log::debug!("Replaying {} for {}", endpoints::ANALYZE, file.name());
        self.analysis
            .clone()
            .ok_or_else(|| ServiceError::NotRecorded(endpoints::ANALYZE.to_string()))
    }

    async fn similar_to_image(
        &self,
        file: &F,
        rect: &FaceRect,
        filters: &SimilarityFilters,
    ) -> Result<Vec<SimilarFace>, ServiceError> {
        log::debug!(
            "Replaying {} for {} at {:?}",
            endpoints::SIMILAR_TO_IMAGE,
            file.name(),
            rect
        );
        let faces = self
            .similar
            .as_ref()
            .ok_or_else(|| ServiceError::NotRecorded(endpoints::SIMILAR_TO_IMAGE.to_string()))?;
        Ok(faces
            .iter()
            .filter(|face| filters.accepts(face))
            .cloned()
            .collect())
    }
}
