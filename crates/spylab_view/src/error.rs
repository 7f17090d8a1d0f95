//! Error types for view plumbing.

use thiserror::Error;

/// Errors raised while wiring a size observer to its host element.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ViewError {
    /// The element could not be found or has the wrong type
    #[error("Element not found: {0}")]
    ElementNotFound(String),

    /// The platform refused to create or register an observation
    #[error("Failed to observe element: {message}")]
    Observe {
        /// Platform error text
        message: String,
    },
}

impl ViewError {
    /// Create an observation error with a message.
    pub fn observe(message: impl Into<String>) -> Self {
        Self::Observe {
            message: message.into(),
        }
    }
}
