//! Error types for project editing.

use xcproj_core::GraphError;
use xcproj_plist::PlistError;
use xcproj_text::TextError;

/// Errors from project mutation and capability recipes.
#[derive(Debug, thiserror::Error)]
pub enum EditError {
    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    Text(#[from] TextError),

    #[error(transparent)]
    Plist(#[from] PlistError),

    #[error("target {0:?} not found")]
    TargetNotFound(String),

    #[error("build configuration {0:?} not found")]
    ConfigurationNotFound(String),

    #[error("{0}")]
    Invalid(String),
}

impl EditError {
    pub(crate) fn invalid(detail: impl Into<String>) -> Self {
        EditError::Invalid(detail.into())
    }
}

/// Result type for editing operations.
pub type Result<T> = std::result::Result<T, EditError>;
