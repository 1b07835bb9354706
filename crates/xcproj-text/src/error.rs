//! Error types for the text codec.

use std::io;

use thiserror::Error;
use xcproj_core::GraphError;

/// Errors that can occur while reading or writing a project document.
#[derive(Debug, Error)]
pub enum TextError {
    #[error("malformed input at {line}:{column}: {detail}")]
    Malformed {
        line: usize,
        column: usize,
        detail: String,
    },

    #[error("unknown object kind {isa:?} for object {id}")]
    UnknownKind { id: String, isa: String },

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl TextError {
    pub(crate) fn malformed(line: usize, column: usize, detail: impl Into<String>) -> Self {
        TextError::Malformed {
            line,
            column,
            detail: detail.into(),
        }
    }

    /// Whether the source text itself is unusable (including unknown kinds).
    pub fn is_malformed(&self) -> bool {
        matches!(self, TextError::Malformed { .. } | TextError::UnknownKind { .. })
    }
}

/// Result type for codec operations.
pub type Result<T> = std::result::Result<T, TextError>;
