//! Error types for flat property-list documents.

use std::path::PathBuf;

/// Errors that can occur while reading or writing a plist document.
#[derive(Debug, thiserror::Error)]
pub enum PlistError {
    /// The XML is not a well-formed property list.
    #[error("malformed plist at line {line}: {detail}")]
    Malformed {
        /// 1-based line of the offending construct.
        line: usize,
        /// Description of the problem.
        detail: String,
    },

    /// A well-formed element this reader does not model (`<data>`, ...).
    #[error("unsupported plist element <{0}>")]
    UnsupportedElement(String),

    /// The root of the document is not a dictionary.
    #[error("plist root must be a dictionary, found <{0}>")]
    RootNotDict(String),

    /// I/O error reading or writing the document.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl PlistError {
    pub(crate) fn malformed(line: usize, detail: impl Into<String>) -> Self {
        PlistError::Malformed {
            line,
            detail: detail.into(),
        }
    }
}

/// Result type for plist operations.
pub type Result<T> = std::result::Result<T, PlistError>;
