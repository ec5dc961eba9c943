//! Custom error types with exit codes

use thiserror::Error;

/// Main error type for regconf operations
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum EditorError {
    /// Configuration Error - the tool itself is misconfigured (bad engine table, bad arguments)
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Document Error - the configuration document cannot be read or has the wrong shape
    #[error("Document error: {message}")]
    Document { message: String },

    /// Validation Error - the document has submission-blocking problems
    #[error("Validation error: {message}")]
    Validation { message: String },

    /// Filesystem Error - file operation failed
    #[error("Filesystem error: {message}")]
    Filesystem { message: String },

    /// Rejected Error - an edit was refused (read-only group, locked location, wrong session state)
    #[error("Rejected: {message}")]
    Rejected { message: String },
}

impl EditorError {
    /// Get the appropriate exit code for this error type
    #[must_use]
    #[inline]
    pub const fn exit_code(&self) -> i32 {
        match *self {
            Self::Configuration { .. } => 1,
            Self::Document { .. } => 2,
            Self::Validation { .. } => 3,
            Self::Filesystem { .. } => 4,
            Self::Rejected { .. } => 5,
        }
    }

    /// Create a configuration error
    #[inline]
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a document error
    #[inline]
    pub fn document<S: Into<String>>(message: S) -> Self {
        Self::Document {
            message: message.into(),
        }
    }

    /// Create a validation error
    #[inline]
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a filesystem error
    #[inline]
    pub fn filesystem<S: Into<String>>(message: S) -> Self {
        Self::Filesystem {
            message: message.into(),
        }
    }

    /// Create a rejected-edit error
    #[inline]
    pub fn rejected<S: Into<String>>(message: S) -> Self {
        Self::Rejected {
            message: message.into(),
        }
    }
}
