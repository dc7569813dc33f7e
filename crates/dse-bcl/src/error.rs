//! Error types for the measure catalog

use std::path::PathBuf;

/// Catalog and argument errors
#[derive(Debug, thiserror::Error)]
pub enum BclError {
    /// Value does not fit the argument
    #[error("invalid value for argument '{name}': {reason}")]
    InvalidArgumentValue { name: String, reason: String },

    /// Directory has no descriptor
    #[error("no measure descriptor in {0}")]
    MissingDescriptor(PathBuf),

    /// Descriptor could not be read or written
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Descriptor is not valid JSON for a measure
    #[error("descriptor error: {0}")]
    Json(#[from] serde_json::Error),
}

impl BclError {
    /// Argument errors leave the measure untouched and can be retried
    #[inline]
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::InvalidArgumentValue { .. })
    }
}
