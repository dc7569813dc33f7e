//! Error types for the job boundary

/// Errors raised while parsing or inspecting job boundary values
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RunManagerError {
    /// Unrecognized file type name or extension
    #[error("unknown file type: {0}")]
    UnknownFileType(String),

    /// Unrecognized job type name
    #[error("unknown job type: {0}")]
    UnknownJobType(String),

    /// A job tree node did not have the expected shape
    #[error("malformed job tree at job {job}: {reason}")]
    MalformedTree {
        /// Job identifier
        job: uuid::Uuid,
        /// What was wrong
        reason: String,
    },
}

impl RunManagerError {
    /// Parse failures can be retried with corrected input; tree shape errors cannot.
    #[inline]
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::MalformedTree { .. })
    }
}
