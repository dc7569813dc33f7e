//! Typed references to files on disk

use crate::error::AnalysisError;
use dse_runmanager::FileType;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// A path plus the file type it holds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileReference {
    path: PathBuf,
    file_type: FileType,
}

impl FileReference {
    /// Reference a file, judging its type by extension
    pub fn new(path: impl Into<PathBuf>) -> Result<Self, AnalysisError> {
        let path = path.into();
        let file_type = FileType::from_path(&path)?;
        Ok(Self { path, file_type })
    }

    #[must_use]
    pub fn with_type(path: impl Into<PathBuf>, file_type: FileType) -> Self {
        Self {
            path: path.into(),
            file_type,
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn file_type(&self) -> FileType {
        self.file_type
    }
}
