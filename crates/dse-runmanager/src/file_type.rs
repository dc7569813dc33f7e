//! File kinds passed between workflow steps

use crate::error::RunManagerError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Kind of file produced or consumed by a step
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum FileType {
    /// OpenStudio model
    Osm,
    /// EnergyPlus input file
    Idf,
    /// EnergyPlus SQLite output
    Sql,
    /// Attribute / report document
    Xml,
    /// Serialized standard report
    Ossr,
    /// Weather file
    Epw,
    /// Flat attribute document (name/value pairs)
    Json,
}

impl FileType {
    /// All known file types
    pub const ALL: [FileType; 7] = [
        FileType::Osm,
        FileType::Idf,
        FileType::Sql,
        FileType::Xml,
        FileType::Ossr,
        FileType::Epw,
        FileType::Json,
    ];

    /// True for the types that carry the building model itself.
    ///
    /// Only these advance the mainline type when walking a workflow.
    #[inline]
    #[must_use]
    pub fn is_energy_model(self) -> bool {
        matches!(self, FileType::Osm | FileType::Idf)
    }

    /// Lower case file extension, without the dot
    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            FileType::Osm => "osm",
            FileType::Idf => "idf",
            FileType::Sql => "sql",
            FileType::Xml => "xml",
            FileType::Ossr => "ossr",
            FileType::Epw => "epw",
            FileType::Json => "json",
        }
    }

    /// File type of a path, judged by extension
    pub fn from_path(path: &Path) -> Result<Self, RunManagerError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .ok_or_else(|| RunManagerError::UnknownFileType(path.display().to_string()))?;
        ext.parse()
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.extension().to_ascii_uppercase())
    }
}

impl FromStr for FileType {
    type Err = RunManagerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim().trim_start_matches('.');
        FileType::ALL
            .iter()
            .copied()
            .find(|t| t.extension().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| RunManagerError::UnknownFileType(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_energy_model_types() {
        assert!(FileType::Osm.is_energy_model());
        assert!(FileType::Idf.is_energy_model());
        assert!(!FileType::Sql.is_energy_model());
        assert!(!FileType::Xml.is_energy_model());
        assert!(!FileType::Epw.is_energy_model());
    }

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!("OSM".parse::<FileType>().unwrap(), FileType::Osm);
        assert_eq!(".idf".parse::<FileType>().unwrap(), FileType::Idf);
        assert!("docx".parse::<FileType>().is_err());
    }

    #[test]
    fn test_from_path() {
        assert_eq!(FileType::from_path(Path::new("run/out.SQL")).unwrap(), FileType::Sql);
        assert!(FileType::from_path(Path::new("run/README")).is_err());
    }

    #[test]
    fn test_display_round_trips() {
        for t in FileType::ALL {
            assert_eq!(t.to_string().parse::<FileType>().unwrap(), t);
        }
    }
}
