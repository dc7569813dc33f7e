//! Executable unit kinds

use crate::error::RunManagerError;
use crate::file_type::FileType;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of job the execution engine knows how to run
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum JobType {
    /// Placeholder that does nothing and passes its input through
    Null,
    /// Ruby script (model or EnergyPlus measure)
    Ruby,
    /// Translate an OpenStudio model to EnergyPlus input
    ModelToIdf,
    /// Prepare an EnergyPlus input for simulation
    EnergyPlusPreProcess,
    /// Expand HVAC template objects
    ExpandObjects,
    /// Run the EnergyPlus simulation
    EnergyPlus,
    /// Extract standard attributes from simulation output with model context
    OpenStudioPostProcess,
    /// Extract standard attributes from simulation output alone
    EnergyPlusPostProcess,
}

impl JobType {
    /// All known job types
    pub const ALL: [JobType; 8] = [
        JobType::Null,
        JobType::Ruby,
        JobType::ModelToIdf,
        JobType::EnergyPlusPreProcess,
        JobType::ExpandObjects,
        JobType::EnergyPlus,
        JobType::OpenStudioPostProcess,
        JobType::EnergyPlusPostProcess,
    ];

    /// Input and output file types a job of this kind declares by default.
    ///
    /// Ruby jobs declare their types per script, so they have none here.
    #[must_use]
    pub fn default_file_types(self) -> (Option<FileType>, Option<FileType>) {
        match self {
            JobType::Null | JobType::Ruby => (None, None),
            JobType::ModelToIdf => (Some(FileType::Osm), Some(FileType::Idf)),
            JobType::EnergyPlusPreProcess | JobType::ExpandObjects => {
                (Some(FileType::Idf), Some(FileType::Idf))
            }
            JobType::EnergyPlus => (Some(FileType::Idf), Some(FileType::Sql)),
            JobType::OpenStudioPostProcess | JobType::EnergyPlusPostProcess => {
                (Some(FileType::Sql), Some(FileType::Xml))
            }
        }
    }

    /// Canonical name used in serialized job specifications
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            JobType::Null => "Null",
            JobType::Ruby => "Ruby",
            JobType::ModelToIdf => "ModelToIdf",
            JobType::EnergyPlusPreProcess => "EnergyPlusPreProcess",
            JobType::ExpandObjects => "ExpandObjects",
            JobType::EnergyPlus => "EnergyPlus",
            JobType::OpenStudioPostProcess => "OpenStudioPostProcess",
            JobType::EnergyPlusPostProcess => "EnergyPlusPostProcess",
        }
    }
}

impl fmt::Display for JobType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobType {
    type Err = RunManagerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        JobType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| RunManagerError::UnknownJobType(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simulation_chain_types_line_up() {
        let chain = [JobType::ModelToIdf, JobType::EnergyPlus, JobType::OpenStudioPostProcess];
        for pair in chain.windows(2) {
            assert_eq!(pair[0].default_file_types().1, pair[1].default_file_types().0);
        }
    }

    #[test]
    fn test_parse() {
        assert_eq!("energyplus".parse::<JobType>().unwrap(), JobType::EnergyPlus);
        assert!("Sleep".parse::<JobType>().is_err());
    }
}
