//! Catalog measures

use crate::argument::Argument;
use crate::error::BclError;
use dse_runmanager::FileType;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Name of the descriptor file inside a measure directory
pub const DESCRIPTOR_FILE_NAME: &str = "measure.json";

const DEFAULT_SCRIPT_NAME: &str = "measure.rb";

/// What a measure script operates on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MeasureType {
    /// Edits an OpenStudio model
    ModelMeasure,
    /// Edits an EnergyPlus input file
    EnergyPlusMeasure,
    /// Runs outside the model chain
    UtilityMeasure,
    /// Reads simulation results
    ReportingMeasure,
}

impl MeasureType {
    /// Input and output file types implied by the measure type
    #[must_use]
    pub fn file_types(self) -> (Option<FileType>, Option<FileType>) {
        match self {
            MeasureType::ModelMeasure => (Some(FileType::Osm), Some(FileType::Osm)),
            MeasureType::EnergyPlusMeasure => (Some(FileType::Idf), Some(FileType::Idf)),
            MeasureType::UtilityMeasure | MeasureType::ReportingMeasure => (None, None),
        }
    }
}

/// A catalog measure: a script directory plus its descriptor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BclMeasure {
    uuid: Uuid,
    version_uuid: Uuid,
    name: String,
    #[serde(default)]
    description: String,
    measure_type: MeasureType,
    #[serde(default = "default_script_name")]
    script_name: String,
    #[serde(default)]
    arguments: Vec<Argument>,
    #[serde(default)]
    directory: PathBuf,
}

fn default_script_name() -> String {
    DEFAULT_SCRIPT_NAME.to_string()
}

impl BclMeasure {
    /// Create a measure with fresh identifiers
    #[must_use]
    pub fn new(name: impl Into<String>, directory: impl Into<PathBuf>, measure_type: MeasureType) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            version_uuid: Uuid::new_v4(),
            name: name.into(),
            description: String::new(),
            measure_type,
            script_name: default_script_name(),
            arguments: Vec::new(),
            directory: directory.into(),
        }
    }

    /// Use known identifiers, as when mirroring an existing catalog entry
    #[inline]
    #[must_use]
    pub fn with_uuids(mut self, uuid: Uuid, version_uuid: Uuid) -> Self {
        self.uuid = uuid;
        self.version_uuid = version_uuid;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_argument(mut self, argument: Argument) -> Self {
        self.arguments.push(argument);
        self
    }

    #[inline]
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    #[inline]
    #[must_use]
    pub fn with_script_name(mut self, script_name: impl Into<String>) -> Self {
        self.script_name = script_name.into();
        self
    }

    /// A new version of the same measure: same uuid, fresh version uuid
    #[must_use]
    pub fn new_version(&self) -> Self {
        let mut next = self.clone();
        next.version_uuid = Uuid::new_v4();
        next
    }

    /// Read `measure.json` from a measure directory
    pub fn load(directory: &Path) -> Result<Self, BclError> {
        let descriptor = directory.join(DESCRIPTOR_FILE_NAME);
        if !descriptor.is_file() {
            return Err(BclError::MissingDescriptor(directory.to_path_buf()));
        }
        let text = fs::read_to_string(&descriptor)?;
        let mut measure: BclMeasure = serde_json::from_str(&text)?;
        measure.directory = directory.to_path_buf();
        tracing::debug!("Loaded measure '{}' from {}", measure.name, directory.display());
        Ok(measure)
    }

    /// Write `measure.json` into the measure directory
    pub fn save(&self) -> Result<(), BclError> {
        fs::create_dir_all(&self.directory)?;
        let text = serde_json::to_string_pretty(self)?;
        fs::write(self.directory.join(DESCRIPTOR_FILE_NAME), text)?;
        Ok(())
    }

    #[must_use]
    pub fn uuid(&self) -> Uuid {
        self.uuid
    }

    #[must_use]
    pub fn version_uuid(&self) -> Uuid {
        self.version_uuid
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    #[must_use]
    pub fn measure_type(&self) -> MeasureType {
        self.measure_type
    }

    #[must_use]
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Default argument list
    #[must_use]
    pub fn arguments(&self) -> &[Argument] {
        &self.arguments
    }

    #[must_use]
    pub fn primary_script_path(&self) -> PathBuf {
        self.directory.join(&self.script_name)
    }

    #[must_use]
    pub fn input_file_type(&self) -> Option<FileType> {
        self.measure_type.file_types().0
    }

    #[must_use]
    pub fn output_file_type(&self) -> Option<FileType> {
        self.measure_type.file_types().1
    }
}
