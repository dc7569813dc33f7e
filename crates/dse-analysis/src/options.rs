//! Options controlling how data points become workflows

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for [`crate::Problem::create_workflow`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowOptions {
    /// Directory added to the load path of every Ruby job
    pub ruby_include_dir: Option<PathBuf>,
    /// Ask the engine to put all job outputs in one directory (on by default)
    pub flat_output_directory: bool,
    /// Script file name to run inside catalog measure directories
    pub script_name: Option<String>,
}

impl Default for WorkflowOptions {
    fn default() -> Self {
        Self {
            ruby_include_dir: None,
            flat_output_directory: true,
            script_name: None,
        }
    }
}

impl WorkflowOptions {
    /// Create default options
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    #[must_use]
    pub fn with_ruby_include_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.ruby_include_dir = Some(dir.into());
        self
    }

    #[inline]
    #[must_use]
    pub fn with_flat_output_directory(mut self, flat: bool) -> Self {
        self.flat_output_directory = flat;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_script_name(mut self, script_name: impl Into<String>) -> Self {
        self.script_name = Some(script_name.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let options = WorkflowOptions::new()
            .with_ruby_include_dir("lib/ruby")
            .with_flat_output_directory(true);
        assert_eq!(options.ruby_include_dir, Some(PathBuf::from("lib/ruby")));
        assert!(options.flat_output_directory);
        assert!(options.script_name.is_none());
    }

    #[test]
    fn test_flat_output_is_the_default() {
        assert!(WorkflowOptions::default().flat_output_directory);
        assert!(!WorkflowOptions::new().with_flat_output_directory(false).flat_output_directory);
    }

    #[test]
    fn test_partial_config_deserializes() {
        let options: WorkflowOptions = serde_json::from_str(r#"{"script_name": "run.rb"}"#).unwrap();
        assert!(options.flat_output_directory);
        assert_eq!(options.script_name.as_deref(), Some("run.rb"));

        let nested: WorkflowOptions = serde_json::from_str(r#"{"flat_output_directory": false}"#).unwrap();
        assert!(!nested.flat_output_directory);
    }
}
