//! Data points: one value per problem variable, plus what running it produced

use crate::file_reference::FileReference;
use crate::object::{analysis_object_handle, AnalysisObject, ChangeType, ObjectBase, ParentLink};
use crate::problem::Problem;
use crate::value::VariableValue;
use dse_runmanager::{FileType, Job};
use once_cell::sync::OnceCell;
use parking_lot::RwLock;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use uuid::Uuid;

pub(crate) struct DataPointData {
    pub(crate) base: ObjectBase,
    pub(crate) problem: Problem,
    pub(crate) values: Vec<VariableValue>,
    pub(crate) selected: bool,
    pub(crate) complete: bool,
    pub(crate) failed: bool,
    pub(crate) directory: Option<PathBuf>,
    pub(crate) top_level_job: Option<Job>,
    pub(crate) osm_input_data: Option<FileReference>,
    pub(crate) idf_input_data: Option<FileReference>,
    pub(crate) sql_output_data: Option<FileReference>,
    pub(crate) xml_output_data: Vec<FileReference>,
    pub(crate) response_values: Vec<f64>,
    pub(crate) tags: BTreeSet<String>,
    pub(crate) output_attributes: OnceCell<BTreeMap<String, f64>>,
}

/// One concrete assignment of values to a problem's variables
#[derive(Clone)]
pub struct DataPoint {
    pub(crate) inner: Arc<RwLock<DataPointData>>,
}

analysis_object_handle!(DataPoint);

impl DataPoint {
    /// A fresh, unrun point. Validity against the problem is not checked here;
    /// see [`Problem::is_valid`].
    #[must_use]
    pub fn new(problem: &Problem, values: Vec<VariableValue>) -> Self {
        Self::from_data(DataPointData {
            base: ObjectBase::new(String::new()),
            problem: problem.clone(),
            values,
            selected: true,
            complete: false,
            failed: false,
            directory: None,
            top_level_job: None,
            osm_input_data: None,
            idf_input_data: None,
            sql_output_data: None,
            xml_output_data: Vec::new(),
            response_values: Vec::new(),
            tags: BTreeSet::new(),
            output_attributes: OnceCell::new(),
        })
    }

    pub(crate) fn from_data(data: DataPointData) -> Self {
        Self {
            inner: Arc::new(RwLock::new(data)),
        }
    }

    pub(crate) fn set_parent(&self, parent: Option<ParentLink>) {
        self.inner.write().base.parent = parent;
    }

    #[must_use]
    pub fn problem(&self) -> Problem {
        self.inner.read().problem.clone()
    }

    #[must_use]
    pub fn problem_uuid(&self) -> Uuid {
        self.problem().uuid()
    }

    #[must_use]
    pub fn values(&self) -> Vec<VariableValue> {
        self.inner.read().values.clone()
    }

    /// Null entries match anything, integers match exactly, doubles approximately
    #[must_use]
    pub fn matches(&self, values: &[VariableValue]) -> bool {
        let guard = self.inner.read();
        guard.values.len() == values.len() && guard.values.iter().zip(values).all(|(a, b)| a.matches(b))
    }

    #[must_use]
    pub fn is_selected(&self) -> bool {
        self.inner.read().selected
    }

    pub fn set_selected(&self, selected: bool) {
        self.inner.write().selected = selected;
        self.on_change(ChangeType::Benign);
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.inner.read().complete
    }

    #[must_use]
    pub fn is_failed(&self) -> bool {
        self.inner.read().failed
    }

    pub fn mark_complete(&self) {
        self.inner.write().complete = true;
        self.on_change(ChangeType::Benign);
    }

    /// A failed point is also complete: nothing more will run for it
    pub fn mark_failed(&self) {
        {
            let mut guard = self.inner.write();
            guard.complete = true;
            guard.failed = true;
        }
        self.on_change(ChangeType::Benign);
    }

    #[must_use]
    pub fn directory(&self) -> Option<PathBuf> {
        self.inner.read().directory.clone()
    }

    pub fn set_directory(&self, directory: impl Into<PathBuf>) {
        self.inner.write().directory = Some(directory.into());
        self.on_change(ChangeType::Benign);
    }

    #[must_use]
    pub fn top_level_job(&self) -> Option<Job> {
        self.inner.read().top_level_job.clone()
    }

    pub fn set_top_level_job(&self, job: Job) {
        self.inner.write().top_level_job = Some(job);
        self.on_change(ChangeType::Benign);
    }

    #[must_use]
    pub fn osm_input_data(&self) -> Option<FileReference> {
        self.inner.read().osm_input_data.clone()
    }

    #[must_use]
    pub fn idf_input_data(&self) -> Option<FileReference> {
        self.inner.read().idf_input_data.clone()
    }

    #[must_use]
    pub fn sql_output_data(&self) -> Option<FileReference> {
        self.inner.read().sql_output_data.clone()
    }

    #[must_use]
    pub fn xml_output_data(&self) -> Vec<FileReference> {
        self.inner.read().xml_output_data.clone()
    }

    pub fn set_osm_input_data(&self, file: FileReference) -> bool {
        self.set_file(file, FileType::Osm, |d, f| d.osm_input_data = Some(f))
    }

    pub fn set_idf_input_data(&self, file: FileReference) -> bool {
        self.set_file(file, FileType::Idf, |d, f| d.idf_input_data = Some(f))
    }

    pub fn set_sql_output_data(&self, file: FileReference) -> bool {
        self.set_file(file, FileType::Sql, |d, f| d.sql_output_data = Some(f))
    }

    fn set_file(
        &self,
        file: FileReference,
        expected: FileType,
        store: impl FnOnce(&mut DataPointData, FileReference),
    ) -> bool {
        if file.file_type() != expected {
            tracing::warn!(
                "Expected a {} file, got {} ({})",
                expected,
                file.file_type(),
                file.path().display()
            );
            return false;
        }
        store(&mut self.inner.write(), file);
        self.on_change(ChangeType::Benign);
        true
    }

    /// Report and attribute documents. Replacing them drops cached attributes.
    pub fn set_xml_output_data(&self, files: Vec<FileReference>) {
        {
            let mut guard = self.inner.write();
            guard.xml_output_data = files;
            guard.output_attributes = OnceCell::new();
        }
        self.on_change(ChangeType::Benign);
    }

    /// Numeric attributes read from the attached JSON attribute documents.
    ///
    /// Loaded once and cached. Nested objects flatten to dotted names, booleans
    /// read as 0/1, anything else is ignored. Unreadable documents are logged
    /// and skipped.
    #[must_use]
    pub fn output_attributes(&self) -> BTreeMap<String, f64> {
        let guard = self.inner.read();
        guard
            .output_attributes
            .get_or_init(|| load_attributes(&guard.xml_output_data))
            .clone()
    }

    #[must_use]
    pub fn output_attribute(&self, name: &str) -> Option<f64> {
        let guard = self.inner.read();
        guard
            .output_attributes
            .get_or_init(|| load_attributes(&guard.xml_output_data))
            .get(name)
            .copied()
    }

    #[must_use]
    pub fn response_values(&self) -> Vec<f64> {
        self.inner.read().response_values.clone()
    }

    pub fn set_response_values(&self, values: Vec<f64>) {
        self.inner.write().response_values = values;
        self.on_change(ChangeType::Benign);
    }

    #[must_use]
    pub fn tags(&self) -> BTreeSet<String> {
        self.inner.read().tags.clone()
    }

    #[must_use]
    pub fn is_tagged(&self, tag: &str) -> bool {
        self.inner.read().tags.contains(tag)
    }

    pub fn add_tag(&self, tag: impl Into<String>) {
        self.inner.write().tags.insert(tag.into());
        self.on_change(ChangeType::Benign);
    }

    pub fn delete_tag(&self, tag: &str) -> bool {
        let removed = self.inner.write().tags.remove(tag);
        if removed {
            self.on_change(ChangeType::Benign);
        }
        removed
    }

    /// Forget everything a run produced; the values stay
    pub fn clear_results(&self) {
        {
            let mut guard = self.inner.write();
            guard.complete = false;
            guard.failed = false;
            guard.directory = None;
            guard.top_level_job = None;
            guard.osm_input_data = None;
            guard.idf_input_data = None;
            guard.sql_output_data = None;
            guard.xml_output_data.clear();
            guard.response_values.clear();
            guard.output_attributes = OnceCell::new();
        }
        self.on_change(ChangeType::Benign);
    }
}

fn load_attributes(files: &[FileReference]) -> BTreeMap<String, f64> {
    let mut attributes = BTreeMap::new();
    for file in files.iter().filter(|f| f.file_type() == FileType::Json) {
        match read_document(file.path()) {
            Ok(value) => flatten_into("", &value, &mut attributes),
            Err(e) => tracing::warn!("Skipping attribute document {}: {}", file.path().display(), e),
        }
    }
    attributes
}

fn read_document(path: &Path) -> Result<serde_json::Value, Box<dyn std::error::Error>> {
    let text = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

fn flatten_into(prefix: &str, value: &serde_json::Value, out: &mut BTreeMap<String, f64>) {
    let key = |name: &str| {
        if prefix.is_empty() {
            name.to_string()
        } else {
            format!("{prefix}.{name}")
        }
    };
    match value {
        serde_json::Value::Object(map) => {
            for (name, child) in map {
                flatten_into(&key(name), child, out);
            }
        }
        serde_json::Value::Number(n) => {
            if let Some(v) = n.as_f64() {
                out.insert(prefix.to_string(), v);
            }
        }
        serde_json::Value::Bool(b) => {
            out.insert(prefix.to_string(), if *b { 1.0 } else { 0.0 });
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn test_matches_with_nulls() {
        let problem = Problem::new("p");
        let dp = DataPoint::new(
            &problem,
            vec![VariableValue::Integer(1), VariableValue::Double(0.3)],
        );
        assert!(dp.matches(&[VariableValue::Integer(1), VariableValue::Double(0.3 + 1e-12)]));
        assert!(dp.matches(&[
            VariableValue::Null(crate::value::ValueType::Integer),
            VariableValue::Double(0.3)
        ]));
        assert!(!dp.matches(&[VariableValue::Integer(2), VariableValue::Double(0.3)]));
        assert!(!dp.matches(&[VariableValue::Integer(1)]));
    }

    #[test]
    fn test_attributes_are_flattened_and_cached() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        let mut file = std::fs::File::create(&path).unwrap();
        write!(file, r#"{{"site_eui": 212.5, "costs": {{"total": 1000, "label": "usd"}}, "passed": true}}"#).unwrap();

        let dp = DataPoint::new(&Problem::new("p"), Vec::new());
        dp.set_xml_output_data(vec![
            FileReference::new(path.clone()).unwrap(),
            FileReference::with_type(dir.path().join("missing.json"), FileType::Json),
        ]);

        let attributes = dp.output_attributes();
        assert_eq!(attributes.get("site_eui"), Some(&212.5));
        assert_eq!(attributes.get("costs.total"), Some(&1000.0));
        assert_eq!(attributes.get("passed"), Some(&1.0));
        assert!(!attributes.contains_key("costs.label"));

        std::fs::remove_file(&path).unwrap();
        assert_eq!(dp.output_attribute("site_eui"), Some(212.5));
    }

    #[test]
    fn test_failed_implies_complete_and_clear_results_resets() {
        let dp = DataPoint::new(&Problem::new("p"), Vec::new());
        dp.mark_failed();
        assert!(dp.is_complete());
        assert!(dp.is_failed());
        dp.set_response_values(vec![1.0]);
        dp.clear_results();
        assert!(!dp.is_complete());
        assert!(!dp.is_failed());
        assert!(dp.response_values().is_empty());
    }

    #[test]
    fn test_file_slots_check_type() {
        let dp = DataPoint::new(&Problem::new("p"), Vec::new());
        assert!(!dp.set_osm_input_data(FileReference::with_type("in.idf", FileType::Idf)));
        assert!(dp.set_idf_input_data(FileReference::with_type("in.idf", FileType::Idf)));
        assert_eq!(dp.idf_input_data().unwrap().path(), Path::new("in.idf"));
    }
}
