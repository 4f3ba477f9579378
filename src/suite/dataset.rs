//! Data sets and data-driven scenario expansion
//!
//! A scenario template bound to a data set is multiplied into one instance
//! per record, in the data set's declared order. Expansion is lazy: the
//! `Expansion` iterator builds each instance on demand and can be restarted.

use serde_json::Value;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::model::{DataBinding, Scenario};
use crate::common::{Error, Result};

/// Separator between a scenario title and its serialized record
pub const DISPLAY_SEPARATOR: &str = " | ";

/// Where a data set's records come from
#[derive(Debug, Clone)]
pub enum DataSource {
    /// Declared in the suite file
    Inline(Value),
    /// Loaded from a JSON or YAML file
    File(PathBuf),
}

/// Ordered collection of records
#[derive(Debug, Clone)]
pub struct DataSet {
    name: String,
    source: DataSource,
    records: Vec<Value>,
}

impl DataSet {
    /// Build a data set from an inline value
    ///
    /// Accepts a list (one record per element), a keyed mapping whose values
    /// are all mappings (one record per value, in key order), or any other
    /// mapping (a single record). Scalars are not enumerable.
    pub fn from_value(name: &str, value: Value) -> Result<Self> {
        let records = enumerate(name, &value)?;
        Ok(Self {
            name: name.to_string(),
            source: DataSource::Inline(value),
            records,
        })
    }

    /// Load a data set from a `.json` file, or YAML for any other extension
    pub fn from_file(name: &str, path: &Path) -> Result<Self> {
        let value = read_records(name, path)?;
        let records = enumerate(name, &value)?;
        Ok(Self {
            name: name.to_string(),
            source: DataSource::File(path.to_path_buf()),
            records,
        })
    }

    /// Re-read the data set from its source
    pub fn reload(&self) -> Result<Self> {
        match &self.source {
            DataSource::Inline(_) => Ok(self.clone()),
            DataSource::File(path) => Self::from_file(&self.name, path),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn records(&self) -> &[Value] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

fn read_records(name: &str, path: &Path) -> Result<Value> {
    let content = std::fs::read_to_string(path).map_err(|e| Error::FileRead {
        path: path.display().to_string(),
        error: e.to_string(),
    })?;
    let is_json = path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    if is_json {
        serde_json::from_str(&content).map_err(|e| Error::dataset(name, e))
    } else {
        serde_yaml::from_str(&content).map_err(|e| Error::dataset(name, e))
    }
}

fn enumerate(name: &str, value: &Value) -> Result<Vec<Value>> {
    match value {
        Value::Array(items) => Ok(items.clone()),
        Value::Object(map) if !map.is_empty() && map.values().all(Value::is_object) => {
            Ok(map.values().cloned().collect())
        }
        Value::Object(map) if map.is_empty() => Ok(Vec::new()),
        Value::Object(_) => Ok(vec![value.clone()]),
        other => Err(Error::dataset(
            name,
            format!("expected a list or mapping of records, got {}", kind_of(other)),
        )),
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "a mapping",
    }
}

/// Canonical serialization of a record
///
/// Strings render as their literal value; mappings and lists as compact JSON
/// with keys in declared order.
pub fn render_record(record: &Value) -> String {
    match record {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Expand a template into its concrete instances
///
/// Templates without a data set yield themselves once.
pub fn expand(template: &Scenario) -> Expansion<'_> {
    Expansion {
        template,
        position: 0,
        used: HashSet::new(),
    }
}

/// Lazy, finite, restartable sequence of scenario instances
#[derive(Debug, Clone)]
pub struct Expansion<'a> {
    template: &'a Scenario,
    position: usize,
    /// Display names handed out so far
    used: HashSet<String>,
}

impl Expansion<'_> {
    /// Rewind to the first instance
    pub fn restart(&mut self) {
        self.position = 0;
        self.used.clear();
    }

    fn total(&self) -> usize {
        match &self.template.data {
            DataBinding::Template(set) => set.len(),
            _ => 1,
        }
    }
}

impl Iterator for Expansion<'_> {
    type Item = Scenario;

    fn next(&mut self) -> Option<Scenario> {
        if self.position >= self.total() {
            return None;
        }
        let index = self.position;
        self.position += 1;

        let set = match &self.template.data {
            DataBinding::Template(set) => set,
            _ => return Some(self.template.clone()),
        };

        let record = set.records()[index].clone();
        let base = format!(
            "{}{}{}",
            self.template.title,
            DISPLAY_SEPARATOR,
            render_record(&record)
        );
        // Suffix until unused, including names that a record rendered itself
        let mut display_name = base.clone();
        let mut suffix = 1;
        while self.used.contains(&display_name) {
            suffix += 1;
            display_name = format!("{} #{}", base, suffix);
        }
        self.used.insert(display_name.clone());

        Some(Scenario {
            feature: self.template.feature.clone(),
            title: self.template.title.clone(),
            display_name,
            steps: self.template.steps.clone(),
            data: DataBinding::Bound {
                source: Arc::clone(set),
                index,
                record,
            },
            retry: self.template.retry,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.total().saturating_sub(self.position);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Expansion<'_> {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::suite::model::{RetryPolicy, RetryScope};
    use serde_json::json;

    fn template(data: DataBinding) -> Scenario {
        Scenario {
            feature: "DDT".to_string(),
            title: "Should log accounts1".to_string(),
            display_name: "Should log accounts1".to_string(),
            steps: Vec::new(),
            data,
            retry: RetryPolicy::once(RetryScope::Scenario),
        }
    }

    fn accounts() -> Arc<DataSet> {
        Arc::new(
            DataSet::from_value(
                "accounts",
                json!([
                    {"login": "davert", "password": "123456"},
                    {"login": "admin", "password": "666666"}
                ]),
            )
            .unwrap(),
        )
    }

    #[test]
    fn test_expansion_preserves_order_and_renders_records() {
        let t = template(DataBinding::Template(accounts()));
        let names: Vec<String> = expand(&t).map(|s| s.display_name).collect();

        assert_eq!(
            names,
            vec![
                r#"Should log accounts1 | {"login":"davert","password":"123456"}"#,
                r#"Should log accounts1 | {"login":"admin","password":"666666"}"#,
            ]
        );
        // The template is untouched
        assert!(t.is_template());
        assert_eq!(t.display_name, "Should log accounts1");
    }

    #[test]
    fn test_scalar_records_render_literally() {
        let set = DataSet::from_value("users", json!(["nick", "jack"])).unwrap();
        let t = template(DataBinding::Template(Arc::new(set)));
        let instances: Vec<Scenario> = expand(&t).collect();

        assert_eq!(instances[0].display_name, "Should log accounts1 | nick");
        assert_eq!(instances[1].record(), Some(&json!("jack")));
    }

    #[test]
    fn test_expansion_is_restartable() {
        let t = template(DataBinding::Template(accounts()));
        let mut expansion = expand(&t);
        assert_eq!(expansion.len(), 2);
        assert!(expansion.next().is_some());
        assert!(expansion.next().is_some());
        assert!(expansion.next().is_none());

        expansion.restart();
        assert_eq!(expansion.count(), 2);
    }

    #[test]
    fn test_plain_template_passes_through() {
        let t = template(DataBinding::None);
        let instances: Vec<Scenario> = expand(&t).collect();
        assert_eq!(instances.len(), 1);
        assert_eq!(instances[0].display_name, "Should log accounts1");
    }

    #[test]
    fn test_duplicate_records_get_distinct_names() {
        let set = DataSet::from_value("dupes", json!(["nick", "nick", "jack"])).unwrap();
        let t = template(DataBinding::Template(Arc::new(set)));
        let names: Vec<String> = expand(&t).map(|s| s.display_name).collect();

        assert_eq!(names[0], "Should log accounts1 | nick");
        assert_eq!(names[1], "Should log accounts1 | nick #2");
        assert_eq!(names[2], "Should log accounts1 | jack");
    }

    #[test]
    fn test_suffixed_names_never_collide_with_records() {
        let set = DataSet::from_value("dupes", json!(["nick", "nick", "nick #2"])).unwrap();
        let t = template(DataBinding::Template(Arc::new(set)));
        let names: Vec<String> = expand(&t).map(|s| s.display_name).collect();

        let distinct: HashSet<&String> = names.iter().collect();
        assert_eq!(distinct.len(), names.len(), "{:?}", names);
        assert_eq!(names[1], "Should log accounts1 | nick #2");
        assert_eq!(names[2], "Should log accounts1 | nick #2 #2");
    }

    #[test]
    fn test_restart_resets_suffixes() {
        let set = DataSet::from_value("dupes", json!(["nick", "nick"])).unwrap();
        let t = template(DataBinding::Template(Arc::new(set)));
        let mut expansion = expand(&t);
        let first: Vec<String> = expansion.by_ref().map(|s| s.display_name).collect();
        expansion.restart();
        let second: Vec<String> = expansion.map(|s| s.display_name).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_keyed_mapping_yields_values_in_order() {
        let set = DataSet::from_value(
            "keyed",
            json!({"first": {"login": "andrey"}, "second": {"login": "collaborator"}}),
        )
        .unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(set.records()[1], json!({"login": "collaborator"}));

        let single = DataSet::from_value("single", json!({"login": "davert"})).unwrap();
        assert_eq!(single.len(), 1);
    }

    #[test]
    fn test_scalar_data_set_is_rejected() {
        let err = DataSet::from_value("bad", json!(5)).unwrap_err();
        assert!(matches!(err, Error::DataSet { .. }));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_file_data_set_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("users.json");
        std::fs::write(&path, r#"["nick"]"#).unwrap();

        let set = DataSet::from_file("users", &path).unwrap();
        assert_eq!(set.records(), &[json!("nick")]);

        std::fs::write(&path, r#"["jack"]"#).unwrap();
        let fresh = set.reload().unwrap();
        assert_eq!(fresh.records(), &[json!("jack")]);
    }
}
