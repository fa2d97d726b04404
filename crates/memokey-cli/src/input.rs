//! # Input Decoding
//!
//! Reads a JSON or YAML document into a [`Value`].
//!
//! - Arrays become lists, or sets with `--arrays-as-sets`.
//! - YAML mappings may have non-string keys (`{2: 4}`); JSON keys are
//!   always strings.
//! - A single-entry object `{"$ndarray": {...}}` becomes a
//!   [`DenseArray`](memokey_tensor::DenseArray) and `{"$table": {...}}` a
//!   [`Table`](memokey_tensor::Table).

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use memokey_core::{Mapping, Value};
use memokey_tensor::{DenseArray, Table};

/// Document syntax.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum InputFormat {
    Json,
    Yaml,
}

impl InputFormat {
    /// Guess from the file extension; anything but `.yaml`/`.yml` is JSON.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml") => {
                Self::Yaml
            }
            _ => Self::Json,
        }
    }
}

/// Input options shared by every document subcommand.
#[derive(Args, Debug, Clone)]
pub struct InputArgs {
    /// Path to a JSON or YAML document.
    pub file: PathBuf,

    /// Input syntax. Defaults to the file extension.
    #[arg(long, value_enum)]
    pub format: Option<InputFormat>,

    /// Read every array as an unordered set.
    #[arg(long)]
    pub arrays_as_sets: bool,
}

impl InputArgs {
    /// Read and decode the document.
    pub fn load(&self) -> Result<Value> {
        let format = self.format.unwrap_or_else(|| InputFormat::from_path(&self.file));
        let raw = std::fs::read_to_string(&self.file)
            .with_context(|| format!("failed to read {}", self.file.display()))?;
        let decoder = Decoder {
            arrays_as_sets: self.arrays_as_sets,
        };
        let value = match format {
            InputFormat::Json => {
                let doc: serde_json::Value = serde_json::from_str(&raw)
                    .with_context(|| format!("invalid JSON in {}", self.file.display()))?;
                decoder.json(doc)?
            }
            InputFormat::Yaml => {
                let doc: serde_yaml::Value = serde_yaml::from_str(&raw)
                    .with_context(|| format!("invalid YAML in {}", self.file.display()))?;
                decoder.yaml(doc)?
            }
        };
        tracing::debug!(file = %self.file.display(), ?format, kind = ?value.kind(), "decoded input");
        Ok(value)
    }
}

/// Converts parsed documents into [`Value`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct Decoder {
    pub arrays_as_sets: bool,
}

impl Decoder {
    fn array(&self, items: Vec<Value>) -> Value {
        if self.arrays_as_sets {
            Value::Set(items.into_iter().collect())
        } else {
            Value::List(items)
        }
    }

    /// Decode a JSON document.
    pub fn json(&self, doc: serde_json::Value) -> Result<Value> {
        use serde_json::Value as Json;

        Ok(match doc {
            Json::Array(items) => self.array(
                items
                    .into_iter()
                    .map(|item| self.json(item))
                    .collect::<Result<_>>()?,
            ),
            Json::Object(mut map) => {
                if map.len() == 1 {
                    if let Some(doc) = map.remove("$ndarray") {
                        return tensor_array(doc);
                    }
                    if let Some(doc) = map.remove("$table") {
                        return tensor_table(doc);
                    }
                }
                let mut mapping = Mapping::new();
                for (k, v) in map {
                    mapping.insert(Value::Str(k), self.json(v)?);
                }
                Value::Map(mapping)
            }
            scalar => Value::from(scalar),
        })
    }

    /// Decode a YAML document.
    pub fn yaml(&self, doc: serde_yaml::Value) -> Result<Value> {
        use serde_yaml::Value as Yaml;

        Ok(match doc {
            Yaml::Null => Value::Null,
            Yaml::Bool(b) => Value::Bool(b),
            Yaml::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::from(i)
                } else if let Some(u) = n.as_u64() {
                    Value::from(u)
                } else {
                    Value::Float(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            Yaml::String(s) => Value::Str(s),
            Yaml::Sequence(items) => self.array(
                items
                    .into_iter()
                    .map(|item| self.yaml(item))
                    .collect::<Result<_>>()?,
            ),
            Yaml::Mapping(map) => {
                if map.len() == 1 {
                    if let Some(doc) = map.get("$ndarray") {
                        return tensor_array(serde_json::to_value(doc)?);
                    }
                    if let Some(doc) = map.get("$table") {
                        return tensor_table(serde_json::to_value(doc)?);
                    }
                }
                let mut mapping = Mapping::new();
                for (k, v) in map {
                    mapping.insert(self.yaml(k)?, self.yaml(v)?);
                }
                Value::Map(mapping)
            }
            Yaml::Tagged(tagged) => self.yaml(tagged.value)?,
        })
    }
}

fn tensor_array(doc: serde_json::Value) -> Result<Value> {
    let array: DenseArray = serde_json::from_value(doc).context("invalid $ndarray")?;
    Ok(Value::opaque(array))
}

fn tensor_table(doc: serde_json::Value) -> Result<Value> {
    let table = Table::from_json(doc).context("invalid $table")?;
    Ok(Value::opaque(table))
}

#[cfg(test)]
mod tests {
    use super::*;
    use memokey_core::ValueKind;
    use serde_json::json;

    #[test]
    fn format_from_extension() {
        assert_eq!(InputFormat::from_path(Path::new("a.yaml")), InputFormat::Yaml);
        assert_eq!(InputFormat::from_path(Path::new("a.YML")), InputFormat::Yaml);
        assert_eq!(InputFormat::from_path(Path::new("a.json")), InputFormat::Json);
        assert_eq!(InputFormat::from_path(Path::new("noext")), InputFormat::Json);
    }

    #[test]
    fn json_arrays_become_lists_or_sets() {
        let doc = json!([1, 2, 2]);
        let list = Decoder::default().json(doc.clone()).unwrap();
        assert_eq!(list, Value::list([1, 2, 2]));

        let set = Decoder { arrays_as_sets: true }.json(doc).unwrap();
        assert_eq!(set, Value::set([1, 2]));
    }

    #[test]
    fn yaml_keeps_integer_keys() {
        let doc: serde_yaml::Value = serde_yaml::from_str("2: 4\n'2': 5\n").unwrap();
        let v = Decoder::default().yaml(doc).unwrap();
        match v {
            Value::Map(m) => {
                assert_eq!(m.get(&Value::Int(2)), Some(&Value::Int(4)));
                assert_eq!(m.get(&Value::from("2")), Some(&Value::Int(5)));
            }
            other => panic!("expected mapping, got {other:?}"),
        }
    }

    #[test]
    fn ndarray_objects_become_opaque() {
        let doc = json!({"w": {"$ndarray": {"shape": [3], "dtype": "i64", "data": [0, 1, 2]}}});
        let v = Decoder::default().json(doc).unwrap();
        match v {
            Value::Map(m) => {
                let w = m.get(&Value::from("w")).unwrap();
                assert_eq!(w.kind(), ValueKind::Opaque);
                assert!(w.type_name().ends_with("DenseArray"));
            }
            other => panic!("expected mapping, got {other:?}"),
        }
    }

    #[test]
    fn table_objects_become_opaque() {
        let doc: serde_yaml::Value = serde_yaml::from_str(
            "$table:\n  series: true\n  columns:\n    - name: s\n      values: [1.5, 2.5]\n",
        )
        .unwrap();
        let v = Decoder::default().yaml(doc).unwrap();
        assert!(v.type_name().ends_with("Table"));
    }

    #[test]
    fn malformed_tensor_is_an_error() {
        let doc = json!({"$ndarray": {"shape": [2], "dtype": "i64", "data": [1]}});
        assert!(Decoder::default().json(doc).is_err());
    }

    #[test]
    fn objects_with_extra_keys_stay_mappings() {
        let doc = json!({"$ndarray": 1, "other": 2});
        let v = Decoder::default().json(doc).unwrap();
        assert_eq!(v.kind(), ValueKind::Mapping);
    }
}
