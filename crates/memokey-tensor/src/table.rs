//! # Columnar Tables
//!
//! A [`Table`] is an ordered list of named, equal-length columns. A table
//! built with [`Table::series`] holds exactly one column and is tagged as a
//! series in its digest.
//!
//! ## Encodings
//!
//! - **Columnar** (feature `columnar`): `f64`, `i64` and string columns in
//!   a compact binary layout. Non-finite floats are written as null slots,
//!   so `NaN`, `inf` and `-inf` are indistinguishable.
//! - **JSON fallback**: used when any column holds mixed values. Columns
//!   are written as a JSON array of `[name, cells]` pairs in column order;
//!   non-finite floats become `null`.

use std::any::Any;

use memokey_core::OpaqueValue;
use serde::Deserialize;

use crate::error::SerializeError;

/// Whether a table stands for a full frame or a single series.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableKind {
    Frame,
    Series,
}

impl TableKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Frame => "frame",
            Self::Series => "series",
        }
    }
}

/// One column's cells.
#[derive(Debug, Clone, PartialEq)]
pub enum Column {
    F64(Vec<f64>),
    I64(Vec<i64>),
    Str(Vec<String>),
    /// Heterogeneous cells; only the JSON fallback can encode these.
    Mixed(Vec<serde_json::Value>),
}

impl Column {
    pub fn len(&self) -> usize {
        match self {
            Self::F64(v) => v.len(),
            Self::I64(v) => v.len(),
            Self::Str(v) => v.len(),
            Self::Mixed(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Narrowest column type holding every cell: all integers give `I64`,
    /// numbers and nulls give `F64` (null as `NaN`), all strings give `Str`,
    /// anything else is `Mixed`.
    pub fn infer(cells: Vec<serde_json::Value>) -> Self {
        use serde_json::Value as Json;

        if cells.iter().all(|c| c.as_i64().is_some()) {
            return Self::I64(cells.iter().filter_map(Json::as_i64).collect());
        }
        if cells.iter().all(|c| c.is_number() || c.is_null()) {
            return Self::F64(
                cells
                    .iter()
                    .map(|c| c.as_f64().unwrap_or(f64::NAN))
                    .collect(),
            );
        }
        if cells.iter().all(Json::is_string) {
            return Self::Str(
                cells
                    .into_iter()
                    .filter_map(|c| match c {
                        Json::String(s) => Some(s),
                        _ => None,
                    })
                    .collect(),
            );
        }
        Self::Mixed(cells)
    }

    fn json_cells(&self) -> Vec<serde_json::Value> {
        use serde_json::Value as Json;

        match self {
            Self::F64(v) => v
                .iter()
                .map(|x| serde_json::Number::from_f64(*x).map_or(Json::Null, Json::Number))
                .collect(),
            Self::I64(v) => v.iter().map(|x| Json::from(*x)).collect(),
            Self::Str(v) => v.iter().map(|s| Json::String(s.clone())).collect(),
            Self::Mixed(v) => v.clone(),
        }
    }
}

#[derive(Deserialize)]
struct RawColumn {
    name: String,
    values: Vec<serde_json::Value>,
}

#[derive(Deserialize)]
struct RawTable {
    columns: Vec<RawColumn>,
    #[serde(default)]
    series: bool,
}

/// Named, equal-length columns in a fixed order.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    kind: TableKind,
    columns: Vec<(String, Column)>,
}

impl Table {
    /// A frame over `columns`. Names must be unique and lengths equal.
    pub fn new(columns: Vec<(String, Column)>) -> Result<Self, SerializeError> {
        if let Some((_, first)) = columns.first() {
            let expected = first.len();
            for (i, (name, column)) in columns.iter().enumerate() {
                if column.len() != expected {
                    return Err(SerializeError::RaggedColumns {
                        column: name.clone(),
                        expected,
                        actual: column.len(),
                    });
                }
                if columns[..i].iter().any(|(other, _)| other == name) {
                    return Err(SerializeError::DuplicateColumn(name.clone()));
                }
            }
        }
        Ok(Self {
            kind: TableKind::Frame,
            columns,
        })
    }

    /// A single-column series.
    pub fn series(name: impl Into<String>, column: Column) -> Self {
        Self {
            kind: TableKind::Series,
            columns: vec![(name.into(), column)],
        }
    }

    /// Parse `{"columns": [{"name": ..., "values": [...]}], "series": bool}`,
    /// inferring each column's type from its cells.
    pub fn from_json(json: serde_json::Value) -> Result<Self, SerializeError> {
        let raw: RawTable = serde_json::from_value(json)?;
        let columns: Vec<(String, Column)> = raw
            .columns
            .into_iter()
            .map(|c| (c.name, Column::infer(c.values)))
            .collect();
        if raw.series {
            match <[(String, Column); 1]>::try_from(columns) {
                Ok([(name, column)]) => Ok(Self::series(name, column)),
                Err(columns) => Err(SerializeError::RaggedColumns {
                    column: "series".to_string(),
                    expected: 1,
                    actual: columns.len(),
                }),
            }
        } else {
            Self::new(columns)
        }
    }

    pub fn kind(&self) -> TableKind {
        self.kind
    }

    pub fn columns(&self) -> &[(String, Column)] {
        &self.columns
    }

    /// Row count; zero for a table without columns.
    pub fn rows(&self) -> usize {
        self.columns.first().map_or(0, |(_, c)| c.len())
    }

    /// Columnar encoding, falling back to JSON for mixed columns.
    pub fn encode(&self) -> Result<Vec<u8>, SerializeError> {
        match self.encode_columnar() {
            Err(SerializeError::UnsupportedColumn(column)) => {
                tracing::debug!(column = %column, "mixed column; using json fallback");
                self.encode_json()
            }
            other => other,
        }
    }

    /// Binary columnar encoding:
    ///
    /// ```text
    /// b"MKTB" | version u8 = 1 | ncols u32 LE | column * ncols
    /// column := name_len u32 LE | name | dtype u8 | nrows u64 LE | cell * nrows
    /// ```
    ///
    /// `f64` cells are a presence byte followed, when present, by the LE
    /// bits; `i64` cells are LE; string cells are `len u32 LE | bytes`.
    #[cfg(feature = "columnar")]
    pub fn encode_columnar(&self) -> Result<Vec<u8>, SerializeError> {
        let mut out = Vec::new();
        out.extend_from_slice(b"MKTB");
        out.push(1);
        put_len(&mut out, self.columns.len());
        for (name, column) in &self.columns {
            put_len(&mut out, name.len());
            out.extend_from_slice(name.as_bytes());
            match column {
                Column::F64(v) => {
                    out.push(1);
                    out.extend_from_slice(&(v.len() as u64).to_le_bytes());
                    for x in v {
                        if x.is_finite() {
                            out.push(1);
                            out.extend_from_slice(&x.to_bits().to_le_bytes());
                        } else {
                            out.push(0);
                        }
                    }
                }
                Column::I64(v) => {
                    out.push(2);
                    out.extend_from_slice(&(v.len() as u64).to_le_bytes());
                    v.iter().for_each(|x| out.extend_from_slice(&x.to_le_bytes()));
                }
                Column::Str(v) => {
                    out.push(3);
                    out.extend_from_slice(&(v.len() as u64).to_le_bytes());
                    for s in v {
                        put_len(&mut out, s.len());
                        out.extend_from_slice(s.as_bytes());
                    }
                }
                Column::Mixed(_) => return Err(SerializeError::UnsupportedColumn(name.clone())),
            }
        }
        Ok(out)
    }

    #[cfg(not(feature = "columnar"))]
    pub fn encode_columnar(&self) -> Result<Vec<u8>, SerializeError> {
        Err(SerializeError::Unavailable("columnar"))
    }

    /// JSON array of `[name, cells]` pairs, in column order.
    pub fn encode_json(&self) -> Result<Vec<u8>, SerializeError> {
        let pairs: Vec<(&str, Vec<serde_json::Value>)> = self
            .columns
            .iter()
            .map(|(name, column)| (name.as_str(), column.json_cells()))
            .collect();
        Ok(serde_json::to_vec(&pairs)?)
    }
}

#[cfg(feature = "columnar")]
fn put_len(out: &mut Vec<u8>, len: usize) {
    // Column counts and string lengths stay far below 4 GiB.
    out.extend_from_slice(&(len as u32).to_le_bytes());
}

impl OpaqueValue for Table {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn frame() -> Table {
        Table::new(vec![
            ("0".to_string(), Column::I64(vec![1, 2])),
            ("a".to_string(), Column::Str(vec!["b".into(), "c".into()])),
            ("c".to_string(), Column::F64(vec![5.5, f64::NAN])),
        ])
        .unwrap()
    }

    #[test]
    fn new_rejects_ragged_columns() {
        let err = Table::new(vec![
            ("a".to_string(), Column::I64(vec![1, 2])),
            ("b".to_string(), Column::I64(vec![1])),
        ])
        .unwrap_err();
        assert!(matches!(err, SerializeError::RaggedColumns { .. }));
    }

    #[test]
    fn new_rejects_duplicate_names() {
        let err = Table::new(vec![
            ("a".to_string(), Column::I64(vec![1])),
            ("a".to_string(), Column::I64(vec![2])),
        ])
        .unwrap_err();
        assert!(matches!(err, SerializeError::DuplicateColumn(_)));
    }

    #[test]
    fn infer_picks_narrowest_type() {
        assert_eq!(Column::infer(vec![json!(1), json!(2)]), Column::I64(vec![1, 2]));
        assert_eq!(
            Column::infer(vec![json!("x"), json!("y")]),
            Column::Str(vec!["x".into(), "y".into()])
        );
        match Column::infer(vec![json!(1.5), json!(null)]) {
            Column::F64(v) => {
                assert_eq!(v[0], 1.5);
                assert!(v[1].is_nan());
            }
            other => panic!("expected f64 column, got {other:?}"),
        }
        assert!(matches!(
            Column::infer(vec![json!(1), json!("x")]),
            Column::Mixed(_)
        ));
    }

    #[test]
    fn from_json_builds_series() {
        let t = Table::from_json(json!({
            "columns": [{"name": "s", "values": [5.5, null]}],
            "series": true
        }))
        .unwrap();
        assert_eq!(t.kind(), TableKind::Series);
        assert_eq!(t.rows(), 2);

        let two = Table::from_json(json!({
            "columns": [{"name": "a", "values": [1]}, {"name": "b", "values": [2]}],
            "series": true
        }));
        assert!(two.is_err());
    }

    #[test]
    fn json_fallback_folds_non_finite_to_null() {
        let t = Table::series("s", Column::F64(vec![5.5, f64::NAN, f64::INFINITY]));
        let bytes = t.encode_json().unwrap();
        assert_eq!(std::str::from_utf8(&bytes).unwrap(), r#"[["s",[5.5,null,null]]]"#);
    }

    #[test]
    fn json_fallback_keeps_column_order() {
        let zb = Table::new(vec![
            ("z".to_string(), Column::Mixed(vec![json!(1), json!("x")])),
            ("b".to_string(), Column::I64(vec![2, 3])),
        ])
        .unwrap();
        let bz = Table::new(vec![
            ("b".to_string(), Column::I64(vec![2, 3])),
            ("z".to_string(), Column::Mixed(vec![json!(1), json!("x")])),
        ])
        .unwrap();
        assert_eq!(
            std::str::from_utf8(&zb.encode_json().unwrap()).unwrap(),
            r#"[["z",[1,"x"]],["b",[2,3]]]"#
        );
        assert_ne!(zb.encode_json().unwrap(), bz.encode_json().unwrap());
    }

    #[cfg(feature = "columnar")]
    #[test]
    fn columnar_folds_non_finite_floats() {
        let inf = Table::series("s", Column::F64(vec![5.5, f64::NAN, f64::INFINITY]));
        let neg = Table::series("s", Column::F64(vec![5.5, f64::NAN, f64::NEG_INFINITY]));
        let longer = Table::series(
            "s",
            Column::F64(vec![5.5, f64::NAN, f64::INFINITY, f64::NEG_INFINITY]),
        );
        assert_eq!(inf.encode().unwrap(), neg.encode().unwrap());
        assert_ne!(inf.encode().unwrap(), longer.encode().unwrap());
    }

    #[cfg(feature = "columnar")]
    #[test]
    fn mixed_columns_use_json_fallback() {
        let t = Table::new(vec![(
            "m".to_string(),
            Column::Mixed(vec![json!(1), json!("x")]),
        )])
        .unwrap();
        assert_eq!(t.encode().unwrap(), br#"[["m",[1,"x"]]]"#.to_vec());
        assert!(frame().encode().unwrap().starts_with(b"MKTB"));
    }

    #[cfg(not(feature = "columnar"))]
    #[test]
    fn columnar_is_unavailable_without_feature() {
        assert!(matches!(
            frame().encode(),
            Err(SerializeError::Unavailable("columnar"))
        ));
    }
}
