//! Serializer errors for tensor types.

use thiserror::Error;

/// Failures while building or encoding a tensor value.
#[derive(Error, Debug)]
pub enum SerializeError {
    /// Data length does not match the product of the shape.
    #[error("shape {shape:?} needs {expected} elements, got {actual}")]
    ShapeMismatch {
        shape: Vec<usize>,
        expected: usize,
        actual: usize,
    },

    /// A column's length differs from the first column's.
    #[error("column {column:?} has {actual} rows, expected {expected}")]
    RaggedColumns {
        column: String,
        expected: usize,
        actual: usize,
    },

    /// Two columns share a name.
    #[error("duplicate column {0:?}")]
    DuplicateColumn(String),

    /// The columnar encoding cannot represent this column.
    #[error("column {0:?} holds mixed values; columnar encoding needs a single type")]
    UnsupportedColumn(String),

    /// The named serializer was not compiled in.
    #[error("serializer `{0}` is not available in this build")]
    Unavailable(&'static str),

    /// The JSON fallback failed.
    #[error("json fallback: {0}")]
    Json(#[from] serde_json::Error),
}
