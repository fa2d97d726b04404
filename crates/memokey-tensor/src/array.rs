//! # Dense Arrays
//!
//! An n-dimensional, row-major array of `f64`, `i64` or `bool`.
//!
//! ## Binary Encoding
//!
//! ```text
//! b"MKND" | version u8 = 1 | dtype u8 | ndim u32 LE | dim u64 LE * ndim | data
//! ```
//!
//! Data is little-endian per element (`bool` as one byte). Floats are
//! written by bit pattern, so `NaN` payloads and `-0.0` are preserved
//! exactly.

use std::any::Any;

use memokey_core::OpaqueValue;
use serde::{Deserialize, Serialize};

use crate::error::SerializeError;

const MAGIC: &[u8; 4] = b"MKND";
const VERSION: u8 = 1;

/// Element storage, one variant per element type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "dtype", content = "data", rename_all = "lowercase")]
pub enum ArrayData {
    F64(Vec<f64>),
    I64(Vec<i64>),
    Bool(Vec<bool>),
}

impl ArrayData {
    /// Number of elements.
    pub fn len(&self) -> usize {
        match self {
            Self::F64(v) => v.len(),
            Self::I64(v) => v.len(),
            Self::Bool(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Element type name.
    pub fn dtype(&self) -> &'static str {
        match self {
            Self::F64(_) => "f64",
            Self::I64(_) => "i64",
            Self::Bool(_) => "bool",
        }
    }

    fn code(&self) -> u8 {
        match self {
            Self::F64(_) => 1,
            Self::I64(_) => 2,
            Self::Bool(_) => 3,
        }
    }
}

#[derive(Deserialize)]
struct RawArray {
    shape: Vec<usize>,
    #[serde(flatten)]
    data: ArrayData,
}

impl TryFrom<RawArray> for DenseArray {
    type Error = SerializeError;

    fn try_from(raw: RawArray) -> Result<Self, Self::Error> {
        DenseArray::new(raw.shape, raw.data)
    }
}

/// Row-major n-dimensional array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawArray")]
pub struct DenseArray {
    shape: Vec<usize>,
    #[serde(flatten)]
    data: ArrayData,
}

impl DenseArray {
    /// Build an array, checking that `data` fills `shape` exactly.
    pub fn new(shape: Vec<usize>, data: ArrayData) -> Result<Self, SerializeError> {
        let expected = shape.iter().product::<usize>();
        if expected != data.len() {
            return Err(SerializeError::ShapeMismatch {
                shape,
                expected,
                actual: data.len(),
            });
        }
        Ok(Self { shape, data })
    }

    /// One-dimensional `i64` array `0..n`.
    pub fn arange(n: i64) -> Self {
        let data: Vec<i64> = (0..n.max(0)).collect();
        Self {
            shape: vec![data.len()],
            data: ArrayData::I64(data),
        }
    }

    /// One-dimensional array over `values`.
    pub fn vector(values: ArrayData) -> Self {
        Self {
            shape: vec![values.len()],
            data: values,
        }
    }

    /// Array of the same data with a new shape.
    pub fn reshape(self, shape: Vec<usize>) -> Result<Self, SerializeError> {
        Self::new(shape, self.data)
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn data(&self) -> &ArrayData {
        &self.data
    }

    /// Dense binary encoding.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(10 + 8 * self.shape.len() + 8 * self.data.len());
        out.extend_from_slice(MAGIC);
        out.push(VERSION);
        out.push(self.data.code());
        // ndim is bounded by memory; u32 is ample.
        out.extend_from_slice(&(self.shape.len() as u32).to_le_bytes());
        for dim in &self.shape {
            out.extend_from_slice(&(*dim as u64).to_le_bytes());
        }
        match &self.data {
            ArrayData::F64(v) => v
                .iter()
                .for_each(|x| out.extend_from_slice(&x.to_bits().to_le_bytes())),
            ArrayData::I64(v) => v.iter().for_each(|x| out.extend_from_slice(&x.to_le_bytes())),
            ArrayData::Bool(v) => out.extend(v.iter().map(|b| u8::from(*b))),
        }
        out
    }
}

impl OpaqueValue for DenseArray {
    fn as_any(&self) -> &dyn Any {
        self
    }
}
