//! # Type Names
//!
//! Stable names for the built-in value kinds and the reflection helper used
//! for opaque types. These names seed every accumulator as the type tag, so
//! changing one changes every digest of that kind.

use std::any::TypeId;

/// Type name of [`Value::Null`](crate::Value::Null).
pub const NULL: &str = "null";
/// Type name of [`Value::Bool`](crate::Value::Bool).
pub const BOOL: &str = "bool";
/// Type name of [`Value::Int`](crate::Value::Int).
pub const INT: &str = "int";
/// Type name of [`Value::Float`](crate::Value::Float).
pub const FLOAT: &str = "float";
/// Type name of [`Value::Str`](crate::Value::Str).
pub const STR: &str = "str";
/// Type name of [`Value::Bytes`](crate::Value::Bytes).
pub const BYTES: &str = "bytes";
/// Type name of [`Value::List`](crate::Value::List).
pub const LIST: &str = "list";
/// Type name of [`Value::Tuple`](crate::Value::Tuple).
pub const TUPLE: &str = "tuple";
/// Type name of [`Value::Map`](crate::Value::Map).
pub const MAP: &str = "map";
/// Type name of [`Value::Set`](crate::Value::Set).
pub const SET: &str = "set";

/// Fully-qualified name of `T`, e.g. `memokey_tensor::array::DenseArray`.
///
/// Backed by [`std::any::type_name`]; the exact text is stable within a
/// build, which is all the name-keyed registry needs.
pub fn full_type_name<T: ?Sized>() -> &'static str {
    std::any::type_name::<T>()
}

/// Type tag bytes that seed an accumulator: the name followed by NUL.
///
/// The terminator keeps a tag from running into the payload, so `"int"`
/// plus `"5..."` never matches `"int5"` plus `"..."`.
pub fn type_tag(type_name: &str) -> Vec<u8> {
    let mut tag = Vec::with_capacity(type_name.len() + 1);
    tag.extend_from_slice(type_name.as_bytes());
    tag.push(0);
    tag
}

/// Registry key: a concrete runtime type or its fully-qualified name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeKey {
    /// Exact runtime type.
    Type {
        /// The runtime type id.
        id: TypeId,
        /// Its fully-qualified name, kept for listing and logging.
        name: &'static str,
    },
    /// Fully-qualified type name; may name a type not yet seen.
    Name(String),
}

impl TypeKey {
    /// Key for the concrete type `T`.
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self::Type {
            id: TypeId::of::<T>(),
            name: full_type_name::<T>(),
        }
    }

    /// Key for a fully-qualified type name.
    pub fn name(name: impl Into<String>) -> Self {
        Self::Name(name.into())
    }

    /// The type name this key refers to.
    pub fn type_name(&self) -> &str {
        match self {
            Self::Type { name, .. } => name,
            Self::Name(name) => name,
        }
    }
}

impl From<&str> for TypeKey {
    fn from(name: &str) -> Self {
        Self::Name(name.to_string())
    }
}

impl From<String> for TypeKey {
    fn from(name: String) -> Self {
        Self::Name(name)
    }
}
