//! Dispatcher handlers for [`DenseArray`] and [`Table`].
//!
//! Both freeze by reference (the default [`TypeHandler::to_canonical`]).

use memokey_core::{MemokeyError, OpaqueValue};
use memokey_engine::{DigestScope, TypeHandler};

use crate::array::DenseArray;
use crate::error::SerializeError;
use crate::table::Table;

fn downcast<'a, T: 'static>(value: &'a dyn OpaqueValue) -> Result<&'a T, MemokeyError> {
    value
        .as_any()
        .downcast_ref::<T>()
        .ok_or_else(|| MemokeyError::UnhashableType {
            type_name: value.type_name().to_string(),
            reason: format!("handler expects {}", std::any::type_name::<T>()),
        })
}

/// Hashes the dense binary encoding.
pub struct DenseArrayHandler;

impl TypeHandler for DenseArrayHandler {
    fn name(&self) -> &str {
        "dense-array"
    }

    fn contribute_digest(
        &self,
        value: &dyn OpaqueValue,
        scope: &mut DigestScope<'_>,
    ) -> Result<(), MemokeyError> {
        let array = downcast::<DenseArray>(value)?;
        scope.update(&array.encode());
        Ok(())
    }
}

/// Hashes the table kind followed by its columnar (or JSON) encoding.
pub struct TableHandler;

impl TypeHandler for TableHandler {
    fn name(&self) -> &str {
        "table"
    }

    fn contribute_digest(
        &self,
        value: &dyn OpaqueValue,
        scope: &mut DigestScope<'_>,
    ) -> Result<(), MemokeyError> {
        let table = downcast::<Table>(value)?;
        let encoded = table.encode().map_err(|e| match e {
            SerializeError::Unavailable(extension) => MemokeyError::ExtensionUnavailable {
                type_name: value.type_name().to_string(),
                extension: extension.to_string(),
            },
            other => MemokeyError::UnhashableType {
                type_name: value.type_name().to_string(),
                reason: other.to_string(),
            },
        })?;
        scope.update(table.kind().as_str().as_bytes());
        scope.update(&encoded);
        Ok(())
    }
}
