//! Built-in handlers for the structural probe and the Unknown fallback.

use memokey_core::{MemokeyError, OpaqueRef, OpaqueValue};

use crate::canonical::{CanonicalForm, FreezeScope, FrozenBlob, SeqTag};
use crate::dispatcher::TypeHandler;
use crate::engine::DigestScope;

// A probe hit guarantees the accessor returns Some; these guard against an
// implementor whose accessors disagree between calls.
fn lost_capability(value: &dyn OpaqueValue) -> MemokeyError {
    MemokeyError::UnhashableType {
        type_name: value.type_name().to_string(),
        reason: "structural view disappeared after probing".to_string(),
    }
}

fn lost_capability_freeze(value: &dyn OpaqueValue) -> MemokeyError {
    MemokeyError::UnfreezableType {
        type_name: value.type_name().to_string(),
    }
}

/// Hashes and freezes mapping-like opaques like [`Value::Map`](memokey_core::Value::Map).
pub(crate) struct MappingLikeHandler;

impl TypeHandler for MappingLikeHandler {
    fn name(&self) -> &str {
        "mapping-like"
    }

    fn to_canonical(
        &self,
        value: &OpaqueRef,
        scope: &FreezeScope<'_>,
    ) -> Result<CanonicalForm, MemokeyError> {
        let pairs = value
            .as_mapping()
            .ok_or_else(|| lost_capability_freeze(value.as_ref()))?;
        scope.freeze_mapping(&pairs)
    }

    fn contribute_digest(
        &self,
        value: &dyn OpaqueValue,
        scope: &mut DigestScope<'_>,
    ) -> Result<(), MemokeyError> {
        let pairs = value.as_mapping().ok_or_else(|| lost_capability(value))?;
        scope.mapping(&pairs)
    }
}

/// Hashes and freezes set-like opaques like [`Value::Set`](memokey_core::Value::Set).
pub(crate) struct SetLikeHandler;

impl TypeHandler for SetLikeHandler {
    fn name(&self) -> &str {
        "set-like"
    }

    fn to_canonical(
        &self,
        value: &OpaqueRef,
        scope: &FreezeScope<'_>,
    ) -> Result<CanonicalForm, MemokeyError> {
        let items = value
            .as_set()
            .ok_or_else(|| lost_capability_freeze(value.as_ref()))?;
        scope.freeze_set(&items)
    }

    fn contribute_digest(
        &self,
        value: &dyn OpaqueValue,
        scope: &mut DigestScope<'_>,
    ) -> Result<(), MemokeyError> {
        let items = value.as_set().ok_or_else(|| lost_capability(value))?;
        scope.set(&items)
    }
}

/// Hashes and freezes sequence-like opaques like [`Value::List`](memokey_core::Value::List).
pub(crate) struct SequenceLikeHandler;

impl TypeHandler for SequenceLikeHandler {
    fn name(&self) -> &str {
        "sequence-like"
    }

    fn to_canonical(
        &self,
        value: &OpaqueRef,
        scope: &FreezeScope<'_>,
    ) -> Result<CanonicalForm, MemokeyError> {
        let items = value
            .as_sequence()
            .ok_or_else(|| lost_capability_freeze(value.as_ref()))?;
        scope.freeze_sequence(SeqTag::List, &items)
    }

    fn contribute_digest(
        &self,
        value: &dyn OpaqueValue,
        scope: &mut DigestScope<'_>,
    ) -> Result<(), MemokeyError> {
        let items = value.as_sequence().ok_or_else(|| lost_capability(value))?;
        scope.sequence(&items)
    }
}

/// Hashes blob-like opaques as raw bytes and freezes them to a blob.
pub(crate) struct BlobLikeHandler;

impl TypeHandler for BlobLikeHandler {
    fn name(&self) -> &str {
        "blob-like"
    }

    fn to_canonical(
        &self,
        value: &OpaqueRef,
        _scope: &FreezeScope<'_>,
    ) -> Result<CanonicalForm, MemokeyError> {
        let bytes = value
            .as_blob()
            .ok_or_else(|| lost_capability_freeze(value.as_ref()))?;
        Ok(CanonicalForm::Blob(FrozenBlob::new(&bytes)))
    }

    fn contribute_digest(
        &self,
        value: &dyn OpaqueValue,
        scope: &mut DigestScope<'_>,
    ) -> Result<(), MemokeyError> {
        let bytes = value.as_blob().ok_or_else(|| lost_capability(value))?;
        scope.update(&bytes);
        Ok(())
    }
}

/// Best-effort fallback: type name plus default text rendering.
///
/// Distinct values that render identically share a digest on this path.
/// Such values cannot be frozen.
pub(crate) struct UnknownHandler;

impl TypeHandler for UnknownHandler {
    fn name(&self) -> &str {
        "unknown"
    }

    fn to_canonical(
        &self,
        value: &OpaqueRef,
        _scope: &FreezeScope<'_>,
    ) -> Result<CanonicalForm, MemokeyError> {
        Err(MemokeyError::UnfreezableType {
            type_name: value.type_name().to_string(),
        })
    }

    fn contribute_digest(
        &self,
        value: &dyn OpaqueValue,
        scope: &mut DigestScope<'_>,
    ) -> Result<(), MemokeyError> {
        let text = format!("{}({})", value.type_name(), value.render());
        scope.update(text.as_bytes());
        Ok(())
    }
}

