#![deny(missing_docs)]
//! # memokey-engine: Content Fingerprints for Nested Values
//!
//! Turns any [`Value`] into a deterministic 32-byte [`Digest`] suitable as
//! a cache key, and into an immutable [`CanonicalForm`] for storage or
//! comparison.
//!
//! ## Architecture
//!
//! - [`dispatcher`]: the opaque-type registry. Exact type, then name, then
//!   structural probe, then the Unknown fallback.
//! - [`engine`]: recursive structural hashing with type tags and
//!   order-insensitive sets and mappings.
//! - [`canonical`]: freezing into shareable canonical forms.
//!
//! ## Guarantees
//!
//! Equal values produce equal digests across runs and processes. Values of
//! different runtime types never share a digest by construction, except on
//! the Unknown fallback path, where identical text renderings collide.
//!
//! ## Crate Policy
//!
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.
//! - Hashing is synchronous; concurrent calls share only the dispatcher's
//!   read lock.

pub mod canonical;
pub mod dispatcher;
pub mod engine;
mod handlers;

pub use canonical::{CanonicalForm, Canonicalizer, FreezeScope, FrozenBlob, SeqTag};
pub use dispatcher::{Capability, Route, TypeDispatcher, TypeHandler};
pub use engine::{DigestEngine, DigestScope};

pub use memokey_core::{
    full_type_name, Digest, HashAccumulator, HashAlgorithm, Mapping, MemokeyConfig, MemokeyError,
    OpaqueRef, OpaqueValue, TypeKey, Value, ValueKind, ValueSet,
};

/// Digest of `value` using the process-wide default dispatcher.
pub fn digest(value: &Value) -> Result<Digest, MemokeyError> {
    digest_with(value, TypeDispatcher::global())
}

/// Digest of `value` using an explicit dispatcher and its configuration.
pub fn digest_with(value: &Value, dispatcher: &TypeDispatcher) -> Result<Digest, MemokeyError> {
    DigestEngine::new(dispatcher).digest(value)
}

/// Canonical form of `value` using the process-wide default dispatcher.
pub fn freeze(value: &Value) -> Result<CanonicalForm, MemokeyError> {
    freeze_with(value, TypeDispatcher::global())
}

/// Canonical form of `value` using an explicit dispatcher.
pub fn freeze_with(
    value: &Value,
    dispatcher: &TypeDispatcher,
) -> Result<CanonicalForm, MemokeyError> {
    Canonicalizer::new(DigestEngine::new(dispatcher)).freeze(value)
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn scalar() -> impl Strategy<Value = Value> {
        prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::Bool),
            any::<i64>().prop_map(Value::from),
            any::<f64>().prop_map(Value::Float),
            "[a-z0-9]{0,8}".prop_map(Value::from),
            prop::collection::vec(any::<u8>(), 0..8).prop_map(Value::Bytes),
        ]
    }

    #[derive(Debug)]
    struct Payload(Vec<u8>);

    impl OpaqueValue for Payload {
        fn as_any(&self) -> &dyn std::any::Any {
            self
        }

        fn as_blob(&self) -> Option<std::borrow::Cow<'_, [u8]>> {
            Some(std::borrow::Cow::Borrowed(&self.0))
        }
    }

    fn leaf() -> impl Strategy<Value = Value> {
        prop_oneof![
            4 => scalar(),
            1 => prop::collection::vec(any::<u8>(), 0..4).prop_map(|b| Value::opaque(Payload(b))),
        ]
    }

    fn nested() -> impl Strategy<Value = Value> {
        leaf().prop_recursive(3, 32, 6, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..6).prop_map(Value::List),
                prop::collection::vec(inner.clone(), 0..6).prop_map(Value::Tuple),
                prop::collection::vec(inner.clone(), 0..6).prop_map(|items| Value::set(items)),
                prop::collection::vec(("[a-z]{1,4}", inner), 0..6)
                    .prop_map(|pairs| Value::map(pairs)),
            ]
        })
    }

    proptest! {
        #[test]
        fn digest_is_deterministic(v in nested()) {
            prop_assert_eq!(digest(&v).unwrap(), digest(&v.clone()).unwrap());
        }

        #[test]
        fn set_digest_ignores_order(mut items in prop::collection::vec(scalar(), 0..8)) {
            let forward = Value::set(items.clone());
            items.reverse();
            let backward = Value::set(items);
            prop_assert_eq!(digest(&forward).unwrap(), digest(&backward).unwrap());
        }

        #[test]
        fn mapping_digest_ignores_insertion_order(
            pairs in prop::collection::btree_map("[a-z]{1,4}", any::<i64>(), 0..8)
        ) {
            let forward = Value::map(pairs.iter().map(|(k, v)| (k.as_str(), *v)));
            let backward = Value::map(pairs.iter().rev().map(|(k, v)| (k.as_str(), *v)));
            prop_assert_eq!(digest(&forward).unwrap(), digest(&backward).unwrap());
        }

        #[test]
        fn freeze_is_idempotent(v in nested()) {
            let once = freeze(&v).unwrap();
            let twice = freeze(&once.to_value()).unwrap();
            prop_assert_eq!(&once, &twice);
        }

        #[test]
        fn freeze_preserves_digest_of_builtin_values(v in scalar().prop_recursive(3, 32, 6, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..6).prop_map(Value::List),
                prop::collection::vec(inner, 0..6).prop_map(|items| Value::set(items)),
            ]
        })) {
            prop_assert_eq!(digest(&freeze(&v).unwrap().to_value()).unwrap(), digest(&v).unwrap());
        }
    }
}
