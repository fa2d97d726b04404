//! # Digest Engine: Recursive Structural Hashing
//!
//! Reduces any [`Value`] to a single [`Digest`]. Children are hashed first
//! and their digests folded into a parent accumulator, which is seeded with
//! the type tag of the parent's runtime type name.
//!
//! ## Ordering Rules
//!
//! - **Sequence**: child digests combined in original order.
//! - **Mapping**: entries sorted by the hex string of the key digest, ties
//!   broken by the value digest, then key digest and value digest combined
//!   per entry. Keys never need to be mutually comparable.
//! - **Set**: element digests sorted byte-lexicographically, then combined.
//!   This removes any dependence on storage iteration order.
//!
//! ## Opaque Values
//!
//! Opaque values go through the [`TypeDispatcher`]. The resolved handler
//! writes into a fork of the accumulator; if its serializer turns out to be
//! unavailable the fork is discarded and, unless strict extensions are
//! configured, the Unknown fallback runs on the untouched parent state.
//!
//! Recursion depth follows nesting depth. Cyclic opaque graphs are not
//! detected.

use memokey_core::typename::type_tag;
use memokey_core::{
    Digest, HashAccumulator, MemokeyConfig, MemokeyError, OpaqueValue, Value,
};

use crate::dispatcher::TypeDispatcher;

/// Recursive digest algorithm bound to a dispatcher.
#[derive(Debug, Clone, Copy)]
pub struct DigestEngine<'d> {
    dispatcher: &'d TypeDispatcher,
}

impl<'d> DigestEngine<'d> {
    /// An engine using `dispatcher` for opaque types and its configuration.
    pub fn new(dispatcher: &'d TypeDispatcher) -> Self {
        Self { dispatcher }
    }

    /// The dispatcher this engine consults.
    pub fn dispatcher(&self) -> &'d TypeDispatcher {
        self.dispatcher
    }

    /// The active configuration.
    pub fn config(&self) -> &'d MemokeyConfig {
        self.dispatcher.config()
    }

    /// Digest of `value`.
    pub fn digest(&self, value: &Value) -> Result<Digest, MemokeyError> {
        Ok(self.accumulate(value)?.digest())
    }

    /// The accumulator state after streaming `value`, for callers that
    /// want to keep appending.
    pub fn accumulate(&self, value: &Value) -> Result<HashAccumulator, MemokeyError> {
        let type_name = value.type_name();
        let mut acc = self.seed(type_name);
        match value {
            Value::Null => scalar(&mut acc, type_name, "null"),
            Value::Bool(b) => scalar(&mut acc, type_name, &b.to_string()),
            Value::Int(n) => scalar(&mut acc, type_name, &n.to_string()),
            Value::Float(f) => scalar(&mut acc, type_name, &format_float(*f)),
            Value::Str(s) => scalar(&mut acc, type_name, s),
            Value::Bytes(b) => acc.update(b),
            Value::List(items) | Value::Tuple(items) => self.sequence_into(&mut acc, items)?,
            Value::Map(m) => self.mapping_into(&mut acc, m.as_slice())?,
            Value::Set(s) => self.set_into(&mut acc, s.as_slice())?,
            Value::Opaque(o) => self.opaque_into(&mut acc, o.as_ref())?,
        }
        Ok(acc)
    }

    /// A fresh accumulator seeded with the type tag for `type_name`.
    pub fn seed(&self, type_name: &str) -> HashAccumulator {
        HashAccumulator::seeded(self.config().algorithm, &type_tag(type_name))
    }

    fn sequence_into(
        &self,
        acc: &mut HashAccumulator,
        items: &[Value],
    ) -> Result<(), MemokeyError> {
        for item in items {
            acc.combine(&self.digest(item)?);
        }
        Ok(())
    }

    fn mapping_into(
        &self,
        acc: &mut HashAccumulator,
        pairs: &[(Value, Value)],
    ) -> Result<(), MemokeyError> {
        let mut entries = pairs
            .iter()
            .map(|(k, v)| Ok((self.digest(k)?, self.digest(v)?)))
            .collect::<Result<Vec<_>, MemokeyError>>()?;
        // Byte order of a digest is the order of its hex string. Distinct keys
        // can share a digest (NaN payloads), so ties fall to the value digest.
        entries.sort_unstable();
        for (key_digest, value_digest) in &entries {
            acc.combine(key_digest);
            acc.combine(value_digest);
        }
        Ok(())
    }

    fn set_into(&self, acc: &mut HashAccumulator, items: &[Value]) -> Result<(), MemokeyError> {
        let mut digests = items
            .iter()
            .map(|v| self.digest(v))
            .collect::<Result<Vec<_>, _>>()?;
        digests.sort_unstable();
        for d in &digests {
            acc.combine(d);
        }
        Ok(())
    }

    fn opaque_into(
        &self,
        acc: &mut HashAccumulator,
        value: &dyn OpaqueValue,
    ) -> Result<(), MemokeyError> {
        let config = self.config();
        if !config.opaque_extensions {
            return self.fallback_into(acc, value, "opaque extensions are disabled");
        }

        let handler = self.dispatcher.resolve(value)?;
        let mut trial = acc.fork();
        let outcome = handler.contribute_digest(value, &mut DigestScope::new(*self, &mut trial));
        match outcome {
            Ok(()) => {
                *acc = trial;
                Ok(())
            }
            Err(MemokeyError::ExtensionUnavailable { extension, .. })
                if !config.strict_extensions =>
            {
                tracing::warn!(
                    type_name = value.type_name(),
                    extension = %extension,
                    "serializer unavailable; degrading to unknown fallback"
                );
                self.fallback_into(acc, value, "serializer unavailable")
            }
            Err(e) => Err(e),
        }
    }

    fn fallback_into(
        &self,
        acc: &mut HashAccumulator,
        value: &dyn OpaqueValue,
        reason: &str,
    ) -> Result<(), MemokeyError> {
        if !self.config().unknown_fallback {
            return Err(MemokeyError::UnhashableType {
                type_name: value.type_name().to_string(),
                reason: format!("{reason} and the unknown fallback is disabled"),
            });
        }
        self.dispatcher
            .unknown_handler()
            .contribute_digest(value, &mut DigestScope::new(*self, acc))
    }
}

fn scalar(acc: &mut HashAccumulator, type_name: &str, text: &str) {
    acc.update(format!("{type_name}({text})").as_bytes());
}

/// Shortest round-trip rendering; `NaN`, `inf` and `-inf` spelled out.
fn format_float(f: f64) -> String {
    format!("{f:?}")
}

/// A handler's view of an in-progress digest.
///
/// Wraps the accumulator (already seeded with the type tag) and the engine
/// so handlers can hash children with the same rules as built-in values.
pub struct DigestScope<'s> {
    engine: DigestEngine<'s>,
    acc: &'s mut HashAccumulator,
}

impl<'s> DigestScope<'s> {
    pub(crate) fn new(engine: DigestEngine<'s>, acc: &'s mut HashAccumulator) -> Self {
        Self { engine, acc }
    }

    /// Append raw bytes.
    pub fn update(&mut self, data: &[u8]) {
        self.acc.update(data);
    }

    /// Fold in a child digest.
    pub fn combine(&mut self, child: &Digest) {
        self.acc.combine(child);
    }

    /// Digest of a child value under the same engine.
    pub fn digest_child(&self, value: &Value) -> Result<Digest, MemokeyError> {
        self.engine.digest(value)
    }

    /// Combine element digests in order.
    pub fn sequence(&mut self, items: &[Value]) -> Result<(), MemokeyError> {
        self.engine.sequence_into(self.acc, items)
    }

    /// Combine entries with digest-ordered keys.
    pub fn mapping(&mut self, pairs: &[(Value, Value)]) -> Result<(), MemokeyError> {
        self.engine.mapping_into(self.acc, pairs)
    }

    /// Combine sorted element digests.
    pub fn set(&mut self, items: &[Value]) -> Result<(), MemokeyError> {
        self.engine.set_into(self.acc, items)
    }

    /// The underlying accumulator.
    pub fn accumulator(&mut self) -> &mut HashAccumulator {
        &mut *self.acc
    }

    /// The active configuration.
    pub fn config(&self) -> &MemokeyConfig {
        self.engine.config()
    }
}
