//! # Canonicalizer: Immutable Equivalents
//!
//! Converts a [`Value`] into a [`CanonicalForm`]: an immutable, shareable
//! tree whose ordering no longer depends on how the input was built.
//!
//! ## Rules
//!
//! - Scalars are carried over unchanged.
//! - Byte blobs become [`FrozenBlob`]s.
//! - Mapping entries are sorted by the `Display` string of the canonical
//!   key. The sort is stable, so keys whose string forms coincide (`2` and
//!   `"2"`) stay in input order and the result then depends on insertion
//!   order. The digest engine orders by key digest and has no such gap.
//! - Sequences keep their order; sets are sorted by the digest of each
//!   frozen element, so refreezing a rebuilt value is a no-op.
//! - Opaque values are handed to the dispatcher. The Unknown handler and
//!   unresolved types cannot be frozen.
//!
//! Children are held in `Arc`s, so `clone()` is a shallow copy.

use std::cmp::Ordering;
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use base64::engine::general_purpose::URL_SAFE;
use base64::Engine as _;
use memokey_core::{Mapping, MemokeyError, OpaqueRef, Value, ValueSet};
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};

use crate::dispatcher::Route;
use crate::engine::DigestEngine;

/// Which sequence kind a frozen sequence came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SeqTag {
    /// Growable list.
    List,
    /// Fixed tuple.
    Tuple,
}

/// Immutable, cheaply clonable byte blob.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct FrozenBlob(Arc<[u8]>);

impl FrozenBlob {
    /// Copy `bytes` into a new frozen blob.
    pub fn new(bytes: &[u8]) -> Self {
        Self(Arc::from(bytes))
    }

    /// The frozen bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// URL-safe base64 with padding.
    pub fn to_base64(&self) -> String {
        URL_SAFE.encode(&self.0)
    }
}

impl Deref for FrozenBlob {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for FrozenBlob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_base64())
    }
}

impl fmt::Debug for FrozenBlob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FrozenBlob({})", self.to_base64())
    }
}

/// Immutable canonical equivalent of a [`Value`].
#[derive(Debug, Clone)]
pub enum CanonicalForm {
    /// Absent value.
    Null,
    /// Boolean.
    Bool(bool),
    /// Integer.
    Int(i128),
    /// Float, compared by bit pattern.
    Float(f64),
    /// Shared string.
    Str(Arc<str>),
    /// Frozen byte blob.
    Blob(FrozenBlob),
    /// List or tuple, order preserved.
    Seq {
        /// Originating sequence kind.
        tag: SeqTag,
        /// Frozen elements.
        items: Arc<[CanonicalForm]>,
    },
    /// Entries in canonical key order.
    Map(Arc<[(CanonicalForm, CanonicalForm)]>),
    /// Elements in digest order.
    Set(Arc<[CanonicalForm]>),
    /// Shared handle to the original opaque value.
    Opaque(OpaqueRef),
}

impl CanonicalForm {
    /// Rebuild a [`Value`] with the same content. Opaque handles are shared,
    /// not copied.
    pub fn to_value(&self) -> Value {
        match self {
            Self::Null => Value::Null,
            Self::Bool(b) => Value::Bool(*b),
            Self::Int(n) => Value::Int(*n),
            Self::Float(f) => Value::Float(*f),
            Self::Str(s) => Value::Str(s.to_string()),
            Self::Blob(b) => Value::Bytes(b.as_bytes().to_vec()),
            Self::Seq { tag, items } => {
                let items = items.iter().map(Self::to_value).collect();
                match tag {
                    SeqTag::List => Value::List(items),
                    SeqTag::Tuple => Value::Tuple(items),
                }
            }
            Self::Map(entries) => Value::Map(
                entries
                    .iter()
                    .map(|(k, v)| (k.to_value(), v.to_value()))
                    .collect::<Mapping>(),
            ),
            Self::Set(items) => Value::Set(items.iter().map(Self::to_value).collect::<ValueSet>()),
            Self::Opaque(o) => Value::Opaque(Arc::clone(o)),
        }
    }
}

impl CanonicalForm {
    fn rank(&self) -> u8 {
        match self {
            Self::Null => 0,
            Self::Bool(_) => 1,
            Self::Int(_) => 2,
            Self::Float(_) => 3,
            Self::Str(_) => 4,
            Self::Blob(_) => 5,
            Self::Seq { .. } => 6,
            Self::Map(_) => 7,
            Self::Set(_) => 8,
            Self::Opaque(_) => 9,
        }
    }

    /// Total order consistent with `==`: floats by bit pattern, opaque
    /// handles by address. Only breaks ties between equal digests.
    fn total_cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Bool(a), Self::Bool(b)) => a.cmp(b),
            (Self::Int(a), Self::Int(b)) => a.cmp(b),
            (Self::Float(a), Self::Float(b)) => a.to_bits().cmp(&b.to_bits()),
            (Self::Str(a), Self::Str(b)) => a.cmp(b),
            (Self::Blob(a), Self::Blob(b)) => a.as_bytes().cmp(b.as_bytes()),
            (Self::Seq { tag: ta, items: a }, Self::Seq { tag: tb, items: b }) => {
                (*ta as u8).cmp(&(*tb as u8)).then_with(|| cmp_items(a, b))
            }
            (Self::Set(a), Self::Set(b)) => cmp_items(a, b),
            (Self::Map(a), Self::Map(b)) => a.len().cmp(&b.len()).then_with(|| {
                a.iter()
                    .zip(b.iter())
                    .map(|((ka, va), (kb, vb))| ka.total_cmp(kb).then_with(|| va.total_cmp(vb)))
                    .find(|o| o.is_ne())
                    .unwrap_or(Ordering::Equal)
            }),
            (Self::Opaque(a), Self::Opaque(b)) => {
                (Arc::as_ptr(a) as *const () as usize).cmp(&(Arc::as_ptr(b) as *const () as usize))
            }
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

fn cmp_items(a: &[CanonicalForm], b: &[CanonicalForm]) -> Ordering {
    a.len().cmp(&b.len()).then_with(|| {
        a.iter()
            .zip(b)
            .map(|(x, y)| x.total_cmp(y))
            .find(|o| o.is_ne())
            .unwrap_or(Ordering::Equal)
    })
}

impl From<&CanonicalForm> for Value {
    fn from(form: &CanonicalForm) -> Self {
        form.to_value()
    }
}

impl PartialEq for CanonicalForm {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a.to_bits() == b.to_bits(),
            (Self::Str(a), Self::Str(b)) => a == b,
            (Self::Blob(a), Self::Blob(b)) => a == b,
            (Self::Seq { tag: ta, items: a }, Self::Seq { tag: tb, items: b }) => {
                ta == tb && a == b
            }
            (Self::Map(a), Self::Map(b)) => a == b,
            (Self::Set(a), Self::Set(b)) => a == b,
            (Self::Opaque(a), Self::Opaque(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl Eq for CanonicalForm {}

fn write_joined<'a, I>(f: &mut fmt::Formatter<'_>, items: I) -> fmt::Result
where
    I: IntoIterator<Item = &'a CanonicalForm>,
{
    for (i, item) in items.into_iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

impl fmt::Display for CanonicalForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(n) => write!(f, "{n}"),
            Self::Float(x) => write!(f, "{x:?}"),
            Self::Str(s) => f.write_str(s),
            Self::Blob(b) => write!(f, "{b}"),
            Self::Seq {
                tag: SeqTag::List,
                items,
            } => {
                f.write_str("[")?;
                write_joined(f, items.iter())?;
                f.write_str("]")
            }
            Self::Seq {
                tag: SeqTag::Tuple,
                items,
            } => {
                f.write_str("(")?;
                write_joined(f, items.iter())?;
                f.write_str(")")
            }
            Self::Map(entries) => {
                f.write_str("{")?;
                for (i, (k, v)) in entries.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{k}: {v}")?;
                }
                f.write_str("}")
            }
            Self::Set(items) => {
                f.write_str("{")?;
                write_joined(f, items.iter())?;
                f.write_str("}")
            }
            Self::Opaque(o) => f.write_str(&o.render()),
        }
    }
}

/// JSON-friendly rendering: blobs as base64, mapping keys as their display
/// strings, sets as arrays, opaque values as their text rendering.
impl Serialize for CanonicalForm {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_unit(),
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Int(n) => serializer.serialize_i128(*n),
            Self::Float(x) => serializer.serialize_f64(*x),
            Self::Str(s) => serializer.serialize_str(s),
            Self::Blob(b) => serializer.serialize_str(&b.to_base64()),
            Self::Seq { items, .. } | Self::Set(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items.iter() {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Self::Map(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (k, v) in entries.iter() {
                    map.serialize_entry(&k.to_string(), v)?;
                }
                map.end()
            }
            Self::Opaque(o) => serializer.serialize_str(&o.render()),
        }
    }
}

/// Produces [`CanonicalForm`]s, using the engine for set ordering and the
/// engine's dispatcher for opaque values.
#[derive(Debug, Clone, Copy)]
pub struct Canonicalizer<'d> {
    engine: DigestEngine<'d>,
}

impl<'d> Canonicalizer<'d> {
    /// A canonicalizer sharing `engine`'s dispatcher and configuration.
    pub fn new(engine: DigestEngine<'d>) -> Self {
        Self { engine }
    }

    /// Canonical form of `value`.
    pub fn freeze(&self, value: &Value) -> Result<CanonicalForm, MemokeyError> {
        Ok(match value {
            Value::Null => CanonicalForm::Null,
            Value::Bool(b) => CanonicalForm::Bool(*b),
            Value::Int(n) => CanonicalForm::Int(*n),
            Value::Float(x) => CanonicalForm::Float(*x),
            Value::Str(s) => CanonicalForm::Str(Arc::from(s.as_str())),
            Value::Bytes(b) => CanonicalForm::Blob(FrozenBlob::new(b)),
            Value::List(items) => self.freeze_sequence(SeqTag::List, items)?,
            Value::Tuple(items) => self.freeze_sequence(SeqTag::Tuple, items)?,
            Value::Map(m) => self.freeze_mapping(m.as_slice())?,
            Value::Set(s) => self.freeze_set(s.as_slice())?,
            Value::Opaque(o) => self.freeze_opaque(o)?,
        })
    }

    fn freeze_sequence(&self, tag: SeqTag, items: &[Value]) -> Result<CanonicalForm, MemokeyError> {
        let items = items
            .iter()
            .map(|v| self.freeze(v))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(CanonicalForm::Seq {
            tag,
            items: items.into(),
        })
    }

    fn freeze_mapping(&self, pairs: &[(Value, Value)]) -> Result<CanonicalForm, MemokeyError> {
        let mut entries = pairs
            .iter()
            .map(|(k, v)| Ok((self.freeze(k)?, self.freeze(v)?)))
            .collect::<Result<Vec<_>, MemokeyError>>()?;
        entries.sort_by_cached_key(|(k, _)| k.to_string());
        Ok(CanonicalForm::Map(entries.into()))
    }

    // Elements are ordered by the digest of their frozen form, so freezing
    // the rebuilt value reproduces the same order. Probe-routed opaques
    // freeze to plain blobs and containers, whose digests differ from the
    // opaque's own.
    fn freeze_set(&self, items: &[Value]) -> Result<CanonicalForm, MemokeyError> {
        let mut keyed = items
            .iter()
            .map(|v| {
                let form = self.freeze(v)?;
                Ok((self.engine.digest(&form.to_value())?, form))
            })
            .collect::<Result<Vec<_>, MemokeyError>>()?;
        keyed.sort_by(|(a, fa), (b, fb)| a.cmp(b).then_with(|| fa.total_cmp(fb)));
        let mut items: Vec<CanonicalForm> = keyed.into_iter().map(|(_, form)| form).collect();
        items.dedup();
        Ok(CanonicalForm::Set(items.into()))
    }

    fn freeze_opaque(&self, value: &OpaqueRef) -> Result<CanonicalForm, MemokeyError> {
        let unfreezable = || MemokeyError::UnfreezableType {
            type_name: value.type_name().to_string(),
        };
        let dispatcher = self.engine.dispatcher();
        if !dispatcher.config().opaque_extensions {
            return Err(unfreezable());
        }
        let (route, handler) = match dispatcher.resolve_with_route(value.as_ref()) {
            Ok(found) => found,
            Err(MemokeyError::UnresolvedType { .. }) => return Err(unfreezable()),
            Err(e) => return Err(e),
        };
        if route == Route::Unknown {
            return Err(unfreezable());
        }
        handler.to_canonical(value, &FreezeScope { canonicalizer: *self })
    }
}

/// A handler's view of an in-progress freeze.
pub struct FreezeScope<'s> {
    canonicalizer: Canonicalizer<'s>,
}

impl FreezeScope<'_> {
    /// Canonical form of a child value.
    pub fn freeze_child(&self, value: &Value) -> Result<CanonicalForm, MemokeyError> {
        self.canonicalizer.freeze(value)
    }

    /// Canonical mapping from key/value pairs.
    pub fn freeze_mapping(&self, pairs: &[(Value, Value)]) -> Result<CanonicalForm, MemokeyError> {
        self.canonicalizer.freeze_mapping(pairs)
    }

    /// Canonical set from unique elements.
    pub fn freeze_set(&self, items: &[Value]) -> Result<CanonicalForm, MemokeyError> {
        self.canonicalizer.freeze_set(items)
    }

    /// Canonical sequence, order preserved.
    pub fn freeze_sequence(
        &self,
        tag: SeqTag,
        items: &[Value],
    ) -> Result<CanonicalForm, MemokeyError> {
        self.canonicalizer.freeze_sequence(tag, items)
    }
}
