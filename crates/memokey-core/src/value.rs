//! # Value Model
//!
//! [`Value`] is the closed set of value kinds the digest engine and the
//! canonicalizer understand: scalars, ordered sequences, mappings, sets,
//! and a single open slot, [`Value::Opaque`], for externally-defined types.
//!
//! ## Structural Equality
//!
//! Two values are equal when they have the same variant and equal
//! contents. Floats compare by bit pattern (so `NaN == NaN` and
//! `0.0 != -0.0`), mappings and sets compare without regard to order, and
//! opaque values compare by shared identity. Every pair of equal values
//! yields the same digest.

use std::any::Any;
use std::borrow::Cow;
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::typename;

/// Shared handle to an opaque value. Canonical forms hold the same handle
/// rather than a deep copy.
pub type OpaqueRef = Arc<dyn OpaqueValue>;

/// An externally-defined value handled through the type dispatcher.
///
/// Implementors must provide [`as_any`](Self::as_any) so the dispatcher can
/// match on the exact runtime type. The capability accessors are the
/// structural probe used when no handler is registered for the type; leave
/// them at `None` for values that are none of those shapes.
pub trait OpaqueValue: Any + fmt::Debug + Send + Sync {
    /// `self` as `&dyn Any`, for exact-type lookup and downcasting.
    fn as_any(&self) -> &dyn Any;

    /// Fully-qualified runtime type name. Seeds the type tag and keys
    /// name-based registry lookup.
    fn type_name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Default text rendering, used only by the Unknown fallback.
    fn render(&self) -> String {
        format!("{self:?}")
    }

    /// Mapping-like view: key/value pairs in any order.
    fn as_mapping(&self) -> Option<Cow<'_, [(Value, Value)]>> {
        None
    }

    /// Set-like view: unique elements in any order.
    fn as_set(&self) -> Option<Cow<'_, [Value]>> {
        None
    }

    /// Sequence-like view: elements in meaningful order.
    fn as_sequence(&self) -> Option<Cow<'_, [Value]>> {
        None
    }

    /// Blob-like view: raw bytes.
    fn as_blob(&self) -> Option<Cow<'_, [u8]>> {
        None
    }
}

/// Coarse classification of a [`Value`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    /// `Null`, `Bool`, `Int`, `Float`, `Str`.
    Scalar,
    /// `Bytes`.
    Blob,
    /// `List`, `Tuple`.
    Sequence,
    /// `Map`.
    Mapping,
    /// `Set`.
    Set,
    /// `Opaque`.
    Opaque,
}

/// A possibly nested in-memory datum.
#[derive(Debug, Clone)]
pub enum Value {
    /// Absent value.
    Null,
    /// Boolean.
    Bool(bool),
    /// Integer; wide enough for every `i64` and `u64`.
    Int(i128),
    /// 64-bit float.
    Float(f64),
    /// UTF-8 string.
    Str(String),
    /// Byte blob.
    Bytes(Vec<u8>),
    /// Ordered, growable sequence.
    List(Vec<Value>),
    /// Ordered, fixed sequence. Tagged apart from `List`.
    Tuple(Vec<Value>),
    /// Key/value mapping with unique keys.
    Map(Mapping),
    /// Unordered collection of unique values.
    Set(ValueSet),
    /// Externally-typed value.
    Opaque(OpaqueRef),
}

impl Value {
    /// Byte blob from anything convertible to bytes.
    pub fn bytes(data: impl Into<Vec<u8>>) -> Self {
        Self::Bytes(data.into())
    }

    /// List from any iterator of convertible items.
    pub fn list<I, T>(items: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Value>,
    {
        Self::List(items.into_iter().map(Into::into).collect())
    }

    /// Tuple from any iterator of convertible items.
    pub fn tuple<I, T>(items: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Value>,
    {
        Self::Tuple(items.into_iter().map(Into::into).collect())
    }

    /// Mapping from key/value pairs; later duplicates replace earlier ones.
    pub fn map<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<Value>,
        V: Into<Value>,
    {
        Self::Map(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Set from any iterator; duplicates are dropped.
    pub fn set<I, T>(items: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Value>,
    {
        Self::Set(items.into_iter().map(Into::into).collect())
    }

    /// Wrap an opaque value.
    pub fn opaque(value: impl OpaqueValue) -> Self {
        Self::Opaque(Arc::new(value))
    }

    /// The value's coarse kind.
    pub fn kind(&self) -> ValueKind {
        match self {
            Self::Null | Self::Bool(_) | Self::Int(_) | Self::Float(_) | Self::Str(_) => {
                ValueKind::Scalar
            }
            Self::Bytes(_) => ValueKind::Blob,
            Self::List(_) | Self::Tuple(_) => ValueKind::Sequence,
            Self::Map(_) => ValueKind::Mapping,
            Self::Set(_) => ValueKind::Set,
            Self::Opaque(_) => ValueKind::Opaque,
        }
    }

    /// Fully-qualified runtime type name; the source of the type tag.
    pub fn type_name(&self) -> &str {
        match self {
            Self::Null => typename::NULL,
            Self::Bool(_) => typename::BOOL,
            Self::Int(_) => typename::INT,
            Self::Float(_) => typename::FLOAT,
            Self::Str(_) => typename::STR,
            Self::Bytes(_) => typename::BYTES,
            Self::List(_) => typename::LIST,
            Self::Tuple(_) => typename::TUPLE,
            Self::Map(_) => typename::MAP,
            Self::Set(_) => typename::SET,
            Self::Opaque(o) => o.type_name(),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a.to_bits() == b.to_bits(),
            (Self::Str(a), Self::Str(b)) => a == b,
            (Self::Bytes(a), Self::Bytes(b)) => a == b,
            (Self::List(a), Self::List(b)) | (Self::Tuple(a), Self::Tuple(b)) => a == b,
            (Self::Map(a), Self::Map(b)) => a == b,
            (Self::Set(a), Self::Set(b)) => a == b,
            (Self::Opaque(a), Self::Opaque(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl Eq for Value {}

/// Bit-exact hash consistent with `Value`'s equality. Only used to bucket
/// entries; never part of a digest.
fn bucket_of(value: &Value) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Self::Null => {}
            Self::Bool(b) => b.hash(state),
            Self::Int(n) => n.hash(state),
            Self::Float(f) => f.to_bits().hash(state),
            Self::Str(s) => s.hash(state),
            Self::Bytes(b) => b.hash(state),
            Self::List(items) | Self::Tuple(items) => items.hash(state),
            Self::Map(m) => m.hash(state),
            Self::Set(s) => s.hash(state),
            Self::Opaque(o) => (Arc::as_ptr(o) as *const () as usize).hash(state),
        }
    }
}

/// Insertion-ordered key/value pairs with unique keys.
///
/// Iteration order is the insertion order, which is *not* significant:
/// equality ignores it and so does the digest. Keys are indexed by a
/// bit-exact hash, so insertion and lookup stay constant-time on average.
#[derive(Clone, Default)]
pub struct Mapping {
    entries: Vec<(Value, Value)>,
    index: HashMap<u64, Vec<usize>>,
}

impl Mapping {
    /// An empty mapping.
    pub fn new() -> Self {
        Self::default()
    }

    fn position(&self, bucket: u64, key: &Value) -> Option<usize> {
        self.index
            .get(&bucket)?
            .iter()
            .copied()
            .find(|&i| self.entries[i].0 == *key)
    }

    /// Insert a pair, returning the value it replaced.
    pub fn insert(&mut self, key: Value, value: Value) -> Option<Value> {
        let bucket = bucket_of(&key);
        if let Some(i) = self.position(bucket, &key) {
            return Some(std::mem::replace(&mut self.entries[i].1, value));
        }
        self.index.entry(bucket).or_default().push(self.entries.len());
        self.entries.push((key, value));
        None
    }

    /// Look up a key.
    pub fn get(&self, key: &Value) -> Option<&Value> {
        self.position(bucket_of(key), key)
            .map(|i| &self.entries[i].1)
    }

    /// Pairs in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, (Value, Value)> {
        self.entries.iter()
    }

    /// Pairs as a slice.
    pub fn as_slice(&self) -> &[(Value, Value)] {
        &self.entries
    }

    /// Number of pairs.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if there are no pairs.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// The index is derived state; leaving it out keeps `render()` of opaque
// values holding a mapping independent of hash-map iteration order.
impl fmt::Debug for Mapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mapping")
            .field("entries", &self.entries)
            .finish()
    }
}

impl PartialEq for Mapping {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().all(|(k, v)| other.get(k) == Some(v))
    }
}

impl Eq for Mapping {}

impl Hash for Mapping {
    fn hash<H: Hasher>(&self, state: &mut H) {
        let sum = self.entries.iter().fold(0u64, |acc, (k, v)| {
            let mut hasher = DefaultHasher::new();
            k.hash(&mut hasher);
            v.hash(&mut hasher);
            acc.wrapping_add(hasher.finish())
        });
        state.write_usize(self.len());
        state.write_u64(sum);
    }
}

impl FromIterator<(Value, Value)> for Mapping {
    fn from_iter<I: IntoIterator<Item = (Value, Value)>>(iter: I) -> Self {
        let mut mapping = Self::new();
        for (k, v) in iter {
            mapping.insert(k, v);
        }
        mapping
    }
}

impl<'a> IntoIterator for &'a Mapping {
    type Item = &'a (Value, Value);
    type IntoIter = std::slice::Iter<'a, (Value, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Unordered collection of unique values.
///
/// Elements are stored in arrival order, which carries no meaning.
#[derive(Clone, Default)]
pub struct ValueSet {
    items: Vec<Value>,
    index: HashMap<u64, Vec<usize>>,
}

impl ValueSet {
    /// An empty set.
    pub fn new() -> Self {
        Self::default()
    }

    fn position(&self, bucket: u64, value: &Value) -> Option<usize> {
        self.index
            .get(&bucket)?
            .iter()
            .copied()
            .find(|&i| self.items[i] == *value)
    }

    /// Insert an element; returns false if an equal element was present.
    pub fn insert(&mut self, value: Value) -> bool {
        let bucket = bucket_of(&value);
        if self.position(bucket, &value).is_some() {
            return false;
        }
        self.index.entry(bucket).or_default().push(self.items.len());
        self.items.push(value);
        true
    }

    /// Membership by structural equality.
    pub fn contains(&self, value: &Value) -> bool {
        self.position(bucket_of(value), value).is_some()
    }

    /// Elements in arrival order.
    pub fn iter(&self) -> std::slice::Iter<'_, Value> {
        self.items.iter()
    }

    /// Elements as a slice.
    pub fn as_slice(&self) -> &[Value] {
        &self.items
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// True if there are no elements.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl fmt::Debug for ValueSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValueSet")
            .field("items", &self.items)
            .finish()
    }
}

impl PartialEq for ValueSet {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().all(|v| other.contains(v))
    }
}

impl Eq for ValueSet {}

impl Hash for ValueSet {
    fn hash<H: Hasher>(&self, state: &mut H) {
        let sum = self
            .items
            .iter()
            .fold(0u64, |acc, v| acc.wrapping_add(bucket_of(v)));
        state.write_usize(self.len());
        state.write_u64(sum);
    }
}

impl FromIterator<Value> for ValueSet {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        let mut set = Self::new();
        for v in iter {
            set.insert(v);
        }
        set
    }
}

impl<'a> IntoIterator for &'a ValueSet {
    type Item = &'a Value;
    type IntoIter = std::slice::Iter<'a, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

// ---------------------------------------------------------------------------
// Conversions
// ---------------------------------------------------------------------------

macro_rules! impl_from_int {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Value {
                fn from(n: $ty) -> Self {
                    Self::Int(i128::from(n))
                }
            }
        )*
    };
}

impl_from_int!(i8, i16, i32, i64, i128, u8, u16, u32, u64);

impl From<usize> for Value {
    fn from(n: usize) -> Self {
        // usize is at most 64 bits on supported targets.
        Self::Int(n as i128)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl From<f32> for Value {
    fn from(f: f32) -> Self {
        Self::Float(f64::from(f))
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl From<&[u8]> for Value {
    fn from(b: &[u8]) -> Self {
        Self::Bytes(b.to_vec())
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Self::List(items)
    }
}

impl From<Mapping> for Value {
    fn from(m: Mapping) -> Self {
        Self::Map(m)
    }
}

impl From<ValueSet> for Value {
    fn from(s: ValueSet) -> Self {
        Self::Set(s)
    }
}

impl From<OpaqueRef> for Value {
    fn from(o: OpaqueRef) -> Self {
        Self::Opaque(o)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        use serde_json::Value as Json;
        match json {
            Json::Null => Self::Null,
            Json::Bool(b) => Self::Bool(b),
            Json::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Self::Int(i128::from(i))
                } else if let Some(u) = n.as_u64() {
                    Self::Int(i128::from(u))
                } else {
                    Self::Float(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            Json::String(s) => Self::Str(s),
            Json::Array(items) => Self::List(items.into_iter().map(Value::from).collect()),
            Json::Object(map) => Self::Map(
                map.into_iter()
                    .map(|(k, v)| (Value::Str(k), Value::from(v)))
                    .collect(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Point {
        x: i64,
        y: i64,
    }

    impl OpaqueValue for Point {
        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    #[test]
    fn type_names_of_builtins() {
        assert_eq!(Value::Null.type_name(), "null");
        assert_eq!(Value::from(0).type_name(), "int");
        assert_eq!(Value::from(0.0).type_name(), "float");
        assert_eq!(Value::from(false).type_name(), "bool");
        assert_eq!(Value::from("0").type_name(), "str");
        assert_eq!(Value::list([1, 2]).type_name(), "list");
        assert_eq!(Value::tuple([1, 2]).type_name(), "tuple");
    }

    #[test]
    fn opaque_type_name_defaults_to_full_path() {
        let v = Value::opaque(Point { x: 1, y: 2 });
        assert!(v.type_name().ends_with("value::tests::Point"), "{}", v.type_name());
        assert_eq!(v.kind(), ValueKind::Opaque);
        if let Value::Opaque(o) = &v {
            assert_eq!(o.render(), "Point { x: 1, y: 2 }");
            assert!(o.as_any().downcast_ref::<Point>().is_some());
        }
    }

    #[test]
    fn mapping_keys_are_unique_and_order_free() {
        let mut m = Mapping::new();
        assert_eq!(m.insert("a".into(), 1.into()), None);
        assert_eq!(m.insert("a".into(), 2.into()), Some(Value::Int(1)));
        assert_eq!(m.len(), 1);

        let ab = Value::map([("a", 1), ("b", 2)]);
        let ba = Value::map([("b", 2), ("a", 1)]);
        assert_eq!(ab, ba);
        assert_ne!(ab, Value::map([("a", 1), ("b", 3)]));
    }

    #[test]
    fn set_deduplicates_and_ignores_order() {
        let s = Value::set([1, 2, 2, 3]);
        if let Value::Set(inner) = &s {
            assert_eq!(inner.len(), 3);
        }
        assert_eq!(s, Value::set([3, 2, 1]));
    }

    #[test]
    fn equal_values_hash_equal() {
        let ab = Value::map([("a", Value::set([1, 2])), ("b", Value::Float(f64::NAN))]);
        let ba = Value::map([("b", Value::Float(f64::NAN)), ("a", Value::set([2, 1]))]);
        assert_eq!(ab, ba);
        assert_eq!(bucket_of(&ab), bucket_of(&ba));
        assert_ne!(bucket_of(&Value::list([1, 2])), bucket_of(&Value::tuple([1, 2])));
    }

    #[test]
    fn large_collections_deduplicate() {
        let n = 200_000;
        let set = Value::set((0..n).chain(0..n));
        match &set {
            Value::Set(inner) => {
                assert_eq!(inner.len(), n as usize);
                assert!(inner.contains(&Value::Int(n as i128 - 1)));
                assert!(!inner.contains(&Value::Int(n as i128)));
            }
            other => panic!("expected set, got {other:?}"),
        }

        let map = Value::map((0..n).map(|i| (i, i)).chain((0..n).map(|i| (i, -i))));
        match &map {
            Value::Map(inner) => {
                assert_eq!(inner.len(), n as usize);
                assert_eq!(inner.get(&Value::Int(7)), Some(&Value::Int(-7)));
            }
            other => panic!("expected mapping, got {other:?}"),
        }
    }

    #[test]
    fn colliding_buckets_stay_distinct() {
        let mut set = ValueSet::new();
        assert!(set.insert(Value::Float(f64::NAN)));
        assert!(set.insert(Value::Float(f64::from_bits(f64::NAN.to_bits() | 1))));
        assert!(!set.insert(Value::Float(f64::NAN)));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn debug_output_lists_entries_only() {
        let m: Mapping = [(Value::from("k"), Value::Int(1))].into_iter().collect();
        assert_eq!(format!("{m:?}"), r#"Mapping { entries: [(Str("k"), Int(1))] }"#);
    }

    #[test]
    fn sequences_respect_order_and_kind() {
        assert_ne!(Value::list([1, 2]), Value::list([2, 1]));
        assert_ne!(Value::list([1, 2]), Value::tuple([1, 2]));
    }

    #[test]
    fn floats_compare_by_bits() {
        assert_eq!(Value::Float(f64::NAN), Value::Float(f64::NAN));
        assert_ne!(Value::Float(0.0), Value::Float(-0.0));
        assert_ne!(Value::Float(0.0), Value::Int(0));
    }

    #[test]
    fn opaque_equality_is_identity() {
        let shared: OpaqueRef = Arc::new(Point { x: 0, y: 0 });
        assert_eq!(Value::Opaque(shared.clone()), Value::Opaque(shared));
        assert_ne!(
            Value::opaque(Point { x: 0, y: 0 }),
            Value::opaque(Point { x: 0, y: 0 })
        );
    }

    #[test]
    fn from_json() {
        let json = serde_json::json!({"a": [1, 2.5, null, true, "s"], "big": u64::MAX});
        let v = Value::from(json);
        let expected = Value::map([
            (
                Value::from("a"),
                Value::list([
                    Value::Int(1),
                    Value::Float(2.5),
                    Value::Null,
                    Value::Bool(true),
                    Value::from("s"),
                ]),
            ),
            (Value::from("big"), Value::Int(i128::from(u64::MAX))),
        ]);
        assert_eq!(v, expected);
    }

    #[test]
    fn option_conversion() {
        assert_eq!(Value::from(None::<i32>), Value::Null);
        assert_eq!(Value::from(Some("x")), Value::from("x"));
    }
}
