//! # Type Dispatcher: Opaque Type Registry
//!
//! [`TypeDispatcher`] maps a runtime type, or its fully-qualified name, to a
//! [`TypeHandler`]. It is consulted only for [`Value::Opaque`]; every other
//! variant is handled by a single match in the engine.
//!
//! ## Lookup Order
//!
//! 1. Exact runtime type (`TypeId`).
//! 2. Fully-qualified type name, so a handler can be registered before the
//!    type is known to the registry.
//! 3. Structural capability probe, in fixed priority: mapping-like,
//!    set-like, sequence-like, blob-like.
//! 4. The Unknown handler, unless disabled by configuration, in which case
//!    resolution fails with `UnresolvedType`.
//!
//! ## Concurrency
//!
//! The registry sits behind a `parking_lot::RwLock`. Registration is
//! expected to finish before concurrent hashing begins; lookups take only
//! the read lock.

use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use memokey_core::{MemokeyConfig, MemokeyError, OpaqueRef, OpaqueValue, TypeKey};
use once_cell::sync::Lazy;
use parking_lot::RwLock;

use crate::canonical::{CanonicalForm, FreezeScope};
use crate::engine::DigestScope;
use crate::handlers::{
    BlobLikeHandler, MappingLikeHandler, SequenceLikeHandler, SetLikeHandler, UnknownHandler,
};

/// Handling logic for one opaque type.
pub trait TypeHandler: Send + Sync {
    /// Short handler name for listings and logs.
    fn name(&self) -> &str;

    /// Immutable canonical form of `value`. Defaults to passing the shared
    /// handle through unchanged.
    fn to_canonical(
        &self,
        value: &OpaqueRef,
        scope: &FreezeScope<'_>,
    ) -> Result<CanonicalForm, MemokeyError> {
        let _ = scope;
        Ok(CanonicalForm::Opaque(Arc::clone(value)))
    }

    /// Stream `value` into the scope's accumulator. The accumulator is
    /// already seeded with the type tag.
    fn contribute_digest(
        &self,
        value: &dyn OpaqueValue,
        scope: &mut DigestScope<'_>,
    ) -> Result<(), MemokeyError>;
}

/// Structural capabilities, in probe priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// Exposes key/value pairs.
    MappingLike,
    /// Exposes unique unordered elements.
    SetLike,
    /// Exposes ordered elements.
    SequenceLike,
    /// Exposes raw bytes.
    BlobLike,
}

impl Capability {
    /// Probe `value` in fixed priority order.
    pub fn probe(value: &dyn OpaqueValue) -> Option<Self> {
        if value.as_mapping().is_some() {
            Some(Self::MappingLike)
        } else if value.as_set().is_some() {
            Some(Self::SetLike)
        } else if value.as_sequence().is_some() {
            Some(Self::SequenceLike)
        } else if value.as_blob().is_some() {
            Some(Self::BlobLike)
        } else {
            None
        }
    }
}

/// How a handler was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Registered for the exact runtime type.
    ExactType,
    /// Registered under the type's fully-qualified name.
    Name,
    /// Matched a structural capability.
    Probe(Capability),
    /// Nothing matched; the Unknown handler.
    Unknown,
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ExactType => f.write_str("exact-type"),
            Self::Name => f.write_str("name"),
            Self::Probe(c) => write!(f, "probe:{c:?}"),
            Self::Unknown => f.write_str("unknown"),
        }
    }
}

#[derive(Default)]
struct Registry {
    by_type: HashMap<TypeId, Arc<dyn TypeHandler>>,
    by_name: HashMap<String, Arc<dyn TypeHandler>>,
    // name -> type, filled by type-keyed registrations
    catalog: HashMap<String, TypeId>,
}

/// Process-wide registry from opaque type to handler.
pub struct TypeDispatcher {
    config: MemokeyConfig,
    registry: RwLock<Registry>,
    mapping_like: Arc<dyn TypeHandler>,
    set_like: Arc<dyn TypeHandler>,
    sequence_like: Arc<dyn TypeHandler>,
    blob_like: Arc<dyn TypeHandler>,
    unknown: Arc<dyn TypeHandler>,
}

static GLOBAL: Lazy<TypeDispatcher> = Lazy::new(TypeDispatcher::new);

impl TypeDispatcher {
    /// An empty dispatcher with the default configuration.
    pub fn new() -> Self {
        Self::with_config(MemokeyConfig::default())
    }

    /// An empty dispatcher with an explicit configuration.
    pub fn with_config(config: MemokeyConfig) -> Self {
        Self {
            config,
            registry: RwLock::new(Registry::default()),
            mapping_like: Arc::new(MappingLikeHandler),
            set_like: Arc::new(SetLikeHandler),
            sequence_like: Arc::new(SequenceLikeHandler),
            blob_like: Arc::new(BlobLikeHandler),
            unknown: Arc::new(UnknownHandler),
        }
    }

    /// The process-wide default dispatcher (default configuration).
    pub fn global() -> &'static TypeDispatcher {
        &GLOBAL
    }

    /// The configuration this dispatcher and its engines run with.
    pub fn config(&self) -> &MemokeyConfig {
        &self.config
    }

    /// Insert or overwrite the handler for `key`, returning the previous
    /// handler.
    pub fn register(
        &self,
        key: impl Into<TypeKey>,
        handler: Arc<dyn TypeHandler>,
    ) -> Option<Arc<dyn TypeHandler>> {
        let key = key.into();
        tracing::debug!(type_name = key.type_name(), handler = handler.name(), "registering type handler");
        let mut registry = self.registry.write();
        match key {
            TypeKey::Type { id, name } => {
                registry.catalog.insert(name.to_string(), id);
                registry.by_type.insert(id, handler)
            }
            TypeKey::Name(name) => registry.by_name.insert(name, handler),
        }
    }

    /// Register `handler` for the concrete type `T`.
    pub fn register_type<T: OpaqueValue>(
        &self,
        handler: Arc<dyn TypeHandler>,
    ) -> Option<Arc<dyn TypeHandler>> {
        self.register(TypeKey::of::<T>(), handler)
    }

    /// Remove the handler for `key`, returning it.
    pub fn unregister(&self, key: impl Into<TypeKey>) -> Option<Arc<dyn TypeHandler>> {
        let mut registry = self.registry.write();
        match key.into() {
            TypeKey::Type { id, name } => {
                registry.catalog.remove(name);
                registry.by_type.remove(&id)
            }
            TypeKey::Name(name) => registry.by_name.remove(&name),
        }
    }

    /// Find the handler for `value` and report how it was found.
    pub fn resolve_with_route(
        &self,
        value: &dyn OpaqueValue,
    ) -> Result<(Route, Arc<dyn TypeHandler>), MemokeyError> {
        let found = {
            let registry = self.registry.read();
            if let Some(h) = registry.by_type.get(&value.as_any().type_id()) {
                Some((Route::ExactType, Arc::clone(h)))
            } else {
                registry
                    .by_name
                    .get(value.type_name())
                    .map(|h| (Route::Name, Arc::clone(h)))
            }
        };

        let resolved = match found {
            Some(hit) => hit,
            None => match Capability::probe(value) {
                Some(cap) => (Route::Probe(cap), Arc::clone(self.structural(cap))),
                None if self.config.unknown_fallback => (Route::Unknown, Arc::clone(&self.unknown)),
                None => {
                    return Err(MemokeyError::UnresolvedType {
                        type_name: value.type_name().to_string(),
                    })
                }
            },
        };

        tracing::trace!(
            type_name = value.type_name(),
            route = %resolved.0,
            handler = resolved.1.name(),
            "resolved opaque type"
        );
        Ok(resolved)
    }

    /// Find the handler for `value`.
    pub fn resolve(&self, value: &dyn OpaqueValue) -> Result<Arc<dyn TypeHandler>, MemokeyError> {
        self.resolve_with_route(value).map(|(_, handler)| handler)
    }

    /// The Unknown handler, regardless of configuration.
    pub fn unknown_handler(&self) -> Arc<dyn TypeHandler> {
        Arc::clone(&self.unknown)
    }

    /// True if a handler is registered for `value`'s exact type or name.
    pub fn is_registered(&self, value: &dyn OpaqueValue) -> bool {
        let registry = self.registry.read();
        registry.by_type.contains_key(&value.as_any().type_id())
            || registry.by_name.contains_key(value.type_name())
    }

    /// Fail with `UnresolvedType` unless a handler is registered for
    /// `value`'s exact type or name.
    pub fn assert_type(&self, value: &dyn OpaqueValue) -> Result<(), MemokeyError> {
        if self.is_registered(value) {
            Ok(())
        } else {
            Err(MemokeyError::UnresolvedType {
                type_name: value.type_name().to_string(),
            })
        }
    }

    /// The runtime type registered under a fully-qualified name, if any.
    pub fn type_for_name(&self, name: &str) -> Option<TypeId> {
        self.registry.read().catalog.get(name).copied()
    }

    /// Sorted, deduplicated names of every registered type.
    pub fn type_names(&self) -> Vec<String> {
        let registry = self.registry.read();
        let mut names: Vec<String> = registry
            .catalog
            .keys()
            .chain(registry.by_name.keys())
            .cloned()
            .collect();
        names.sort();
        names.dedup();
        names
    }

    fn structural(&self, cap: Capability) -> &Arc<dyn TypeHandler> {
        match cap {
            Capability::MappingLike => &self.mapping_like,
            Capability::SetLike => &self.set_like,
            Capability::SequenceLike => &self.sequence_like,
            Capability::BlobLike => &self.blob_like,
        }
    }
}

impl Default for TypeDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TypeDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeDispatcher")
            .field("config", &self.config)
            .field("types", &self.type_names())
            .finish()
    }
}
