//! # memokey-core: Foundational Types
//!
//! This crate is the leaf of the memokey workspace. It defines the value
//! model, the digest type, the forkable hash accumulator, configuration,
//! and the error taxonomy. It depends on nothing internal.
//!
//! ## Key Design Principles
//!
//! 1. **Closed value model.** [`Value`] enumerates every kind the engine
//!    understands. Exactly one variant, [`Value::Opaque`], is open to
//!    externally-defined types.
//!
//! 2. **Type tags everywhere.** Every accumulator is seeded with
//!    [`typename::type_tag`] of the value's type name, so `0`, `false`,
//!    `0.0`, `"0"` and `null` never share a digest.
//!
//! 3. **Pluggable primitive.** [`HashAccumulator`] talks to the hash
//!    function only through [`HashPrimitive`]; SHA-256 and BLAKE3 are
//!    provided.
//!
//! ## Crate Policy
//!
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod accumulator;
pub mod config;
pub mod digest;
pub mod error;
pub mod typename;
pub mod value;

// Re-export primary types for ergonomic imports.
pub use accumulator::{HashAccumulator, HashPrimitive};
pub use config::MemokeyConfig;
pub use digest::{Digest, HashAlgorithm, DIGEST_LEN};
pub use error::{ConfigError, DigestParseError, MemokeyError};
pub use typename::{full_type_name, TypeKey};
pub use value::{Mapping, OpaqueRef, OpaqueValue, Value, ValueKind, ValueSet};
