//! # memokey-tensor: Numeric Container Types
//!
//! Opaque value types for dense numeric arrays and columnar tables, with
//! the handlers that serialize them for the digest engine. Nothing is
//! registered implicitly; call [`register`] on each dispatcher that should
//! know these types.
//!
//! ## Known Imprecision
//!
//! Table encodings cannot tell `NaN`, `inf` and `-inf` apart: the columnar
//! layout writes them as null slots and the JSON fallback as `null`. Dense
//! arrays keep exact float bits.

pub mod array;
pub mod error;
pub mod handlers;
pub mod table;

use std::sync::Arc;

use memokey_engine::TypeDispatcher;

pub use array::{ArrayData, DenseArray};
pub use error::SerializeError;
pub use handlers::{DenseArrayHandler, TableHandler};
pub use table::{Column, Table, TableKind};

/// Register the [`DenseArray`] and [`Table`] handlers on `dispatcher`.
pub fn register(dispatcher: &TypeDispatcher) {
    dispatcher.register_type::<DenseArray>(Arc::new(DenseArrayHandler));
    dispatcher.register_type::<Table>(Arc::new(TableHandler));
}
