//! Schema-aware document model types.
//!
//! # Responsibility
//! - Define classifiers, attributes and their value types.
//! - Define documents as physical-key layouts and the tagged key type.
//!
//! # Invariants
//! - Mixin attribute values live under mixin-qualified keys, never under
//!   the plain attribute name.
//! - Every document names a CLASS classifier in `_class`.

pub mod classifier;
pub mod document;
pub mod key;
