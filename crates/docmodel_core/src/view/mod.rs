//! Mixin views over document layouts.
//!
//! # Responsibility
//! - Build accessor tables mapping declared attribute names to physical
//!   keys, once per classifier.
//! - Expose a document "as" a mixin (or class) without copying it.
//!
//! # Invariants
//! - Views borrow the document layout; writes through a view are writes to
//!   the document.
//! - A mixin view reports the mixin id as its class.

pub mod mixin_view;
