//! Typed assignment, selector navigation and in-place mutations.
//!
//! # Responsibility
//! - Normalize loose input into physical-key layouts (`assign`).
//! - Locate nested embedded objects and array elements by selector.
//! - Apply set/push/pull at the located node without replacing the whole
//!   document.
//!
//! # Invariants
//! - Mutations touch only the addressed node; derived state elsewhere is
//!   never updated from here.

pub mod assign;
pub mod ops;
pub mod selector;
