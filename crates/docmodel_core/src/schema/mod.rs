//! Type registry and attribute resolution.
//!
//! # Responsibility
//! - Own the loaded classifiers of one model instance.
//! - Walk `extends` chains for subtyping, attribute, domain and concrete
//!   class lookups.
//!
//! # Invariants
//! - Classifiers are immutable after `Hierarchy::load_model`.
//! - Every `extends` chain is acyclic and ends at a root.

pub mod hierarchy;
