//! Structural query matching.
//!
//! # Responsibility
//! - Evaluate Mongo-like query objects against documents and embedded
//!   values, resolving query keys through the classifier hierarchy.
//!
//! # Invariants
//! - Top-level query keys combine with AND semantics; there is no OR.
//! - An array query value always compares positionally; a non-array query
//!   value against an array always searches for any matching element.

pub mod matcher;
