//! Instance store and snapshot persistence.
//!
//! # Responsibility
//! - Provide the top-level document collection callers replay transactions
//!   into.
//! - Round-trip classifiers and documents through JSON snapshots.
//!
//! # Invariants
//! - Snapshot restore goes through the same validation as bulk load.

pub mod instance_store;
pub mod snapshot;
