//! Schema-aware in-memory document model.
//! Classifier hierarchy, typed assignment, query matching, selector-based
//! mutation and mixin views over physical-key document layouts.

pub mod config;
pub mod error;
pub mod logging;
pub mod model;
pub mod mutation;
pub mod query;
pub mod schema;
pub mod store;
pub mod view;

pub use config::ModelOptions;
pub use error::{ModelError, ModelResult};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::classifier::{Attribute, AttributeType, Classifier, ClassifierId, ClassifierKind};
pub use model::document::{DocId, Document, Layout, LayoutSource};
pub use model::key::PhysicalKey;
pub use mutation::assign::Assigner;
pub use mutation::ops::Mutator;
pub use mutation::selector::{navigate, Navigation, PathStep, SelectorStep, Slot};
pub use query::matcher::{match_object, match_query, match_value, ValueMatch};
pub use schema::hierarchy::{Hierarchy, ResolvedAttribute};
pub use store::instance_store::Model;
pub use store::snapshot::{
    load_snapshot, read_snapshot, write_snapshot, ModelSnapshot, SnapshotError, SnapshotResult,
};
pub use view::mixin_view::{is_mixed_in, AccessorTable, DocView, DocViewMut, ViewBuilder};

/// Minimal health-check API for host integration probes.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
