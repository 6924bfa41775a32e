//! Document and embedded object layouts.
//!
//! # Responsibility
//! - Hold document values in their persisted, physical-key layout.
//! - Expose typed accessors for the reserved identity fields.
//!
//! # Invariants
//! - `_id` and `_class` are always present on a stored document.
//! - `_class` names a CLASS classifier, never a mixin.
//! - `_mixins`, when present, is an array of mixin ids without duplicates.

use crate::error::{ModelError, ModelResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Identity field.
pub const ID_KEY: &str = "_id";
/// Concrete class of a document or embedded object.
pub const CLASS_KEY: &str = "_class";
/// Applied mixin ids.
pub const MIXINS_KEY: &str = "_mixins";

/// Stable document identifier.
pub type DocId = String;

/// Flat value layout keyed by physical wire keys.
pub type Layout = Map<String, Value>;

/// Anything that can be read as a backing layout.
///
/// Implemented by raw layouts, documents and mixin views, so matching code
/// can accept a view and operate on the storage underneath it.
pub trait LayoutSource {
    fn layout(&self) -> &Layout;
}

impl LayoutSource for Layout {
    fn layout(&self) -> &Layout {
        self
    }
}

/// Returns the `_class` tag of a layout, if set.
pub fn layout_class(layout: &Layout) -> Option<&str> {
    layout.get(CLASS_KEY).and_then(Value::as_str)
}

/// Top-level document with identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Document {
    layout: Layout,
}

impl Document {
    /// Wraps a layout after checking its identity fields.
    pub fn from_layout(layout: Layout) -> ModelResult<Self> {
        let document = Self { layout };
        document.validate()?;
        Ok(document)
    }

    /// Checks reserved identity fields.
    pub fn validate(&self) -> ModelResult<()> {
        if !matches!(self.layout.get(ID_KEY), Some(Value::String(_))) {
            return Err(ModelError::InvalidDocument(format!(
                "`{ID_KEY}` must be a string"
            )));
        }
        if layout_class(&self.layout).is_none() {
            return Err(ModelError::InvalidDocument(format!(
                "`{CLASS_KEY}` must be a string"
            )));
        }
        match self.layout.get(MIXINS_KEY) {
            None | Some(Value::Array(_)) => Ok(()),
            Some(_) => Err(ModelError::InvalidDocument(format!(
                "`{MIXINS_KEY}` must be an array"
            ))),
        }
    }

    pub fn id(&self) -> &str {
        self.layout
            .get(ID_KEY)
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    pub fn class(&self) -> &str {
        layout_class(&self.layout).unwrap_or_default()
    }

    /// Applied mixin ids, in application order.
    pub fn mixins(&self) -> Vec<&str> {
        match self.layout.get(MIXINS_KEY) {
            Some(Value::Array(items)) => items.iter().filter_map(Value::as_str).collect(),
            _ => Vec::new(),
        }
    }

    pub fn is_mixed_in(&self, mixin: &str) -> bool {
        self.mixins().contains(&mixin)
    }

    /// Appends `mixin` to `_mixins`; returns `false` if already applied.
    pub fn add_mixin(&mut self, mixin: &str) -> bool {
        if self.is_mixed_in(mixin) {
            return false;
        }
        let entry = self
            .layout
            .entry(MIXINS_KEY)
            .or_insert_with(|| Value::Array(Vec::new()));
        match entry {
            Value::Array(items) => items.push(Value::String(mixin.to_string())),
            other => *other = Value::Array(vec![Value::String(mixin.to_string())]),
        }
        true
    }

    pub fn get(&self, wire_key: &str) -> Option<&Value> {
        self.layout.get(wire_key)
    }

    pub fn layout_mut(&mut self) -> &mut Layout {
        &mut self.layout
    }

    pub fn into_layout(self) -> Layout {
        self.layout
    }
}

impl LayoutSource for Document {
    fn layout(&self) -> &Layout {
        &self.layout
    }
}
