//! Typed assignment of loose input values into physical layouts.
//!
//! # Invariants
//! - Output keys are physical wire keys; plain names are only used for
//!   attributes declared on a CLASS.
//! - Assigning an `ArrayOf(InstanceOf(..))` attribute always produces a new
//!   array from the input; existing elements are never merged.
//! - Every embedded object produced here carries its `_class` tag.

use crate::error::{ModelError, ModelResult};
use crate::model::classifier::AttributeType;
use crate::model::document::{layout_class, Layout, CLASS_KEY};
use crate::model::key::{is_internal_key, PhysicalKey};
use crate::schema::hierarchy::Hierarchy;
use serde_json::Value;

/// Recursive, schema-directed value normalizer.
#[derive(Debug, Clone, Copy)]
pub struct Assigner<'h> {
    hierarchy: &'h Hierarchy,
    strict_array_input: bool,
}

impl<'h> Assigner<'h> {
    pub fn new(hierarchy: &'h Hierarchy) -> Self {
        Self {
            hierarchy,
            strict_array_input: false,
        }
    }

    /// Rejects non-array input for `ArrayOf` attributes when enabled.
    pub fn strict_array_input(mut self, strict: bool) -> Self {
        self.strict_array_input = strict;
        self
    }

    /// Merges `values` into `target`, typed by `class`.
    ///
    /// - `_`-prefixed keys are copied verbatim.
    /// - `name|mixin` keys are assigned as `name` typed by `mixin`.
    /// - Other keys are resolved through the `extends` chain of `class`.
    ///
    /// `target` receives a `_class` tag (the concrete class of `class`) when
    /// it has none yet.
    ///
    /// # Errors
    /// - `NotFound` when `class` or a named mixin is unknown.
    /// - `AttributeNotFound` when a key is not declared in the chain.
    /// - `InvalidAttributeType` for non-array `ArrayOf` input in strict mode.
    pub fn assign(&self, target: &mut Layout, class: &str, values: &Layout) -> ModelResult<()> {
        if layout_class(target).is_none() {
            let concrete = self.hierarchy.resolve_concrete_class(class)?;
            target.insert(CLASS_KEY.to_string(), Value::String(concrete.to_string()));
        }

        for (key, value) in values {
            if is_internal_key(key) {
                target.insert(key.clone(), value.clone());
                continue;
            }

            if let PhysicalKey::Mixin { mixin, name } = PhysicalKey::parse(key) {
                let mut single = Layout::new();
                single.insert(name, value.clone());
                self.assign(target, &mixin, &single)?;
                continue;
            }

            let resolved = self.hierarchy.resolve_attribute(class, key)?;
            let typed = self.typed_value(&resolved.attribute.name, &resolved.attribute.ty, value)?;
            target.insert(resolved.wire_key(), typed);
        }
        Ok(())
    }

    /// Normalizes one value according to its declared type.
    ///
    /// Values that do not have the shape their type expects are copied raw,
    /// except non-array `ArrayOf` input in strict mode.
    pub fn typed_value(&self, name: &str, ty: &AttributeType, value: &Value) -> ModelResult<Value> {
        match (ty, value) {
            (AttributeType::ArrayOf { of }, Value::Array(items)) => match of.as_ref() {
                AttributeType::InstanceOf { of: class } => items
                    .iter()
                    .map(|item| self.embedded(class, item))
                    .collect::<ModelResult<Vec<_>>>()
                    .map(Value::Array),
                _ => Ok(value.clone()),
            },
            (AttributeType::ArrayOf { .. }, Value::Null) => Ok(Value::Null),
            (AttributeType::ArrayOf { .. }, _) if self.strict_array_input => {
                Err(ModelError::InvalidAttributeType {
                    attribute: name.to_string(),
                    expected: "an array",
                })
            }
            (AttributeType::InstanceOf { of: class }, Value::Object(_)) => {
                self.embedded(class, value)
            }
            (AttributeType::BagOf { of }, Value::Object(entries)) => match of.as_ref() {
                AttributeType::InstanceOf { of: class } => {
                    let mut bag = Layout::new();
                    for (bag_key, entry) in entries {
                        bag.insert(bag_key.clone(), self.embedded(class, entry)?);
                    }
                    Ok(Value::Object(bag))
                }
                _ => Ok(value.clone()),
            },
            _ => Ok(value.clone()),
        }
    }

    /// Builds a fresh embedded object typed by `class`, or by the input's own
    /// `_class` tag when that names a subclass of `class`.
    fn embedded(&self, class: &str, value: &Value) -> ModelResult<Value> {
        let Value::Object(fields) = value else {
            return Ok(value.clone());
        };
        let class = self
            .hierarchy
            .embedded_class(Some(class), fields)
            .unwrap_or(class);
        let mut layout = Layout::new();
        self.assign(&mut layout, class, fields)?;
        Ok(Value::Object(layout))
    }
}
