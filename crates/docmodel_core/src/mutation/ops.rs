//! Set, push and pull at selector-resolved nodes.
//!
//! # Invariants
//! - The selector is fully resolved before anything is written.
//! - A failed operation leaves the layout untouched.

use crate::error::{ModelError, ModelResult};
use crate::model::classifier::AttributeType;
use crate::model::document::{Layout, CLASS_KEY, ID_KEY, MIXINS_KEY};
use crate::mutation::assign::Assigner;
use crate::mutation::selector::{layout_at_mut, navigate, SelectorStep};
use crate::schema::hierarchy::Hierarchy;
use serde_json::Value;

/// Applies in-place mutations to a root layout.
#[derive(Debug, Clone, Copy)]
pub struct Mutator<'h> {
    hierarchy: &'h Hierarchy,
    assigner: Assigner<'h>,
}

impl<'h> Mutator<'h> {
    pub fn new(hierarchy: &'h Hierarchy, assigner: Assigner<'h>) -> Self {
        Self {
            hierarchy,
            assigner,
        }
    }

    /// Merges `values` into the selected node, typed by the node's class.
    ///
    /// `_id` and `_class` are never rewritten, whatever the selector shape.
    /// `_mixins` may only be set on the root and must name mixins
    /// applicable to the root class.
    ///
    /// # Errors
    /// - `ObjectNotFound` when a selector pattern matches nothing.
    /// - `InvalidAttributeType` when the node is not an embedded object.
    /// - `InvalidDocument` for identity fields in `values`, or `_mixins`
    ///   below the root.
    /// - Any assignment error; the node is then left as it was.
    pub fn set(
        &self,
        root_class: &str,
        root: &mut Layout,
        selector: &[SelectorStep],
        values: &Layout,
    ) -> ModelResult<()> {
        let navigation =
            navigate(self.hierarchy, root_class, root, selector).map_err(object_not_found)?;
        let Some(class) = navigation.target_class else {
            return Err(ModelError::InvalidAttributeType {
                attribute: last_key(selector),
                expected: "an embedded object",
            });
        };
        if let Some(key) = [ID_KEY, CLASS_KEY]
            .into_iter()
            .find(|key| values.contains_key(*key))
        {
            return Err(ModelError::InvalidDocument(format!(
                "`{key}` cannot be changed by set"
            )));
        }
        if let Some(mixins) = values.get(MIXINS_KEY) {
            if !navigation.target.is_empty() {
                return Err(ModelError::InvalidDocument(format!(
                    "`{MIXINS_KEY}` only applies to the document root"
                )));
            }
            self.hierarchy.validate_mixins(root_class, mixins)?;
        }
        let target = layout_at_mut(root, &navigation.target).ok_or(ModelError::ObjectNotFound)?;

        let mut scratch = target.clone();
        self.assigner.assign(&mut scratch, &class, values)?;
        *target = scratch;
        Ok(())
    }

    /// Appends one typed element to the `ArrayOf` attribute named by the
    /// last selector segment, creating the array when absent.
    ///
    /// # Errors
    /// - `InvalidAttributeType` when the selector is empty or names a
    ///   non-array attribute.
    pub fn push(
        &self,
        root_class: &str,
        root: &mut Layout,
        selector: &[SelectorStep],
        value: &Value,
    ) -> ModelResult<()> {
        let navigation = navigate(self.hierarchy, root_class, root, selector)?;
        let not_array = || ModelError::InvalidAttributeType {
            attribute: last_key(selector),
            expected: "an array",
        };
        let Some(resolved) = navigation.attribute else {
            return Err(not_array());
        };
        let AttributeType::ArrayOf { of } = &resolved.attribute.ty else {
            return Err(not_array());
        };

        let element = self
            .assigner
            .typed_value(&resolved.attribute.name, of, value)?;
        let owner_path = if navigation.element.is_some() {
            &navigation.parent
        } else {
            &navigation.target
        };
        let owner = layout_at_mut(root, owner_path).ok_or(ModelError::ObjectNotFound)?;
        match owner
            .entry(resolved.wire_key())
            .or_insert_with(|| Value::Array(Vec::new()))
        {
            Value::Array(items) => {
                items.push(element);
                Ok(())
            }
            _ => Err(not_array()),
        }
    }

    /// Removes the element matched by the last selector segment: spliced out
    /// of its array for `ArrayOf`, or the field deleted for `InstanceOf`.
    ///
    /// # Errors
    /// - `ObjectNotFound` when the selector is empty, its last segment has no
    ///   pattern, or a pattern matches nothing.
    /// - `InvalidAttributeType` for any other attribute kind.
    pub fn pull(
        &self,
        root_class: &str,
        root: &mut Layout,
        selector: &[SelectorStep],
    ) -> ModelResult<()> {
        let navigation =
            navigate(self.hierarchy, root_class, root, selector).map_err(object_not_found)?;
        let (Some(resolved), Some(slot)) = (navigation.attribute, navigation.element) else {
            return Err(ModelError::ObjectNotFound);
        };
        let parent = layout_at_mut(root, &navigation.parent).ok_or(ModelError::ObjectNotFound)?;

        match &resolved.attribute.ty {
            AttributeType::ArrayOf { .. } => {
                let Some(index) = slot.index else {
                    return Err(ModelError::ObjectNotFound);
                };
                match parent.get_mut(&slot.key) {
                    Some(Value::Array(items)) if index < items.len() => {
                        items.remove(index);
                        Ok(())
                    }
                    _ => Err(ModelError::ObjectNotFound),
                }
            }
            AttributeType::InstanceOf { .. } => parent
                .remove(&slot.key)
                .map(|_| ())
                .ok_or(ModelError::ObjectNotFound),
            _ => Err(ModelError::InvalidAttributeType {
                attribute: last_key(selector),
                expected: "an array or embedded object",
            }),
        }
    }
}

fn object_not_found(err: ModelError) -> ModelError {
    match err {
        ModelError::SelectorMismatch { .. } => ModelError::ObjectNotFound,
        other => other,
    }
}

fn last_key(selector: &[SelectorStep]) -> String {
    selector
        .last()
        .map(|step| step.key.clone())
        .unwrap_or_default()
}
