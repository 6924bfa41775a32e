//! Selector navigation into nested embedded objects.
//!
//! # Responsibility
//! - Resolve a `{key, pattern?}` path to the node a mutation targets.
//! - Report locations as index paths so resolution runs on a shared borrow
//!   and the mutation step can re-enter the layout mutably.
//!
//! # Invariants
//! - Only the last segment may omit its pattern.
//! - `parent` always names the object that physically owns the target slot.

use crate::error::{ModelError, ModelResult};
use crate::model::classifier::{AttributeType, ClassifierId};
use crate::model::document::Layout;
use crate::query::matcher::match_value;
use crate::schema::hierarchy::{Hierarchy, ResolvedAttribute};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::rc::Rc;

/// One step of a selector path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectorStep {
    /// Attribute name (or mixin wire key) on the current object.
    pub key: String,
    /// Query matched against the attribute value to pick the next node.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<Value>,
}

impl SelectorStep {
    /// Names a field on the current object without descending into it.
    pub fn field(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            pattern: None,
        }
    }

    /// Descends into the value (or array element) matching `pattern`.
    pub fn matching(key: impl Into<String>, pattern: Value) -> Self {
        Self {
            key: key.into(),
            pattern: Some(pattern),
        }
    }
}

/// One hop inside a layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathStep {
    Field(String),
    Index(usize),
}

/// Location of a pattern-matched value inside its parent object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slot {
    /// Wire key on the parent.
    pub key: String,
    /// Array position, when the value is an array element.
    pub index: Option<usize>,
}

/// Outcome of a successful navigation.
#[derive(Debug, Clone)]
pub struct Navigation {
    pub target: Vec<PathStep>,
    /// `None` when the target is not an embedded object.
    pub target_class: Option<ClassifierId>,
    pub parent: Vec<PathStep>,
    pub parent_class: ClassifierId,
    /// Attribute named by the last segment; `None` for an empty selector.
    pub attribute: Option<Rc<ResolvedAttribute>>,
    /// Set when the last segment carried a pattern.
    pub element: Option<Slot>,
}

/// Walks `selector` from `root`.
///
/// An empty selector targets the root itself. A last segment without a
/// pattern targets the current object and names the attribute on it. A
/// segment with a pattern matches the attribute value with existential
/// (non-full) semantics and continues from the matched object.
///
/// # Errors
/// - `PatternRequired` for a pattern-less segment that is not last.
/// - `SelectorMismatch` when a pattern matches nothing.
/// - `InvalidAttributeType` when a pattern targets a `BagOf` attribute, or
///   navigation must continue through a non-object value.
/// - `AttributeNotFound` when a key is not declared on the current class.
pub fn navigate(
    hierarchy: &Hierarchy,
    root_class: &str,
    root: &Layout,
    selector: &[SelectorStep],
) -> ModelResult<Navigation> {
    let mut current = root;
    let mut current_class = root_class.to_string();
    let mut current_path = Vec::new();
    let mut previous_path = Vec::new();
    let mut previous_class = root_class.to_string();

    for (position, step) in selector.iter().enumerate() {
        let last = position + 1 == selector.len();
        let resolved = hierarchy.resolve_key(&current_class, &step.key)?;

        let Some(pattern) = step.pattern.as_ref() else {
            if !last {
                return Err(ModelError::PatternRequired {
                    key: step.key.clone(),
                });
            }
            return Ok(Navigation {
                target: current_path,
                target_class: Some(current_class),
                parent: previous_path,
                parent_class: previous_class,
                attribute: Some(resolved),
                element: None,
            });
        };

        if matches!(resolved.attribute.ty, AttributeType::BagOf { .. }) {
            return Err(ModelError::InvalidAttributeType {
                attribute: step.key.clone(),
                expected: "an array or embedded object",
            });
        }

        let wire_key = resolved.wire_key();
        let mismatch = || ModelError::SelectorMismatch {
            key: step.key.clone(),
        };
        let raw = current.get(&wire_key).ok_or_else(mismatch)?;
        let outcome = match_value(hierarchy, resolved.element_class(), raw, pattern, false)?;
        if !outcome.matched {
            return Err(mismatch());
        }

        let mut element_path = current_path.clone();
        element_path.push(PathStep::Field(wire_key.clone()));
        let element = match outcome.element {
            Some(index) => {
                element_path.push(PathStep::Index(index));
                raw.get(index).ok_or_else(mismatch)?
            }
            None => raw,
        };
        let element_class = match element {
            Value::Object(fields) => hierarchy
                .embedded_class(resolved.element_class(), fields)
                .map(str::to_string),
            _ => None,
        };

        if last {
            return Ok(Navigation {
                target: element_path,
                target_class: element_class,
                parent: current_path,
                parent_class: current_class,
                attribute: Some(resolved),
                element: Some(Slot {
                    key: wire_key,
                    index: outcome.element,
                }),
            });
        }

        let (Value::Object(fields), Some(class)) = (element, element_class) else {
            return Err(ModelError::InvalidAttributeType {
                attribute: step.key.clone(),
                expected: "an embedded object",
            });
        };
        previous_path = std::mem::replace(&mut current_path, element_path);
        previous_class = std::mem::replace(&mut current_class, class);
        current = fields;
    }

    Ok(Navigation {
        target: Vec::new(),
        target_class: Some(root_class.to_string()),
        parent: Vec::new(),
        parent_class: root_class.to_string(),
        attribute: None,
        element: None,
    })
}

/// Follows `path` to a nested object.
pub fn layout_at_mut<'a>(root: &'a mut Layout, path: &[PathStep]) -> Option<&'a mut Layout> {
    let Some((first, rest)) = path.split_first() else {
        return Some(root);
    };
    let PathStep::Field(key) = first else {
        return None;
    };
    let mut value = root.get_mut(key)?;
    for step in rest {
        value = match step {
            PathStep::Field(key) => value.as_object_mut()?.get_mut(key)?,
            PathStep::Index(index) => value.as_array_mut()?.get_mut(*index)?,
        };
    }
    value.as_object_mut()
}
