//! Classifier hierarchy with cached attribute resolution.

use crate::error::{ModelError, ModelResult};
use crate::model::classifier::{Attribute, Classifier, ClassifierId, ClassifierKind};
use crate::model::document::{layout_class, Layout, MIXINS_KEY};
use crate::model::key::{is_valid_identifier, PhysicalKey};
use log::info;
use serde_json::Value;
use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::rc::Rc;

/// Attribute found by walking an `extends` chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedAttribute {
    pub attribute: Attribute,
    /// Classifier that declares the attribute.
    pub owner: ClassifierId,
    pub key: PhysicalKey,
}

impl ResolvedAttribute {
    /// Wire form of `key`, as stored in layouts.
    pub fn wire_key(&self) -> String {
        self.key.to_wire()
    }

    pub fn element_class(&self) -> Option<&str> {
        self.attribute.ty.element_class()
    }
}

/// Registry of classifiers for one loaded model.
#[derive(Debug, Default)]
pub struct Hierarchy {
    classifiers: BTreeMap<ClassifierId, Classifier>,
    resolved: RefCell<HashMap<(ClassifierId, String), Rc<ResolvedAttribute>>>,
}

impl Hierarchy {
    /// Builds a hierarchy from a bulk classifier load.
    ///
    /// # Errors
    /// - `InvalidIdentifier` for blank ids/names or ones using reserved
    ///   key characters.
    /// - `AlreadyExists` for a duplicate classifier id, or a duplicate
    ///   attribute name within one classifier.
    /// - `NotFound` when `extends` names an unknown classifier.
    /// - `CyclicInheritance` when an `extends` chain loops.
    pub fn load_model(classifiers: impl IntoIterator<Item = Classifier>) -> ModelResult<Self> {
        let mut entries = BTreeMap::new();
        for classifier in classifiers {
            if !is_valid_identifier(&classifier.id) {
                return Err(ModelError::InvalidIdentifier(classifier.id));
            }
            let mut names = BTreeSet::new();
            for attribute in &classifier.attributes {
                if !is_valid_identifier(&attribute.name) || attribute.name.starts_with('_') {
                    return Err(ModelError::InvalidIdentifier(attribute.name.clone()));
                }
                if !names.insert(attribute.name.as_str()) {
                    return Err(ModelError::AlreadyExists(format!(
                        "{}.{}",
                        classifier.id, attribute.name
                    )));
                }
            }
            if entries.contains_key(&classifier.id) {
                return Err(ModelError::AlreadyExists(classifier.id));
            }
            entries.insert(classifier.id.clone(), classifier);
        }

        for classifier in entries.values() {
            let mut seen = BTreeSet::new();
            let mut current = classifier;
            while let Some(parent) = current.extends.as_deref() {
                if !seen.insert(current.id.as_str()) {
                    return Err(ModelError::CyclicInheritance(classifier.id.clone()));
                }
                current = entries
                    .get(parent)
                    .ok_or_else(|| ModelError::NotFound(parent.to_string()))?;
            }
        }

        let mixins = entries.values().filter(|c| c.is_mixin()).count();
        info!(
            "event=model_load module=schema status=ok classifiers={} mixins={}",
            entries.len(),
            mixins
        );

        Ok(Self {
            classifiers: entries,
            resolved: RefCell::new(HashMap::new()),
        })
    }

    pub fn len(&self) -> usize {
        self.classifiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classifiers.is_empty()
    }

    pub fn classifiers(&self) -> impl Iterator<Item = &Classifier> {
        self.classifiers.values()
    }

    pub fn find(&self, id: &str) -> Option<&Classifier> {
        self.classifiers.get(id)
    }

    pub fn get(&self, id: &str) -> ModelResult<&Classifier> {
        self.find(id)
            .ok_or_else(|| ModelError::NotFound(id.to_string()))
    }

    pub fn kind(&self, id: &str) -> ModelResult<ClassifierKind> {
        Ok(self.get(id)?.kind)
    }

    pub fn is_mixin(&self, id: &str) -> bool {
        self.find(id).is_some_and(Classifier::is_mixin)
    }

    /// Iterates `id` and then each classifier up its `extends` chain.
    ///
    /// Yields nothing when `id` is unknown.
    pub fn ancestors<'a>(&'a self, id: &str) -> Ancestors<'a> {
        Ancestors {
            hierarchy: self,
            next: self.find(id),
        }
    }

    /// Returns whether `class` equals `ancestor` or extends it transitively.
    pub fn is_subtype(&self, class: &str, ancestor: &str) -> bool {
        self.ancestors(class).any(|c| c.id == ancestor)
    }

    /// Finds the classifier declaring `name`, starting at `start` and
    /// walking `extends` upward, and computes its physical key.
    ///
    /// # Errors
    /// - `NotFound` when `start` is unknown.
    /// - `AttributeNotFound` when no classifier in the chain declares `name`.
    pub fn resolve_attribute(&self, start: &str, name: &str) -> ModelResult<Rc<ResolvedAttribute>> {
        self.get(start)?;
        let cache_key = (start.to_string(), name.to_string());
        if let Some(hit) = self.resolved.borrow().get(&cache_key) {
            return Ok(Rc::clone(hit));
        }

        let resolved = self
            .ancestors(start)
            .find_map(|classifier| {
                classifier.own_attribute(name).map(|attribute| ResolvedAttribute {
                    attribute: attribute.clone(),
                    owner: classifier.id.clone(),
                    key: classifier.physical_key(name),
                })
            })
            .map(Rc::new)
            .ok_or_else(|| ModelError::AttributeNotFound {
                class: start.to_string(),
                attribute: name.to_string(),
            })?;

        self.resolved
            .borrow_mut()
            .insert(cache_key, Rc::clone(&resolved));
        Ok(resolved)
    }

    /// Resolves a layout or query key against `class`.
    ///
    /// Keys already in mixin wire form (`name|mixin`) resolve against the
    /// mixin they name instead of `class`.
    pub fn resolve_key(&self, class: &str, key: &str) -> ModelResult<Rc<ResolvedAttribute>> {
        match PhysicalKey::parse(key) {
            PhysicalKey::Mixin { mixin, name } => self.resolve_attribute(&mixin, &name),
            PhysicalKey::Plain(_) => self.resolve_attribute(class, key),
        }
    }

    /// Lists own and inherited attributes of `id`, nearest declaration first.
    ///
    /// A name declared on both a classifier and its ancestor is reported once,
    /// from the nearest declaration.
    pub fn all_attributes(&self, id: &str) -> ModelResult<Vec<Rc<ResolvedAttribute>>> {
        self.get(id)?;
        let mut seen = BTreeSet::new();
        let mut attributes = Vec::new();
        for classifier in self.ancestors(id) {
            for attribute in &classifier.attributes {
                if seen.insert(attribute.name.as_str()) {
                    attributes.push(self.resolve_attribute(id, &attribute.name)?);
                }
            }
        }
        Ok(attributes)
    }

    /// Returns the storage domain declared by `class` or its nearest ancestor.
    pub fn resolve_domain(&self, class: &str) -> ModelResult<&str> {
        self.get(class)?;
        self.ancestors(class)
            .find_map(|c| c.domain.as_deref())
            .ok_or_else(|| ModelError::NoDomain(class.to_string()))
    }

    /// Class an embedded `layout` is typed by: its own `_class` tag when that
    /// extends `declared` (or nothing is declared), `declared` otherwise.
    pub fn embedded_class<'a>(
        &self,
        declared: Option<&'a str>,
        layout: &'a Layout,
    ) -> Option<&'a str> {
        let tagged = layout_class(layout)
            .filter(|tagged| declared.map_or(true, |declared| self.is_subtype(tagged, declared)));
        tagged.or(declared)
    }

    /// Checks an applied-mixins value for a document of `class`.
    ///
    /// # Errors
    /// - `InvalidDocument` unless `mixins` is an array of strings.
    /// - `NotFound`, `NotAMixin` or `IncompatibleMixin` for an entry that
    ///   cannot be applied to `class`.
    pub fn validate_mixins(&self, class: &str, mixins: &Value) -> ModelResult<()> {
        let Value::Array(items) = mixins else {
            return Err(ModelError::InvalidDocument(format!(
                "`{MIXINS_KEY}` must be an array"
            )));
        };
        for item in items {
            let Some(mixin) = item.as_str() else {
                return Err(ModelError::InvalidDocument(format!(
                    "`{MIXINS_KEY}` entries must be strings"
                )));
            };
            if self.kind(mixin)? != ClassifierKind::Mixin {
                return Err(ModelError::NotAMixin(mixin.to_string()));
            }
            if !self.is_subtype(class, self.resolve_concrete_class(mixin)?) {
                return Err(ModelError::IncompatibleMixin {
                    mixin: mixin.to_string(),
                    class: class.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Walks `extends` from `id` until a CLASS classifier is found.
    pub fn resolve_concrete_class(&self, id: &str) -> ModelResult<&str> {
        self.get(id)?;
        self.ancestors(id)
            .find(|c| c.kind == ClassifierKind::Class)
            .map(|c| c.id.as_str())
            .ok_or_else(|| ModelError::NotFound(format!("concrete class of {id}")))
    }
}

/// Iterator over an `extends` chain, see [`Hierarchy::ancestors`].
pub struct Ancestors<'a> {
    hierarchy: &'a Hierarchy,
    next: Option<&'a Classifier>,
}

impl<'a> Iterator for Ancestors<'a> {
    type Item = &'a Classifier;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next.take()?;
        let hierarchy = self.hierarchy;
        self.next = current
            .extends
            .as_deref()
            .and_then(|parent| hierarchy.find(parent));
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::Hierarchy;
    use crate::error::ModelError;
    use crate::model::classifier::{AttributeType, Classifier};

    #[test]
    fn resolve_attribute_uses_cache_consistently() {
        let hierarchy = Hierarchy::load_model([
            Classifier::class("core.class.Doc").attribute("title", AttributeType::String),
            Classifier::class("task.class.Task").extends("core.class.Doc"),
        ])
        .unwrap();

        let first = hierarchy.resolve_attribute("task.class.Task", "title").unwrap();
        let second = hierarchy.resolve_attribute("task.class.Task", "title").unwrap();
        assert!(std::rc::Rc::ptr_eq(&first, &second));
        assert_eq!(first.owner, "core.class.Doc");
    }

    #[test]
    fn embedded_class_prefers_compatible_tag() {
        let hierarchy = Hierarchy::load_model([
            Classifier::class("SubTask"),
            Classifier::class("UrgentSubTask").extends("SubTask"),
            Classifier::class("Other"),
        ])
        .unwrap();
        let urgent = serde_json::json!({"_class": "UrgentSubTask"});
        let other = serde_json::json!({"_class": "Other"});

        let urgent = urgent.as_object().unwrap();
        let other = other.as_object().unwrap();
        assert_eq!(hierarchy.embedded_class(Some("SubTask"), urgent), Some("UrgentSubTask"));
        assert_eq!(hierarchy.embedded_class(Some("SubTask"), other), Some("SubTask"));
        assert_eq!(hierarchy.embedded_class(None, other), Some("Other"));
    }

    #[test]
    fn load_rejects_self_extending_classifier() {
        let err = Hierarchy::load_model([Classifier::class("a").extends("a")]).unwrap_err();
        assert_eq!(err, ModelError::CyclicInheritance("a".to_string()));
    }

    #[test]
    fn load_rejects_reserved_attribute_names() {
        let err = Hierarchy::load_model([
            Classifier::class("a").attribute("_id", AttributeType::String)
        ])
        .unwrap_err();
        assert_eq!(err, ModelError::InvalidIdentifier("_id".to_string()));
    }
}
