//! Classifier and attribute descriptors.
//!
//! # Responsibility
//! - Describe document shapes: classes, mixins and their own attributes.
//! - Provide small builders for assembling a model in code and tests.
//!
//! # Invariants
//! - `attributes` holds own attributes only; inherited ones are found by
//!   walking `extends`.
//! - Attribute names are unique within one classifier.

use crate::model::key::PhysicalKey;
use serde::{Deserialize, Serialize};

/// Identifier of a classifier, e.g. `tracker.class.Issue`.
pub type ClassifierId = String;

/// Whether a classifier is a primary class or an applicable mixin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassifierKind {
    Class,
    Mixin,
}

/// Declared value type of one attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AttributeType {
    String,
    Number,
    Boolean,
    /// Unix epoch milliseconds.
    Date,
    /// Identifier reference to another document.
    RefTo { to: ClassifierId },
    /// Nested embedded object typed by `of`.
    InstanceOf { of: ClassifierId },
    /// Ordered sequence of `of`-typed values.
    ArrayOf { of: Box<AttributeType> },
    /// Unordered keyed map of `of`-typed values.
    BagOf { of: Box<AttributeType> },
}

impl AttributeType {
    pub fn ref_to(to: impl Into<ClassifierId>) -> Self {
        Self::RefTo { to: to.into() }
    }

    pub fn instance_of(of: impl Into<ClassifierId>) -> Self {
        Self::InstanceOf { of: of.into() }
    }

    pub fn array_of(of: AttributeType) -> Self {
        Self::ArrayOf { of: Box::new(of) }
    }

    pub fn bag_of(of: AttributeType) -> Self {
        Self::BagOf { of: Box::new(of) }
    }

    /// Returns the embedded class that values (or elements) of this type
    /// are typed by, if any.
    ///
    /// `ArrayOf(InstanceOf(C))` and `BagOf(InstanceOf(C))` both yield `C`.
    pub fn element_class(&self) -> Option<&str> {
        match self {
            Self::InstanceOf { of } => Some(of.as_str()),
            Self::ArrayOf { of } | Self::BagOf { of } => of.element_class(),
            _ => None,
        }
    }

    pub fn is_array(&self) -> bool {
        matches!(self, Self::ArrayOf { .. })
    }
}

/// One named, typed attribute owned by a classifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: AttributeType,
}

impl Attribute {
    pub fn new(name: impl Into<String>, ty: AttributeType) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

/// Type descriptor for documents and embedded objects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classifier {
    pub id: ClassifierId,
    pub kind: ClassifierKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extends: Option<ClassifierId>,
    /// Storage partition; inherited from the nearest ancestor declaring one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(default)]
    pub attributes: Vec<Attribute>,
}

impl Classifier {
    /// Starts a CLASS descriptor with no parent and no attributes.
    pub fn class(id: impl Into<ClassifierId>) -> Self {
        Self::with_kind(id, ClassifierKind::Class)
    }

    /// Starts a MIXIN descriptor; callers must set `extends`.
    pub fn mixin(id: impl Into<ClassifierId>) -> Self {
        Self::with_kind(id, ClassifierKind::Mixin)
    }

    fn with_kind(id: impl Into<ClassifierId>, kind: ClassifierKind) -> Self {
        Self {
            id: id.into(),
            kind,
            extends: None,
            domain: None,
            attributes: Vec::new(),
        }
    }

    pub fn extends(mut self, parent: impl Into<ClassifierId>) -> Self {
        self.extends = Some(parent.into());
        self
    }

    pub fn domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    pub fn attribute(mut self, name: impl Into<String>, ty: AttributeType) -> Self {
        self.attributes.push(Attribute::new(name, ty));
        self
    }

    pub fn own_attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|attr| attr.name == name)
    }

    pub fn is_mixin(&self) -> bool {
        self.kind == ClassifierKind::Mixin
    }

    /// Storage key of attribute `name` when declared by this classifier.
    pub fn physical_key(&self, name: &str) -> PhysicalKey {
        match self.kind {
            ClassifierKind::Class => PhysicalKey::plain(name),
            ClassifierKind::Mixin => PhysicalKey::mixin(self.id.as_str(), name),
        }
    }
}
