//! Error contract shared by every document model operation.
//!
//! # Responsibility
//! - Give each failure mode of the model a distinct, matchable variant.
//! - Keep messages stable enough for callers to surface verbatim.
//!
//! # Invariants
//! - Every variant aborts the triggering operation; no partial mutation is
//!   visible after an error is returned.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub type ModelResult<T> = Result<T, ModelError>;

/// Failure raised by registry lookups, matching, and mutations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    /// Classifier or document id is not present.
    NotFound(String),
    /// Attribute name is not declared anywhere in the `extends` chain.
    AttributeNotFound { class: String, attribute: String },
    /// No classifier in the chain declares a storage domain.
    NoDomain(String),
    /// A selector segment before the last one has no pattern.
    PatternRequired { key: String },
    /// A selector pattern matched nothing at its path position.
    SelectorMismatch { key: String },
    /// Operation requested against an attribute of the wrong kind.
    InvalidAttributeType {
        attribute: String,
        expected: &'static str,
    },
    /// Selector resolution for set/pull found no target.
    ObjectNotFound,
    /// Document or classifier id is already registered.
    AlreadyExists(String),
    /// Identifier is blank or contains a reserved key character.
    InvalidIdentifier(String),
    /// An `extends` chain loops back onto itself.
    CyclicInheritance(String),
    /// `cast` target is not a mixin classifier.
    NotAMixin(String),
    /// Mixin base class is not an ancestor of the document's class.
    IncompatibleMixin { mixin: String, class: String },
    /// `$regex` pattern or `$options` failed to compile.
    InvalidRegex { pattern: String, message: String },
    /// Layout is missing a reserved field or has the wrong shape.
    InvalidDocument(String),
}

impl Display for ModelError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(id) => write!(f, "not found: {id}"),
            Self::AttributeNotFound { class, attribute } => {
                write!(f, "attribute `{attribute}` not found on `{class}`")
            }
            Self::NoDomain(class) => write!(f, "no domain declared for `{class}`"),
            Self::PatternRequired { key } => {
                write!(f, "selector segment `{key}` requires a pattern")
            }
            Self::SelectorMismatch { key } => {
                write!(f, "selector pattern for `{key}` matched nothing")
            }
            Self::InvalidAttributeType {
                attribute,
                expected,
            } => write!(f, "attribute `{attribute}` is not {expected}"),
            Self::ObjectNotFound => write!(f, "selector did not resolve to an object"),
            Self::AlreadyExists(id) => write!(f, "already exists: {id}"),
            Self::InvalidIdentifier(value) => write!(f, "invalid identifier `{value}`"),
            Self::CyclicInheritance(id) => write!(f, "cyclic extends chain at `{id}`"),
            Self::NotAMixin(id) => write!(f, "classifier `{id}` is not a mixin"),
            Self::IncompatibleMixin { mixin, class } => {
                write!(f, "mixin `{mixin}` cannot be applied to class `{class}`")
            }
            Self::InvalidRegex { pattern, message } => {
                write!(f, "invalid $regex `{pattern}`: {message}")
            }
            Self::InvalidDocument(message) => write!(f, "invalid document: {message}"),
        }
    }
}

impl Error for ModelError {}
