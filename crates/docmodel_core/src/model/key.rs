//! Physical storage keys.
//!
//! # Responsibility
//! - Represent where an attribute's value lives inside a layout.
//! - Convert between the tagged form and the persisted wire string.
//!
//! # Invariants
//! - Class attributes are stored under their plain name.
//! - Mixin attributes are stored as `<name>|<mixin>` with every `.` in the
//!   mixin id replaced by `~`, so two mixins (or a mixin and its base
//!   class) declaring the same name never collide.
//! - `parse(to_wire(k)) == k` for every key built from valid identifiers.

use std::fmt::{Display, Formatter};

/// Separates attribute name and mixin id in wire keys.
pub const MIXIN_KEY_SEPARATOR: char = '|';
/// Replaces `.` inside mixin ids on the wire.
pub const MIXIN_ID_ESCAPE: char = '~';
/// Prefix of reserved identity/bookkeeping fields (`_id`, `_class`, ...).
pub const INTERNAL_PREFIX: char = '_';

/// Tagged storage key for one attribute value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PhysicalKey {
    Plain(String),
    Mixin { mixin: String, name: String },
}

impl PhysicalKey {
    pub fn plain(name: impl Into<String>) -> Self {
        Self::Plain(name.into())
    }

    pub fn mixin(mixin: impl Into<String>, name: impl Into<String>) -> Self {
        Self::Mixin {
            mixin: mixin.into(),
            name: name.into(),
        }
    }

    /// Decodes a wire key; keys without the separator are plain.
    pub fn parse(wire: &str) -> Self {
        match wire.split_once(MIXIN_KEY_SEPARATOR) {
            Some((name, mixin)) => Self::Mixin {
                mixin: mixin.replace(MIXIN_ID_ESCAPE, "."),
                name: name.to_string(),
            },
            None => Self::Plain(wire.to_string()),
        }
    }

    pub fn to_wire(&self) -> String {
        match self {
            Self::Plain(name) => name.clone(),
            Self::Mixin { mixin, name } => format!(
                "{name}{MIXIN_KEY_SEPARATOR}{}",
                mixin.replace('.', &MIXIN_ID_ESCAPE.to_string())
            ),
        }
    }

    /// Attribute name as declared on its owning classifier.
    pub fn name(&self) -> &str {
        match self {
            Self::Plain(name) => name,
            Self::Mixin { name, .. } => name,
        }
    }

    pub fn mixin_id(&self) -> Option<&str> {
        match self {
            Self::Plain(_) => None,
            Self::Mixin { mixin, .. } => Some(mixin),
        }
    }
}

impl Display for PhysicalKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_wire())
    }
}

/// Returns whether a wire key carries a mixin qualifier.
pub fn is_mixin_key(wire: &str) -> bool {
    wire.contains(MIXIN_KEY_SEPARATOR)
}

/// Returns whether a wire key names a reserved internal field.
pub fn is_internal_key(wire: &str) -> bool {
    wire.starts_with(INTERNAL_PREFIX)
}

/// Returns whether `value` may be used as a classifier id or attribute name.
pub fn is_valid_identifier(value: &str) -> bool {
    !value.trim().is_empty()
        && !value.contains(MIXIN_KEY_SEPARATOR)
        && !value.contains(MIXIN_ID_ESCAPE)
}
