//! Construction-time options for a model instance.

/// Behavior switches for one [`crate::Model`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ModelOptions {
    /// Reject non-array input for `ArrayOf` attributes instead of storing
    /// it raw. Off by default because partial/raw payloads rely on the
    /// permissive copy.
    pub strict_array_input: bool,
}

impl ModelOptions {
    pub fn strict() -> Self {
        Self {
            strict_array_input: true,
        }
    }
}
