//! Runtime class identity of listener handlers.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use harmony_core::types::ClassId;

/// The runtime class identity of a handler.
///
/// Two `HandlerClass` values are equal only when they carry the same
/// [`ClassId`]. Reloading a class keeps its name but produces a new
/// identity, so a pre-reload and a post-reload class never compare equal.
#[derive(Debug, Clone)]
pub struct HandlerClass {
    id: ClassId,
    name: Arc<str>,
}

impl HandlerClass {
    /// Defines the first generation of a class.
    pub fn define(name: impl Into<Arc<str>>) -> Self {
        Self {
            id: ClassId::new(),
            name: name.into(),
        }
    }

    /// Produces the next generation of this class: same name, new identity.
    pub fn redefine(&self) -> Self {
        Self {
            id: ClassId::new(),
            name: Arc::clone(&self.name),
        }
    }

    /// Returns the identity token.
    pub fn id(&self) -> ClassId {
        self.id
    }

    /// Returns the fully-qualified class name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns whether both identities share a class name.
    pub fn same_name(&self, other: &HandlerClass) -> bool {
        self.name == other.name
    }
}

impl PartialEq for HandlerClass {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for HandlerClass {}

impl Hash for HandlerClass {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for HandlerClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.name, self.id)
    }
}
