//! Named prototype definitions.

use std::collections::HashMap;

use crate::rwx::command::{CommandError, CommandResult};
use crate::scene::NodeId;

/// A registered prototype: a detached node holding its geometry and clumps.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PrototypeEntry {
    pub node: NodeId,

    /// Set once `protoend` closes the definition
    pub finalized: bool,
}

/// Prototype name -> definition, scoped to one interpretation run.
#[derive(Clone, Debug, Default)]
pub struct PrototypeRegistry {
    entries: HashMap<String, PrototypeEntry>,
}

impl PrototypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a definition in progress. A later definition with the same
    /// name replaces the earlier one.
    pub fn begin(&mut self, name: &str, node: NodeId) -> Option<PrototypeEntry> {
        self.entries.insert(
            name.to_string(),
            PrototypeEntry {
                node,
                finalized: false,
            },
        )
    }

    /// Mark a definition as complete.
    pub fn finalize(&mut self, name: &str) {
        if let Some(entry) = self.entries.get_mut(name) {
            entry.finalized = true;
        }
    }

    /// Look up a prototype that is safe to instance.
    pub fn resolve(&self, name: &str) -> CommandResult<NodeId> {
        match self.entries.get(name) {
            Some(entry) if entry.finalized => Ok(entry.node),
            _ => Err(CommandError::ReferenceNotFound(name.to_string())),
        }
    }

    pub fn get(&self, name: &str) -> Option<&PrototypeEntry> {
        self.entries.get(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.entries.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::Mesh;
    use crate::scene::Scene;
    use rwx_math::DMat4;

    fn detached_node(scene: &mut Scene) -> NodeId {
        scene.add_node("pob", Mesh::new("p"), None, DMat4::IDENTITY)
    }

    #[test]
    fn test_unfinished_definition_does_not_resolve() {
        let mut scene = Scene::new("test");
        let node = detached_node(&mut scene);
        let mut registry = PrototypeRegistry::new();

        registry.begin("wheel", node);
        assert_eq!(
            registry.resolve("wheel"),
            Err(CommandError::ReferenceNotFound("wheel".to_string()))
        );

        registry.finalize("wheel");
        assert_eq!(registry.resolve("wheel"), Ok(node));
    }

    #[test]
    fn test_missing_name() {
        let registry = PrototypeRegistry::new();
        assert!(matches!(
            registry.resolve("ghost"),
            Err(CommandError::ReferenceNotFound(name)) if name == "ghost"
        ));
    }

    #[test]
    fn test_redefinition_replaces() {
        let mut scene = Scene::new("test");
        let first = detached_node(&mut scene);
        let second = detached_node(&mut scene);
        let mut registry = PrototypeRegistry::new();

        registry.begin("wheel", first);
        registry.finalize("wheel");
        let replaced = registry.begin("wheel", second);
        registry.finalize("wheel");

        assert_eq!(replaced.map(|e| e.node), Some(first));
        assert_eq!(registry.resolve("wheel"), Ok(second));
        assert_eq!(registry.len(), 1);
    }
}
