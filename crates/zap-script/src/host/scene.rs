use crate::api::types::{EntityKey, LocalId};
use crate::host::part::Part;
use crate::host::resolver::EntityResolver;

/// Simple part storage using a flat Vec.
/// Stands in for the host's scene graph where the host has none of its own;
/// designed for small-to-medium part counts.
#[derive(Debug, Default, Clone)]
pub struct PartScene {
    parts: Vec<Part>,
}

impl PartScene {
    pub fn new() -> Self {
        Self {
            parts: Vec::with_capacity(256),
        }
    }

    /// Add a part to the scene.
    pub fn spawn(&mut self, part: Part) {
        self.parts.push(part);
    }

    /// Remove a part by id. Returns the removed part if found.
    pub fn despawn(&mut self, id: LocalId) -> Option<Part> {
        let idx = self.parts.iter().position(|p| p.local_id == id)?;
        Some(self.parts.swap_remove(idx))
    }

    pub fn get(&self, id: LocalId) -> Option<&Part> {
        self.parts.iter().find(|p| p.local_id == id)
    }

    pub fn get_mut(&mut self, id: LocalId) -> Option<&mut Part> {
        self.parts.iter_mut().find(|p| p.local_id == id)
    }

    /// Look a part up by its global key. Linear scan.
    pub fn get_by_key(&self, key: EntityKey) -> Option<&Part> {
        self.parts.iter().find(|p| p.key == key)
    }

    /// All parts linked into the composite rooted at `root`, root included.
    pub fn link_set(&self, root: LocalId) -> Vec<&Part> {
        self.parts.iter().filter(|p| p.root == Some(root)).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Part> {
        self.parts.iter()
    }

    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }
}

impl EntityResolver for PartScene {
    fn part(&self, id: LocalId) -> Option<Part> {
        self.get(id).cloned()
    }

    fn by_key(&self, key: EntityKey) -> Option<Part> {
        self.get_by_key(key).cloned()
    }

    fn root_of(&self, part: &Part) -> Option<Part> {
        part.root.and_then(|root| self.get(root)).cloned()
    }
}
