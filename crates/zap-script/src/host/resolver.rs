use std::sync::Arc;

use parking_lot::RwLock;

use crate::api::types::{EntityKey, LocalId};
use crate::host::part::Part;

/// Read-only view of the host's live entity set.
///
/// Lookups return owned snapshots: the entity may change or vanish as soon as
/// the call returns, and the translator only needs a frozen copy.
pub trait EntityResolver: Send + Sync {
    /// Look up a part by region-local id.
    fn part(&self, id: LocalId) -> Option<Part>;

    /// Look up any entity (part or avatar) by key.
    fn by_key(&self, key: EntityKey) -> Option<Part>;

    /// Root part of the composite `part` belongs to, or `None` if it is standalone.
    fn root_of(&self, part: &Part) -> Option<Part>;
}

/// A host that mutates its scene between ticks shares it behind a lock.
impl<R: EntityResolver> EntityResolver for RwLock<R> {
    fn part(&self, id: LocalId) -> Option<Part> {
        self.read().part(id)
    }

    fn by_key(&self, key: EntityKey) -> Option<Part> {
        self.read().by_key(key)
    }

    fn root_of(&self, part: &Part) -> Option<Part> {
        self.read().root_of(part)
    }
}

impl<R: EntityResolver + ?Sized> EntityResolver for Arc<R> {
    fn part(&self, id: LocalId) -> Option<Part> {
        (**self).part(id)
    }

    fn by_key(&self, key: EntityKey) -> Option<Part> {
        (**self).by_key(key)
    }

    fn root_of(&self, part: &Part) -> Option<Part> {
        (**self).root_of(part)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::scene::PartScene;

    #[test]
    fn locked_scene_sees_later_spawns() {
        let scene = Arc::new(RwLock::new(PartScene::new()));
        let resolver: Arc<dyn EntityResolver> = scene.clone();
        assert!(resolver.part(LocalId(1)).is_none());

        scene
            .write()
            .spawn(Part::new(LocalId(1), EntityKey::new_v4()));
        assert!(resolver.part(LocalId(1)).is_some());
    }
}
