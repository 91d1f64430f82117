use glam::{Quat, Vec3};
use crate::api::types::{EntityKey, LocalId};

/// A scene entity as the translator sees it: one prim of an object, or an avatar.
/// Parts of a composite object share a root; the root part has link number 1
/// and children count up from 2. A standalone part has link number 0.
#[derive(Debug, Clone, PartialEq)]
pub struct Part {
    /// Region-local identifier.
    pub local_id: LocalId,
    /// Global key (used for detection lookups).
    pub key: EntityKey,
    /// Display name.
    pub name: String,
    /// Owning avatar.
    pub owner: EntityKey,
    /// Position in region space.
    pub position: Vec3,
    pub rotation: Quat,
    pub velocity: Vec3,
    /// Link index within the composite object.
    pub link_num: i32,
    /// Root part of the composite this part belongs to, if linked.
    pub root: Option<LocalId>,
}

impl Part {
    /// Create a standalone part at the origin.
    pub fn new(local_id: LocalId, key: EntityKey) -> Self {
        Self {
            local_id,
            key,
            name: String::new(),
            owner: EntityKey::NIL,
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            velocity: Vec3::ZERO,
            link_num: 0,
            root: None,
        }
    }

    /// Whether this part is the root of a composite object.
    pub fn is_root(&self) -> bool {
        self.root == Some(self.local_id)
    }

    // -- Builder pattern --

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_owner(mut self, owner: EntityKey) -> Self {
        self.owner = owner;
        self
    }

    pub fn with_position(mut self, position: Vec3) -> Self {
        self.position = position;
        self
    }

    pub fn with_rotation(mut self, rotation: Quat) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn with_velocity(mut self, velocity: Vec3) -> Self {
        self.velocity = velocity;
        self
    }

    /// Link this part into the composite rooted at `root` with the given index.
    pub fn linked_to(mut self, root: LocalId, link_num: i32) -> Self {
        self.root = Some(root);
        self.link_num = link_num;
        self
    }
}
