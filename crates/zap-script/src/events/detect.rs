use glam::{Quat, Vec2, Vec3};
use serde::{Deserialize, Serialize};

use crate::api::types::EntityKey;
use crate::host::part::Part;

/// Where on a face an avatar touched a part.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SurfaceTouch {
    pub face_index: i32,
    pub uv: Vec2,
    pub st: Vec2,
    pub position: Vec3,
    pub normal: Vec3,
    pub binormal: Vec3,
}

/// Frozen copy of one entity involved in an event, taken at translation time.
/// Vectors the event does not use stay zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectParams {
    /// The detected entity. Always set.
    pub key: EntityKey,
    pub name: String,
    pub owner: EntityKey,
    pub position: Vec3,
    pub rotation: Quat,
    pub velocity: Vec3,
    /// Grab offset, only carried by `touch`.
    pub offset: Vec3,
    /// Link index of the part involved, within its composite object.
    pub link_num: i32,
    pub surface_touch: Option<SurfaceTouch>,
}

impl DetectParams {
    pub fn new(key: EntityKey) -> Self {
        Self {
            key,
            name: String::new(),
            owner: EntityKey::NIL,
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            velocity: Vec3::ZERO,
            offset: Vec3::ZERO,
            link_num: 0,
            surface_touch: None,
        }
    }

    /// Copy the live state of `entity` (name, owner, placement, velocity).
    /// Key and link number are left as they are.
    pub fn populate(mut self, entity: &Part) -> Self {
        self.name = entity.name.clone();
        self.owner = entity.owner;
        self.position = entity.position;
        self.rotation = entity.rotation;
        self.velocity = entity.velocity;
        self
    }

    // -- Builder pattern --

    pub fn with_position(mut self, position: Vec3) -> Self {
        self.position = position;
        self
    }

    pub fn with_offset(mut self, offset: Vec3) -> Self {
        self.offset = offset;
        self
    }

    pub fn with_link_num(mut self, link_num: i32) -> Self {
        self.link_num = link_num;
        self
    }

    pub fn with_surface_touch(mut self, surface: SurfaceTouch) -> Self {
        self.surface_touch = Some(surface);
        self
    }
}
