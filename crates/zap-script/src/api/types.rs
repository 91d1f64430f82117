use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Region-local identifier of a scene part.
/// `LocalId(0)` is reserved and means "no part".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct LocalId(pub u32);

impl LocalId {
    pub const NONE: LocalId = LocalId(0);

    /// True for the reserved `LocalId(0)`.
    pub fn is_none(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for LocalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Globally unique key of an avatar, object or the ground.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityKey(pub Uuid);

impl EntityKey {
    /// The all-zero key. Hosts report it for the ground in land collisions.
    pub const NIL: EntityKey = EntityKey(Uuid::nil());

    /// Generate a fresh random key.
    pub fn new_v4() -> Self {
        Self(Uuid::new_v4())
    }

    /// True for [`EntityKey::NIL`], i.e. the ground.
    pub fn is_nil(&self) -> bool {
        self.0.is_nil()
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Identifier of one script instance (an inventory item of an object).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub Uuid);

impl ItemId {
    /// Generate a fresh script identifier.
    pub fn new_v4() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Who a queued event is delivered to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventTarget {
    /// Every script running in the object.
    Object(LocalId),
    /// One script instance inside the object.
    Script { object: LocalId, item: ItemId },
}

impl EventTarget {
    /// The object this target lives in. Delivery is serialized per object.
    pub fn object(&self) -> LocalId {
        match *self {
            EventTarget::Object(object) => object,
            EventTarget::Script { object, .. } => object,
        }
    }

    /// The script instance, if the target is a single script.
    pub fn item(&self) -> Option<ItemId> {
        match *self {
            EventTarget::Object(_) => None,
            EventTarget::Script { item, .. } => Some(item),
        }
    }
}

impl fmt::Display for EventTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventTarget::Object(object) => write!(f, "object {}", object),
            EventTarget::Script { object, item } => write!(f, "script {} in object {}", item, object),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_local_id_is_none() {
        assert!(LocalId(0).is_none());
        assert!(LocalId::NONE.is_none());
        assert!(!LocalId(7).is_none());
    }

    #[test]
    fn target_exposes_object_and_item() {
        let item = ItemId::new_v4();
        let object = EventTarget::Object(LocalId(3));
        let script = EventTarget::Script { object: LocalId(3), item };
        assert_eq!(object.object(), LocalId(3));
        assert_eq!(script.object(), LocalId(3));
        assert_eq!(object.item(), None);
        assert_eq!(script.item(), Some(item));
    }

    #[test]
    fn nil_key() {
        assert!(EntityKey::NIL.is_nil());
        assert!(!EntityKey::new_v4().is_nil());
    }
}
