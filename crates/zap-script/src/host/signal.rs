use std::collections::HashMap;
use std::fmt;

use glam::{Quat, Vec3};

use crate::api::types::{EntityKey, ItemId, LocalId};
use crate::events::detect::SurfaceTouch;

/// One entity reported by the host in a collision signal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectedObject {
    /// Colliding entity; nil for the ground.
    pub key: EntityKey,
    /// Contact position reported by the host.
    pub position: Vec3,
}

/// The colliders of one collision signal.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColliderArgs {
    pub colliders: Vec<DetectedObject>,
}

impl ColliderArgs {
    pub fn new(colliders: Vec<DetectedObject>) -> Self {
        Self { colliders }
    }
}

/// State-change notifications emitted by the simulation host.
/// Payloads are host-native: local ids, keys, raw vectors.
#[derive(Debug, Clone, PartialEq)]
pub enum HostSignal {
    /// An avatar started grabbing a part. `original_id` is zero when the
    /// grabbed part is the one the signal is addressed to.
    ObjectGrab {
        local_id: LocalId,
        original_id: LocalId,
        offset: Vec3,
        agent: EntityKey,
        surface: Option<SurfaceTouch>,
    },
    /// An avatar keeps grabbing a part.
    ObjectGrabbing {
        local_id: LocalId,
        original_id: LocalId,
        offset: Vec3,
        agent: EntityKey,
        surface: Option<SurfaceTouch>,
    },
    /// An avatar released a part.
    ObjectDeGrab {
        local_id: LocalId,
        original_id: LocalId,
        agent: EntityKey,
        surface: Option<SurfaceTouch>,
    },
    /// A script was compiled or rezzed and must run its first state entry.
    ScriptStart { local_id: LocalId, item: ItemId },
    /// A script is being deleted from an object.
    RemoveScript { local_id: LocalId, item: ItemId },
    StateEntry { local_id: LocalId },
    StateExit { local_id: LocalId },
    /// `change` is a bitmask of what changed.
    ScriptChanged { local_id: LocalId, change: u32 },
    AtTarget { local_id: LocalId, handle: i32, target: Vec3, at: Vec3 },
    NotAtTarget { local_id: LocalId },
    AtRotTarget { local_id: LocalId, handle: i32, target: Quat, at: Quat },
    NotAtRotTarget { local_id: LocalId },
    Control {
        local_id: LocalId,
        item: ItemId,
        agent: EntityKey,
        held: u32,
        change: u32,
    },
    Email {
        local_id: LocalId,
        item: ItemId,
        time_sent: String,
        address: String,
        subject: String,
        message: String,
        num_left: i32,
    },
    ColliderStart { local_id: LocalId, colliders: ColliderArgs },
    Colliding { local_id: LocalId, colliders: ColliderArgs },
    CollidingEnd { local_id: LocalId, colliders: ColliderArgs },
    LandColliderStart { local_id: LocalId, colliders: ColliderArgs },
    LandColliding { local_id: LocalId, colliders: ColliderArgs },
    LandColliderEnd { local_id: LocalId, colliders: ColliderArgs },
    Attach { local_id: LocalId, item: ItemId, avatar: EntityKey },
    MovingStart { local_id: LocalId, item: ItemId },
    MovingEnd { local_id: LocalId, item: ItemId },
    /// Raised by the money subsystem. `object_id` is the part that was paid.
    ObjectPaid { object_id: LocalId, agent: EntityKey, amount: i32 },
}

/// Discriminant of [`HostSignal`], used as the subscription key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignalKind {
    ObjectGrab,
    ObjectGrabbing,
    ObjectDeGrab,
    ScriptStart,
    RemoveScript,
    StateEntry,
    StateExit,
    ScriptChanged,
    AtTarget,
    NotAtTarget,
    AtRotTarget,
    NotAtRotTarget,
    Control,
    Email,
    ColliderStart,
    Colliding,
    CollidingEnd,
    LandColliderStart,
    LandColliding,
    LandColliderEnd,
    Attach,
    MovingStart,
    MovingEnd,
    ObjectPaid,
}

impl SignalKind {
    /// Every signal the region scene raises. Payment comes from the money
    /// subsystem and is not part of this set.
    pub const REGION: [SignalKind; 23] = [
        SignalKind::ObjectGrab,
        SignalKind::ObjectGrabbing,
        SignalKind::ObjectDeGrab,
        SignalKind::ScriptStart,
        SignalKind::RemoveScript,
        SignalKind::StateEntry,
        SignalKind::StateExit,
        SignalKind::ScriptChanged,
        SignalKind::AtTarget,
        SignalKind::NotAtTarget,
        SignalKind::AtRotTarget,
        SignalKind::NotAtRotTarget,
        SignalKind::Control,
        SignalKind::Email,
        SignalKind::ColliderStart,
        SignalKind::Colliding,
        SignalKind::CollidingEnd,
        SignalKind::LandColliderStart,
        SignalKind::LandColliding,
        SignalKind::LandColliderEnd,
        SignalKind::Attach,
        SignalKind::MovingStart,
        SignalKind::MovingEnd,
    ];
}

impl HostSignal {
    pub fn kind(&self) -> SignalKind {
        match self {
            HostSignal::ObjectGrab { .. } => SignalKind::ObjectGrab,
            HostSignal::ObjectGrabbing { .. } => SignalKind::ObjectGrabbing,
            HostSignal::ObjectDeGrab { .. } => SignalKind::ObjectDeGrab,
            HostSignal::ScriptStart { .. } => SignalKind::ScriptStart,
            HostSignal::RemoveScript { .. } => SignalKind::RemoveScript,
            HostSignal::StateEntry { .. } => SignalKind::StateEntry,
            HostSignal::StateExit { .. } => SignalKind::StateExit,
            HostSignal::ScriptChanged { .. } => SignalKind::ScriptChanged,
            HostSignal::AtTarget { .. } => SignalKind::AtTarget,
            HostSignal::NotAtTarget { .. } => SignalKind::NotAtTarget,
            HostSignal::AtRotTarget { .. } => SignalKind::AtRotTarget,
            HostSignal::NotAtRotTarget { .. } => SignalKind::NotAtRotTarget,
            HostSignal::Control { .. } => SignalKind::Control,
            HostSignal::Email { .. } => SignalKind::Email,
            HostSignal::ColliderStart { .. } => SignalKind::ColliderStart,
            HostSignal::Colliding { .. } => SignalKind::Colliding,
            HostSignal::CollidingEnd { .. } => SignalKind::CollidingEnd,
            HostSignal::LandColliderStart { .. } => SignalKind::LandColliderStart,
            HostSignal::LandColliding { .. } => SignalKind::LandColliding,
            HostSignal::LandColliderEnd { .. } => SignalKind::LandColliderEnd,
            HostSignal::Attach { .. } => SignalKind::Attach,
            HostSignal::MovingStart { .. } => SignalKind::MovingStart,
            HostSignal::MovingEnd { .. } => SignalKind::MovingEnd,
            HostSignal::ObjectPaid { .. } => SignalKind::ObjectPaid,
        }
    }
}

/// Callback registered against one signal kind.
pub type SignalHandler = Box<dyn Fn(&HostSignal) + Send + Sync>;

/// The host's subscription point: signal kind -> subscribed handlers.
///
/// Subscriptions are made once at startup; `emit` takes `&self` so the bus
/// can be shared by every subsystem thread that raises signals.
#[derive(Default)]
pub struct SignalBus {
    handlers: HashMap<SignalKind, Vec<SignalHandler>>,
}

impl SignalBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for every later signal of `kind`.
    pub fn subscribe(&mut self, kind: SignalKind, handler: SignalHandler) {
        self.handlers.entry(kind).or_default().push(handler);
    }

    pub fn is_subscribed(&self, kind: SignalKind) -> bool {
        self.handlers.get(&kind).is_some_and(|h| !h.is_empty())
    }

    /// Deliver a signal to every handler subscribed to its kind.
    /// Returns the number of handlers invoked.
    pub fn emit(&self, signal: &HostSignal) -> usize {
        let Some(handlers) = self.handlers.get(&signal.kind()) else {
            return 0;
        };
        for handler in handlers {
            handler(signal);
        }
        handlers.len()
    }
}

impl fmt::Debug for SignalBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut kinds: Vec<_> = self.handlers.keys().collect();
        kinds.sort_by_key(|k| format!("{:?}", k));
        f.debug_struct("SignalBus").field("kinds", &kinds).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn emit_reaches_only_matching_kind() {
        let hits = Arc::new(AtomicUsize::new(0));
        let mut bus = SignalBus::new();
        let counter = hits.clone();
        bus.subscribe(
            SignalKind::StateEntry,
            Box::new(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        );

        assert_eq!(bus.emit(&HostSignal::StateEntry { local_id: LocalId(1) }), 1);
        assert_eq!(bus.emit(&HostSignal::StateExit { local_id: LocalId(1) }), 0);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn kind_matches_variant() {
        let signal = HostSignal::LandColliding {
            local_id: LocalId(1),
            colliders: ColliderArgs::default(),
        };
        assert_eq!(signal.kind(), SignalKind::LandColliding);
        assert!(!SignalKind::REGION.contains(&SignalKind::ObjectPaid));
    }
}
