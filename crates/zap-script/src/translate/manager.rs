//! Host signal -> EventParams translation. One handler per signal kind; each
//! resolves the entities involved, builds the record and posts it.
//!
//! Handlers never fail towards the host: a part that vanished between signal
//! and translation, or a full queue, drops the event with a log line.

use std::sync::Arc;

use glam::{Quat, Vec3};
use log::{debug, info, warn};

use crate::api::runtime::ScriptRuntime;
use crate::api::types::{EntityKey, EventTarget, ItemId, LocalId};
use crate::events::args::EventArg;
use crate::events::detect::{DetectParams, SurfaceTouch};
use crate::events::name::EventName;
use crate::events::params::EventParams;
use crate::host::resolver::EntityResolver;
use crate::host::signal::{ColliderArgs, DetectedObject, HostSignal, SignalBus, SignalKind};
use crate::queue::priority::{EventPriority, EventQueue};

/// Turns host signals into queued script events.
pub struct EventManager {
    queue: Arc<EventQueue>,
    resolver: Arc<dyn EntityResolver>,
    runtime: Arc<dyn ScriptRuntime>,
}

impl EventManager {
    /// Translator posting into `queue`. `runtime` is only told about script
    /// removals; deliveries go through the dispatcher.
    pub fn new(
        queue: Arc<EventQueue>,
        resolver: Arc<dyn EntityResolver>,
        runtime: Arc<dyn ScriptRuntime>,
    ) -> Self {
        Self {
            queue,
            resolver,
            runtime,
        }
    }

    /// Subscribe to every region signal. Call once at startup.
    pub fn hook_up_region_events(self: &Arc<Self>, bus: &mut SignalBus) {
        for kind in SignalKind::REGION {
            self.subscribe(bus, kind);
        }
    }

    /// Subscribe to payment notifications. Only hosts with a money
    /// subsystem raise them.
    pub fn hook_up_money(self: &Arc<Self>, bus: &mut SignalBus) {
        self.subscribe(bus, SignalKind::ObjectPaid);
    }

    fn subscribe(self: &Arc<Self>, bus: &mut SignalBus, kind: SignalKind) {
        let manager = Arc::clone(self);
        bus.subscribe(kind, Box::new(move |signal| manager.translate(signal)));
    }

    /// Route one host signal to its handler.
    pub fn translate(&self, signal: &HostSignal) {
        match signal {
            HostSignal::ObjectGrab {
                local_id,
                original_id,
                agent,
                surface,
                ..
            } => self.touch_start(*local_id, *original_id, *agent, *surface),
            HostSignal::ObjectGrabbing {
                local_id,
                original_id,
                offset,
                agent,
                surface,
            } => self.touch(*local_id, *original_id, *offset, *agent, *surface),
            HostSignal::ObjectDeGrab {
                local_id,
                original_id,
                agent,
                surface,
            } => self.touch_end(*local_id, *original_id, *agent, *surface),
            HostSignal::ScriptStart { local_id, item } => self.start_script(*local_id, *item),
            HostSignal::RemoveScript { local_id, item } => self.on_remove_script(*local_id, *item),
            HostSignal::StateEntry { local_id } => self.state_entry(*local_id),
            HostSignal::StateExit { local_id } => self.state_exit(*local_id),
            HostSignal::ScriptChanged { local_id, change } => self.changed(*local_id, *change),
            HostSignal::AtTarget {
                local_id,
                handle,
                target,
                at,
            } => self.at_target(*local_id, *handle, *target, *at),
            HostSignal::NotAtTarget { local_id } => self.not_at_target(*local_id),
            HostSignal::AtRotTarget {
                local_id,
                handle,
                target,
                at,
            } => self.at_rot_target(*local_id, *handle, *target, *at),
            HostSignal::NotAtRotTarget { local_id } => self.not_at_rot_target(*local_id),
            HostSignal::Control {
                local_id,
                item,
                agent,
                held,
                change,
            } => self.control(*local_id, *item, *agent, *held, *change),
            HostSignal::Email {
                local_id,
                item,
                time_sent,
                address,
                subject,
                message,
                num_left,
            } => self.email(*local_id, *item, time_sent, address, subject, message, *num_left),
            HostSignal::ColliderStart { local_id, colliders } => {
                self.collision_start(*local_id, colliders)
            }
            HostSignal::Colliding { local_id, colliders } => self.collision(*local_id, colliders),
            HostSignal::CollidingEnd { local_id, colliders } => {
                self.collision_end(*local_id, colliders)
            }
            HostSignal::LandColliderStart { local_id, colliders } => {
                self.land_collision_start(*local_id, colliders)
            }
            HostSignal::LandColliding { local_id, colliders } => {
                self.land_collision(*local_id, colliders)
            }
            HostSignal::LandColliderEnd { local_id, colliders } => {
                self.land_collision_end(*local_id, colliders)
            }
            HostSignal::Attach {
                local_id,
                item,
                avatar,
            } => self.attach(*local_id, *item, *avatar),
            HostSignal::MovingStart { local_id, item } => self.moving_start(*local_id, *item),
            HostSignal::MovingEnd { local_id, item } => self.moving_end(*local_id, *item),
            HostSignal::ObjectPaid {
                object_id,
                agent,
                amount,
            } => self.handle_object_paid(*object_id, *agent, *amount),
        }
    }

    // -- Touch --

    /// An avatar started touching `local_id`. `original_id` is the part
    /// actually touched when it differs from the scripted one.
    pub fn touch_start(
        &self,
        local_id: LocalId,
        original_id: LocalId,
        agent: EntityKey,
        surface: Option<SurfaceTouch>,
    ) {
        self.post_touch(EventName::TouchStart, local_id, original_id, agent, None, surface);
    }

    pub fn touch(
        &self,
        local_id: LocalId,
        original_id: LocalId,
        offset: Vec3,
        agent: EntityKey,
        surface: Option<SurfaceTouch>,
    ) {
        self.post_touch(EventName::Touch, local_id, original_id, agent, Some(offset), surface);
    }

    pub fn touch_end(
        &self,
        local_id: LocalId,
        original_id: LocalId,
        agent: EntityKey,
        surface: Option<SurfaceTouch>,
    ) {
        self.post_touch(EventName::TouchEnd, local_id, original_id, agent, None, surface);
    }

    /// The snapshot describes the toucher; its link number comes from the part
    /// actually touched, which is `original_id` when the host sets it.
    fn post_touch(
        &self,
        name: EventName,
        local_id: LocalId,
        original_id: LocalId,
        agent: EntityKey,
        offset: Option<Vec3>,
        surface: Option<SurfaceTouch>,
    ) {
        let touched = if original_id.is_none() { local_id } else { original_id };
        let Some(part) = self.resolver.part(touched) else {
            debug!("{}: part {} is gone, dropping", name, touched);
            return;
        };

        let mut det = DetectParams::new(agent).with_link_num(part.link_num);
        if let Some(toucher) = self.resolver.by_key(agent) {
            det = det.populate(&toucher);
        }
        if let Some(offset) = offset {
            det = det.with_offset(offset);
        }
        if let Some(surface) = surface {
            det = det.with_surface_touch(surface);
        }

        self.post(
            EventTarget::Object(local_id),
            EventParams::build(name, vec![EventArg::Integer(1)], vec![det]),
        );
    }

    // -- Collisions --

    /// Object collisions: one record listing every resolved collider.
    pub fn collision_start(&self, local_id: LocalId, colliders: &ColliderArgs) {
        self.post_collision(EventName::CollisionStart, local_id, colliders);
    }

    pub fn collision(&self, local_id: LocalId, colliders: &ColliderArgs) {
        self.post_collision(EventName::Collision, local_id, colliders);
    }

    pub fn collision_end(&self, local_id: LocalId, colliders: &ColliderArgs) {
        self.post_collision(EventName::CollisionEnd, local_id, colliders);
    }

    /// All colliders go into one record, led by their count.
    fn post_collision(&self, name: EventName, local_id: LocalId, colliders: &ColliderArgs) {
        let detected: Vec<DetectParams> = colliders
            .colliders
            .iter()
            .map(|collider| self.detect_collider(collider))
            .collect();
        if detected.is_empty() {
            return;
        }
        let count = i32::try_from(detected.len()).unwrap_or(i32::MAX);
        self.post(
            EventTarget::Object(local_id),
            EventParams::build(name, vec![EventArg::Integer(count)], detected),
        );
    }

    fn detect_collider(&self, collider: &DetectedObject) -> DetectParams {
        let det = DetectParams::new(collider.key).with_position(collider.position);
        match self.resolver.by_key(collider.key) {
            Some(entity) => det.populate(&entity),
            None => det,
        }
    }

    /// Ground contacts: one record per contact point.
    pub fn land_collision_start(&self, local_id: LocalId, colliders: &ColliderArgs) {
        self.post_land_collision(EventName::LandCollisionStart, local_id, colliders);
    }

    pub fn land_collision(&self, local_id: LocalId, colliders: &ColliderArgs) {
        self.post_land_collision(EventName::LandCollision, local_id, colliders);
    }

    pub fn land_collision_end(&self, local_id: LocalId, colliders: &ColliderArgs) {
        self.post_land_collision(EventName::LandCollisionEnd, local_id, colliders);
    }

    /// Unlike object collisions, each ground contact is its own record.
    fn post_land_collision(&self, name: EventName, local_id: LocalId, colliders: &ColliderArgs) {
        for collider in &colliders.colliders {
            let det = DetectParams::new(collider.key).with_position(collider.position);
            self.post(
                EventTarget::Object(local_id),
                EventParams::build(name, vec![EventArg::Vector(collider.position)], vec![det]),
            );
        }
    }

    // -- Targets --

    /// Movement target `handle` reached; `at_pos` is the object's position.
    pub fn at_target(&self, local_id: LocalId, handle: i32, target_pos: Vec3, at_pos: Vec3) {
        self.post(
            EventTarget::Object(local_id),
            EventParams::build(
                EventName::AtTarget,
                vec![
                    EventArg::Integer(handle),
                    EventArg::Vector(target_pos),
                    EventArg::Vector(at_pos),
                ],
                Vec::new(),
            ),
        );
    }

    pub fn not_at_target(&self, local_id: LocalId) {
        self.post_bare(local_id, EventName::NotAtTarget);
    }

    pub fn at_rot_target(&self, local_id: LocalId, handle: i32, target_rot: Quat, at_rot: Quat) {
        self.post(
            EventTarget::Object(local_id),
            EventParams::build(
                EventName::AtRotTarget,
                vec![
                    EventArg::Integer(handle),
                    EventArg::Rotation(target_rot),
                    EventArg::Rotation(at_rot),
                ],
                Vec::new(),
            ),
        );
    }

    pub fn not_at_rot_target(&self, local_id: LocalId) {
        self.post_bare(local_id, EventName::NotAtRotTarget);
    }

    // -- Money --

    /// Payment is always credited to the root of the composite that was paid.
    pub fn handle_object_paid(&self, object_id: LocalId, agent: EntityKey, amount: i32) {
        let Some(part) = self.resolver.part(object_id) else {
            debug!("money: paid part {} is gone, dropping", object_id);
            return;
        };
        debug!("paid: {} from {}, amount {}", object_id, agent, amount);
        let part = self.resolver.root_of(&part).unwrap_or(part);
        self.money(part.local_id, agent, amount);
    }

    /// Post `money` to `local_id` as given, without root attribution.
    pub fn money(&self, local_id: LocalId, agent: EntityKey, amount: i32) {
        self.post(
            EventTarget::Object(local_id),
            EventParams::build(
                EventName::Money,
                vec![EventArg::Key(agent), EventArg::Integer(amount)],
                Vec::new(),
            ),
        );
    }

    // -- Lifecycle --

    pub fn state_entry(&self, local_id: LocalId) {
        self.post_bare(local_id, EventName::StateEntry);
    }

    pub fn state_exit(&self, local_id: LocalId) {
        self.post_bare(local_id, EventName::StateExit);
    }

    /// First run of a freshly compiled or rezzed script. Jumps ahead of all
    /// steady-state events.
    pub fn start_script(&self, local_id: LocalId, item: ItemId) {
        self.queue.restore_script(local_id, item);
        self.post_with(
            EventTarget::Script {
                object: local_id,
                item,
            },
            EventParams::bare(EventName::StateEntry),
            EventPriority::FirstStart,
        );
    }

    /// Stop a script right away. Pending events for it are discarded; nothing
    /// for it is delivered after this returns.
    pub fn on_remove_script(&self, local_id: LocalId, item: ItemId) {
        let purged = self.queue.remove_script(local_id, item);
        info!(
            "removing script {} from {} ({} pending events discarded)",
            item, local_id, purged
        );
        self.runtime.stop_script(local_id, item);
    }

    /// `change` is the host's bitmask of what changed.
    pub fn changed(&self, local_id: LocalId, change: u32) {
        self.post(
            EventTarget::Object(local_id),
            EventParams::build(
                EventName::Changed,
                vec![EventArg::Integer(change as i32)],
                Vec::new(),
            ),
        );
    }

    /// Attach and movement events address the whole object; the item
    /// argument is accepted for host signature parity and not used.
    pub fn attach(&self, local_id: LocalId, _item: ItemId, avatar: EntityKey) {
        self.post(
            EventTarget::Object(local_id),
            EventParams::build(EventName::Attach, vec![EventArg::Key(avatar)], Vec::new()),
        );
    }

    pub fn moving_start(&self, local_id: LocalId, _item: ItemId) {
        self.post_bare(local_id, EventName::MovingStart);
    }

    pub fn moving_end(&self, local_id: LocalId, _item: ItemId) {
        self.post_bare(local_id, EventName::MovingEnd);
    }

    // -- Input and messaging --

    /// `held` and `change` are the host's control-key bitmasks.
    pub fn control(&self, local_id: LocalId, _item: ItemId, agent: EntityKey, held: u32, change: u32) {
        self.post(
            EventTarget::Object(local_id),
            EventParams::build(
                EventName::Control,
                vec![
                    EventArg::Key(agent),
                    EventArg::Integer(held as i32),
                    EventArg::Integer(change as i32),
                ],
                Vec::new(),
            ),
        );
    }

    #[allow(clippy::too_many_arguments)]
    pub fn email(
        &self,
        local_id: LocalId,
        _item: ItemId,
        time_sent: &str,
        address: &str,
        subject: &str,
        message: &str,
        num_left: i32,
    ) {
        self.post(
            EventTarget::Object(local_id),
            EventParams::build(
                EventName::Email,
                vec![
                    EventArg::from(time_sent),
                    EventArg::from(address),
                    EventArg::from(subject),
                    EventArg::from(message),
                    EventArg::Integer(num_left),
                ],
                Vec::new(),
            ),
        );
    }

    // -- Posting --

    fn post_bare(&self, local_id: LocalId, name: EventName) {
        self.post(EventTarget::Object(local_id), EventParams::bare(name));
    }

    fn post(&self, target: EventTarget, event: EventParams) {
        self.post_with(target, event, EventPriority::Continued);
    }

    fn post_with(&self, target: EventTarget, event: EventParams, priority: EventPriority) {
        let name = event.name();
        if let Err(err) = self.queue.enqueue(target, event, priority) {
            warn!("dropping {} for {}: {}", name, target, err);
        }
    }
}
