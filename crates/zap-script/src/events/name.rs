use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::args::ArgKind;
use crate::error::SignatureError;

/// The closed vocabulary of script-visible events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventName {
    StateEntry,
    StateExit,
    TouchStart,
    Touch,
    TouchEnd,
    CollisionStart,
    Collision,
    CollisionEnd,
    LandCollisionStart,
    LandCollision,
    LandCollisionEnd,
    AtTarget,
    NotAtTarget,
    AtRotTarget,
    NotAtRotTarget,
    Money,
    Control,
    Email,
    Attach,
    Changed,
    MovingStart,
    MovingEnd,
}

use ArgKind::{Integer, Key, Rotation, Vector};

const NO_ARGS: &[ArgKind] = &[];
const DETECTED_COUNT: &[ArgKind] = &[Integer];
const LAND_POSITION: &[ArgKind] = &[Vector];
const AT_TARGET: &[ArgKind] = &[Integer, Vector, Vector];
const AT_ROT_TARGET: &[ArgKind] = &[Integer, Rotation, Rotation];
const MONEY: &[ArgKind] = &[Key, Integer];
const CONTROL: &[ArgKind] = &[Key, Integer, Integer];
const EMAIL: &[ArgKind] = &[
    ArgKind::String,
    ArgKind::String,
    ArgKind::String,
    ArgKind::String,
    Integer,
];
const ATTACH: &[ArgKind] = &[Key];
const CHANGED: &[ArgKind] = &[Integer];

impl EventName {
    pub const ALL: [EventName; 22] = [
        EventName::StateEntry,
        EventName::StateExit,
        EventName::TouchStart,
        EventName::Touch,
        EventName::TouchEnd,
        EventName::CollisionStart,
        EventName::Collision,
        EventName::CollisionEnd,
        EventName::LandCollisionStart,
        EventName::LandCollision,
        EventName::LandCollisionEnd,
        EventName::AtTarget,
        EventName::NotAtTarget,
        EventName::AtRotTarget,
        EventName::NotAtRotTarget,
        EventName::Money,
        EventName::Control,
        EventName::Email,
        EventName::Attach,
        EventName::Changed,
        EventName::MovingStart,
        EventName::MovingEnd,
    ];

    /// Handler name as the script language spells it.
    pub fn as_str(self) -> &'static str {
        match self {
            EventName::StateEntry => "state_entry",
            EventName::StateExit => "state_exit",
            EventName::TouchStart => "touch_start",
            EventName::Touch => "touch",
            EventName::TouchEnd => "touch_end",
            EventName::CollisionStart => "collision_start",
            EventName::Collision => "collision",
            EventName::CollisionEnd => "collision_end",
            EventName::LandCollisionStart => "land_collision_start",
            EventName::LandCollision => "land_collision",
            EventName::LandCollisionEnd => "land_collision_end",
            EventName::AtTarget => "at_target",
            EventName::NotAtTarget => "not_at_target",
            EventName::AtRotTarget => "at_rot_target",
            EventName::NotAtRotTarget => "not_at_rot_target",
            EventName::Money => "money",
            EventName::Control => "control",
            EventName::Email => "email",
            EventName::Attach => "attach",
            EventName::Changed => "changed",
            EventName::MovingStart => "moving_start",
            EventName::MovingEnd => "moving_end",
        }
    }

    /// Fixed argument signature of the handler.
    pub fn signature(self) -> &'static [ArgKind] {
        match self {
            EventName::StateEntry
            | EventName::StateExit
            | EventName::NotAtTarget
            | EventName::NotAtRotTarget
            | EventName::MovingStart
            | EventName::MovingEnd => NO_ARGS,
            EventName::TouchStart
            | EventName::Touch
            | EventName::TouchEnd
            | EventName::CollisionStart
            | EventName::Collision
            | EventName::CollisionEnd => DETECTED_COUNT,
            EventName::LandCollisionStart
            | EventName::LandCollision
            | EventName::LandCollisionEnd => LAND_POSITION,
            EventName::AtTarget => AT_TARGET,
            EventName::AtRotTarget => AT_ROT_TARGET,
            EventName::Money => MONEY,
            EventName::Control => CONTROL,
            EventName::Email => EMAIL,
            EventName::Attach => ATTACH,
            EventName::Changed => CHANGED,
        }
    }

    /// Whether the event carries detected-entity snapshots.
    pub fn has_detection(self) -> bool {
        matches!(
            self,
            EventName::TouchStart
                | EventName::Touch
                | EventName::TouchEnd
                | EventName::CollisionStart
                | EventName::Collision
                | EventName::CollisionEnd
                | EventName::LandCollisionStart
                | EventName::LandCollision
                | EventName::LandCollisionEnd
        )
    }
}

impl fmt::Display for EventName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventName {
    type Err = SignatureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EventName::ALL
            .iter()
            .copied()
            .find(|name| name.as_str() == s)
            .ok_or_else(|| SignatureError::UnknownEvent(s.to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip_through_str() {
        for name in EventName::ALL {
            assert_eq!(name.as_str().parse::<EventName>(), Ok(name));
        }
    }

    #[test]
    fn unknown_name_is_rejected() {
        assert_eq!(
            "timer".parse::<EventName>(),
            Err(SignatureError::UnknownEvent("timer".into()))
        );
    }

    #[test]
    fn serde_uses_handler_spelling() {
        let json = serde_json::to_string(&EventName::LandCollisionStart).unwrap();
        assert_eq!(json, "\"land_collision_start\"");
    }

    #[test]
    fn detection_events_take_a_single_leading_argument() {
        for name in EventName::ALL.into_iter().filter(|n| n.has_detection()) {
            assert_eq!(name.signature().len(), 1, "{name}");
        }
    }
}
