use std::fmt;

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::api::types::EntityKey;

/// Type tag of an event argument, used by event signatures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArgKind {
    Integer,
    String,
    Key,
    Vector,
    Rotation,
}

impl fmt::Display for ArgKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ArgKind::Integer => "integer",
            ArgKind::String => "string",
            ArgKind::Key => "key",
            ArgKind::Vector => "vector",
            ArgKind::Rotation => "rotation",
        };
        f.write_str(name)
    }
}

/// A typed value passed to a script event handler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum EventArg {
    Integer(i32),
    String(String),
    Key(EntityKey),
    Vector(Vec3),
    Rotation(Quat),
}

impl EventArg {
    /// Type tag checked against event signatures.
    pub fn kind(&self) -> ArgKind {
        match self {
            EventArg::Integer(_) => ArgKind::Integer,
            EventArg::String(_) => ArgKind::String,
            EventArg::Key(_) => ArgKind::Key,
            EventArg::Vector(_) => ArgKind::Vector,
            EventArg::Rotation(_) => ArgKind::Rotation,
        }
    }

    /// Typed accessors; `None` when the argument holds another kind.
    pub fn as_integer(&self) -> Option<i32> {
        match *self {
            EventArg::Integer(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_vector(&self) -> Option<Vec3> {
        match *self {
            EventArg::Vector(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_key(&self) -> Option<EntityKey> {
        match *self {
            EventArg::Key(k) => Some(k),
            _ => None,
        }
    }
}

impl From<i32> for EventArg {
    fn from(v: i32) -> Self {
        EventArg::Integer(v)
    }
}

impl From<String> for EventArg {
    fn from(v: String) -> Self {
        EventArg::String(v)
    }
}

impl From<&str> for EventArg {
    fn from(v: &str) -> Self {
        EventArg::String(v.to_owned())
    }
}

impl From<EntityKey> for EventArg {
    fn from(v: EntityKey) -> Self {
        EventArg::Key(v)
    }
}

impl From<Vec3> for EventArg {
    fn from(v: Vec3) -> Self {
        EventArg::Vector(v)
    }
}

impl From<Quat> for EventArg {
    fn from(v: Quat) -> Self {
        EventArg::Rotation(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_follow_variants() {
        assert_eq!(EventArg::from(3).kind(), ArgKind::Integer);
        assert_eq!(EventArg::from("hi").kind(), ArgKind::String);
        assert_eq!(EventArg::from(Vec3::X).kind(), ArgKind::Vector);
        assert_eq!(EventArg::from(Quat::IDENTITY).kind(), ArgKind::Rotation);
        assert_eq!(EventArg::from(EntityKey::NIL).kind(), ArgKind::Key);
    }

    #[test]
    fn accessors_reject_other_kinds() {
        assert_eq!(EventArg::Integer(4).as_integer(), Some(4));
        assert_eq!(EventArg::Vector(Vec3::X).as_integer(), None);
        assert_eq!(EventArg::Vector(Vec3::ONE).as_vector(), Some(Vec3::ONE));
    }

    #[test]
    fn serializes_with_type_tag() {
        let json = serde_json::to_string(&EventArg::Integer(5)).unwrap();
        assert_eq!(json, r#"{"type":"integer","value":5}"#);
    }
}
