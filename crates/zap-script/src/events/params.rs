use serde::{Deserialize, Serialize};

use super::args::EventArg;
use super::detect::DetectParams;
use super::name::EventName;
use crate::error::SignatureError;

/// Canonical description of one script-visible event.
///
/// Built once by the translator and moved through the queue to the runtime.
/// There are no setters: a record is never changed after construction, and
/// deserialization goes through the same signature check as [`EventParams::new`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawEventParams")]
pub struct EventParams {
    name: EventName,
    args: Vec<EventArg>,
    detected: Vec<DetectParams>,
}

/// Wire shape of [`EventParams`] before its signature is checked.
#[derive(Deserialize)]
struct RawEventParams {
    name: EventName,
    args: Vec<EventArg>,
    #[serde(default)]
    detected: Vec<DetectParams>,
}

impl TryFrom<RawEventParams> for EventParams {
    type Error = SignatureError;

    fn try_from(raw: RawEventParams) -> Result<Self, Self::Error> {
        Self::new(raw.name, raw.args, raw.detected)
    }
}

impl EventParams {
    /// Build a record, checking `args` against the event's signature.
    pub fn new(
        name: EventName,
        args: Vec<EventArg>,
        detected: Vec<DetectParams>,
    ) -> Result<Self, SignatureError> {
        let params = Self { name, args, detected };
        params.validate()?;
        Ok(params)
    }

    /// Build a record whose arguments the caller constructs from the signature.
    /// A mismatch is a bug in the caller and trips a debug assertion.
    pub(crate) fn build(name: EventName, args: Vec<EventArg>, detected: Vec<DetectParams>) -> Self {
        let params = Self { name, args, detected };
        debug_assert!(
            params.validate().is_ok(),
            "malformed {} record: {:?}",
            params.name,
            params.validate()
        );
        params
    }

    /// Event with no arguments and no detections. Only for names whose
    /// signature is empty.
    pub(crate) fn bare(name: EventName) -> Self {
        Self::build(name, Vec::new(), Vec::new())
    }

    pub fn name(&self) -> EventName {
        self.name
    }

    pub fn args(&self) -> &[EventArg] {
        &self.args
    }

    /// Detected-entity snapshots, one per toucher or collider.
    pub fn detected(&self) -> &[DetectParams] {
        &self.detected
    }

    /// Hand the record over to a runtime that marshals it into script values.
    pub fn into_parts(self) -> (EventName, Vec<EventArg>, Vec<DetectParams>) {
        (self.name, self.args, self.detected)
    }

    /// Check arity and argument types against the fixed signature.
    pub fn validate(&self) -> Result<(), SignatureError> {
        let signature = self.name.signature();
        if signature.len() != self.args.len() {
            return Err(SignatureError::Arity {
                event: self.name,
                expected: signature.len(),
                actual: self.args.len(),
            });
        }
        for (index, (expected, arg)) in signature.iter().zip(&self.args).enumerate() {
            if arg.kind() != *expected {
                return Err(SignatureError::Type {
                    event: self.name,
                    index,
                    expected: *expected,
                    actual: arg.kind(),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::types::EntityKey;
    use crate::events::args::ArgKind;
    use glam::Vec3;

    #[test]
    fn accepts_matching_signature() {
        let p = EventParams::new(
            EventName::Money,
            vec![EventArg::Key(EntityKey::new_v4()), EventArg::Integer(10)],
            Vec::new(),
        )
        .unwrap();
        assert_eq!(p.name(), EventName::Money);
        assert_eq!(p.args().len(), 2);
    }

    #[test]
    fn rejects_wrong_arity() {
        let err = EventParams::new(EventName::Changed, Vec::new(), Vec::new()).unwrap_err();
        assert_eq!(
            err,
            SignatureError::Arity {
                event: EventName::Changed,
                expected: 1,
                actual: 0
            }
        );
    }

    #[test]
    fn rejects_wrong_type() {
        let err = EventParams::new(
            EventName::LandCollision,
            vec![EventArg::Integer(1)],
            Vec::new(),
        )
        .unwrap_err();
        assert_eq!(
            err,
            SignatureError::Type {
                event: EventName::LandCollision,
                index: 0,
                expected: ArgKind::Vector,
                actual: ArgKind::Integer
            }
        );
    }

    #[test]
    fn survives_json() {
        let p = EventParams::new(
            EventName::TouchStart,
            vec![EventArg::Integer(1)],
            vec![DetectParams::new(EntityKey::new_v4()).with_position(Vec3::X)],
        )
        .unwrap();
        let json = serde_json::to_string(&p).unwrap();
        let back: EventParams = serde_json::from_str(&json).unwrap();
        assert_eq!(back, p);
    }

    #[test]
    fn json_with_wrong_arity_is_rejected() {
        let err = serde_json::from_str::<EventParams>(r#"{"name":"money","args":[],"detected":[]}"#)
            .unwrap_err();
        assert!(err.to_string().contains("money takes 2 arguments"), "error was {err}");
    }

    #[test]
    fn json_with_wrong_type_is_rejected() {
        let json = r#"{"name":"changed","args":[{"type":"string","value":"x"}]}"#;
        assert!(serde_json::from_str::<EventParams>(json).is_err());
    }

    #[test]
    #[should_panic(expected = "malformed")]
    #[cfg(debug_assertions)]
    fn build_asserts_in_debug() {
        let _ = EventParams::build(EventName::Attach, Vec::new(), Vec::new());
    }
}
