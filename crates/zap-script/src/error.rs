use thiserror::Error;

use crate::api::types::LocalId;
use crate::events::args::ArgKind;
use crate::events::name::EventName;
use crate::queue::priority::EventPriority;

/// Rejection returned to a producer when an event cannot be queued.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueueError {
    /// The class store already holds `capacity` pending events.
    /// The event was not queued.
    #[error("{class} store is full ({capacity} pending), event rejected")]
    Full {
        class: EventPriority,
        capacity: usize,
    },
    /// The queue was closed by dispatcher shutdown.
    #[error("event queue is closed")]
    Closed,
}

/// An argument list that does not match the fixed signature of its event.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignatureError {
    #[error("unknown event name `{0}`")]
    UnknownEvent(String),
    #[error("{event} takes {expected} arguments, got {actual}")]
    Arity {
        event: EventName,
        expected: usize,
        actual: usize,
    },
    #[error("{event} argument {index} must be {expected}, got {actual}")]
    Type {
        event: EventName,
        index: usize,
        expected: ArgKind,
        actual: ArgKind,
    },
}

/// Failure reported by the script runtime for one delivered event.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExecutionError {
    /// The script handler raised an error while running.
    #[error("{event} handler failed: {message}")]
    Handler { event: EventName, message: String },
    /// No script instance is loaded for the target.
    #[error("no script loaded for object {0}")]
    NoScript(LocalId),
    /// Execution stopped before the handler completed.
    #[error("execution aborted: {0}")]
    Aborted(String),
}

/// Result of delivering one event to the runtime.
pub type ExecutionResult = Result<(), ExecutionError>;

/// Invalid dispatcher configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid dispatch config: {0}")]
    Invalid(String),
    #[error("malformed dispatch config: {0}")]
    Json(#[from] serde_json::Error),
}

/// Failure to start the dispatcher worker pool.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("failed to spawn dispatch worker: {0}")]
    Spawn(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_error_names_the_class() {
        let err = QueueError::Full {
            class: EventPriority::FirstStart,
            capacity: 10,
        };
        let msg = err.to_string();
        assert!(msg.contains("first_start"), "message was {msg}");
        assert!(msg.contains("10"));
    }

    #[test]
    fn signature_errors_render_event_names() {
        let err = SignatureError::Type {
            event: EventName::Money,
            index: 1,
            expected: ArgKind::Integer,
            actual: ArgKind::String,
        };
        assert_eq!(err.to_string(), "money argument 1 must be integer, got string");
    }

    #[test]
    fn config_error_wraps_json() {
        let json_err = serde_json::from_str::<u32>("nope").unwrap_err();
        let err = ConfigError::from(json_err);
        assert!(matches!(err, ConfigError::Json(_)));
    }
}
