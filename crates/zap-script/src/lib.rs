pub mod api;
pub mod dispatch;
pub mod error;
pub mod events;
pub mod host;
pub mod queue;
pub mod testing;
pub mod translate;

// Re-export key types at crate root for convenience
pub use api::config::DispatchConfig;
pub use api::runtime::ScriptRuntime;
pub use api::types::{EntityKey, EventTarget, ItemId, LocalId};
pub use dispatch::{DispatchCounts, DispatchOutcome, Dispatcher};
pub use error::{
    ConfigError, DispatchError, ExecutionError, ExecutionResult, QueueError, SignatureError,
};
pub use events::{ArgKind, DetectParams, EventArg, EventName, EventParams, SurfaceTouch};
pub use host::{
    ColliderArgs, DetectedObject, EntityResolver, HostSignal, Part, PartScene, SignalBus,
    SignalKind,
};
pub use queue::{EventPriority, EventQueue, QueuedEvent, DEFAULT_QUEUE_CAPACITY};
pub use translate::EventManager;
