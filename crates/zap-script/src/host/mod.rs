//! The simulation host as seen from the event layer: the signal vocabulary it
//! raises, its subscription bus, and read-only entity lookups.

pub mod part;
pub mod resolver;
pub mod scene;
pub mod signal;

pub use part::Part;
pub use resolver::EntityResolver;
pub use scene::PartScene;
pub use signal::{ColliderArgs, DetectedObject, HostSignal, SignalBus, SignalHandler, SignalKind};
