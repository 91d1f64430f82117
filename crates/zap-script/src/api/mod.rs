pub mod config;
pub mod runtime;
pub mod types;

pub use config::DispatchConfig;
pub use runtime::ScriptRuntime;
pub use types::{EntityKey, EventTarget, ItemId, LocalId};
