use crate::api::types::{EventTarget, ItemId, LocalId};
use crate::error::ExecutionResult;
use crate::events::params::EventParams;

/// The contract the sandboxed script runtime fulfills for the event layer.
///
/// Called from dispatcher worker threads. The dispatcher guarantees that at
/// most one `execute` runs per object at any instant; calls for different
/// objects may run concurrently.
pub trait ScriptRuntime: Send + Sync {
    /// Run the handler for `event` to completion against the target script(s).
    /// A failing handler is reported as `Err`, never by panicking.
    fn execute(&self, target: EventTarget, event: EventParams) -> ExecutionResult;

    /// Terminate and unload a script instance immediately.
    ///
    /// Once this returns, no handler of that script may start: an `execute`
    /// addressed to it must return
    /// [`ExecutionError::NoScript`](crate::error::ExecutionError::NoScript)
    /// and an object-wide `execute` must skip it. The dispatcher also drops queued
    /// events for a removed script, but a worker may already be past that
    /// check when the removal lands, so the runtime is the final gate.
    fn stop_script(&self, object: LocalId, item: ItemId);
}
