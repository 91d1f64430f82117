//! In-memory [`ScriptRuntime`] for tests and host integration harnesses.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use crate::api::runtime::ScriptRuntime;
use crate::api::types::{EventTarget, ItemId, LocalId};
use crate::error::{ExecutionError, ExecutionResult};
use crate::events::name::EventName;
use crate::events::params::EventParams;

/// One `execute` call as seen by the runtime.
#[derive(Debug, Clone, PartialEq)]
pub struct Execution {
    pub target: EventTarget,
    pub event: EventParams,
}

#[derive(Debug, Default)]
struct Log {
    executions: Vec<Execution>,
    stopped: Vec<(LocalId, ItemId)>,
}

/// Records every execution and tracks per-object overlap.
///
/// Executions are recorded when they start. A script stopped through
/// `stop_script` is never started again: `execute` for it returns
/// [`ExecutionError::NoScript`] and records nothing.
///
/// `max_in_flight_per_object` reports the largest number of simultaneous
/// `execute` calls ever seen for one object; the dispatcher keeps it at 1.
#[derive(Debug, Default)]
pub struct RecordingRuntime {
    log: Mutex<Log>,
    executed: Condvar,
    in_flight: Mutex<HashMap<LocalId, usize>>,
    max_in_flight: AtomicUsize,
    delay: Option<Duration>,
    failing: HashSet<EventName>,
}

impl RecordingRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleep this long inside every `execute`, to widen race windows.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Report a handler failure for every event with this name.
    pub fn fail_on(mut self, name: EventName) -> Self {
        self.failing.insert(name);
        self
    }

    /// Every recorded execution, in start order.
    pub fn executions(&self) -> Vec<Execution> {
        self.log.lock().executions.clone()
    }

    /// Event names of `executions`, in start order.
    pub fn executed_names(&self) -> Vec<EventName> {
        self.log
            .lock()
            .executions
            .iter()
            .map(|e| e.event.name())
            .collect()
    }

    /// Executions addressed to `object`, in delivery order.
    pub fn executions_for(&self, object: LocalId) -> Vec<Execution> {
        self.log
            .lock()
            .executions
            .iter()
            .filter(|e| e.target.object() == object)
            .cloned()
            .collect()
    }

    /// Every `stop_script` call received, in call order.
    pub fn stopped(&self) -> Vec<(LocalId, ItemId)> {
        self.log.lock().stopped.clone()
    }

    /// Peak number of overlapping `execute` calls for a single object.
    pub fn max_in_flight_per_object(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// Block until at least `count` executions were recorded or `timeout`
    /// passes. Returns whether the count was reached.
    pub fn wait_for_executions(&self, count: usize, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut log = self.log.lock();
        while log.executions.len() < count {
            if self.executed.wait_until(&mut log, deadline).timed_out() {
                return log.executions.len() >= count;
            }
        }
        true
    }

    fn enter(&self, object: LocalId) {
        let mut in_flight = self.in_flight.lock();
        let count = in_flight.entry(object).or_insert(0);
        *count += 1;
        self.max_in_flight.fetch_max(*count, Ordering::SeqCst);
    }

    fn leave(&self, object: LocalId) {
        let mut in_flight = self.in_flight.lock();
        if let Some(count) = in_flight.get_mut(&object) {
            *count -= 1;
            if *count == 0 {
                in_flight.remove(&object);
            }
        }
    }
}

impl ScriptRuntime for RecordingRuntime {
    fn execute(&self, target: EventTarget, event: EventParams) -> ExecutionResult {
        let object = target.object();
        let name = event.name();
        self.enter(object);
        {
            let mut log = self.log.lock();
            if let EventTarget::Script { object, item } = target {
                if log.stopped.contains(&(object, item)) {
                    drop(log);
                    self.leave(object);
                    return Err(ExecutionError::NoScript(object));
                }
            }
            log.executions.push(Execution { target, event });
        }
        self.executed.notify_all();

        if let Some(delay) = self.delay {
            thread::sleep(delay);
        }
        self.leave(object);

        if self.failing.contains(&name) {
            return Err(ExecutionError::Handler {
                event: name,
                message: "injected failure".into(),
            });
        }
        Ok(())
    }

    fn stop_script(&self, object: LocalId, item: ItemId) {
        self.log.lock().stopped.push((object, item));
    }
}
