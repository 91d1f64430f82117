//! Worker pool that drains the [`EventQueue`] into the [`ScriptRuntime`].
//!
//! At most one execution per object is in flight. A worker takes the oldest
//! pending event whose object is idle, FirstStart store first; events of busy
//! objects stay in their store, in order and inside its bound, until the
//! object is released.

use std::any::Any;
use std::collections::HashSet;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::{debug, info, warn};
use parking_lot::Mutex;

use crate::api::config::DispatchConfig;
use crate::api::runtime::ScriptRuntime;
use crate::api::types::LocalId;
use crate::error::{DispatchError, ExecutionError};
use crate::queue::priority::{EventQueue, QueuedEvent};

/// What one [`Dispatcher::dispatch_once`] call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The queue was empty.
    Idle,
    /// Events are pending, but every one belongs to an object with an
    /// execution in flight.
    Blocked,
    /// One event was taken and handled.
    Processed,
}

/// Snapshot of the dispatcher counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchCounts {
    /// Executions that returned `Ok`.
    pub delivered: u64,
    /// Executions that failed or panicked.
    pub failed: u64,
    /// Entries discarded because their script was removed.
    pub dropped: u64,
}

#[derive(Default)]
struct DispatchStats {
    delivered: AtomicU64,
    failed: AtomicU64,
    dropped: AtomicU64,
}

impl DispatchStats {
    fn snapshot(&self) -> DispatchCounts {
        DispatchCounts {
            delivered: self.delivered.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
        }
    }
}

struct Shared {
    queue: Arc<EventQueue>,
    runtime: Arc<dyn ScriptRuntime>,
    idle_wait: Duration,
    /// Objects with an execution in flight.
    busy: Mutex<HashSet<LocalId>>,
    stats: DispatchStats,
    running: AtomicBool,
}

impl Shared {
    fn dispatch_once(&self) -> DispatchOutcome {
        let entry = {
            let mut busy = self.busy.lock();
            let Some(entry) = self
                .queue
                .dequeue_eligible(|entry| !busy.contains(&entry.target.object()))
            else {
                return if self.queue.is_empty() {
                    DispatchOutcome::Idle
                } else {
                    DispatchOutcome::Blocked
                };
            };
            busy.insert(entry.target.object());
            entry
        };

        let object = entry.target.object();
        self.deliver(entry);
        self.busy.lock().remove(&object);
        // Workers that found only this object's events are waiting on the queue.
        if !self.queue.is_empty() {
            self.queue.wake_all();
        }
        DispatchOutcome::Processed
    }

    fn deliver(&self, entry: QueuedEvent) {
        let QueuedEvent { target, event, .. } = entry;
        if self.queue.is_removed(&target) {
            debug!("skipping {} for removed script {}", event.name(), target);
            self.stats.dropped.fetch_add(1, Ordering::Relaxed);
            return;
        }

        let name = event.name();
        let runtime = &self.runtime;
        let result = panic::catch_unwind(AssertUnwindSafe(|| runtime.execute(target, event)))
            .unwrap_or_else(|payload| Err(ExecutionError::Aborted(panic_message(&*payload))));
        match result {
            Ok(()) => {
                self.stats.delivered.fetch_add(1, Ordering::Relaxed);
            }
            Err(err) => {
                warn!("{} on {}: {}", name, target, err);
                self.stats.failed.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    fn worker_loop(&self) {
        while self.running.load(Ordering::Acquire) {
            let seen = self.queue.generation();
            if self.dispatch_once() != DispatchOutcome::Processed {
                self.queue.wait_for_work(seen, self.idle_wait);
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "handler panicked".to_string()
    }
}

/// Drains the queue into the runtime, one execution per object at a time.
///
/// Built with [`new`](Self::new) it owns no threads and is driven by
/// [`dispatch_once`](Self::dispatch_once); [`start`](Self::start) also spawns
/// the worker pool.
pub struct Dispatcher {
    shared: Arc<Shared>,
    workers: Vec<JoinHandle<()>>,
}

impl Dispatcher {
    /// Build a dispatcher without worker threads. Events are only delivered
    /// through `dispatch_once` and `drain` on the calling thread.
    pub fn new(
        queue: Arc<EventQueue>,
        runtime: Arc<dyn ScriptRuntime>,
        config: &DispatchConfig,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                queue,
                runtime,
                idle_wait: config.idle_wait(),
                busy: Mutex::new(HashSet::new()),
                stats: DispatchStats::default(),
                running: AtomicBool::new(false),
            }),
            workers: Vec::new(),
        }
    }

    /// Validate `config` and spawn `config.workers` worker threads.
    pub fn start(
        queue: Arc<EventQueue>,
        runtime: Arc<dyn ScriptRuntime>,
        config: DispatchConfig,
    ) -> Result<Self, DispatchError> {
        config.validate()?;
        let mut dispatcher = Self::new(queue, runtime, &config);
        dispatcher.shared.running.store(true, Ordering::Release);

        for i in 0..config.workers {
            let shared = Arc::clone(&dispatcher.shared);
            let spawned = thread::Builder::new()
                .name(format!("zap-dispatch-{i}"))
                .spawn(move || shared.worker_loop());
            match spawned {
                Ok(handle) => dispatcher.workers.push(handle),
                Err(err) => {
                    dispatcher.stop();
                    return Err(err.into());
                }
            }
        }
        info!(
            "dispatcher started: {} workers, idle wait {:?}",
            config.workers, dispatcher.shared.idle_wait
        );
        Ok(dispatcher)
    }

    /// Take and handle one event on the calling thread.
    pub fn dispatch_once(&self) -> DispatchOutcome {
        self.shared.dispatch_once()
    }

    /// Run `dispatch_once` until nothing more can be taken. Returns the
    /// number of events handled.
    pub fn drain(&self) -> usize {
        let mut handled = 0;
        while self.dispatch_once() == DispatchOutcome::Processed {
            handled += 1;
        }
        handled
    }

    /// Counters since construction.
    pub fn stats(&self) -> DispatchCounts {
        self.shared.stats.snapshot()
    }

    /// The queue this dispatcher drains.
    pub fn queue(&self) -> &Arc<EventQueue> {
        &self.shared.queue
    }

    /// Number of spawned worker threads; 0 for a dispatcher built with `new`.
    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Stop the workers, close the queue and wait for in-flight executions
    /// to finish. Pending entries stay in the queue.
    pub fn shutdown(mut self) -> DispatchCounts {
        self.stop();
        self.stats()
    }

    fn stop(&mut self) {
        let was_running = self.shared.running.swap(false, Ordering::AcqRel);
        self.shared.queue.close();
        for handle in self.workers.drain(..) {
            if handle.join().is_err() {
                warn!("dispatch worker exited by panic");
            }
        }
        if was_running {
            let counts = self.stats();
            info!(
                "dispatcher stopped: {} delivered, {} failed, {} dropped",
                counts.delivered, counts.failed, counts.dropped
            );
        }
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        if !self.workers.is_empty() {
            self.stop();
        }
    }
}
