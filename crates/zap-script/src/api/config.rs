use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::queue::priority::DEFAULT_QUEUE_CAPACITY;

/// Configuration for the dispatcher and its queue, provided by the host.
///
/// A full class store always rejects the new event with `QueueError::Full`;
/// producers are never blocked and accepted events are never dropped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Number of worker threads (default: 4).
    pub workers: usize,
    /// Maximum pending events per class store (default: 10000).
    pub queue_capacity: usize,
    /// Longest a worker waits on an empty queue before re-checking, in
    /// milliseconds (default: 10).
    pub idle_wait_ms: u64,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            idle_wait_ms: 10,
        }
    }
}

impl DispatchConfig {
    /// Parse a config from a JSON string. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configs the dispatcher cannot run with: zero workers or a
    /// zero queue capacity.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.workers == 0 {
            return Err(ConfigError::Invalid("workers must be at least 1".into()));
        }
        if self.queue_capacity == 0 {
            return Err(ConfigError::Invalid("queue_capacity must be at least 1".into()));
        }
        Ok(())
    }

    /// `idle_wait_ms` as a `Duration`.
    pub fn idle_wait(&self) -> Duration {
        Duration::from_millis(self.idle_wait_ms)
    }

    // -- Builder pattern --

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    pub fn with_idle_wait_ms(mut self, ms: u64) -> Self {
        self.idle_wait_ms = ms;
        self
    }
}
