pub mod priority;

pub use priority::{EventPriority, EventQueue, QueuedEvent, DEFAULT_QUEUE_CAPACITY};
