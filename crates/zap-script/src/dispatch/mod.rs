pub mod dispatcher;

pub use dispatcher::{DispatchCounts, DispatchOutcome, Dispatcher};
