//! Script-visible event records: name vocabulary, typed arguments and
//! detected-entity snapshots. Pure data, built by the translator.

pub mod args;
pub mod detect;
pub mod name;
pub mod params;

pub use args::{ArgKind, EventArg};
pub use detect::{DetectParams, SurfaceTouch};
pub use name::EventName;
pub use params::EventParams;
