pub mod manager;

pub use manager::EventManager;
