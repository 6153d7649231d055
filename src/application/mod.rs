// Application layer - Use cases over the domain and injected capabilities
pub mod clock;
pub mod monitor_service;
pub mod signal_tracker;
pub mod snapshot_source;
pub mod state_store;
