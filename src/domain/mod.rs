// Domain layer - Pure tank, signal and time logic
pub mod dashboard;
pub mod device;
pub mod signal;
pub mod snapshot;
pub mod summary;
pub mod timestamp;
