//! Shared types for the rt-bridge daemon and its tests.
//!
//! Everything that crosses a wire or a crate boundary lives here: the
//! inventory snapshot model, batch outcome counters, and the error
//! taxonomy for remote failures.

pub mod device;
pub mod error;
pub mod outcome;

pub use device::{DeviceSnapshot, InventoryAction, InventoryEvent};
pub use error::BridgeError;
pub use outcome::{SyncDisposition, SyncOutcome, TicketAction, TicketOutcome};

/// Crate version, reported by the health endpoint.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
