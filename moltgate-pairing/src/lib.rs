//! Device pairing for moltgate.
//!
//! The device registry belongs to the gateway; this crate only reads and
//! mutates it through the gateway CLI and turns the results into typed,
//! partial-failure-tolerant outcomes.

pub mod error;
pub mod orchestrator;
pub mod types;

pub use error::{PairingError, PairingResult};
pub use orchestrator::{PairingOrchestrator, extract_json_object, parse_listing, validate_request_id};
pub use types::*;
