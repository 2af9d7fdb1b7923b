//! Administrative HTTP surface for moltgate.
//!
//! Every route under `/api/admin` passes the access gate first; handlers then
//! drive the gateway, the pairing orchestrator and the sync engine.

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod responder;
pub mod router;
pub mod state;

pub use config::{ConfigError, ServerConfig};
pub use error::{ApiError, ApiResult};
pub use responder::{DefaultResponder, Responder};
pub use router::router;
pub use state::AppState;
