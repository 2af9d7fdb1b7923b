//! Sandbox process collaborator for moltgate.
//!
//! Everything moltgate does to the assistant's sandbox goes through the
//! [`SandboxClient`] trait:
//! - Bounded command execution with captured output
//! - Private scratch files (credential bundles, sync markers)
//! - Background process listing, start and kill
//! - Port readiness waits
//!
//! [`GatewaySupervisor`] layers the gateway lifecycle and its CLI on top.

pub mod client;
pub mod error;
pub mod gateway;
pub mod local;
#[cfg(any(test, feature = "test-util"))]
pub mod mock;
pub mod types;

pub use client::SandboxClient;
pub use error::{SandboxError, SandboxResult};
pub use gateway::{GatewayConfig, GatewaySupervisor, ReleaseVersion, RestartOutcome};
pub use local::LocalSandbox;
pub use types::*;
