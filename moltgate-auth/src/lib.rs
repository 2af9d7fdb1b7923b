//! Access gate for the moltgate administrative surface.
//!
//! Every administrative request is authorized by exactly one strategy:
//! - Development / E2E bypass
//! - Shared-secret bootstrap mode (no identity provider yet)
//! - Signed-token verification against the issuer's published key set
//!
//! The gate only decides. Rendering a denial is up to the caller.

pub mod bootstrap;
pub mod config;
pub mod error;
pub mod gate;
pub mod identity;
pub mod jwt;

pub use bootstrap::BootstrapAuthority;
pub use config::{AccessConfig, IssuerState};
pub use error::{AuthResult, VerificationError};
pub use gate::{AccessGate, AccessRequest};
pub use identity::*;
pub use jwt::{AccessClaims, JwtVerifier, RemoteJwksVerifier};
