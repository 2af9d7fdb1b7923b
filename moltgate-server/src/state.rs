//! Shared application state.

use crate::config::ServerConfig;
use crate::responder::{DefaultResponder, Responder};
use moltgate_auth::{AccessGate, JwtVerifier};
use moltgate_cloud::{StorageSecrets, SyncEngine};
use moltgate_pairing::PairingOrchestrator;
use moltgate_sandbox::{GatewaySupervisor, SandboxClient};
use std::sync::Arc;

/// Components handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub gate: Arc<AccessGate>,
    pub gateway: Arc<GatewaySupervisor>,
    pub pairing: Arc<PairingOrchestrator>,
    pub sync: Arc<SyncEngine>,
    pub storage: Arc<StorageSecrets>,
    pub responder: Arc<dyn Responder>,
}

impl AppState {
    pub fn new(
        config: ServerConfig,
        sandbox: Arc<dyn SandboxClient>,
        verifier: Arc<dyn JwtVerifier>,
    ) -> Self {
        let ServerConfig {
            access,
            storage,
            gateway,
            sync,
            ..
        } = config;

        let gateway = Arc::new(GatewaySupervisor::new(sandbox.clone(), gateway));
        Self {
            gate: Arc::new(AccessGate::new(access, verifier)),
            pairing: Arc::new(PairingOrchestrator::new(gateway.clone())),
            gateway,
            sync: Arc::new(SyncEngine::new(sandbox, sync)),
            storage: Arc::new(storage),
            responder: Arc::new(DefaultResponder),
        }
    }

    pub fn with_responder(mut self, responder: Arc<dyn Responder>) -> Self {
        self.responder = responder;
        self
    }
}
