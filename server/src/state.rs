use std::sync::Arc;

use crate::auth::{CredentialStore, NameRegistry};
use crate::command::CommandRegistry;
use crate::config::Config;
use crate::rooms::RoomDirectory;
use crate::session::InputPolicy;

/// Shared application state passed to all handlers via axum State extractor.
#[derive(Clone)]
pub struct AppState {
    /// Registered accounts
    pub store: CredentialStore,
    /// Active chat rooms
    pub directory: RoomDirectory,
    /// Display names held by live sessions
    pub names: Arc<NameRegistry>,
    /// System and chat command tables, built once
    pub commands: Arc<CommandRegistry>,
    /// Per-connection input rate limit
    pub input_policy: InputPolicy,
    /// Required Origin header for WebSocket upgrades, if any
    pub allowed_origin: Option<String>,
    /// Per-IP upgrade rate limit
    pub ws_per_second: u64,
    pub ws_burst: u32,
}

impl AppState {
    /// Build state from loaded config. Spawns the room directory, so call it
    /// inside the runtime.
    pub fn new(store: CredentialStore, config: &Config) -> Self {
        Self {
            store,
            directory: RoomDirectory::spawn(),
            names: Arc::new(NameRegistry::new()),
            commands: Arc::new(CommandRegistry::new()),
            input_policy: InputPolicy::new(config.input_interval_ms, config.input_burst),
            allowed_origin: config.allowed_origin.clone(),
            ws_per_second: config.ws_per_second,
            ws_burst: config.ws_burst,
        }
    }
}
