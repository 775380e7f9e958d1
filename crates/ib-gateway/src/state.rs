//! Shared application state, handed to every axum handler via `State`.

use std::sync::Arc;

use ib_cache::CommandCache;
use ib_domain::config::Config;
use ib_model::ModelClient;
use ib_rooms::RoomManager;

use crate::metrics::Metrics;

#[derive(Clone)]
pub struct AppState {
    // Core config
    pub config: Arc<Config>,

    // Collaboration plane
    pub rooms: Arc<RoomManager>,

    // AI pipeline. `None` ⇒ no provider configured; the orchestrator goes
    // straight to the local fallback parser instead of calling out.
    pub cache: Arc<CommandCache>,
    pub model: Option<Arc<dyn ModelClient>>,

    // Security
    pub api_token: Arc<Option<String>>,

    // Observability
    pub metrics: Arc<Metrics>,
}
