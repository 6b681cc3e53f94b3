use std::sync::Arc;

use switchboard_core::config::GatewayConfig;
use switchboard_graph::SessionManager;

/// Shared application state for axum handlers.
pub struct AppState {
    pub config: GatewayConfig,
    pub sessions: Arc<SessionManager>,
}
