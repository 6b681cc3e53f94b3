use std::sync::Arc;
use std::time::Duration;

use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tracing::{debug, info};

use switchboard_core::config::GatewayConfig;
use switchboard_graph::SessionManager;

use crate::routes;
use crate::state::AppState;

/// HTTP gateway over a set of conversation sessions, built on axum.
pub struct GatewayServer {
    config: GatewayConfig,
    sessions: Arc<SessionManager>,
}

impl GatewayServer {
    pub fn new(config: GatewayConfig, sessions: Arc<SessionManager>) -> Self {
        Self { config, sessions }
    }

    pub fn router(&self) -> Router {
        let state = Arc::new(AppState {
            config: self.config.clone(),
            sessions: self.sessions.clone(),
        });

        Router::new()
            .route("/api/health", get(routes::health))
            .route("/api/sessions", get(routes::list_sessions))
            .route("/chat", get(routes::chat_get).post(routes::chat_post))
            .route("/chat/", get(routes::chat_get).post(routes::chat_post))
            .route("/agents", get(routes::list_agents))
            .route("/current-agent", get(routes::current_agent))
            .route("/sessions/{id}/transitions", get(routes::session_transitions))
            .layer(CorsLayer::permissive())
            .with_state(state)
    }

    /// Run the gateway server until the cancellation token is triggered.
    pub async fn run(&self, shutdown: CancellationToken) -> anyhow::Result<()> {
        let app = self.router();

        if self.config.session_idle_secs > 0 {
            tokio::spawn(reap_sessions(
                self.sessions.clone(),
                self.config.session_idle_secs,
                shutdown.clone(),
            ));
        }

        let listener = TcpListener::bind(&self.config.bind).await?;
        info!(bind = %self.config.bind, "Gateway listening");

        axum::serve(listener, app)
            .with_graceful_shutdown(async move { shutdown.cancelled().await })
            .await?;

        info!("Gateway stopped");
        Ok(())
    }
}

/// Periodically drop sessions idle for `idle_secs`, until shutdown.
async fn reap_sessions(sessions: Arc<SessionManager>, idle_secs: u64, shutdown: CancellationToken) {
    let max_idle = chrono::Duration::seconds(i64::try_from(idle_secs).unwrap_or(i64::MAX));
    let period = Duration::from_secs(idle_secs.clamp(1, 60));
    loop {
        tokio::select! {
            _ = tokio::time::sleep(period) => {}
            _ = shutdown.cancelled() => {
                debug!("Session reaper shutting down");
                break;
            }
        }
        sessions.reap_idle(max_idle).await;
    }
}
