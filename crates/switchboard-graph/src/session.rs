use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::Mutex;
use tracing::info;

use switchboard_core::config::RoutingConfig;
use switchboard_core::event::EventBus;
use switchboard_core::types::SessionId;

use crate::conversation::ConversationGraph;
use crate::roster::AgentRoster;

/// A live session and when it was last used.
pub struct SessionEntry {
    pub graph: Arc<Mutex<ConversationGraph>>,
    pub started_at: DateTime<Utc>,
    pub last_active: DateTime<Utc>,
}

/// Keeps one `ConversationGraph` per session key.
///
/// Each graph sits behind its own mutex, so turns within a session run one
/// at a time while different sessions proceed concurrently.
pub struct SessionManager {
    roster: Arc<AgentRoster>,
    routing: RoutingConfig,
    events: Option<Arc<EventBus>>,
    sessions: Mutex<HashMap<String, SessionEntry>>,
}

impl SessionManager {
    pub fn new(roster: Arc<AgentRoster>, routing: RoutingConfig) -> Self {
        Self {
            roster,
            routing,
            events: None,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Attach `bus` to every session created from now on.
    pub fn with_events(mut self, bus: Arc<EventBus>) -> Self {
        self.events = Some(bus);
        self
    }

    pub fn roster(&self) -> &Arc<AgentRoster> {
        &self.roster
    }

    /// Get the session for `key`, creating it at the root agent if needed.
    pub async fn get_or_create(&self, key: &str) -> Arc<Mutex<ConversationGraph>> {
        let mut sessions = self.sessions.lock().await;
        if let Some(entry) = sessions.get_mut(key) {
            entry.last_active = Utc::now();
            return entry.graph.clone();
        }

        let mut graph = ConversationGraph::create(&self.roster, self.routing.clone());
        if let Some(bus) = &self.events {
            graph = graph.with_events(bus.clone());
        }
        let graph = Arc::new(Mutex::new(graph));
        sessions.insert(
            key.to_string(),
            SessionEntry {
                graph: graph.clone(),
                started_at: Utc::now(),
                last_active: Utc::now(),
            },
        );
        info!(session = %key, "Session created");
        graph
    }

    /// Create a session under a fresh random key.
    pub async fn open(&self) -> (String, Arc<Mutex<ConversationGraph>>) {
        let key = SessionId::new().0;
        let graph = self.get_or_create(&key).await;
        (key, graph)
    }

    pub async fn get(&self, key: &str) -> Option<Arc<Mutex<ConversationGraph>>> {
        self.sessions.lock().await.get(key).map(|e| e.graph.clone())
    }

    pub async fn remove(&self, key: &str) -> bool {
        self.sessions.lock().await.remove(key).is_some()
    }

    /// Active session keys.
    pub async fn list(&self) -> Vec<String> {
        self.sessions.lock().await.keys().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    /// Drop sessions unused for at least `max_idle`. Returns how many went.
    pub async fn reap_idle(&self, max_idle: Duration) -> usize {
        let now = Utc::now();
        let mut sessions = self.sessions.lock().await;
        let before = sessions.len();
        sessions.retain(|_, entry| now - entry.last_active < max_idle);
        let reaped = before - sessions.len();
        if reaped > 0 {
            info!(reaped, remaining = sessions.len(), "Idle sessions reaped");
        }
        reaped
    }
}
