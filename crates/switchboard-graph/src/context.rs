use serde::Serialize;
use serde_json::{Map, Value};

use switchboard_core::types::Role;

/// One remembered turn in an agent's context.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContextEntry {
    pub role: Role,
    pub content: String,
    pub agent: String,
}

/// State an agent accumulates over a session.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AgentContext {
    pub conversation_summary: Vec<ContextEntry>,
    pub user_preferences: Map<String, Value>,
    pub session_data: Map<String, Value>,
}

impl AgentContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, role: Role, content: impl Into<String>, agent: impl Into<String>) {
        self.conversation_summary.push(ContextEntry {
            role,
            content: content.into(),
            agent: agent.into(),
        });
    }

    /// The last `n` entries, oldest first.
    pub fn recent(&self, n: usize) -> &[ContextEntry] {
        let start = self.conversation_summary.len().saturating_sub(n);
        &self.conversation_summary[start..]
    }

    /// Render the last `n` entries as `role: content` pairs joined by ` | `.
    pub fn format_recent(&self, n: usize) -> String {
        self.recent(n)
            .iter()
            .map(|e| format!("{}: {}", e.role, e.content))
            .collect::<Vec<_>>()
            .join(" | ")
    }

    pub fn is_empty(&self) -> bool {
        self.conversation_summary.is_empty()
            && self.user_preferences.is_empty()
            && self.session_data.is_empty()
    }
}
