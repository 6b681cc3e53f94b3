use chrono::{DateTime, Utc};
use serde::Serialize;

use switchboard_core::types::TransitionKind;

/// One accepted transition.
///
/// Records are append-only. Path records (`MultiStepPath`,
/// `AutoGeneratedPath`) are additionally advanced in place as their hops
/// are walked, and closed with `completed = true`.
#[derive(Debug, Clone, Serialize)]
pub struct TransitionRecord {
    pub from_agent: String,
    pub to_agent: String,
    pub kind: TransitionKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<Vec<String>>,
    pub step_index: usize,
    pub completed: bool,
    pub user_message: String,
    pub agent_response: String,
    pub at: DateTime<Utc>,
}

impl TransitionRecord {
    /// A path record that still has hops to walk.
    pub fn is_open_path(&self) -> bool {
        self.kind.carries_path() && !self.completed && self.path.is_some()
    }

    /// The hop the session should currently be at.
    pub fn position(&self) -> Option<&str> {
        self.path.as_ref()?.get(self.step_index).map(String::as_str)
    }

    /// Hops after the current position.
    pub fn remaining_hops(&self) -> &[String] {
        match &self.path {
            Some(path) if self.step_index < path.len() => &path[self.step_index + 1..],
            _ => &[],
        }
    }

    /// Move one hop forward; returns the new position.
    pub(crate) fn advance(&mut self) -> Option<String> {
        let path = self.path.as_ref()?;
        let next = path.get(self.step_index + 1)?.clone();
        self.step_index += 1;
        if self.step_index + 1 >= path.len() {
            self.completed = true;
        }
        Some(next)
    }

    /// `from -> to (kind)`
    pub fn summary(&self) -> String {
        format!("{} -> {} ({})", self.from_agent, self.to_agent, self.kind)
    }
}
