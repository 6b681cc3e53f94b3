use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique session identifier.
#[derive(Debug, Clone, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn from_string(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Role in a conversation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A chat message in the conversation transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: text.into(),
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: text.into(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: text.into(),
        }
    }
}

/// How a transition was triggered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionKind {
    /// A single-target `TRANSITION_TO:` directive.
    Explicit,
    /// A `TRANSITION_TO:a->b->c` directive; the record carries the path.
    MultiStepPath,
    /// A single-target directive expanded through the connectivity graph.
    AutoGeneratedPath,
    /// One further hop along a previously recorded path.
    PathContinuation,
    /// Intent keyword matched one of the active agent's transition rules.
    RuleMatch,
    /// Follow-on transition requested by the target of a hand-off.
    Completion,
}

impl TransitionKind {
    /// Kinds whose record owns a walkable path.
    pub fn carries_path(&self) -> bool {
        matches!(self, Self::MultiStepPath | Self::AutoGeneratedPath)
    }
}

impl std::fmt::Display for TransitionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Explicit => "explicit",
            Self::MultiStepPath => "multi_step_path",
            Self::AutoGeneratedPath => "auto_generated_path",
            Self::PathContinuation => "path_continuation",
            Self::RuleMatch => "rule_match",
            Self::Completion => "completion",
        };
        f.write_str(s)
    }
}

/// Event broadcast to all subscribers while a conversation turn runs.
#[derive(Debug, Clone)]
pub enum GraphEvent {
    /// A user turn was accepted by the active agent.
    TurnStarted { agent: String, message: String },
    /// A response fragment was forwarded to the caller.
    Fragment { agent: String, text: String },
    /// Control moved to another agent.
    Transitioned {
        from: String,
        to: String,
        kind: TransitionKind,
    },
    /// A transition was decided but the target could not be resolved.
    TransitionSuppressed { from: String, target: String },
    /// A hand-off response was produced by the target agent.
    HandoffCompleted { agent: String, hop: usize },
    /// The handler collaborator failed or timed out.
    BackendFailed { agent: String, error: String },
    /// The turn finished.
    TurnComplete {
        agent: String,
        at: DateTime<Utc>,
    },
}
