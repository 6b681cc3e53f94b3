use thiserror::Error;

#[derive(Debug, Error)]
pub enum SwitchboardError {
    // Config errors
    #[error("Config error: {0}")]
    Config(String),

    #[error("Config file not found: {0}")]
    ConfigNotFound(String),

    // Routing errors
    #[error("Unknown agent: {0}")]
    UnknownAgent(String),

    // Backend errors
    #[error("Backend request failed: {0}")]
    Backend(String),

    #[error("Backend timeout after {timeout_secs}s: {agent}")]
    BackendTimeout { agent: String, timeout_secs: u64 },

    // Gateway errors
    #[error("Gateway error: {0}")]
    Gateway(String),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // JSON errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SwitchboardError {
    /// Whether this error is one the session survives (it is rendered in-band
    /// and the conversation stays on its current agent).
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::UnknownAgent(_) | Self::Backend(_) | Self::BackendTimeout { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, SwitchboardError>;
