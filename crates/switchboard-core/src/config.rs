use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::agent::{AgentDescriptor, AgentsFile};
use crate::error::{Result, SwitchboardError};

/// Top-level switchboard configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub routing: RoutingConfig,
    #[serde(default)]
    pub gateway: Option<GatewayConfig>,
    /// Optional JSON agent file, relative to the config file's directory.
    #[serde(default)]
    pub agents_file: Option<String>,
    /// Inline agent descriptors.
    #[serde(default)]
    pub agents: Vec<AgentDescriptor>,
}

/// Language-model backend (OpenAI-compatible chat completions).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_model_id")]
    pub model_id: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Append the "answer in 50 words" instruction to every agent prompt.
    #[serde(default = "default_concise_replies")]
    pub concise_replies: bool,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model_id: default_model_id(),
            api_key: None,
            max_tokens: default_max_tokens(),
            concise_replies: default_concise_replies(),
        }
    }
}

fn default_base_url() -> String { "http://localhost:8000/v1".to_string() }
fn default_model_id() -> String { "Qwen/Qwen2.5-7B-Instruct".to_string() }
fn default_max_tokens() -> u32 { 512 }
fn default_concise_replies() -> bool { true }

/// Transition engine tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingConfig {
    /// Allow-listed completion target besides the root agent.
    #[serde(default = "default_feedback_agent")]
    pub feedback_agent: String,
    /// Agent that receives pending scheduling context on hand-off.
    #[serde(default = "default_scheduling_agent")]
    pub scheduling_agent: String,
    /// Hard cap on chained hand-offs within one turn. Values below 1 are
    /// treated as 1: the chosen target always answers once.
    #[serde(default = "default_max_handoff_hops")]
    pub max_handoff_hops: usize,
    /// Number of recent transition initiators remembered by the loop guard.
    #[serde(default = "default_loop_guard_window")]
    pub loop_guard_window: usize,
    /// Emit a `[Transitioning to X]` fragment when control moves.
    #[serde(default = "default_announce_transitions")]
    pub announce_transitions: bool,
    /// Append the generated GRAPH STRUCTURE section to agent prompts.
    #[serde(default = "default_embed_graph_structure")]
    pub embed_graph_structure: bool,
    /// Bounded wait for every handler call.
    #[serde(default = "default_handler_timeout_secs")]
    pub handler_timeout_secs: u64,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            feedback_agent: default_feedback_agent(),
            scheduling_agent: default_scheduling_agent(),
            max_handoff_hops: default_max_handoff_hops(),
            loop_guard_window: default_loop_guard_window(),
            announce_transitions: default_announce_transitions(),
            embed_graph_structure: default_embed_graph_structure(),
            handler_timeout_secs: default_handler_timeout_secs(),
        }
    }
}

fn default_feedback_agent() -> String { "feedback_agent".to_string() }
fn default_scheduling_agent() -> String { "scheduler_agent".to_string() }
fn default_max_handoff_hops() -> usize { 5 }
fn default_loop_guard_window() -> usize { 5 }
fn default_announce_transitions() -> bool { true }
fn default_embed_graph_structure() -> bool { true }
fn default_handler_timeout_secs() -> u64 { 30 }

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Sessions idle this long are dropped. 0 keeps them forever.
    #[serde(default = "default_session_idle_secs")]
    pub session_idle_secs: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            session_idle_secs: default_session_idle_secs(),
        }
    }
}

fn default_bind() -> String { "127.0.0.1:8080".to_string() }
fn default_session_idle_secs() -> u64 { 1800 }

impl AppConfig {
    /// Load config from a TOML file, with env var expansion.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|_| SwitchboardError::ConfigNotFound(path.display().to_string()))?;

        Self::parse(&content)
    }

    /// Parse config from TOML text, with env var expansion.
    pub fn parse(content: &str) -> Result<Self> {
        // Expand ${ENV_VAR} references
        let expanded = expand_env_vars(content);

        toml::from_str(&expanded).map_err(|e| SwitchboardError::Config(e.to_string()))
    }

    /// Resolve the full agent set: the agents file (if any) followed by inline agents.
    ///
    /// `base_dir` anchors a relative `agents_file`. An empty result is a config error.
    pub fn agent_descriptors(&self, base_dir: &Path) -> Result<Vec<AgentDescriptor>> {
        let mut agents = Vec::new();
        if let Some(ref file) = self.agents_file {
            let path = resolve_path(file, base_dir);
            agents.extend(AgentsFile::load(&path)?);
        }
        agents.extend(self.agents.iter().cloned());

        if agents.is_empty() {
            return Err(SwitchboardError::Config("no agents configured".into()));
        }
        Ok(agents)
    }

    pub fn gateway_or_default(&self) -> GatewayConfig {
        self.gateway.clone().unwrap_or_default()
    }
}

fn resolve_path(spec: &str, base_dir: &Path) -> PathBuf {
    let path = Path::new(spec);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base_dir.join(path)
    }
}

/// Expand `${ENV_VAR}` patterns in a string.
fn expand_env_vars(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '$' && chars.peek() == Some(&'{') {
            chars.next(); // consume '{'
            let mut var_name = String::new();
            for c in chars.by_ref() {
                if c == '}' {
                    break;
                }
                var_name.push(c);
            }
            match std::env::var(&var_name) {
                Ok(val) => result.push_str(&val),
                Err(_) => {
                    // Keep original if env var not set
                    result.push_str(&format!("${{{}}}", var_name));
                }
            }
        } else {
            result.push(c);
        }
    }
    result
}
