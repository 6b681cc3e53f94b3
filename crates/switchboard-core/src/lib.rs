pub mod agent;
pub mod config;
pub mod error;
pub mod event;
pub mod traits;
pub mod types;

pub use agent::{AgentDescriptor, AgentsFile, TransitionRule, TransitionRules};
pub use config::AppConfig;
pub use error::{Result, SwitchboardError};
pub use event::EventBus;
pub use traits::Handler;
pub use types::*;
