pub mod connectivity;
pub mod context;
pub mod conversation;
pub mod directive;
pub mod engine;
pub mod handoff;
pub mod intents;
pub mod node;
pub mod record;
pub mod roster;
pub mod session;
pub mod topology;

pub use connectivity::ConnectivityGraph;
pub use context::{AgentContext, ContextEntry};
pub use conversation::{ConversationGraph, BACKEND_ERROR_PREFIX};
pub use directive::{AgentReply, Directive, TRANSITION_MARKER};
pub use engine::{Decision, TransitionEngine};
pub use node::AgentNode;
pub use record::TransitionRecord;
pub use roster::AgentRoster;
pub use session::SessionManager;
pub use topology::structure_prompt;
