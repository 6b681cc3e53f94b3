//! Handlers and fixtures shared by Switchboard tests.

mod fixtures;
mod handlers;

pub use fixtures::office_descriptors;
pub use handlers::{FailingHandler, ScriptedHandler, ScriptedHandlers, SlowHandler, DEFAULT_REPLY};
