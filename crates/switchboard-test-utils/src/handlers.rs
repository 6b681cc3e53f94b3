use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use futures::future::BoxFuture;
use futures::stream::{self, BoxStream, StreamExt};

use switchboard_core::agent::AgentDescriptor;
use switchboard_core::error::{Result, SwitchboardError};
use switchboard_core::traits::Handler;
use switchboard_core::types::ChatMessage;

/// Reply used when a scripted handler's queue is empty.
pub const DEFAULT_REPLY: &str = "OK";

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// A handler that replays queued replies and records what it was sent.
///
/// Replies stream back word by word.
pub struct ScriptedHandler {
    name: String,
    system_message: String,
    replies: Mutex<VecDeque<String>>,
    received: Mutex<Vec<Vec<ChatMessage>>>,
}

impl ScriptedHandler {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            system_message: format!("You are {}.", name),
            name,
            replies: Mutex::new(VecDeque::new()),
            received: Mutex::new(Vec::new()),
        }
    }

    pub fn with_system_message(mut self, system_message: impl Into<String>) -> Self {
        self.system_message = system_message.into();
        self
    }

    pub fn push_reply(&self, reply: impl Into<String>) {
        lock(&self.replies).push_back(reply.into());
    }

    /// Every message list passed to `execute`, in call order.
    pub fn received(&self) -> Vec<Vec<ChatMessage>> {
        lock(&self.received).clone()
    }

    pub fn call_count(&self) -> usize {
        lock(&self.received).len()
    }
}

impl Handler for ScriptedHandler {
    fn name(&self) -> &str {
        &self.name
    }

    fn system_message(&self) -> &str {
        &self.system_message
    }

    fn execute(
        &self,
        messages: Vec<ChatMessage>,
    ) -> BoxFuture<'_, Result<BoxStream<'_, Result<String>>>> {
        lock(&self.received).push(messages);
        let reply = lock(&self.replies)
            .pop_front()
            .unwrap_or_else(|| DEFAULT_REPLY.to_string());
        let fragments: Vec<Result<String>> = reply
            .split_inclusive(' ')
            .map(|word| Ok(word.to_string()))
            .collect();
        Box::pin(async move { Ok(stream::iter(fragments).boxed() as BoxStream<'_, Result<String>>) })
    }
}

/// A handler whose every call fails with a backend error.
pub struct FailingHandler {
    name: String,
    error: String,
}

impl FailingHandler {
    pub fn new(name: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            error: error.into(),
        }
    }
}

impl Handler for FailingHandler {
    fn name(&self) -> &str {
        &self.name
    }

    fn system_message(&self) -> &str {
        "You always fail."
    }

    fn execute(
        &self,
        _messages: Vec<ChatMessage>,
    ) -> BoxFuture<'_, Result<BoxStream<'_, Result<String>>>> {
        Box::pin(async move { Err(SwitchboardError::Backend(self.error.clone())) })
    }
}

/// A handler that waits before answering, for timeout tests.
pub struct SlowHandler {
    name: String,
    delay: Duration,
}

impl SlowHandler {
    pub fn new(name: impl Into<String>, delay: Duration) -> Self {
        Self {
            name: name.into(),
            delay,
        }
    }
}

impl Handler for SlowHandler {
    fn name(&self) -> &str {
        &self.name
    }

    fn system_message(&self) -> &str {
        "You are slow."
    }

    fn execute(
        &self,
        _messages: Vec<ChatMessage>,
    ) -> BoxFuture<'_, Result<BoxStream<'_, Result<String>>>> {
        Box::pin(async move {
            tokio::time::sleep(self.delay).await;
            Ok(stream::iter(vec![Ok("finally".to_string())]).boxed() as BoxStream<'_, Result<String>>)
        })
    }
}

/// A set of scripted handlers keyed by agent name.
///
/// `factory()` plugs into roster construction; any agent without an
/// override gets a `ScriptedHandler` that tests can script via `get`.
#[derive(Default)]
pub struct ScriptedHandlers {
    scripted: Mutex<HashMap<String, Arc<ScriptedHandler>>>,
    overrides: Mutex<HashMap<String, Arc<dyn Handler>>>,
}

impl ScriptedHandlers {
    pub fn new() -> Self {
        Self::default()
    }

    /// The scripted handler for `name`, created on first use.
    pub fn get(&self, name: &str) -> Arc<ScriptedHandler> {
        lock(&self.scripted)
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(ScriptedHandler::new(name)))
            .clone()
    }

    /// Use `handler` for `name` instead of a scripted one.
    pub fn set(&self, name: &str, handler: Arc<dyn Handler>) {
        lock(&self.overrides).insert(name.to_string(), handler);
    }

    /// The handler a roster would receive for `name`.
    pub fn handler(&self, name: &str) -> Arc<dyn Handler> {
        if let Some(handler) = lock(&self.overrides).get(name) {
            return handler.clone();
        }
        self.get(name)
    }

    pub fn factory(&self) -> impl FnMut(&AgentDescriptor) -> Result<Arc<dyn Handler>> + '_ {
        move |descriptor| Ok(self.handler(&descriptor.name))
    }
}
