use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::channel::mpsc;
use futures::stream::{self, BoxStream};
use futures::StreamExt;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, error, info, warn};

use switchboard_core::agent::AgentDescriptor;
use switchboard_core::config::RoutingConfig;
use switchboard_core::error::{Result, SwitchboardError};
use switchboard_core::event::EventBus;
use switchboard_core::traits::Handler;
use switchboard_core::types::{ChatMessage, GraphEvent, Role};

use crate::context::AgentContext;
use crate::directive::AgentReply;
use crate::engine::{Decision, TransitionEngine};
use crate::handoff::HandoffBrief;
use crate::record::TransitionRecord;
use crate::roster::AgentRoster;

/// Prefix of the in-band fragment that replaces a failed handler response.
pub const BACKEND_ERROR_PREFIX: &str = "[Error contacting backend: ";

/// Turns of the parent's context inherited on hand-off.
const PARENT_CONTEXT_TURNS: usize = 2;

/// One conversation: the active agent, transcript, per-agent contexts and
/// the transition engine.
///
/// A session processes one turn at a time; callers that share a session
/// across tasks serialize access (see `SessionManager`).
pub struct ConversationGraph {
    roster: AgentRoster,
    engine: TransitionEngine,
    active: String,
    transcript: Vec<ChatMessage>,
    agent_path: Vec<String>,
    contexts: HashMap<String, AgentContext>,
    events: Option<Arc<EventBus>>,
}

/// Forwards fragments to the caller and mirrors them on the event bus.
struct Emitter {
    tx: mpsc::UnboundedSender<String>,
    events: Option<Arc<EventBus>>,
}

impl Emitter {
    fn send(&self, agent: &str, text: &str) {
        if let Some(bus) = &self.events {
            bus.publish(GraphEvent::Fragment {
                agent: agent.to_string(),
                text: text.to_string(),
            });
        }
        // The receiver is gone only when the caller dropped the stream.
        let _ = self.tx.unbounded_send(text.to_string());
    }
}

/// Full text of one handler call, and whether it failed.
struct Outcome {
    text: String,
    failed: bool,
}

impl ConversationGraph {
    /// Start a session at the roster's root agent.
    pub fn create(roster: &AgentRoster, routing: RoutingConfig) -> Self {
        let root = roster.root().to_string();
        let contexts = roster
            .names()
            .map(|name| (name.to_string(), AgentContext::new()))
            .collect();

        Self {
            roster: roster.clone(),
            engine: TransitionEngine::new(routing),
            active: root.clone(),
            transcript: Vec::new(),
            agent_path: vec![root],
            contexts,
            events: None,
        }
    }

    /// Build a roster from descriptors and start a session on it.
    pub fn from_descriptors<F>(
        descriptors: Vec<AgentDescriptor>,
        factory: F,
        routing: RoutingConfig,
    ) -> Result<Self>
    where
        F: FnMut(&AgentDescriptor) -> Result<Arc<dyn Handler>>,
    {
        let roster = AgentRoster::build(descriptors, factory)?;
        Ok(Self::create(&roster, routing))
    }

    /// Publish turn events on `bus`.
    pub fn with_events(mut self, bus: Arc<EventBus>) -> Self {
        self.events = Some(bus);
        self
    }

    /// Attach a new agent under `parent` for this session only.
    pub fn add_agent(
        &mut self,
        parent: &str,
        descriptor: AgentDescriptor,
        handler: Arc<dyn Handler>,
    ) -> Result<()> {
        let name = descriptor.name.clone();
        self.roster.add_agent(parent, descriptor, handler)?;
        self.contexts.entry(name).or_default();
        Ok(())
    }

    /// Process one user message.
    ///
    /// The returned stream yields response fragments as they are produced:
    /// the active agent's reply, then a transition notice and any hand-off
    /// replies. Nothing runs until the stream is polled, and the turn is
    /// finished when the stream ends.
    pub fn process_message(&mut self, text: &str) -> BoxStream<'_, String> {
        let (tx, rx) = mpsc::unbounded();
        let emitter = Emitter {
            tx,
            events: self.events.clone(),
        };
        let message = text.to_string();

        let turn = stream::once(async move {
            self.run_turn(message, emitter).await;
        })
        .filter_map(|_| async { None::<String> });

        stream::select(rx, turn).boxed()
    }

    /// Process one user message and collect every fragment.
    pub async fn respond(&mut self, text: &str) -> String {
        self.process_message(text).collect::<Vec<_>>().await.concat()
    }

    async fn run_turn(&mut self, user_message: String, out: Emitter) {
        let agent = self.active.clone();
        info!(agent = %agent, "Processing message");
        self.publish(GraphEvent::TurnStarted {
            agent: agent.clone(),
            message: user_message.clone(),
        });

        self.context_mut(&agent)
            .record(Role::User, user_message.clone(), agent.clone());
        let first_turn = self.transcript.is_empty();
        self.transcript.push(ChatMessage::user(user_message.clone()));

        let Some(handler) = self.roster.get(&agent).map(|n| n.get_agent().clone()) else {
            error!(agent = %agent, "Active agent missing from roster");
            return;
        };

        let mut messages = Vec::with_capacity(self.transcript.len() + 1);
        if first_turn {
            messages.push(ChatMessage::system(self.preamble(&agent, handler.system_message())));
        }
        messages.extend(self.transcript.iter().cloned());

        let outcome = self.invoke(&handler, messages, &out).await;
        self.context_mut(&agent)
            .record(Role::Assistant, outcome.text.clone(), agent.clone());
        self.transcript.push(ChatMessage::assistant(outcome.text.clone()));

        let reply = AgentReply::from_text(outcome.text.as_str());
        let decision = match self.roster.get(&agent) {
            Some(node) => self
                .engine
                .decide(node, self.roster.graph(), &user_message, &reply),
            None => None,
        };
        if let Some(decision) = decision {
            self.apply(decision, &user_message, &outcome.text, &out).await;
        }

        self.publish(GraphEvent::TurnComplete {
            agent: self.active.clone(),
            at: Utc::now(),
        });
    }

    /// System preamble for the first turn: the handler's prompt plus a
    /// snapshot of the parent's context, if it has any.
    fn preamble(&self, agent: &str, system_message: &str) -> String {
        let inherited = self
            .roster
            .parent_of(agent)
            .and_then(|parent| self.contexts.get(parent))
            .map(|ctx| ctx.format_recent(PARENT_CONTEXT_TURNS))
            .unwrap_or_default();

        if inherited.is_empty() {
            system_message.to_string()
        } else {
            format!("{}\nParent Context: {}", system_message, inherited)
        }
    }

    async fn apply(&mut self, decision: Decision, user_message: &str, response: &str, out: &Emitter) {
        let from = self.active.clone();

        if !self.roster.contains(&decision.target) {
            let err = SwitchboardError::UnknownAgent(decision.target.clone());
            warn!(from = %from, error = %err, "Transition suppressed");
            self.engine.abandon(&decision);
            self.publish(GraphEvent::TransitionSuppressed {
                from,
                target: decision.target,
            });
            return;
        }

        self.engine
            .commit(&from, &decision, user_message, response, &mut self.contexts);
        self.publish(GraphEvent::Transitioned {
            from: from.clone(),
            to: decision.target.clone(),
            kind: decision.kind,
        });

        if decision.target == from {
            debug!(agent = %from, "Path starts at the active agent");
            return;
        }

        self.switch_to(&decision.target, out);
        self.hand_off_chain(decision.target, user_message, out).await;
    }

    /// Run the hand-off to `target`, then any follow-on completion hand-offs
    /// its reply requests, up to the configured hop limit.
    async fn hand_off_chain(&mut self, target: String, original: &str, out: &Emitter) {
        // The chosen target always answers once, even with a zero limit.
        let max_hops = self.engine.routing().max_handoff_hops.max(1);
        let mut target = target;
        let mut message = original.to_string();

        for hop in 1..=max_hops {
            let outcome = self.hand_off(&target, &message, out).await;
            self.publish(GraphEvent::HandoffCompleted {
                agent: target.clone(),
                hop,
            });
            if outcome.failed {
                debug!(agent = %target, "Hand-off chain aborted after backend failure");
                return;
            }

            let reply = AgentReply::from_text(outcome.text.as_str());
            let Some(next) = self
                .engine
                .completion_target(&target, self.roster.root(), &reply)
            else {
                return;
            };
            if !self.roster.contains(&next) {
                warn!(from = %target, to = %next, "Completion target unknown, staying put");
                return;
            }
            if hop == max_hops {
                warn!(agent = %target, hops = max_hops, "Hand-off hop limit reached");
                return;
            }

            let decision = Decision::completion(next.clone());
            self.engine
                .commit(&target, &decision, &message, &outcome.text, &mut self.contexts);
            self.publish(GraphEvent::Transitioned {
                from: target.clone(),
                to: next.clone(),
                kind: decision.kind,
            });

            message = format!("[TASK COMPLETED by {}] {}", target, original);
            self.switch_to(&next, out);
            target = next;
        }
    }

    /// Brief `target` with a fresh two-message exchange and run it.
    async fn hand_off(&mut self, target: &str, message: &str, out: &Emitter) -> Outcome {
        info!(agent = %target, "Handing off request");
        self.context_mut(target)
            .record(Role::User, message, target);

        let Some(handler) = self.roster.get(target).map(|n| n.get_agent().clone()) else {
            return Outcome {
                text: String::new(),
                failed: true,
            };
        };

        let routing = self.engine.routing();
        let parent_context = self
            .roster
            .parent_of(target)
            .and_then(|parent| self.contexts.get(parent))
            .map(|ctx| ctx.recent(PARENT_CONTEXT_TURNS))
            .unwrap_or_default();
        let pending_schedule = if target == routing.scheduling_agent {
            self.contexts
                .get(target)
                .and_then(|ctx| ctx.session_data.get("pending_schedule"))
        } else {
            None
        };
        let messages = HandoffBrief {
            system_message: handler.system_message(),
            user_message: message,
            root: self.roster.root(),
            feedback_agent: &routing.feedback_agent,
            parent_context,
            last_transition: self.engine.last_transition(),
            pending_schedule,
        }
        .messages();

        let outcome = self.invoke(&handler, messages, out).await;
        self.context_mut(target)
            .record(Role::Assistant, outcome.text.clone(), target);
        self.transcript.push(ChatMessage::assistant(outcome.text.clone()));
        outcome
    }

    /// Call a handler under the session's timeout, forwarding fragments.
    ///
    /// Failures become an in-band error fragment; its text is what the
    /// transition logic sees.
    async fn invoke(&self, handler: &Arc<dyn Handler>, messages: Vec<ChatMessage>, out: &Emitter) -> Outcome {
        let agent = handler.name().to_string();
        let timeout_secs = self.engine.routing().handler_timeout_secs;
        let deadline = Instant::now() + Duration::from_secs(timeout_secs);
        let timed_out = || SwitchboardError::BackendTimeout {
            agent: agent.clone(),
            timeout_secs,
        };

        let mut text = String::new();
        let result: Result<()> = async {
            let mut stream = timeout_at(deadline, handler.execute(messages))
                .await
                .map_err(|_| timed_out())??;
            loop {
                match timeout_at(deadline, stream.next()).await {
                    Err(_) => return Err(timed_out()),
                    Ok(None) => return Ok(()),
                    Ok(Some(Err(e))) => return Err(e),
                    Ok(Some(Ok(fragment))) => {
                        out.send(&agent, &fragment);
                        text.push_str(&fragment);
                    }
                }
            }
        }
        .await;

        match result {
            Ok(()) => Outcome { text, failed: false },
            Err(e) => {
                error!(agent = %agent, error = %e, "Handler call failed");
                self.publish(GraphEvent::BackendFailed {
                    agent: agent.clone(),
                    error: e.to_string(),
                });
                let fragment = format!("{}{}]", BACKEND_ERROR_PREFIX, e);
                out.send(&agent, &fragment);
                text.push_str(&fragment);
                Outcome { text, failed: true }
            }
        }
    }

    fn switch_to(&mut self, target: &str, out: &Emitter) {
        let from = std::mem::replace(&mut self.active, target.to_string());
        self.agent_path.push(target.to_string());
        info!(from = %from, to = %target, "Active agent changed");
        if self.engine.routing().announce_transitions {
            out.send(&from, &format!("\n[Transitioning to {}]\n", target));
        }
    }

    fn context_mut(&mut self, agent: &str) -> &mut AgentContext {
        self.contexts.entry(agent.to_string()).or_default()
    }

    fn publish(&self, event: GraphEvent) {
        if let Some(bus) = &self.events {
            bus.publish(event);
        }
    }

    /// Name of the active agent.
    pub fn get_current_agent(&self) -> &str {
        &self.active
    }

    /// Every agent that has been active, in order. Starts with the root.
    pub fn get_agent_path(&self) -> &[String] {
        &self.agent_path
    }

    pub fn get_transitions(&self) -> &[TransitionRecord] {
        self.engine.transitions()
    }

    pub fn get_recent_transitions(&self, count: usize) -> &[TransitionRecord] {
        self.engine.recent_transitions(count)
    }

    pub fn get_last_transition(&self) -> Option<&TransitionRecord> {
        self.engine.last_transition()
    }

    pub fn transcript(&self) -> &[ChatMessage] {
        &self.transcript
    }

    pub fn context(&self, agent: &str) -> Option<&AgentContext> {
        self.contexts.get(agent)
    }

    pub fn roster(&self) -> &AgentRoster {
        &self.roster
    }

    pub fn engine(&self) -> &TransitionEngine {
        &self.engine
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use switchboard_core::types::TransitionKind;
    use switchboard_test_utils::{office_descriptors, FailingHandler, ScriptedHandlers, SlowHandler};

    fn routing() -> RoutingConfig {
        RoutingConfig {
            handler_timeout_secs: 1,
            ..RoutingConfig::default()
        }
    }

    fn office(handlers: &ScriptedHandlers) -> ConversationGraph {
        ConversationGraph::from_descriptors(office_descriptors(), handlers.factory(), routing()).unwrap()
    }

    #[test]
    fn test_create_starts_at_root() {
        let handlers = ScriptedHandlers::new();
        let graph = office(&handlers);
        assert_eq!(graph.get_current_agent(), "reception_agent");
        assert_eq!(graph.get_agent_path(), ["reception_agent"]);
        assert!(graph.get_transitions().is_empty());
        assert!(graph.context("scheduler_agent").unwrap().is_empty());
    }

    #[test]
    fn test_create_rejects_bad_config() {
        let handlers = ScriptedHandlers::new();
        let two_roots = vec![AgentDescriptor::new("a").root(), AgentDescriptor::new("b").root()];
        let result = ConversationGraph::from_descriptors(two_roots, handlers.factory(), routing());
        assert!(matches!(result, Err(SwitchboardError::Config(_))));
    }

    #[tokio::test]
    async fn test_stream_is_lazy() {
        let handlers = ScriptedHandlers::new();
        let mut graph = office(&handlers);
        {
            let _stream = graph.process_message("hello");
        }
        assert!(graph.transcript().is_empty());
        assert_eq!(handlers.get("reception_agent").call_count(), 0);
    }

    #[tokio::test]
    async fn test_rule_transition_and_handoff() {
        let handlers = ScriptedHandlers::new();
        handlers.get("reception_agent").push_reply("Certainly, one moment.");
        handlers.get("booking_agent").push_reply("Room 4 is booked for Friday.");
        let mut graph = office(&handlers);

        let fragments: Vec<String> = graph.process_message("I want to book a room").collect().await;
        let text = fragments.concat();

        assert!(text.starts_with("Certainly, one moment."));
        assert!(text.contains("[Transitioning to booking_agent]"));
        assert!(text.ends_with("Room 4 is booked for Friday."));
        assert_eq!(graph.get_current_agent(), "booking_agent");
        assert_eq!(graph.get_agent_path(), ["reception_agent", "booking_agent"]);

        let last = graph.get_last_transition().unwrap();
        assert_eq!(last.kind, TransitionKind::RuleMatch);
        assert_eq!(last.from_agent, "reception_agent");

        // The hand-off is a fresh two-message exchange.
        let calls = handlers.get("booking_agent").received();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].len(), 2);
        assert_eq!(calls[0][1].content, "[TRANSFERRED REQUEST] I want to book a room");
        assert!(calls[0][0].content.contains("Parent Context: user (reception_agent): I want to book a room"));

        assert_eq!(graph.transcript().len(), 3);
    }

    #[tokio::test]
    async fn test_first_turn_gets_system_preamble_only_once() {
        let handlers = ScriptedHandlers::new();
        let mut graph = office(&handlers);
        graph.respond("zzz").await;
        graph.respond("zzz again").await;

        let calls = handlers.get("reception_agent").received();
        assert_eq!(calls[0][0].role, Role::System);
        assert_eq!(calls[0].len(), 2);
        assert_eq!(calls[1][0].role, Role::User);
        assert_eq!(calls[1].len(), 3);
    }

    #[tokio::test]
    async fn test_self_directive_stays() {
        let handlers = ScriptedHandlers::new();
        handlers.get("reception_agent").push_reply("Happy to help. TRANSITION_TO:reception_agent");
        let mut graph = office(&handlers);
        graph.respond("zzz").await;
        assert_eq!(graph.get_current_agent(), "reception_agent");
        assert!(graph.get_transitions().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_target_is_suppressed() {
        let handlers = ScriptedHandlers::new();
        handlers.get("reception_agent").push_reply("TRANSITION_TO:billing_agent");
        let bus = Arc::new(EventBus::default());
        let mut rx = bus.subscribe();
        let mut graph = office(&handlers).with_events(bus);

        graph.respond("zzz").await;
        assert_eq!(graph.get_current_agent(), "reception_agent");
        assert!(graph.get_transitions().is_empty());

        let mut suppressed = false;
        while let Ok(event) = rx.try_recv() {
            if let GraphEvent::TransitionSuppressed { target, .. } = event {
                assert_eq!(target, "billing_agent");
                suppressed = true;
            }
        }
        assert!(suppressed);
    }

    #[tokio::test]
    async fn test_multi_step_path_walk() {
        let handlers = ScriptedHandlers::new();
        handlers
            .get("reception_agent")
            .push_reply("TRANSITION_TO:reception_agent->faq_agent->hr_agent");
        let mut graph = office(&handlers);

        graph.respond("zzz").await;
        assert_eq!(graph.get_current_agent(), "reception_agent");
        assert!(graph.engine().open_path().is_some());

        graph.respond("zzz").await;
        assert_eq!(graph.get_current_agent(), "faq_agent");

        graph.respond("zzz").await;
        assert_eq!(graph.get_current_agent(), "hr_agent");
        assert!(graph.engine().open_path().is_none());

        graph.respond("zzz").await;
        assert_eq!(graph.get_current_agent(), "hr_agent");
        assert_eq!(
            graph.get_agent_path(),
            ["reception_agent", "faq_agent", "hr_agent"]
        );
    }

    #[tokio::test]
    async fn test_completion_to_feedback_then_back_to_root() {
        let handlers = ScriptedHandlers::new();
        handlers.get("reception_agent").push_reply("One moment.");
        handlers
            .get("booking_agent")
            .push_reply("Booked! TRANSITION_TO:feedback_agent");
        handlers
            .get("feedback_agent")
            .push_reply("Thanks for the rating. TRANSITION_TO:reception_agent");
        handlers.get("reception_agent").push_reply("Anything else?");
        let mut graph = office(&handlers);

        let text = graph.respond("book a room").await;

        // booking_agent initiated the hop to feedback, so returning to the root is allowed
        assert!(text.ends_with("Anything else?"));
        assert_eq!(graph.get_current_agent(), "reception_agent");
        assert_eq!(
            graph.get_agent_path(),
            ["reception_agent", "booking_agent", "feedback_agent", "reception_agent"]
        );
        let last = graph.get_last_transition().unwrap();
        assert_eq!(last.kind, TransitionKind::Completion);
        assert_eq!(last.from_agent, "feedback_agent");

        let calls = handlers.get("feedback_agent").received();
        assert_eq!(
            calls[0][1].content,
            "[TRANSFERRED REQUEST] [TASK COMPLETED by booking_agent] book a room"
        );
    }

    #[tokio::test]
    async fn test_completion_back_to_initiator_is_refused() {
        let handlers = ScriptedHandlers::new();
        handlers.get("reception_agent").push_reply("Of course.");
        handlers
            .get("feedback_agent")
            .push_reply("Noted. TRANSITION_TO:reception_agent");
        let mut graph = office(&handlers);

        graph.respond("I have some feedback").await;

        assert_eq!(graph.get_current_agent(), "feedback_agent");
        assert_eq!(handlers.get("reception_agent").call_count(), 1);
        assert_eq!(graph.get_transitions().len(), 1);
    }

    #[tokio::test]
    async fn test_scheduler_can_hand_back_to_root() {
        let handlers = ScriptedHandlers::new();
        handlers.get("reception_agent").push_reply("Sure.");
        handlers.get("booking_agent").push_reply("Which day?");
        handlers
            .get("booking_agent")
            .push_reply("Passing you on. TRANSITION_TO:scheduler_agent");
        handlers
            .get("scheduler_agent")
            .push_reply("Booked. TRANSITION_TO:reception_agent");
        handlers.get("reception_agent").push_reply("Welcome back.");
        let mut graph = office(&handlers);

        graph.respond("I need to book a meeting room").await;
        graph.respond("Friday please").await;

        assert_eq!(graph.get_current_agent(), "reception_agent");
        let last = graph.get_last_transition().unwrap();
        assert_eq!(last.kind, TransitionKind::Completion);
        assert_eq!(last.from_agent, "scheduler_agent");
    }

    fn bouncing(handlers: &ScriptedHandlers) {
        handlers.get("reception_agent").push_reply("Sure.");
        handlers
            .get("booking_agent")
            .push_reply("Booked. TRANSITION_TO:feedback_agent");
        handlers
            .get("feedback_agent")
            .push_reply("Thanks. TRANSITION_TO:reception_agent");
        handlers
            .get("reception_agent")
            .push_reply("Back at the desk. TRANSITION_TO:feedback_agent");
        handlers
            .get("feedback_agent")
            .push_reply("Thanks again. TRANSITION_TO:reception_agent");
    }

    fn limited(handlers: &ScriptedHandlers, max_handoff_hops: usize) -> ConversationGraph {
        let routing = RoutingConfig {
            max_handoff_hops,
            loop_guard_window: 0,
            ..routing()
        };
        ConversationGraph::from_descriptors(office_descriptors(), handlers.factory(), routing).unwrap()
    }

    #[tokio::test]
    async fn test_handoff_hop_limit() {
        let handlers = ScriptedHandlers::new();
        bouncing(&handlers);
        let mut graph = limited(&handlers, 3);

        graph.respond("book a room").await;

        assert_eq!(handlers.get("booking_agent").call_count(), 1);
        assert_eq!(handlers.get("feedback_agent").call_count(), 1);
        assert_eq!(handlers.get("reception_agent").call_count(), 2);
        assert_eq!(graph.get_current_agent(), "reception_agent");
        assert_eq!(
            graph.get_agent_path(),
            ["reception_agent", "booking_agent", "feedback_agent", "reception_agent"]
        );
        assert_eq!(graph.get_transitions().len(), 3);
    }

    #[tokio::test]
    async fn test_zero_hop_limit_still_answers_once() {
        let handlers = ScriptedHandlers::new();
        bouncing(&handlers);
        let mut graph = limited(&handlers, 0);

        let text = graph.respond("book a room").await;

        assert!(text.ends_with("Booked. TRANSITION_TO:feedback_agent"));
        assert_eq!(handlers.get("booking_agent").call_count(), 1);
        assert_eq!(handlers.get("feedback_agent").call_count(), 0);
        assert_eq!(graph.get_current_agent(), "booking_agent");
    }

    #[tokio::test]
    async fn test_backend_error_fragment() {
        let handlers = ScriptedHandlers::new();
        handlers.set("reception_agent", Arc::new(FailingHandler::new("reception_agent", "connection refused")));
        let mut graph = office(&handlers);

        let text = graph.respond("zzz").await;
        assert!(text.starts_with(BACKEND_ERROR_PREFIX));
        assert!(text.contains("connection refused"));
        assert_eq!(graph.get_current_agent(), "reception_agent");
        assert_eq!(graph.transcript().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_handler_timeout() {
        let handlers = ScriptedHandlers::new();
        handlers.set(
            "reception_agent",
            Arc::new(SlowHandler::new("reception_agent", Duration::from_secs(60))),
        );
        let mut graph = office(&handlers);

        let text = graph.respond("zzz").await;
        assert!(text.contains("Backend timeout after 1s: reception_agent"));
    }

    #[tokio::test]
    async fn test_handoff_failure_aborts_chain() {
        let handlers = ScriptedHandlers::new();
        handlers.get("reception_agent").push_reply("Sure.");
        handlers.set("booking_agent", Arc::new(FailingHandler::new("booking_agent", "502")));
        let mut graph = office(&handlers);

        let text = graph.respond("book a room").await;
        assert!(text.contains("[Transitioning to booking_agent]"));
        assert!(text.contains(BACKEND_ERROR_PREFIX));
        assert_eq!(graph.get_current_agent(), "booking_agent");
        assert_eq!(graph.get_transitions().len(), 1);
    }

    #[tokio::test]
    async fn test_add_agent_is_session_local() {
        let handlers = ScriptedHandlers::new();
        let mut graph = office(&handlers);
        let err = graph
            .add_agent("ghost", AgentDescriptor::new("parking_agent"), handlers.handler("parking_agent"))
            .unwrap_err();
        assert!(matches!(err, SwitchboardError::Config(_)));

        graph
            .add_agent("reception_agent", AgentDescriptor::new("parking_agent"), handlers.handler("parking_agent"))
            .unwrap();
        assert!(graph.roster().contains("parking_agent"));
        assert!(graph.context("parking_agent").is_some());

        handlers.get("reception_agent").push_reply("TRANSITION_TO:parking_agent");
        handlers.get("parking_agent").push_reply("Spot 12 is yours.");
        let text = graph.respond("zzz").await;
        assert!(text.ends_with("Spot 12 is yours."));
        assert_eq!(graph.get_current_agent(), "parking_agent");
    }
}
