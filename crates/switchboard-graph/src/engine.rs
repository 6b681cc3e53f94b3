use std::collections::{HashMap, VecDeque};

use chrono::Utc;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use switchboard_core::config::RoutingConfig;
use switchboard_core::types::TransitionKind;

use crate::connectivity::ConnectivityGraph;
use crate::context::AgentContext;
use crate::directive::{AgentReply, Directive};
use crate::intents;
use crate::node::AgentNode;
use crate::record::TransitionRecord;

/// The outcome of `TransitionEngine::decide`: where to go and why.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    pub target: String,
    pub kind: TransitionKind,
    /// Hops to store for path kinds.
    pub path: Option<Vec<String>>,
    /// Index of the path record a continuation advances.
    continues: Option<usize>,
}

impl Decision {
    fn new(target: impl Into<String>, kind: TransitionKind) -> Self {
        Self {
            target: target.into(),
            kind,
            path: None,
            continues: None,
        }
    }

    /// A follow-on transition requested by the target of a hand-off.
    pub fn completion(target: impl Into<String>) -> Self {
        Self::new(target, TransitionKind::Completion)
    }
}

/// Decides, after every handler turn, whether the active agent changes.
///
/// Holds the append-only transition log, the open multi-step path (if
/// any) and the loop-guard history of recent transition initiators.
#[derive(Debug, Clone)]
pub struct TransitionEngine {
    routing: RoutingConfig,
    transitions: Vec<TransitionRecord>,
    recent_initiators: VecDeque<String>,
}

impl TransitionEngine {
    pub fn new(routing: RoutingConfig) -> Self {
        Self {
            routing,
            transitions: Vec::new(),
            recent_initiators: VecDeque::new(),
        }
    }

    pub fn routing(&self) -> &RoutingConfig {
        &self.routing
    }

    /// Pick the next agent for a finished turn, or `None` to stay.
    ///
    /// Priority: explicit directive (single, path, or expanded through the
    /// connectivity graph), then continuation of an open path, then the
    /// active agent's transition rules in declaration order.
    pub fn decide(
        &self,
        current: &AgentNode,
        graph: &ConnectivityGraph,
        user_message: &str,
        reply: &AgentReply,
    ) -> Option<Decision> {
        let current_name = current.name();

        if let Some(directive) = &reply.directive {
            if directive.targets_self(current_name) {
                debug!(agent = %current_name, "Ignoring self-transition directive");
                return None;
            }
            return Some(self.from_directive(current_name, graph, directive));
        }

        if let Some(decision) = self.continue_path(current_name) {
            return Some(decision);
        }

        self.match_rules(current, user_message, &reply.text)
    }

    fn from_directive(
        &self,
        current: &str,
        graph: &ConnectivityGraph,
        directive: &Directive,
    ) -> Decision {
        match directive {
            Directive::Path(hops) => {
                info!(from = %current, path = %hops.join(" -> "), "Multi-step directive");
                let mut decision =
                    Decision::new(directive.first_target(), TransitionKind::MultiStepPath);
                decision.path = Some(hops.clone());
                decision
            }
            Directive::Single(target) => match graph.shortest_path(current, target) {
                Some(path) if path.len() > 2 => {
                    let hops = path[1..].to_vec();
                    info!(
                        from = %current,
                        to = %target,
                        path = %ConnectivityGraph::describe_path(&path),
                        "Expanded directive through connectivity graph"
                    );
                    let mut decision =
                        Decision::new(hops[0].clone(), TransitionKind::AutoGeneratedPath);
                    decision.path = Some(hops);
                    decision
                }
                Some(_) => Decision::new(target.clone(), TransitionKind::Explicit),
                None => {
                    debug!(from = %current, to = %target, "No route for directive target");
                    Decision::new(target.clone(), TransitionKind::Explicit)
                }
            },
        }
    }

    fn continue_path(&self, current: &str) -> Option<Decision> {
        let (index, record) = self
            .transitions
            .iter()
            .enumerate()
            .rev()
            .find(|(_, r)| r.is_open_path())?;

        if record.position() != Some(current) {
            debug!(
                agent = %current,
                position = ?record.position(),
                "Open path is not at the active agent"
            );
            return None;
        }

        let path = record.path.as_ref()?;
        let next = path.get(record.step_index + 1)?;
        let mut decision = Decision::new(next.clone(), TransitionKind::PathContinuation);
        decision.continues = Some(index);
        Some(decision)
    }

    fn match_rules(
        &self,
        current: &AgentNode,
        user_message: &str,
        response: &str,
    ) -> Option<Decision> {
        let user_lower = user_message.to_lowercase();
        let response_lower = response.to_lowercase();

        current.transition_rules().iter().find_map(|rule| {
            let confidence = intents::confidence(&rule.intent, &user_lower, &response_lower);
            if confidence >= 1 {
                info!(
                    from = %current.name(),
                    to = %rule.target,
                    intent = %rule.intent,
                    confidence,
                    "Transition rule matched"
                );
                Some(Decision::new(rule.target.clone(), TransitionKind::RuleMatch))
            } else {
                None
            }
        })
    }

    /// Accept a decision: log it, advance or open paths, update the loop
    /// guard and the initiating agent's context.
    pub fn commit(
        &mut self,
        from: &str,
        decision: &Decision,
        user_message: &str,
        response: &str,
        contexts: &mut HashMap<String, AgentContext>,
    ) {
        match decision.kind {
            TransitionKind::PathContinuation => {
                if let Some(record) = decision.continues.and_then(|i| self.transitions.get_mut(i)) {
                    record.advance();
                    if record.completed {
                        info!(agent = %decision.target, "Multi-step path completed");
                    }
                }
            }
            // A completion hand-off moves the session off any walked path.
            TransitionKind::Explicit
            | TransitionKind::MultiStepPath
            | TransitionKind::AutoGeneratedPath
            | TransitionKind::Completion => self.close_open_paths(),
            TransitionKind::RuleMatch => {}
        }

        let completed = match &decision.path {
            Some(path) => path.len() <= 1,
            None => true,
        };
        let step_index = match decision.continues.and_then(|i| self.transitions.get(i)) {
            Some(record) => record.step_index,
            None => 0,
        };

        self.transitions.push(TransitionRecord {
            from_agent: from.to_string(),
            to_agent: decision.target.clone(),
            kind: decision.kind,
            path: decision.path.clone(),
            step_index,
            completed,
            user_message: user_message.to_string(),
            agent_response: response.to_string(),
            at: Utc::now(),
        });

        self.recent_initiators.push_back(from.to_string());
        while self.recent_initiators.len() > self.routing.loop_guard_window {
            self.recent_initiators.pop_front();
        }

        let context = contexts.entry(from.to_string()).or_default();
        if user_message.to_lowercase().contains("preference") {
            context
                .user_preferences
                .insert("last_preference".into(), Value::String(user_message.to_string()));
        }
        context.session_data.insert(
            "last_interaction".into(),
            json!({
                "user_message": user_message,
                "agent_response": response,
                "transitioned_to": decision.target,
            }),
        );

        if decision.target == self.routing.scheduling_agent {
            contexts
                .entry(decision.target.clone())
                .or_default()
                .session_data
                .insert(
                    "pending_schedule".into(),
                    json!({
                        "requested_by": from,
                        "user_message": user_message,
                        "agent_response": response,
                    }),
                );
        }

        info!(from = %from, to = %decision.target, kind = %decision.kind, "Transition accepted");
    }

    /// Drop a decision whose target could not be resolved. A continuation
    /// that cannot proceed closes its path.
    pub fn abandon(&mut self, decision: &Decision) {
        warn!(to = %decision.target, kind = %decision.kind, "Transition target unknown, staying put");
        if let Some(record) = decision.continues.and_then(|i| self.transitions.get_mut(i)) {
            record.completed = true;
        }
    }

    fn close_open_paths(&mut self) {
        for record in self.transitions.iter_mut().filter(|r| r.is_open_path()) {
            debug!(path = ?record.path, "Superseding open path");
            record.completed = true;
        }
    }

    /// Follow-on target requested by a hand-off response, if allowed.
    ///
    /// Only the root or feedback agent may be named, never the agent that
    /// just answered, and never the agent that most recently initiated a
    /// transition.
    pub fn completion_target(&self, visited: &str, root: &str, reply: &AgentReply) -> Option<String> {
        let target = reply.directive.as_ref()?.first_target();

        if target != root && target != self.routing.feedback_agent {
            debug!(from = %visited, to = %target, "Completion target not allow-listed");
            return None;
        }
        if target == visited {
            debug!(agent = %visited, "Completion target is the agent that just answered");
            return None;
        }
        if self.recent_initiators.back().is_some_and(|a| a == target) {
            info!(from = %visited, to = %target, "Loop guard rejected completion transition");
            return None;
        }

        Some(target.to_string())
    }

    pub fn transitions(&self) -> &[TransitionRecord] {
        &self.transitions
    }

    /// The last `count` records, oldest first.
    pub fn recent_transitions(&self, count: usize) -> &[TransitionRecord] {
        let start = self.transitions.len().saturating_sub(count);
        &self.transitions[start..]
    }

    pub fn last_transition(&self) -> Option<&TransitionRecord> {
        self.transitions.last()
    }

    /// The open path record, if one exists.
    pub fn open_path(&self) -> Option<&TransitionRecord> {
        self.transitions.iter().rev().find(|r| r.is_open_path())
    }

    pub fn recent_initiators(&self) -> impl Iterator<Item = &str> {
        self.recent_initiators.iter().map(String::as_str)
    }
}
