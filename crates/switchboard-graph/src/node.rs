use std::sync::Arc;

use switchboard_core::agent::{AgentDescriptor, TransitionRules};
use switchboard_core::traits::Handler;

/// One agent in a roster: its handler, declared rules and children.
///
/// Children are held by name. The parent of a node is found by searching
/// the roster for the node that lists it as a child.
#[derive(Clone)]
pub struct AgentNode {
    descriptor: AgentDescriptor,
    handler: Arc<dyn Handler>,
    children: Vec<String>,
}

impl AgentNode {
    pub fn new(descriptor: AgentDescriptor, handler: Arc<dyn Handler>) -> Self {
        Self {
            descriptor,
            handler,
            children: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    pub fn descriptor(&self) -> &AgentDescriptor {
        &self.descriptor
    }

    /// The handler that produces this agent's responses.
    pub fn get_agent(&self) -> &Arc<dyn Handler> {
        &self.handler
    }

    pub fn transition_rules(&self) -> &TransitionRules {
        &self.descriptor.transition_rules
    }

    pub fn is_root(&self) -> bool {
        self.descriptor.is_root
    }

    pub fn add_child(&mut self, name: impl Into<String>) {
        let name = name.into();
        if !self.children.contains(&name) {
            self.children.push(name);
        }
    }

    pub fn children(&self) -> &[String] {
        &self.children
    }

    pub fn has_child(&self, name: &str) -> bool {
        self.children.iter().any(|c| c == name)
    }

    /// Whether one of this agent's declared rules targets `target`.
    ///
    /// This is the local rule view only; reachability through the wider
    /// graph is answered by `ConnectivityGraph`.
    pub fn can_transition_to(&self, target: &str) -> bool {
        self.descriptor.transition_rules.targets().any(|t| t == target)
    }
}

impl std::fmt::Debug for AgentNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentNode")
            .field("name", &self.descriptor.name)
            .field("children", &self.children)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use switchboard_test_utils::ScriptedHandler;

    #[test]
    fn test_can_transition_to_uses_declared_rules() {
        let d = AgentDescriptor::new("booking_agent")
            .with_parent("reception_agent")
            .with_rule("scheduler", "scheduler_agent");
        let node = AgentNode::new(d, Arc::new(ScriptedHandler::new("booking_agent")));
        assert!(node.can_transition_to("scheduler_agent"));
        assert!(!node.can_transition_to("reception_agent"));
        assert_eq!(node.get_agent().name(), "booking_agent");
    }

    #[test]
    fn test_children_are_append_only_and_unique() {
        let mut node = AgentNode::new(
            AgentDescriptor::new("reception_agent").root(),
            Arc::new(ScriptedHandler::new("reception_agent")),
        );
        node.add_child("faq_agent");
        node.add_child("hr_agent");
        node.add_child("faq_agent");
        assert_eq!(node.children(), ["faq_agent", "hr_agent"]);
        assert!(node.has_child("hr_agent"));
        assert!(node.is_root());
    }
}
