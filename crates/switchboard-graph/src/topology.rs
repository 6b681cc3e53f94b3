use std::collections::BTreeSet;

use switchboard_core::agent::AgentDescriptor;

use crate::directive::{PATH_SEPARATOR, TRANSITION_MARKER};
use crate::handoff::STRUCTURE_HEADING;

/// Render the topology section appended to every agent's system prompt.
///
/// Lists the agents, the routing paths implied by their rules and
/// hierarchy, and the directive syntax. Hand-offs strip this section
/// again from the receiving agent's prompt.
pub fn structure_prompt(descriptors: &[AgentDescriptor], feedback_agent: &str) -> String {
    let root = descriptors.iter().find(|d| d.is_root).map(|d| d.name.as_str());
    let names: BTreeSet<&str> = descriptors.iter().map(|d| d.name.as_str()).collect();

    let mut out = format!(
        "\n{}\n\
         - You are part of a network of specialized agents\n\
         - You can route requests through other agents if you don't have direct access\n\
         - Available agents (use exact names in transitions):",
        STRUCTURE_HEADING
    );
    for name in &names {
        let marker = if Some(*name) == root { " (root)" } else { "" };
        out.push_str(&format!("\n  * {}{}", name, marker));
    }

    out.push_str("\n- Common routing paths:");
    for path in routing_paths(descriptors, root, feedback_agent) {
        out.push_str(&format!("\n  * {}", path));
    }

    out.push_str(&format!(
        "\n- Use exact syntax for transitions:\n  \
         * Single transition: {m}agent_name\n  \
         * Multi-step: {m}agent1{s}agent2\n\
         - Example: {m}it_agent or {m}faq_agent{s}reception_agent\n",
        m = TRANSITION_MARKER,
        s = PATH_SEPARATOR
    ));
    out
}

fn routing_paths(
    descriptors: &[AgentDescriptor],
    root: Option<&str>,
    feedback_agent: &str,
) -> BTreeSet<String> {
    let arrow = format!(" {} ", PATH_SEPARATOR);
    let mut paths = BTreeSet::new();

    for d in descriptors {
        for target in d.transition_rules.targets() {
            paths.insert(format!("{}{}{}", d.name, arrow, target));
        }
    }

    if let Some(root) = root {
        if descriptors.iter().any(|d| d.parent.as_deref() == Some(root)) {
            paths.insert(format!("{}{}Any agent", root, arrow));
        }
        if descriptors.iter().any(|d| d.name == feedback_agent) {
            paths.insert(format!("All agents{a}{}{a}{}", feedback_agent, root, a = arrow));
        }
    }

    paths
}
