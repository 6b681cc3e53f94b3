use serde_json::Value;

use switchboard_core::types::ChatMessage;

use crate::context::ContextEntry;
use crate::record::TransitionRecord;

/// Heading of the generated topology section in agent prompts.
pub const STRUCTURE_HEADING: &str = "GRAPH STRUCTURE:";

/// Tag on the single user turn of a hand-off exchange.
pub const TRANSFER_TAG: &str = "[TRANSFERRED REQUEST]";

/// Everything needed to brief an agent that receives a hand-off.
#[derive(Debug, Clone)]
pub struct HandoffBrief<'a> {
    /// The target handler's full system message.
    pub system_message: &'a str,
    pub user_message: &'a str,
    pub root: &'a str,
    pub feedback_agent: &'a str,
    /// Latest turns from the target's structural parent.
    pub parent_context: &'a [ContextEntry],
    pub last_transition: Option<&'a TransitionRecord>,
    /// Set only when the target is the scheduling agent.
    pub pending_schedule: Option<&'a Value>,
}

impl HandoffBrief<'_> {
    /// The specialized system instruction for the target.
    pub fn instructions(&self) -> String {
        let mut out = core_prompt(self.system_message).to_string();

        out.push_str(&format!(
            "\n\nTRANSFERRED REQUEST: Another agent has handed this conversation to you \
             because it falls within your specialty.\n\
             The user's request is: '{}'\n\n\
             Instructions:\n\
             - Resolve the request yourself with your own knowledge and tools.\n\
             - Do not ask the user to repeat details already given.\n\
             - Do not route the request to any other specialist.\n\
             - Once the request is fully handled you may hand back with \
             TRANSITION_TO:{} or collect feedback with TRANSITION_TO:{}.",
            self.user_message, self.root, self.feedback_agent
        ));

        if !self.parent_context.is_empty() {
            let turns: Vec<String> = self
                .parent_context
                .iter()
                .map(|e| format!("{} ({}): {}", e.role, e.agent, e.content))
                .collect();
            out.push_str("\nParent Context: ");
            out.push_str(&turns.join(" | "));
        }

        if let Some(record) = self.last_transition {
            out.push_str("\nLast transition: ");
            out.push_str(&record.summary());
        }

        if let Some(pending) = self.pending_schedule {
            out.push_str("\nPending scheduling request: ");
            out.push_str(&pending.to_string());
        }

        out
    }

    /// The two-message exchange sent to the target handler.
    pub fn messages(&self) -> Vec<ChatMessage> {
        vec![
            ChatMessage::system(self.instructions()),
            ChatMessage::user(format!("{} {}", TRANSFER_TAG, self.user_message)),
        ]
    }
}

/// The part of a system message that precedes the topology section.
pub fn core_prompt(system_message: &str) -> &str {
    match system_message.split_once(STRUCTURE_HEADING) {
        Some((prefix, _)) => prefix.trim_end(),
        None => system_message,
    }
}
