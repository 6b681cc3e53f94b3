use futures::future::BoxFuture;
use futures::stream::BoxStream;
use tracing::debug;

use switchboard_core::agent::AgentDescriptor;
use switchboard_core::error::Result;
use switchboard_core::traits::Handler;
use switchboard_core::types::ChatMessage;

use crate::client::OpenAiClient;

const CONCISE_INSTRUCTION: &str = "IMPORTANT: Your responses must be concise and limited to 50 words or less. Be direct and clear in your communication.";

/// A `Handler` backed by an OpenAI-compatible model endpoint.
pub struct LlmHandler {
    name: String,
    system_message: String,
    temperature: f32,
    tools: Vec<serde_json::Value>,
    client: OpenAiClient,
}

impl LlmHandler {
    /// Build a handler for one agent descriptor.
    pub fn new(descriptor: &AgentDescriptor, client: OpenAiClient) -> Self {
        let mut system_message = descriptor.system_prompt.clone();
        if !descriptor.tool_prompt.is_empty() {
            system_message.push_str("\n\n");
            system_message.push_str(&descriptor.tool_prompt);
        }
        if client.config().concise_replies {
            system_message.push('\n');
            system_message.push_str(CONCISE_INSTRUCTION);
        }

        Self {
            name: descriptor.name.clone(),
            system_message,
            temperature: descriptor.temperature,
            tools: descriptor.tools.clone(),
            client,
        }
    }

    /// Append a generated `GRAPH STRUCTURE:` section to the system prompt.
    pub fn with_graph_structure(mut self, structure: &str) -> Self {
        if !structure.is_empty() {
            self.system_message.push('\n');
            self.system_message.push_str(structure);
        }
        self
    }

    pub fn temperature(&self) -> f32 {
        self.temperature
    }
}

impl Handler for LlmHandler {
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
        Box::pin(async move {
            debug!(agent = %self.name, messages = messages.len(), "Executing handler");
            let stream = self
                .client
                .chat_stream(&messages, self.temperature, &self.tools)
                .await?;
            Ok(stream as BoxStream<'_, Result<String>>)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use switchboard_core::config::BackendConfig;

    fn client(concise: bool) -> OpenAiClient {
        OpenAiClient::new(BackendConfig {
            concise_replies: concise,
            ..BackendConfig::default()
        })
    }

    #[test]
    fn test_system_message_composition() {
        let mut d = AgentDescriptor::new("it_agent").with_prompt("You are IT support.");
        d.tool_prompt = "Use reset_password for lockouts.".into();

        let h = LlmHandler::new(&d, client(true)).with_graph_structure("\nGRAPH STRUCTURE:\n- x");
        let msg = h.system_message();
        assert!(msg.starts_with("You are IT support."));
        assert!(msg.contains("Use reset_password for lockouts."));
        assert!(msg.contains("50 words"));
        assert!(msg.contains("GRAPH STRUCTURE:"));
        assert_eq!(h.name(), "it_agent");
    }

    #[test]
    fn test_plain_prompt_without_extras() {
        let d = AgentDescriptor::new("faq_agent")
            .with_prompt("Answer questions.")
            .with_temperature(0.9);
        let h = LlmHandler::new(&d, client(false)).with_graph_structure("");
        assert_eq!(h.system_message(), "Answer questions.");
        assert_eq!(h.temperature(), 0.9);
    }
}
