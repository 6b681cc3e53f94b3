use futures::stream::{BoxStream, StreamExt};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use switchboard_core::config::BackendConfig;
use switchboard_core::error::{Result, SwitchboardError};
use switchboard_core::types::ChatMessage;

use crate::streaming::{SseEvent, SseStream};

/// OpenAI-compatible chat client. Works with vLLM, Ollama, OpenAI, Groq, etc.
#[derive(Clone)]
pub struct OpenAiClient {
    http: Client,
    config: BackendConfig,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    max_tokens: u32,
    temperature: f32,
    stream: bool,
    #[serde(skip_serializing_if = "no_tools")]
    tools: &'a [serde_json::Value],
}

fn no_tools(tools: &&[serde_json::Value]) -> bool {
    tools.is_empty()
}

#[derive(Deserialize, Debug)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
}

#[derive(Deserialize, Debug)]
struct StreamChoice {
    #[serde(default)]
    delta: Option<StreamDeltaContent>,
}

#[derive(Deserialize, Debug)]
struct StreamDeltaContent {
    #[serde(default)]
    content: Option<String>,
}

/// Extract the text delta from one SSE event, if any.
pub(crate) fn parse_chunk(event: &SseEvent) -> Option<String> {
    if event.is_done() {
        return None;
    }

    match serde_json::from_str::<StreamChunk>(&event.data) {
        Ok(chunk) => chunk
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.delta)
            .and_then(|d| d.content)
            .filter(|text| !text.is_empty()),
        Err(e) => {
            warn!(data = %event.data, error = %e, "Failed to parse SSE chunk");
            None
        }
    }
}

impl OpenAiClient {
    pub fn new(config: BackendConfig) -> Self {
        Self {
            http: Client::new(),
            config,
        }
    }

    pub fn config(&self) -> &BackendConfig {
        &self.config
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'))
    }

    /// Send a streaming chat request and receive a stream of text deltas.
    ///
    /// One attempt only; the caller owns the timeout.
    pub async fn chat_stream(
        &self,
        messages: &[ChatMessage],
        temperature: f32,
        tools: &[serde_json::Value],
    ) -> Result<BoxStream<'static, Result<String>>> {
        let body = ChatRequest {
            model: &self.config.model_id,
            messages,
            max_tokens: self.config.max_tokens,
            temperature,
            stream: true,
            tools,
        };

        let mut req = self.http.post(self.endpoint()).json(&body);
        if let Some(api_key) = &self.config.api_key {
            req = req.bearer_auth(api_key);
        }

        debug!(model = %self.config.model_id, messages = messages.len(), "Sending chat request");

        let response = req
            .send()
            .await
            .map_err(|e| SwitchboardError::Backend(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown".to_string());
            return Err(SwitchboardError::Backend(format!("HTTP {}: {}", status, body)));
        }

        let deltas = SseStream::new(Box::pin(response.bytes_stream()))
            .filter_map(|event| async move { parse_chunk(&event).map(Ok) });

        Ok(deltas.boxed())
    }
}
