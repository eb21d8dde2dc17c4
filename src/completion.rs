//! Completion-service client for an OpenAI-compatible chat endpoint.

use std::io::Write as _;

use async_trait::async_trait;
use eventsource_stream::Eventsource;
use futures::StreamExt;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{BotError, Result};

/// Fixed system preamble sent with every prompt.
const SYSTEM_PROMPT: &str = "You are a helpful assistant";

/// Seam over the external text-generation service.
#[async_trait]
pub trait Completion: Send + Sync {
    /// Generate a reply to `prompt` with the given model.
    ///
    /// With `streaming` set, fragments are surfaced as they arrive and the
    /// assembled, trimmed text is returned once the stream completes. The
    /// call never returns partial text: on any failure the caller gets an
    /// error and substitutes a fallback message.
    async fn generate(&self, prompt: &str, model: &str, streaming: bool) -> Result<String>;
}

#[derive(Debug, Serialize)]
struct CompletionRequest {
    model: String,
    messages: Vec<RequestMessage>,
    stream: bool,
}

/// Message in the request
#[derive(Debug, Serialize)]
struct RequestMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: String,
}

/// Streaming chunk from the completion service
#[derive(Debug, Deserialize)]
struct StreamChunk {
    choices: Vec<StreamChoice>,
}

/// Choice in a streaming chunk
#[derive(Debug, Deserialize)]
struct StreamChoice {
    delta: Option<StreamDelta>,
}

/// Delta in a streaming chunk
#[derive(Debug, Deserialize)]
struct StreamDelta {
    #[serde(default)]
    content: Option<String>,
}

/// Client for an OpenAI-compatible `chat/completions` endpoint.
pub struct CompletionClient {
    api_key: String,
    endpoint: String,
    client: reqwest::Client,
}

impl CompletionClient {
    #[must_use]
    pub fn new(api_key: String, base_url: String) -> Self {
        let endpoint = format!("{}/chat/completions", base_url.trim_end_matches('/'));
        Self {
            api_key,
            endpoint,
            client: reqwest::Client::new(),
        }
    }

    async fn request(&self, prompt: &str, model: &str, stream: bool) -> Result<reqwest::Response> {
        let request = CompletionRequest {
            model: model.to_string(),
            messages: vec![
                RequestMessage {
                    role: "system",
                    content: SYSTEM_PROMPT.to_string(),
                },
                RequestMessage {
                    role: "user",
                    content: prompt.to_string(),
                },
            ],
            stream,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let message = response
                .text()
                .await
                .unwrap_or_else(|e| format!("Failed to read error response: {e}"));
            return Err(BotError::CompletionApi { status, message });
        }

        Ok(response)
    }
}

#[async_trait]
impl Completion for CompletionClient {
    async fn generate(&self, prompt: &str, model: &str, streaming: bool) -> Result<String> {
        debug!("Sending completion request for model {model}");
        let response = self.request(prompt, model, streaming).await?;

        if !streaming {
            let body: CompletionResponse = response.json().await?;
            let reply = body
                .choices
                .into_iter()
                .next()
                .ok_or_else(|| BotError::CompletionResponse("No choices in response".to_string()))?
                .message
                .content;
            debug!("Received buffered completion response");
            return Ok(reply);
        }

        let mut full = String::new();
        let mut events = response.bytes_stream().eventsource();

        while let Some(event) = events.next().await {
            let event = event.map_err(|e| BotError::CompletionResponse(e.to_string()))?;
            if event.data == "[DONE]" {
                break;
            }

            if let Ok(chunk) = serde_json::from_str::<StreamChunk>(&event.data)
                && let Some(choice) = chunk.choices.first()
                && let Some(delta) = &choice.delta
                && let Some(fragment) = &delta.content
                && !fragment.is_empty()
            {
                // Live display while the reply is assembled.
                print!("{fragment}");
                let _ = std::io::stdout().flush();
                full.push_str(fragment);
            }
        }
        println!();

        debug!("Streaming completion finished ({} characters)", full.len());
        Ok(full.trim().to_string())
    }
}
