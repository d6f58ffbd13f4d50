//! OpenAI-compatible streaming backend.
//!
//! Speaks the SSE `chat/completions` protocol served by most local
//! text-generation backends as well as the hosted APIs. One request per bot
//! per round; the bot's generation parameters are merged into the request
//! body, with the reserved fields (`model`, `messages`, `stream`) always
//! winning.

use futures_util::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::generator::{GenerationRequest, GeneratorError, ReplyGenerator, ReplyStream};

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChunkDelta {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChunkChoice {
    delta: ChunkDelta,
    #[allow(dead_code)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatChunk {
    choices: Vec<ChunkChoice>,
}

// ---------------------------------------------------------------------------
// Generator
// ---------------------------------------------------------------------------

/// A [`ReplyGenerator`] backed by an OpenAI-compatible HTTP endpoint.
pub struct OpenAiCompatGenerator {
    client: Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
}

impl OpenAiCompatGenerator {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        OpenAiCompatGenerator {
            client: Client::new(),
            base_url: normalize_base_url(&base_url.into()),
            model: model.into(),
            api_key: None,
        }
    }

    /// Attach a bearer token. Local backends usually need none.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

/// Strip trailing slashes so endpoint joins stay predictable.
pub fn normalize_base_url(url: &str) -> String {
    url.trim_end_matches('/').to_string()
}

/// Assemble the message list: the bot's context as the system message, the
/// shared transcript, then the new user message.
fn build_messages(request: &GenerationRequest) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(request.history.len() + 2);
    if !request.context.is_empty() {
        messages.push(ChatMessage {
            role: "system".to_string(),
            content: request.context.clone(),
        });
    }
    for entry in request.history.entries() {
        if let Some(user) = &entry.user {
            messages.push(ChatMessage {
                role: "user".to_string(),
                content: user.clone(),
            });
        }
        if let Some(reply) = &entry.reply {
            messages.push(ChatMessage {
                role: "assistant".to_string(),
                content: reply.clone(),
            });
        }
    }
    messages.push(ChatMessage {
        role: "user".to_string(),
        content: request.user_message.clone(),
    });
    messages
}

/// Request body: bot params first, reserved fields layered on top.
fn build_body(
    model: &str,
    request: &GenerationRequest,
) -> Result<serde_json::Value, GeneratorError> {
    let mut body = serde_json::Map::new();
    for (key, value) in request.params.iter() {
        body.insert(key.clone(), value.clone());
    }
    body.insert("model".to_string(), serde_json::json!(model));
    body.insert(
        "messages".to_string(),
        serde_json::to_value(build_messages(request))
            .map_err(|e| GeneratorError::Protocol(e.to_string()))?,
    );
    body.insert("stream".to_string(), serde_json::json!(true));
    Ok(serde_json::Value::Object(body))
}

impl ReplyGenerator for OpenAiCompatGenerator {
    fn generate(&self, request: GenerationRequest) -> ReplyStream {
        let client = self.client.clone();
        let url = format!("{}/v1/chat/completions", self.base_url);
        let model = self.model.clone();
        let api_key = self.api_key.clone();

        Box::pin(async_stream::try_stream! {
            let body = build_body(&model, &request)?;

            let mut http_request = client.post(&url).json(&body);
            if let Some(key) = &api_key {
                http_request = http_request.bearer_auth(key);
            }

            tracing::debug!(url = %url, "requesting streamed completion");
            let response = http_request.send().await?;
            if !response.status().is_success() {
                Err(GeneratorError::Http {
                    status: response.status().as_u16(),
                })?;
            }

            let mut stream = response.bytes_stream();
            let mut buffer = String::new();
            let mut reply = String::new();
            let mut produced = false;

            while let Some(chunk) = stream.next().await {
                let chunk = chunk?;
                buffer.push_str(&String::from_utf8_lossy(&chunk));

                while let Some(line_end) = buffer.find('\n') {
                    let line = buffer[..line_end].trim().to_string();
                    buffer.drain(..=line_end);

                    let Some(payload) = line.strip_prefix("data: ") else {
                        continue;
                    };
                    if payload == "[DONE]" {
                        continue;
                    }
                    // Unparsable data lines are skipped, not fatal; some
                    // backends interleave keep-alive comments.
                    let Ok(parsed) = serde_json::from_str::<ChatChunk>(payload) else {
                        continue;
                    };
                    if let Some(content) = parsed
                        .choices
                        .first()
                        .and_then(|choice| choice.delta.content.as_ref())
                    {
                        reply.push_str(content);
                        produced = true;
                        yield reply.clone();
                    }
                }
            }

            if !produced {
                Err(GeneratorError::Empty)?;
            }
        })
    }
}
