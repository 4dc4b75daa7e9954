//! Chat completion backends.
//!
//! [`ChatBackend`] is the seam between the platform and the external model.
//! [`OpenAiCompatClient`] talks to any server exposing
//! `POST {base}/v1/chat/completions`; tests substitute their own backend.

use std::time::Duration;

use async_trait::async_trait;
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::error::LlmError;
use crate::sse::SseDecoder;

// ── Types ────────────────────────────────────────────────────────────────────

/// A single message in a completion request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// Sampling parameters and messages for one call.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Ask the server to constrain output to a single JSON object.
    pub json_object: bool,
}

/// Content deltas in arrival order. The channel closes after the last delta
/// or right after an error item.
pub type DeltaStream = mpsc::Receiver<Result<String, LlmError>>;

#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Model identifier recorded in provenance.
    fn model_id(&self) -> &str;

    /// Non-streaming completion; returns the assistant content.
    async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError>;

    /// Streaming completion. Errors before the first byte are returned
    /// directly; later failures arrive as an `Err` item on the stream.
    async fn stream(&self, request: &CompletionRequest) -> Result<DeltaStream, LlmError>;
}

// ── OpenAI-compatible client ─────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct OpenAiCompatClient {
    http: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
}

#[derive(Serialize)]
struct CompletionBody<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
    temperature: f32,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
}

#[derive(Deserialize)]
struct CompletionChoice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
    #[serde(default)]
    error: Option<serde_json::Value>,
}

#[derive(Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: StreamDelta,
}

#[derive(Default, Deserialize)]
struct StreamDelta {
    #[serde(default)]
    content: Option<String>,
}

impl OpenAiCompatClient {
    pub fn new(
        base_url: &str,
        model: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, LlmError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LlmError::Connection(e.to_string()))?;
        let endpoint = format!("{}/v1/chat/completions", base_url.trim_end_matches('/'));
        let model = model.into();
        info!(endpoint = %endpoint, model = %model, "chat completion client ready");
        Ok(Self {
            http,
            endpoint,
            model,
            api_key,
        })
    }

    async fn send(
        &self,
        request: &CompletionRequest,
        stream: bool,
    ) -> Result<reqwest::Response, LlmError> {
        let body = CompletionBody {
            model: &self.model,
            messages: &request.messages,
            stream,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            response_format: request.json_object.then_some(ResponseFormat {
                kind: "json_object",
            }),
        };

        let mut builder = self.http.post(&self.endpoint).json(&body);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|e| format!("(failed to read body: {e})"));
            warn!(status = status.as_u16(), "model returned non-success status");
            return Err(LlmError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }
}

/// Decode an event-stream body into content deltas on `tx`.
///
/// An in-band `{"error": ..}` object, or a body that ends before `[DONE]`,
/// is forwarded as an `Err` item so a cut-off reply never reads as complete.
pub async fn forward_deltas<S, B>(body: S, tx: mpsc::Sender<Result<String, LlmError>>)
where
    S: Stream<Item = Result<B, LlmError>>,
    B: AsRef<[u8]>,
{
    let mut body = std::pin::pin!(body);
    let mut decoder = SseDecoder::new();

    while let Some(chunk) = body.next().await {
        let chunk = match chunk {
            Ok(c) => c,
            Err(e) => {
                let _ = tx.send(Err(e)).await;
                return;
            }
        };

        for frame in decoder.push(chunk.as_ref()) {
            if frame.is_done() {
                return;
            }
            let parsed: StreamChunk = match serde_json::from_str(&frame.data) {
                Ok(c) => c,
                Err(e) => {
                    debug!(error = %e, "skipping undecodable stream frame");
                    continue;
                }
            };
            if let Some(error) = parsed.error {
                let message = error
                    .get("message")
                    .and_then(serde_json::Value::as_str)
                    .map(str::to_string)
                    .unwrap_or_else(|| error.to_string());
                warn!(error = %message, "model reported an error mid-stream");
                let _ = tx
                    .send(Err(LlmError::Malformed(format!("upstream error: {message}"))))
                    .await;
                return;
            }
            let content = parsed
                .choices
                .into_iter()
                .next()
                .and_then(|c| c.delta.content)
                .unwrap_or_default();
            if !content.is_empty() && tx.send(Ok(content)).await.is_err() {
                return;
            }
        }
    }

    warn!("model stream ended without [DONE]");
    let _ = tx
        .send(Err(LlmError::Malformed("stream ended without [DONE]".to_string())))
        .await;
}

#[async_trait]
impl ChatBackend for OpenAiCompatClient {
    fn model_id(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError> {
        let response = self.send(request, false).await?;
        let parsed: CompletionResponse = response.json().await?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|c| c.trim().to_string())
            .unwrap_or_default();
        if content.is_empty() {
            return Err(LlmError::Malformed("empty completion".to_string()));
        }
        Ok(content)
    }

    async fn stream(&self, request: &CompletionRequest) -> Result<DeltaStream, LlmError> {
        let response = self.send(request, true).await?;
        let (tx, rx) = mpsc::channel(64);
        let body = response.bytes_stream().map(|chunk| chunk.map_err(LlmError::from));
        tokio::spawn(forward_deltas(body, tx));
        Ok(rx)
    }
}
