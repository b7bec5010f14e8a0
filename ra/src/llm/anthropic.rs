//! Anthropic Messages API client
//!
//! Blocking calls retry transient failures with exponential backoff.
//! Streaming calls parse the SSE event stream into `StreamChunk`s.

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::header::HeaderMap;
use reqwest::{Client, RequestBuilder};
use reqwest_eventsource::{Error as EventSourceError, Event, EventSource};
use serde::Deserialize;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::{
    CompletionRequest, CompletionResponse, ContentBlock, LlmClient, LlmError, StopReason, StreamChunk, TokenUsage,
    ToolCall,
};
use crate::config::LlmConfig;

const API_VERSION: &str = "2023-06-01";

/// Maximum number of retries for transient errors
const MAX_RETRIES: u32 = 3;

/// Initial backoff delay for retries
const INITIAL_BACKOFF_MS: u64 = 1000;

/// Retry-after used when a 429 carries no header
const DEFAULT_RETRY_AFTER_SECS: u64 = 60;

fn is_retryable_status(status: u16) -> bool {
    matches!(status, 408 | 500 | 502 | 503 | 504 | 529)
}

/// Map a non-success HTTP status to an error; 429 honors `retry-after`
fn status_error(status: u16, headers: &HeaderMap, message: String) -> LlmError {
    if status == 429 {
        let retry_after = headers
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.trim().parse::<u64>().ok())
            .unwrap_or(DEFAULT_RETRY_AFTER_SECS);
        return LlmError::RateLimited {
            retry_after: Duration::from_secs(retry_after),
        };
    }
    LlmError::ApiError { status, message }
}

fn backoff(attempt: u32) -> Duration {
    Duration::from_millis(INITIAL_BACKOFF_MS * 2u64.pow(attempt.saturating_sub(1)))
}

/// Anthropic API client
pub struct AnthropicClient {
    model: String,
    api_key: String,
    base_url: String,
    http: Client,
    max_tokens: u32,
    timeout: Duration,
}

impl AnthropicClient {
    /// Create a new client from configuration
    pub fn from_config(config: &LlmConfig) -> Result<Self, LlmError> {
        debug!(model = %config.model, base_url = %config.base_url, "AnthropicClient::from_config: called");
        let api_key = config
            .get_api_key()
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

        let timeout = Duration::from_millis(config.timeout_ms);
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(LlmError::Network)?;

        Ok(Self {
            model: config.model.clone(),
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            http,
            max_tokens: config.max_tokens,
            timeout,
        })
    }

    fn post(&self, body: &serde_json::Value) -> RequestBuilder {
        self.http
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .header("content-type", "application/json")
            .json(body)
    }

    /// Build the request body for the Messages API
    fn build_request_body(&self, request: &CompletionRequest) -> Result<serde_json::Value, LlmError> {
        let mut body = serde_json::json!({
            "model": self.model,
            "max_tokens": request.max_tokens.min(self.max_tokens),
            "system": request.system_prompt,
            "messages": serde_json::to_value(&request.messages)?,
        });

        if !request.tools.is_empty() {
            body["tools"] = serde_json::to_value(&request.tools)?;
        }

        Ok(body)
    }
}

#[async_trait]
impl LlmClient for AnthropicClient {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        debug!(model = %self.model, messages = request.messages.len(), "AnthropicClient::complete: called");
        let body = self.build_request_body(&request)?;

        let mut last_error = None;
        for attempt in 0..=MAX_RETRIES {
            if attempt > 0 {
                let delay = backoff(attempt);
                warn!(attempt, backoff_ms = delay.as_millis() as u64, "Retrying LLM call after transient error");
                tokio::time::sleep(delay).await;
            }

            let response = match self.post(&body).send().await {
                Ok(r) => r,
                Err(e) if e.is_timeout() => {
                    last_error = Some(LlmError::Timeout(self.timeout));
                    continue;
                }
                Err(e) => {
                    debug!(attempt, error = %e, "AnthropicClient::complete: network error");
                    last_error = Some(LlmError::Network(e));
                    continue;
                }
            };

            let status = response.status().as_u16();

            if !response.status().is_success() {
                let headers = response.headers().clone();
                let message = response.text().await.unwrap_or_default();
                let err = status_error(status, &headers, message);
                if is_retryable_status(status) && attempt < MAX_RETRIES {
                    debug!(attempt, status, "AnthropicClient::complete: retryable status");
                    last_error = Some(err);
                    continue;
                }
                return Err(err);
            }

            let api_response: ApiResponse = response.json().await?;
            return Ok(api_response.into());
        }

        Err(last_error.unwrap_or_else(|| LlmError::InvalidResponse("Max retries exceeded".to_string())))
    }

    async fn stream(
        &self,
        request: CompletionRequest,
        chunk_tx: mpsc::Sender<StreamChunk>,
    ) -> Result<CompletionResponse, LlmError> {
        debug!(model = %self.model, messages = request.messages.len(), "AnthropicClient::stream: called");
        let mut body = self.build_request_body(&request)?;
        body["stream"] = serde_json::json!(true);

        let mut es = EventSource::new(self.post(&body)).map_err(|e| LlmError::InvalidResponse(e.to_string()))?;
        let mut state = StreamState::default();

        while let Some(event) = es.next().await {
            match event {
                Ok(Event::Open) => debug!("AnthropicClient::stream: opened"),
                Ok(Event::Message(msg)) => {
                    let data: serde_json::Value = serde_json::from_str(&msg.data)?;
                    if state.apply(&data, &chunk_tx).await {
                        break;
                    }
                }
                Err(EventSourceError::InvalidStatusCode(status, response)) => {
                    es.close();
                    let headers = response.headers().clone();
                    let message = response.text().await.unwrap_or_default();
                    let err = status_error(status.as_u16(), &headers, message);
                    warn!(error = %err, "AnthropicClient::stream: request rejected");
                    let _ = chunk_tx.send(StreamChunk::Error(err.to_string())).await;
                    return Err(err);
                }
                Err(e) => {
                    es.close();
                    let _ = chunk_tx.send(StreamChunk::Error(e.to_string())).await;
                    return Err(LlmError::InvalidResponse(e.to_string()));
                }
            }
        }
        es.close();

        let response = state.finish();
        let _ = chunk_tx
            .send(StreamChunk::MessageDone {
                stop_reason: response.stop_reason,
                usage: response.usage,
            })
            .await;
        Ok(response)
    }
}

/// Accumulates one streamed message
#[derive(Default)]
struct StreamState {
    text: String,
    tool_calls: Vec<ToolCall>,
    /// (id, name, partial JSON) of the tool block being streamed
    current_tool: Option<(String, String, String)>,
    stop_reason: Option<StopReason>,
    usage: TokenUsage,
}

impl StreamState {
    /// Apply one SSE event; returns true at `message_stop`
    async fn apply(&mut self, data: &serde_json::Value, chunk_tx: &mpsc::Sender<StreamChunk>) -> bool {
        match data["type"].as_str() {
            Some("message_start") => {
                self.usage.input_tokens = data["message"]["usage"]["input_tokens"].as_u64().unwrap_or(0);
            }
            Some("content_block_start") => {
                let block = &data["content_block"];
                if block["type"] == "tool_use" {
                    let id = block["id"].as_str().unwrap_or_default().to_string();
                    let name = block["name"].as_str().unwrap_or_default().to_string();
                    self.current_tool = Some((id.clone(), name.clone(), String::new()));
                    let _ = chunk_tx.send(StreamChunk::ToolUseStart { id, name }).await;
                }
            }
            Some("content_block_delta") => {
                let delta = &data["delta"];
                if let Some(text) = delta["text"].as_str() {
                    self.text.push_str(text);
                    let _ = chunk_tx.send(StreamChunk::TextDelta(text.to_string())).await;
                }
                if let (Some(json), Some((_, _, acc))) = (delta["partial_json"].as_str(), self.current_tool.as_mut()) {
                    acc.push_str(json);
                }
            }
            Some("content_block_stop") => {
                if let Some((id, name, json)) = self.current_tool.take() {
                    let input = if json.trim().is_empty() {
                        serde_json::json!({})
                    } else {
                        serde_json::from_str(&json).unwrap_or_else(|e| {
                            warn!(tool = %name, error = %e, "Tool input was not valid JSON");
                            serde_json::json!({})
                        })
                    };
                    self.tool_calls.push(ToolCall {
                        id: id.clone(),
                        name,
                        input,
                    });
                    let _ = chunk_tx.send(StreamChunk::ToolUseEnd { id }).await;
                }
            }
            Some("message_delta") => {
                if let Some(reason) = data["delta"]["stop_reason"].as_str() {
                    self.stop_reason = Some(StopReason::from_anthropic(reason));
                }
                if let Some(output) = data["usage"]["output_tokens"].as_u64() {
                    self.usage.output_tokens = output;
                }
            }
            Some("message_stop") => return true,
            Some("error") => {
                let message = data["error"]["message"].as_str().unwrap_or("unknown stream error");
                warn!(%message, "Stream reported an error event");
                let _ = chunk_tx.send(StreamChunk::Error(message.to_string())).await;
            }
            _ => {}
        }
        false
    }

    fn finish(self) -> CompletionResponse {
        CompletionResponse {
            content: if self.text.is_empty() { None } else { Some(self.text) },
            tool_calls: self.tool_calls,
            stop_reason: self.stop_reason.unwrap_or(StopReason::EndTurn),
            usage: self.usage,
        }
    }
}

// Messages API response types

#[derive(Debug, Deserialize)]
struct ApiResponse {
    content: Vec<ContentBlock>,
    stop_reason: Option<String>,
    usage: ApiUsage,
}

#[derive(Debug, Deserialize)]
struct ApiUsage {
    input_tokens: u64,
    output_tokens: u64,
}

impl From<ApiResponse> for CompletionResponse {
    fn from(api: ApiResponse) -> Self {
        let mut texts = Vec::new();
        let mut tool_calls = Vec::new();

        for block in api.content {
            match block {
                ContentBlock::Text { text } => texts.push(text),
                ContentBlock::ToolUse { id, name, input } => tool_calls.push(ToolCall { id, name, input }),
                ContentBlock::ToolResult { .. } => {}
            }
        }

        CompletionResponse {
            content: if texts.is_empty() { None } else { Some(texts.join("\n")) },
            tool_calls,
            stop_reason: api
                .stop_reason
                .as_deref()
                .map(StopReason::from_anthropic)
                .unwrap_or(StopReason::EndTurn),
            usage: TokenUsage {
                input_tokens: api.usage.input_tokens,
                output_tokens: api.usage.output_tokens,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{Message, ToolDefinition};

    fn client(max_tokens: u32) -> AnthropicClient {
        AnthropicClient {
            model: "claude-sonnet-4-5".to_string(),
            api_key: "test-key".to_string(),
            base_url: "https://api.anthropic.com".to_string(),
            http: Client::new(),
            max_tokens,
            timeout: Duration::from_secs(30),
        }
    }

    fn request(max_tokens: u32, tools: Vec<ToolDefinition>) -> CompletionRequest {
        CompletionRequest {
            system_prompt: "You plan cycling routes".to_string(),
            messages: vec![Message::user("Hello")],
            tools,
            max_tokens,
        }
    }

    #[test]
    fn test_build_request_body_basic() {
        let body = client(8192).build_request_body(&request(1000, vec![])).unwrap();

        assert_eq!(body["model"], "claude-sonnet-4-5");
        assert_eq!(body["max_tokens"], 1000);
        assert_eq!(body["system"], "You plan cycling routes");
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(body["messages"][0]["content"], "Hello");
        assert!(body.get("tools").is_none());
    }

    #[test]
    fn test_build_request_body_with_tools() {
        let tools = vec![ToolDefinition {
            name: "route_plan".to_string(),
            description: "Workflow state".to_string(),
            input_schema: serde_json::json!({"type": "object"}),
        }];
        let body = client(8192).build_request_body(&request(1000, tools)).unwrap();

        assert_eq!(body["tools"][0]["name"], "route_plan");
        assert_eq!(body["tools"][0]["input_schema"]["type"], "object");
    }

    #[test]
    fn test_max_tokens_capped() {
        let body = client(1000).build_request_body(&request(5000, vec![])).unwrap();
        assert_eq!(body["max_tokens"], 1000);
    }

    #[test]
    fn test_status_error_rate_limit_reads_retry_after() {
        let mut headers = HeaderMap::new();
        headers.insert("retry-after", "12".parse().unwrap());

        let err = status_error(429, &headers, "slow down".to_string());
        assert_eq!(err.retry_after(), Some(Duration::from_secs(12)));

        let err = status_error(429, &HeaderMap::new(), String::new());
        assert_eq!(err.retry_after(), Some(Duration::from_secs(DEFAULT_RETRY_AFTER_SECS)));
    }

    #[test]
    fn test_status_error_other_statuses() {
        let err = status_error(529, &HeaderMap::new(), "overloaded".to_string());
        assert!(matches!(err, LlmError::ApiError { status: 529, ref message } if message == "overloaded"));
        assert!(err.is_retryable());

        let err = status_error(400, &HeaderMap::new(), "bad request".to_string());
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_backoff_doubles() {
        assert_eq!(backoff(1), Duration::from_millis(1000));
        assert_eq!(backoff(2), Duration::from_millis(2000));
        assert_eq!(backoff(3), Duration::from_millis(4000));
    }

    #[test]
    fn test_api_response_conversion() {
        let api: ApiResponse = serde_json::from_value(serde_json::json!({
            "content": [
                {"type": "text", "text": "Checking your plan."},
                {"type": "tool_use", "id": "toolu_1", "name": "route_plan", "input": {"action": "get_summary"}}
            ],
            "stop_reason": "tool_use",
            "usage": {"input_tokens": 120, "output_tokens": 30}
        }))
        .unwrap();

        let response: CompletionResponse = api.into();
        assert_eq!(response.content.as_deref(), Some("Checking your plan."));
        assert_eq!(response.stop_reason, StopReason::ToolUse);
        assert_eq!(response.tool_calls[0].input["action"], "get_summary");
        assert_eq!(response.usage.output_tokens, 30);
    }

    #[tokio::test]
    async fn test_stream_state_accumulates_tool_call() {
        let (tx, mut rx) = mpsc::channel(16);
        let mut state = StreamState::default();

        let events = [
            serde_json::json!({"type": "message_start", "message": {"usage": {"input_tokens": 42}}}),
            serde_json::json!({"type": "content_block_start", "content_block": {"type": "text"}}),
            serde_json::json!({"type": "content_block_delta", "delta": {"type": "text_delta", "text": "One sec"}}),
            serde_json::json!({"type": "content_block_start", "content_block": {"type": "tool_use", "id": "toolu_9", "name": "route_plan"}}),
            serde_json::json!({"type": "content_block_delta", "delta": {"type": "input_json_delta", "partial_json": "{\"action\":"}}),
            serde_json::json!({"type": "content_block_delta", "delta": {"type": "input_json_delta", "partial_json": "\"get_state\"}"}}),
            serde_json::json!({"type": "content_block_stop"}),
            serde_json::json!({"type": "message_delta", "delta": {"stop_reason": "tool_use"}, "usage": {"output_tokens": 17}}),
        ];
        for event in &events {
            assert!(!state.apply(event, &tx).await);
        }
        assert!(state.apply(&serde_json::json!({"type": "message_stop"}), &tx).await);

        let response = state.finish();
        assert_eq!(response.content.as_deref(), Some("One sec"));
        assert_eq!(response.stop_reason, StopReason::ToolUse);
        assert_eq!(response.tool_calls.len(), 1);
        assert_eq!(response.tool_calls[0].input["action"], "get_state");
        assert_eq!(response.usage.input_tokens, 42);
        assert_eq!(response.usage.output_tokens, 17);

        assert!(matches!(rx.recv().await, Some(StreamChunk::TextDelta(ref t)) if t == "One sec"));
        assert!(matches!(rx.recv().await, Some(StreamChunk::ToolUseStart { ref name, .. }) if name == "route_plan"));
        assert!(matches!(rx.recv().await, Some(StreamChunk::ToolUseEnd { ref id }) if id == "toolu_9"));
    }
}
