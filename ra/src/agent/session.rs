//! Agent session - conversation plus the tool-use loop

use std::sync::Arc;
use std::time::Duration;

use eyre::{Context, Result, eyre};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::llm::{
    CompletionRequest, CompletionResponse, ContentBlock, LlmClient, LlmError, Message, StopReason, StreamChunk,
    TokenUsage,
};
use crate::tools::{ToolContext, ToolExecutor};

/// Rate-limit retries per model call
const MAX_RATE_LIMIT_RETRIES: u32 = 2;

/// Longest we honor a retry-after header
const MAX_RETRY_WAIT: Duration = Duration::from_secs(60);

/// Callback for streamed output
pub type ChunkHandler<'a> = &'a (dyn Fn(&StreamChunk) + Sync);

/// One planning conversation with the model
pub struct AgentSession {
    llm: Arc<dyn LlmClient>,
    executor: ToolExecutor,
    ctx: ToolContext,
    conversation: Vec<Message>,
    system_prompt: String,
    max_turns: u32,
    max_tokens: u32,
    usage: TokenUsage,
}

impl AgentSession {
    pub fn new(llm: Arc<dyn LlmClient>, executor: ToolExecutor, system_prompt: String) -> Self {
        let ctx = ToolContext::new();
        debug!(session_id = %ctx.session_id, tools = ?executor.tool_names(), "AgentSession::new: called");
        Self {
            llm,
            executor,
            ctx,
            conversation: Vec::new(),
            system_prompt,
            max_turns: 25,
            max_tokens: 8192,
            usage: TokenUsage::default(),
        }
    }

    /// Set the turn limit per user message and the response token limit
    pub fn with_limits(mut self, max_turns: u32, max_tokens: u32) -> Self {
        self.max_turns = max_turns.max(1);
        self.max_tokens = max_tokens;
        self
    }

    pub fn context(&self) -> &ToolContext {
        &self.ctx
    }

    pub fn conversation(&self) -> &[Message] {
        &self.conversation
    }

    pub fn usage(&self) -> TokenUsage {
        self.usage
    }

    /// Start over: empty conversation and a fresh plan
    pub async fn reset(&mut self) {
        info!(session_id = %self.ctx.session_id, "Resetting session");
        self.conversation.clear();
        self.ctx.reset_plan().await;
    }

    /// Send a user message and run tool calls until the model finishes
    ///
    /// Returns the model's text from every turn of this exchange.
    pub async fn send(&mut self, input: &str) -> Result<String> {
        self.run(input, None).await
    }

    /// Like `send`, passing streamed chunks to `on_chunk` as they arrive
    pub async fn send_streaming(&mut self, input: &str, on_chunk: ChunkHandler<'_>) -> Result<String> {
        self.run(input, Some(on_chunk)).await
    }

    async fn run(&mut self, input: &str, on_chunk: Option<ChunkHandler<'_>>) -> Result<String> {
        debug!(session_id = %self.ctx.session_id, len = input.len(), "AgentSession::run: called");
        self.conversation.push(Message::user(input));
        let mut replies = Vec::new();

        for turn in 1..=self.max_turns {
            info!(turn, "Starting turn");
            let response = match self.call_llm(on_chunk).await {
                Ok(response) => response,
                Err(e) => {
                    error!(turn, error = %e, "Agent error");
                    return Err(e).context("LLM call failed");
                }
            };
            self.usage.add(response.usage);

            if let Some(text) = response.content.as_deref().filter(|t| !t.trim().is_empty()) {
                replies.push(text.to_string());
            }
            if response.content.is_some() || !response.tool_calls.is_empty() {
                self.conversation.push(response.to_assistant_message());
            }

            if response.stop_reason == StopReason::ToolUse && !response.tool_calls.is_empty() {
                let results = self.executor.execute_all(&response.tool_calls, &self.ctx).await;
                let blocks = results
                    .into_iter()
                    .map(|(id, result)| ContentBlock::tool_result(id, result.content, result.is_error))
                    .collect();
                self.conversation.push(Message::user_blocks(blocks));
                info!(turn, tool_calls = response.tool_calls.len(), "Turn complete");
                continue;
            }

            if response.stop_reason == StopReason::MaxTokens {
                warn!(turn, max_tokens = self.max_tokens, "Response truncated at max tokens");
            }
            info!(turn, "Turn complete");
            return Ok(replies.join("\n\n"));
        }

        warn!(max_turns = self.max_turns, "Turn limit reached");
        Err(eyre!("Stopped after {} turns without a final answer", self.max_turns))
    }

    async fn call_llm(&self, on_chunk: Option<ChunkHandler<'_>>) -> Result<CompletionResponse, LlmError> {
        let mut attempt = 0;
        loop {
            let request = CompletionRequest {
                system_prompt: self.system_prompt.clone(),
                messages: self.conversation.clone(),
                tools: self.executor.definitions(),
                max_tokens: self.max_tokens,
            };

            let result = match on_chunk {
                Some(handler) => {
                    let (tx, mut rx) = mpsc::channel::<StreamChunk>(100);
                    let drain = async {
                        while let Some(chunk) = rx.recv().await {
                            handler(&chunk);
                        }
                    };
                    let (result, ()) = tokio::join!(self.llm.stream(request, tx), drain);
                    result
                }
                None => self.llm.complete(request).await,
            };

            match result {
                Err(LlmError::RateLimited { retry_after }) if attempt < MAX_RATE_LIMIT_RETRIES => {
                    attempt += 1;
                    let wait = retry_after.min(MAX_RETRY_WAIT);
                    warn!(attempt, wait_secs = wait.as_secs(), "Rate limited, waiting before retry");
                    tokio::time::sleep(wait).await;
                }
                other => return other,
            }
        }
    }
}
