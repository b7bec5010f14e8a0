//! Planning agent: session loop, REPL and console checkpoints

mod console;
mod repl;
mod session;

use std::sync::Arc;

use eyre::{Context, Result};
use tracing::debug;

use routeplan::{AskUser, CheckpointManager};

use crate::config::{Config, StravaMode};
use crate::llm::LlmClient;
use crate::prompts::{PromptLoader, SystemContext};
use crate::tools::ToolExecutor;
use crate::tools::builtin::StravaEndpoint;

pub use console::ConsoleAsk;
pub use repl::Repl;
pub use session::{AgentSession, ChunkHandler};

/// Render the system prompt for this configuration
pub fn system_prompt(config: &Config, prompts: &PromptLoader) -> Result<String> {
    let strava_tools = match config.strava.mode {
        StravaMode::Mock => StravaEndpoint::ALL.iter().map(|e| e.name().to_string()).collect(),
        StravaMode::Disabled => Vec::new(),
    };
    prompts
        .system_prompt(&SystemContext::new(strava_tools))
        .context("Failed to render system prompt")
}

/// Wire up a session: prompts, checkpoint manager, tools
pub fn build_session(config: &Config, llm: Arc<dyn LlmClient>, ask: Arc<dyn AskUser>) -> Result<AgentSession> {
    debug!(strava = %config.strava.mode, "build_session: called");
    let prompts = Arc::new(PromptLoader::new(config.agent.prompts_dir.clone()));

    let mut checkpoints = CheckpointManager::new(ask);
    if let Some(timeout) = config.checkpoint.ask_timeout() {
        checkpoints = checkpoints.with_timeout(timeout);
    }

    let system_prompt = system_prompt(config, &prompts)?;
    let executor = ToolExecutor::standard(checkpoints, prompts, config.strava.mode);

    Ok(AgentSession::new(llm, executor, system_prompt).with_limits(config.agent.max_turns, config.llm.max_tokens))
}
