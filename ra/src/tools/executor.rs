//! ToolExecutor - manages tool execution for a session

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, warn};

use routeplan::CheckpointManager;

use crate::config::StravaMode;
use crate::llm::{ToolCall, ToolDefinition};
use crate::prompts::PromptLoader;

use super::builtin::{PresentRoutePlanTool, RoutePlanTool, StravaTool};
use super::{Tool, ToolContext, ToolError, ToolResult};

/// Manages tool execution for a session
pub struct ToolExecutor {
    tools: HashMap<String, Box<dyn Tool>>,
}

impl ToolExecutor {
    /// Create executor with the planning tools, plus Strava unless disabled
    pub fn standard(checkpoints: CheckpointManager, prompts: Arc<PromptLoader>, strava: StravaMode) -> Self {
        debug!(%strava, "ToolExecutor::standard: called");
        let mut executor = Self::empty();

        executor.add_tool(Box::new(RoutePlanTool));
        executor.add_tool(Box::new(PresentRoutePlanTool::new(checkpoints, prompts)));

        if strava == StravaMode::Mock {
            for tool in StravaTool::all() {
                executor.add_tool(Box::new(tool));
            }
        }

        executor
    }

    /// Create an empty executor (for testing)
    pub fn empty() -> Self {
        Self { tools: HashMap::new() }
    }

    /// Add a tool to the executor
    pub fn add_tool(&mut self, tool: Box<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    fn definition(tool: &dyn Tool) -> ToolDefinition {
        ToolDefinition {
            name: tool.name().to_string(),
            description: tool.description().to_string(),
            input_schema: tool.input_schema(),
        }
    }

    /// Get tool definitions for the LLM, sorted by name
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        let mut defs: Vec<ToolDefinition> = self.tools.values().map(|t| Self::definition(t.as_ref())).collect();
        defs.sort_by(|a, b| a.name.cmp(&b.name));
        defs
    }

    /// Execute a tool call
    pub async fn execute(&self, tool_call: &ToolCall, ctx: &ToolContext) -> ToolResult {
        match self.tools.get(&tool_call.name) {
            Some(tool) => {
                let result = tool.execute(tool_call.input.clone(), ctx).await;
                debug!(tool = %tool_call.name, is_error = result.is_error, "ToolExecutor::execute: done");
                result
            }
            None => {
                let err = ToolError::UnknownTool {
                    name: tool_call.name.clone(),
                };
                warn!(error = %err, "Model called an unknown tool");
                ToolResult::error(err.to_string())
            }
        }
    }

    /// Execute multiple tool calls, one at a time, in the order given
    pub async fn execute_all(&self, tool_calls: &[ToolCall], ctx: &ToolContext) -> Vec<(String, ToolResult)> {
        let mut results = Vec::with_capacity(tool_calls.len());

        for call in tool_calls {
            let result = self.execute(call, ctx).await;
            results.push((call.id.clone(), result));
        }

        results
    }

    /// Get tool names, sorted
    pub fn tool_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.keys().cloned().collect();
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use routeplan::{AskError, AskUser, WorkflowStage};

    struct YesAsk;

    #[async_trait]
    impl AskUser for YesAsk {
        async fn ask(&self, _message: &str) -> Result<String, AskError> {
            Ok("yes".to_string())
        }
    }

    fn executor(strava: StravaMode) -> ToolExecutor {
        ToolExecutor::standard(
            CheckpointManager::new(Arc::new(YesAsk)),
            Arc::new(PromptLoader::embedded_only()),
            strava,
        )
    }

    fn call(id: &str, name: &str, input: serde_json::Value) -> ToolCall {
        ToolCall {
            id: id.to_string(),
            name: name.to_string(),
            input,
        }
    }

    #[test]
    fn test_standard_executor_has_planning_tools() {
        let executor = executor(StravaMode::Mock);

        let names = executor.tool_names();
        assert!(names.iter().any(|n| n == "route_plan"));
        assert!(names.iter().any(|n| n == "present_route_plan"));
        assert!(names.iter().any(|n| n == "get-all-activities"));
        assert_eq!(names.len(), 9);
    }

    #[test]
    fn test_strava_disabled() {
        let executor = executor(StravaMode::Disabled);
        assert_eq!(executor.tool_names(), vec!["present_route_plan", "route_plan"]);
    }

    #[test]
    fn test_definitions_sorted() {
        let defs = executor(StravaMode::Mock).definitions();
        let names: Vec<&str> = defs.iter().map(|d| d.name.as_str()).collect();
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
    }


    #[tokio::test]
    async fn test_execute_unknown_tool() {
        let result = executor(StravaMode::Mock)
            .execute(&call("call_1", "unknown_tool", serde_json::json!({})), &ToolContext::new())
            .await;
        assert!(result.is_error);
        assert!(result.content.contains("unknown_tool"));
    }

    #[tokio::test]
    async fn test_execute_all_in_order() {
        let executor = executor(StravaMode::Disabled);
        let ctx = ToolContext::new();
        let calls = vec![
            call("a", "route_plan", serde_json::json!({"action": "confirm_intent"})),
            call("b", "route_plan", serde_json::json!({"action": "present_findings"})),
        ];

        let results = executor.execute_all(&calls, &ctx).await;

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].0, "a");
        assert!(!results[1].1.is_error, "{}", results[1].1.content);
        assert_eq!(ctx.plan.lock().await.stage(), WorkflowStage::FindingsPresented);
    }
}
