//! present_route_plan tool - checkpoints with the rider

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, info, warn};

use routeplan::presentation::{self, PresentRoutePlanInput};
use routeplan::CheckpointManager;

use crate::prompts::{GuideContext, PromptLoader};
use crate::tools::{Tool, ToolContext, ToolError, ToolResult};

/// Show a checkpoint to the rider and hand their decision back to the model
pub struct PresentRoutePlanTool {
    checkpoints: CheckpointManager,
    prompts: Arc<PromptLoader>,
}

impl PresentRoutePlanTool {
    pub fn new(checkpoints: CheckpointManager, prompts: Arc<PromptLoader>) -> Self {
        Self { checkpoints, prompts }
    }

    async fn present(&self, input: Value, ctx: &ToolContext) -> Result<String, ToolError> {
        let input: PresentRoutePlanInput =
            serde_json::from_value(input).map_err(|e| ToolError::InvalidArgument(e.to_string()))?;
        let checkpoint = input.presentation.checkpoint();
        info!(session_id = %ctx.session_id, %checkpoint, "Presenting checkpoint");

        let message = input.render();
        let reply = self.checkpoints.ask(&message).await?;
        let response = input.interpret(&reply);
        debug!(%checkpoint, approved = response.approved, "PresentRoutePlanTool::present: reply parsed");

        if !response.approved
            && let Some(feedback) = &response.feedback
        {
            ctx.plan.lock().await.add_user_feedback(feedback.clone());
        }

        let mut result = serde_json::json!({ "response": response });
        match self
            .prompts
            .guide(checkpoint, &GuideContext::new(message, reply, &response))
        {
            Ok(guide) => result["next"] = Value::String(guide),
            Err(e) => warn!(%checkpoint, error = %e, "Failed to render checkpoint guide"),
        }

        Ok(serde_json::to_string_pretty(&result)?)
    }
}

#[async_trait]
impl Tool for PresentRoutePlanTool {
    fn name(&self) -> &'static str {
        presentation::TOOL_NAME
    }

    fn description(&self) -> &'static str {
        presentation::TOOL_DESCRIPTION
    }

    fn input_schema(&self) -> Value {
        presentation::input_schema()
    }

    async fn execute(&self, input: Value, ctx: &ToolContext) -> ToolResult {
        self.present(input, ctx).await.into()
    }
}
