//! Checkpoints exposed as a single agent tool
//!
//! The agent calls the tool with a stage payload and a prompt; the host shows
//! both and hands back a `UserResponse`. Rendering and reply parsing are the
//! same ones the checkpoint manager uses.

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::checkpoint::CheckpointPayload;
use crate::format::format_message;
use crate::parser::{CheckpointAction, CheckpointResponse, ResponseDetails, parse_response};

/// Tool name the agent sees
pub const TOOL_NAME: &str = "present_route_plan";

pub const TOOL_DESCRIPTION: &str = "Present route planning information to the user at a checkpoint. \
The presentation data will be visible to the user, and they can approve or provide feedback. \
Use this at key workflow stages: confirm_intent, present_findings, select_route, refine_route, present_final.";

/// Tool input
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresentRoutePlanInput {
    pub presentation: CheckpointPayload,

    /// Question put to the user ("Which route would you like?")
    pub prompt: String,
}

impl PresentRoutePlanInput {
    /// Full text shown to the user: the rendered payload followed by the prompt
    ///
    /// The prompt is skipped when it is blank or already ends the rendered text.
    pub fn render(&self) -> String {
        let body = format_message(&self.presentation);
        let prompt = self.prompt.trim();
        if prompt.is_empty() || body.ends_with(prompt) {
            body
        } else {
            format!("{}\n\n{}", body, prompt)
        }
    }

    /// Parse a raw reply against this presentation's checkpoint
    pub fn interpret(&self, raw: &str) -> UserResponse {
        parse_response(self.presentation.checkpoint(), raw).into()
    }
}

/// Tool output: the user's decision
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub approved: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_route_id: Option<String>,
}

impl From<CheckpointResponse> for UserResponse {
    fn from(response: CheckpointResponse) -> Self {
        let approved = matches!(
            response.action,
            CheckpointAction::Confirm | CheckpointAction::Select | CheckpointAction::Approve
        );
        let (feedback, selected_route_id) = match response.details {
            Some(ResponseDetails::Response(raw)) => (Some(raw), None),
            Some(ResponseDetails::RouteId(id)) => (None, Some(id)),
            None => (None, None),
        };
        Self {
            approved,
            feedback,
            selected_route_id,
        }
    }
}

fn stage_variant(stage: &str, properties: serde_json::Value, required: &[&str]) -> serde_json::Value {
    let mut props = json!({ "stage": { "type": "string", "const": stage } });
    if let (Some(target), Some(extra)) = (props.as_object_mut(), properties.as_object()) {
        target.extend(extra.clone());
    }
    let mut required_fields = vec!["stage"];
    required_fields.extend_from_slice(required);
    json!({
        "type": "object",
        "properties": props,
        "required": required_fields,
    })
}

/// JSON schema of the tool input
pub fn input_schema() -> serde_json::Value {
    json!({
        "type": "object",
        "properties": {
            "presentation": {
                "type": "object",
                "description": "The route plan data to present (visible to user)",
                "oneOf": [
                    stage_variant(
                        "confirm_intent",
                        json!({ "query": { "type": "object" }, "skillsNeeded": { "type": "object" } }),
                        &["query", "skillsNeeded"],
                    ),
                    stage_variant(
                        "present_findings",
                        json!({ "skillResults": { "type": "array" }, "insights": { "type": "array" } }),
                        &["skillResults"],
                    ),
                    stage_variant(
                        "select_route",
                        json!({ "candidates": { "type": "array" } }),
                        &["candidates"],
                    ),
                    stage_variant(
                        "refine_route",
                        json!({ "selectedRoute": { "type": "object" }, "proposedRefinements": { "type": "array" } }),
                        &["selectedRoute"],
                    ),
                    stage_variant(
                        "present_final",
                        json!({ "finalRoute": { "type": "object" } }),
                        &["finalRoute"],
                    ),
                ]
            },
            "prompt": {
                "type": "string",
                "description": "Human-readable message asking for user input (e.g., 'Does this look correct?', 'Which route would you like?')"
            }
        },
        "required": ["presentation", "prompt"]
    })
}
