//! route_plan tool - drives the workflow state machine

use async_trait::async_trait;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::debug;

use routeplan::{ParsedQuery, RefinedRoute, RouteCandidate, RoutePlan, SkillResult, SkillsNeeded, WorkflowStage};

use crate::tools::{Tool, ToolContext, ToolError, ToolResult};

/// One `route_plan` call
#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
enum PlanAction {
    GetState,
    GetSummary,
    SetQuery {
        query: ParsedQuery,
    },
    SetSkillsNeeded {
        skills_needed: SkillsNeeded,
    },
    ConfirmIntent,
    AddSkillResults {
        results: Vec<SkillResult>,
    },
    AddInsights {
        insights: Vec<String>,
    },
    PresentFindings,
    SetCandidates {
        candidates: Vec<RouteCandidate>,
    },
    SelectRoute {
        #[serde(deserialize_with = "route_id")]
        route_id: String,
    },
    SetRefinedRoute {
        route: RefinedRoute,
    },
    ApproveFinal,
    AddUserFeedback {
        feedback: String,
    },
    ResetToStage {
        stage: WorkflowStage,
    },
}

/// Models send "2" and 2 interchangeably
fn route_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "route_id must be a string or number, got {}",
            other
        ))),
    }
}

/// Map a 1-based position ("2") to that candidate's id
///
/// An exact id match wins, so candidates whose ids are numbers still select
/// by id.
fn resolve_route_id(plan: &RoutePlan, route_id: String) -> String {
    let state = plan.state();
    let Some(candidates) = state.candidates.as_ref() else {
        return route_id;
    };
    if candidates.iter().any(|c| c.id == route_id) {
        return route_id;
    }
    match route_id.trim().parse::<usize>() {
        Ok(position) if (1..=candidates.len()).contains(&position) => {
            debug!(position, "resolve_route_id: selecting by position");
            candidates[position - 1].id.clone()
        }
        _ => route_id,
    }
}

impl PlanAction {
    /// Apply to the plan; returns the text handed back to the model
    fn apply(self, plan: &mut RoutePlan) -> Result<String, ToolError> {
        let message = match self {
            PlanAction::GetState => return Ok(serde_json::to_string_pretty(&plan.state())?),
            PlanAction::GetSummary => return Ok(plan.summary()),
            PlanAction::SetQuery { query } => {
                let destinations = query.destinations.join(", ");
                plan.set_query(query);
                format!("Query updated (destinations: {})", destinations)
            }
            PlanAction::SetSkillsNeeded { skills_needed } => {
                let active: Vec<&str> = skills_needed.active().iter().map(|s| s.as_str()).collect();
                plan.set_skills_needed(skills_needed);
                format!("Research areas set: {}", active.join(", "))
            }
            PlanAction::ConfirmIntent => {
                plan.confirm_intent()?;
                "Intent confirmed".to_string()
            }
            PlanAction::AddSkillResults { results } => {
                let count = results.len();
                plan.add_skill_results(results);
                format!("Added {} skill result(s)", count)
            }
            PlanAction::AddInsights { insights } => {
                let count = insights.len();
                plan.add_insights(insights);
                format!("Added {} insight(s)", count)
            }
            PlanAction::PresentFindings => {
                plan.present_findings()?;
                "Findings presented".to_string()
            }
            PlanAction::SetCandidates { candidates } => {
                let count = candidates.len();
                plan.set_candidates(candidates);
                format!("Stored {} route candidate(s)", count)
            }
            PlanAction::SelectRoute { route_id } => {
                let route_id = resolve_route_id(plan, route_id);
                plan.select_route(&route_id)?;
                let name = plan
                    .state()
                    .selected_route
                    .map(|r| r.name)
                    .unwrap_or_default();
                format!("Selected route: {}", name)
            }
            PlanAction::SetRefinedRoute { route } => {
                let name = route.route.name.clone();
                plan.set_refined_route(route);
                format!("Refined route stored: {}", name)
            }
            PlanAction::ApproveFinal => {
                plan.approve_final()?;
                "Final route approved".to_string()
            }
            PlanAction::AddUserFeedback { feedback } => {
                plan.add_user_feedback(feedback);
                "Feedback recorded".to_string()
            }
            PlanAction::ResetToStage { stage } => {
                plan.reset_to_stage(stage);
                format!("Workflow reset to {}", stage)
            }
        };
        let stage = plan.stage();
        Ok(match stage.pending_checkpoint() {
            Some(next) => format!(
                "{}. Current stage: {}. Next checkpoint: {}",
                message,
                stage,
                next.presentation_tag()
            ),
            None => format!("{}. Current stage: {}", message, stage),
        })
    }
}

/// Read and advance the shared route plan
pub struct RoutePlanTool;

#[async_trait]
impl Tool for RoutePlanTool {
    fn name(&self) -> &'static str {
        "route_plan"
    }

    fn description(&self) -> &'static str {
        "Read and update the route planning workflow state. Use get_state or get_summary to see where you are, \
         and the other actions to record data and advance stages: query_received -> intent_confirmed -> \
         findings_presented -> route_selected -> route_refined -> final_approved."
    }

    fn input_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "action": {
                    "type": "string",
                    "enum": [
                        "get_state", "get_summary", "set_query", "set_skills_needed", "confirm_intent",
                        "add_skill_results", "add_insights", "present_findings", "set_candidates",
                        "select_route", "set_refined_route", "approve_final", "add_user_feedback",
                        "reset_to_stage"
                    ],
                    "description": "Operation to perform"
                },
                "query": {
                    "type": "object",
                    "description": "Parsed query (set_query): destinations, distance {min, max}, constraints, reference"
                },
                "skills_needed": {
                    "type": "object",
                    "description": "Research areas (set_skills_needed), e.g. {\"climb\": true, \"weather\": false}"
                },
                "results": {
                    "type": "array",
                    "description": "Skill results (add_skill_results): [{skillName, summary, data?}]"
                },
                "insights": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "Insights (add_insights)"
                },
                "candidates": {
                    "type": "array",
                    "description": "Route candidates (set_candidates): [{id, name, distance, elevation, highlights, stops?, warnings?}]"
                },
                "route_id": {
                    "type": "string",
                    "description": "Candidate ID or 1-based position (select_route)"
                },
                "route": {
                    "type": "object",
                    "description": "Refined route (set_refined_route): candidate fields plus adjustments, nutritionPlan?, clothingRecommendations?"
                },
                "feedback": {
                    "type": "string",
                    "description": "User feedback to record (add_user_feedback)"
                },
                "stage": {
                    "type": "string",
                    "enum": WorkflowStage::ALL.iter().map(|s| s.as_str()).collect::<Vec<_>>(),
                    "description": "Target stage (reset_to_stage)"
                }
            },
            "required": ["action"]
        })
    }

    async fn execute(&self, input: Value, ctx: &ToolContext) -> ToolResult {
        debug!(session_id = %ctx.session_id, action = ?input.get("action"), "RoutePlanTool::execute: called");
        let action: PlanAction = match serde_json::from_value(input) {
            Ok(action) => action,
            Err(e) => return ToolResult::error(ToolError::InvalidArgument(e.to_string()).to_string()),
        };

        let mut plan = ctx.plan.lock().await;
        action.apply(&mut plan).into()
    }
}
