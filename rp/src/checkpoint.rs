//! Checkpoint manager
//!
//! A checkpoint is one round trip with the user: render the payload, ask,
//! parse the reply. The manager owns no workflow state; callers apply the
//! parsed response to their `RoutePlan` before running the next checkpoint.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{AskError, CheckpointError};
use crate::format::format_message;
use crate::parser::{CheckpointResponse, parse_response};
use crate::stage::CheckpointName;
use crate::types::{ParsedQuery, RefinedRoute, RouteCandidate, SkillResult, SkillsNeeded};

/// Host-supplied way of asking the user a question
///
/// The host decides how the reply is obtained (console, UI, permission
/// prompt). A failure or stall here propagates to the caller unchanged.
#[async_trait]
pub trait AskUser: Send + Sync {
    async fn ask(&self, message: &str) -> Result<String, AskError>;
}

/// Data presented at a checkpoint, tagged by stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "stage", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum CheckpointPayload {
    ConfirmIntent {
        query: ParsedQuery,
        skills_needed: SkillsNeeded,
    },
    PresentFindings {
        skill_results: Vec<SkillResult>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        insights: Option<Vec<String>>,
    },
    SelectRoute {
        candidates: Vec<RouteCandidate>,
    },
    RefineRoute {
        selected_route: RouteCandidate,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        proposed_refinements: Option<Vec<String>>,
    },
    PresentFinal {
        final_route: RefinedRoute,
    },
}

impl CheckpointPayload {
    /// Checkpoint this payload belongs to
    pub fn checkpoint(&self) -> CheckpointName {
        match self {
            Self::ConfirmIntent { .. } => CheckpointName::ConfirmIntent,
            Self::PresentFindings { .. } => CheckpointName::PresentFindings,
            Self::SelectRoute { .. } => CheckpointName::SelectRoute,
            Self::RefineRoute { .. } => CheckpointName::RefineRoute,
            Self::PresentFinal { .. } => CheckpointName::PresentFinal,
        }
    }
}

/// Runs checkpoints against an `AskUser` implementation
#[derive(Clone)]
pub struct CheckpointManager {
    ask: Arc<dyn AskUser>,
    timeout: Option<Duration>,
}

impl CheckpointManager {
    pub fn new(ask: Arc<dyn AskUser>) -> Self {
        debug!("CheckpointManager::new: called");
        Self { ask, timeout: None }
    }

    /// Give up on a reply after `timeout` instead of waiting forever
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Present the payload, wait for one reply, and parse it
    pub async fn checkpoint(&self, payload: &CheckpointPayload) -> Result<CheckpointResponse, CheckpointError> {
        let name = payload.checkpoint();
        debug!(checkpoint = %name, "CheckpointManager::checkpoint: called");

        let reply = self.ask(&format_message(payload)).await?;
        Ok(parse_response(name, &reply))
    }

    /// Show an already-rendered message and wait for the raw reply
    pub async fn ask(&self, message: &str) -> Result<String, CheckpointError> {
        match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, self.ask.ask(message)).await {
                Ok(reply) => Ok(reply?),
                Err(_) => {
                    warn!(?limit, "Checkpoint timed out waiting for user");
                    Err(CheckpointError::Timeout(limit))
                }
            },
            None => Ok(self.ask.ask(message).await?),
        }
    }

    pub async fn confirm_intent(
        &self,
        query: ParsedQuery,
        skills_needed: SkillsNeeded,
    ) -> Result<CheckpointResponse, CheckpointError> {
        self.checkpoint(&CheckpointPayload::ConfirmIntent { query, skills_needed })
            .await
    }

    pub async fn present_findings(
        &self,
        skill_results: Vec<SkillResult>,
        insights: Option<Vec<String>>,
    ) -> Result<CheckpointResponse, CheckpointError> {
        self.checkpoint(&CheckpointPayload::PresentFindings {
            skill_results,
            insights,
        })
        .await
    }

    pub async fn select_route(&self, candidates: Vec<RouteCandidate>) -> Result<CheckpointResponse, CheckpointError> {
        self.checkpoint(&CheckpointPayload::SelectRoute { candidates }).await
    }

    pub async fn refine_route(
        &self,
        selected_route: RouteCandidate,
        proposed_refinements: Option<Vec<String>>,
    ) -> Result<CheckpointResponse, CheckpointError> {
        self.checkpoint(&CheckpointPayload::RefineRoute {
            selected_route,
            proposed_refinements,
        })
        .await
    }

    pub async fn present_final(&self, final_route: RefinedRoute) -> Result<CheckpointResponse, CheckpointError> {
        self.checkpoint(&CheckpointPayload::PresentFinal { final_route }).await
    }
}


#[cfg(test)]
mod tests {
    use super::mock::{ClosedAsk, ScriptedAsk, SilentAsk};
    use super::*;
    use crate::parser::CheckpointAction;
    use crate::types::Skill;

    fn tunitas_query() -> ParsedQuery {
        ParsedQuery::new(vec!["Tunitas Creek".to_string(), "Pescadero".to_string()])
            .with_distance(Some(80.0), Some(100.0))
    }

    fn two_candidates() -> Vec<RouteCandidate> {
        vec![
            RouteCandidate::new("route-1", "Tunitas Creek Loop", 92.0, 6800.0)
                .with_highlights(vec!["Tunitas Creek climb".to_string()]),
            RouteCandidate::new("route-2", "Coastal Cruise", 85.0, 4200.0)
                .with_highlights(vec!["Ocean views".to_string()]),
        ]
    }

    #[tokio::test]
    async fn test_confirm_intent_yes() {
        let ask = Arc::new(ScriptedAsk::new(&["yes"]));
        let manager = CheckpointManager::new(ask.clone());

        let skills = SkillsNeeded::new()
            .with(Skill::History, true)
            .with(Skill::Climb, true)
            .with(Skill::Route, true);
        let response = manager.confirm_intent(tunitas_query(), skills).await.unwrap();

        assert_eq!(response.action, CheckpointAction::Confirm);
        assert_eq!(ask.call_count(), 1);
        let prompt = &ask.prompts()[0];
        assert!(prompt.contains("**Destinations:** Tunitas Creek, Pescadero"));
        assert!(prompt.contains("**Research areas:** history, climb, route"));
    }

    #[tokio::test]
    async fn test_confirm_intent_clarify() {
        let reply = "Actually, I want to avoid Highway 1";
        let manager = CheckpointManager::new(Arc::new(ScriptedAsk::new(&[reply])));

        let query = ParsedQuery::new(vec!["Santa Cruz".to_string()]).with_distance(None, Some(60.0));
        let response = manager
            .confirm_intent(query, SkillsNeeded::new().with(Skill::Route, true))
            .await
            .unwrap();

        assert_eq!(response.action, CheckpointAction::Clarify);
        assert_eq!(response.raw_response(), Some(reply));
    }

    #[tokio::test]
    async fn test_present_findings_request_more() {
        let manager = CheckpointManager::new(Arc::new(ScriptedAsk::new(&[
            "Can you research more about water stops?",
        ])));

        let response = manager
            .present_findings(vec![SkillResult::new("Route Optimization", "Basic route created")], None)
            .await
            .unwrap();
        assert_eq!(response.action, CheckpointAction::RequestMore);
    }

    #[tokio::test]
    async fn test_select_route_number_and_phrase() {
        let ask = Arc::new(ScriptedAsk::new(&["2", "I'd like route 1 please"]));
        let manager = CheckpointManager::new(ask.clone());

        let first = manager.select_route(two_candidates()).await.unwrap();
        assert_eq!(first.action, CheckpointAction::Select);
        assert_eq!(first.route_id(), Some("2"));

        let second = manager.select_route(two_candidates()).await.unwrap();
        assert_eq!(second.route_id(), Some("1"));
        assert_eq!(ask.call_count(), 2);
    }

    #[tokio::test]
    async fn test_refine_and_final() {
        let manager = CheckpointManager::new(Arc::new(ScriptedAsk::new(&["modify the lunch stop", "yes, generate"])));

        let refine = manager
            .refine_route(two_candidates().remove(0), Some(vec!["Start at 7am".to_string()]))
            .await
            .unwrap();
        assert_eq!(refine.action, CheckpointAction::Refine);

        let final_route = RefinedRoute::new(two_candidates().remove(0), vec![]);
        let approve = manager.present_final(final_route).await.unwrap();
        assert_eq!(approve.action, CheckpointAction::Approve);
    }

    #[tokio::test]
    async fn test_ask_failure_propagates() {
        let manager = CheckpointManager::new(Arc::new(ClosedAsk));
        let err = manager.select_route(two_candidates()).await.unwrap_err();
        assert!(matches!(err, CheckpointError::Ask(AskError::Closed)));
    }

    #[tokio::test]
    async fn test_timeout_surfaces_error() {
        let manager = CheckpointManager::new(Arc::new(SilentAsk)).with_timeout(Duration::from_millis(20));
        let err = manager.select_route(two_candidates()).await.unwrap_err();
        assert!(matches!(err, CheckpointError::Timeout(d) if d == Duration::from_millis(20)));
    }

    #[tokio::test]
    async fn test_ask_passes_message_through() {
        let ask = Arc::new(ScriptedAsk::new(&["sounds good"]));
        let manager = CheckpointManager::new(ask.clone()).with_timeout(Duration::from_secs(5));

        let reply = manager.ask("Ready to ride?").await.unwrap();
        assert_eq!(reply, "sounds good");
        assert_eq!(ask.prompts(), vec!["Ready to ride?".to_string()]);
    }

    #[test]
    fn test_payload_tagging() {
        let payload = CheckpointPayload::RefineRoute {
            selected_route: two_candidates().remove(0),
            proposed_refinements: None,
        };
        let json = serde_json::to_value(&payload).unwrap();

        assert_eq!(json["stage"], "refine_route");
        assert_eq!(json["selectedRoute"]["id"], "route-1");
        assert!(json.get("proposedRefinements").is_none());
        assert_eq!(payload.checkpoint(), CheckpointName::RefineRoute);
    }

    #[test]
    fn test_payload_from_agent_json() {
        let json = serde_json::json!({
            "stage": "confirm_intent",
            "query": {"destinations": ["Mount Hamilton"], "distance": {"min": 50, "max": 70}},
            "skillsNeeded": {"history": true, "climb": true, "weather": true}
        });
        let payload: CheckpointPayload = serde_json::from_value(json).unwrap();

        match payload {
            CheckpointPayload::ConfirmIntent { query, skills_needed } => {
                assert_eq!(query.destinations, vec!["Mount Hamilton"]);
                assert!(skills_needed.is_needed(Skill::Weather));
            }
            other => panic!("Expected ConfirmIntent, got {:?}", other),
        }
    }
}
