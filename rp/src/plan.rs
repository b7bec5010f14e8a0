//! RoutePlan - the single source of truth for route planning progress
//!
//! The agent reads and updates the plan through tool calls; the plan enforces
//! the stage preconditions so the workflow advances deterministically no
//! matter what the model decides to do.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::PlanError;
use crate::stage::WorkflowStage;
use crate::types::{FeedbackEntry, ParsedQuery, RefinedRoute, RouteCandidate, SkillResult, SkillsNeeded};

/// Everything the plan has accumulated so far
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutePlanState {
    pub stage: WorkflowStage,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<ParsedQuery>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skills_needed: Option<SkillsNeeded>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skill_results: Option<Vec<SkillResult>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insights: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub candidates: Option<Vec<RouteCandidate>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_route: Option<RouteCandidate>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refined_route: Option<RefinedRoute>,

    #[serde(default)]
    pub user_feedback: Vec<FeedbackEntry>,
}

/// Stage-guarded state container for one planning session
///
/// Intended for exclusive, sequential use by a single owner.
#[derive(Debug, Clone, Default)]
pub struct RoutePlan {
    state: RoutePlanState,
}

impl RoutePlan {
    /// Start a fresh plan at `query_received`
    pub fn new() -> Self {
        debug!("RoutePlan::new: called");
        Self::default()
    }

    /// Resume from a previously captured state
    pub fn from_state(state: RoutePlanState) -> Self {
        debug!(stage = %state.stage, "RoutePlan::from_state: called");
        Self { state }
    }

    /// Owned snapshot of the full state
    ///
    /// The snapshot is a deep copy; nothing done to it reaches the plan.
    pub fn state(&self) -> RoutePlanState {
        self.state.clone()
    }

    pub fn stage(&self) -> WorkflowStage {
        self.state.stage
    }

    pub fn set_query(&mut self, query: ParsedQuery) {
        debug!(destinations = ?query.destinations, "RoutePlan::set_query: called");
        self.state.query = Some(query);
    }

    pub fn set_skills_needed(&mut self, skills: SkillsNeeded) {
        debug!(active = ?skills.active(), "RoutePlan::set_skills_needed: called");
        self.state.skills_needed = Some(skills);
    }

    /// query_received -> intent_confirmed
    pub fn confirm_intent(&mut self) -> Result<(), PlanError> {
        self.advance("confirm intent", WorkflowStage::QueryReceived, WorkflowStage::IntentConfirmed)
    }

    /// Append skill results; legal at any stage
    pub fn add_skill_results(&mut self, results: Vec<SkillResult>) {
        debug!(count = results.len(), "RoutePlan::add_skill_results: called");
        self.state.skill_results.get_or_insert_with(Vec::new).extend(results);
    }

    /// Append insights; legal at any stage
    pub fn add_insights(&mut self, insights: Vec<String>) {
        debug!(count = insights.len(), "RoutePlan::add_insights: called");
        self.state.insights.get_or_insert_with(Vec::new).extend(insights);
    }

    /// intent_confirmed -> findings_presented
    pub fn present_findings(&mut self) -> Result<(), PlanError> {
        self.advance(
            "present findings",
            WorkflowStage::IntentConfirmed,
            WorkflowStage::FindingsPresented,
        )
    }

    pub fn set_candidates(&mut self, candidates: Vec<RouteCandidate>) {
        debug!(count = candidates.len(), "RoutePlan::set_candidates: called");
        self.state.candidates = Some(candidates);
    }

    /// Select a candidate by id and move to route_selected
    ///
    /// Callable from any stage once candidates exist. On failure the plan is
    /// left untouched.
    pub fn select_route(&mut self, route_id: &str) -> Result<(), PlanError> {
        debug!(%route_id, stage = %self.state.stage, "RoutePlan::select_route: called");
        let candidates = self.state.candidates.as_ref().ok_or(PlanError::NoCandidates)?;

        let selected = candidates
            .iter()
            .find(|candidate| candidate.id == route_id)
            .cloned()
            .ok_or_else(|| PlanError::RouteNotFound {
                id: route_id.to_string(),
            })?;

        info!(route = %selected.name, "Route selected");
        self.state.selected_route = Some(selected);
        self.state.stage = WorkflowStage::RouteSelected;
        Ok(())
    }

    /// Store the refined route and force the stage to route_refined
    pub fn set_refined_route(&mut self, route: RefinedRoute) {
        debug!(
            adjustments = route.adjustments.len(),
            stage = %self.state.stage,
            "RoutePlan::set_refined_route: called"
        );
        self.state.refined_route = Some(route);
        self.state.stage = WorkflowStage::RouteRefined;
    }

    /// route_refined -> final_approved
    pub fn approve_final(&mut self) -> Result<(), PlanError> {
        self.advance("approve final", WorkflowStage::RouteRefined, WorkflowStage::FinalApproved)
    }

    /// Record feedback against the current stage
    pub fn add_user_feedback(&mut self, feedback: impl Into<String>) {
        let feedback = feedback.into();
        debug!(stage = %self.state.stage, len = feedback.len(), "RoutePlan::add_user_feedback: called");
        self.state.user_feedback.push(FeedbackEntry {
            stage: self.state.stage,
            feedback,
            timestamp: Utc::now(),
        });
    }

    /// Move to any stage without checks, for backtracking
    pub fn reset_to_stage(&mut self, stage: WorkflowStage) {
        info!(from = %self.state.stage, to = %stage, "Resetting workflow stage");
        self.state.stage = stage;
    }

    /// Multi-line digest of the plan for the agent's context
    pub fn summary(&self) -> String {
        let state = &self.state;
        let mut parts = vec![format!("Current Stage: {}", state.stage)];

        if let Some(query) = &state.query {
            parts.push(format!("\nQuery: {}", query.destinations.join(", ")));
            if let Some(distance) = &query.distance {
                let min = distance.min.filter(|v| *v != 0.0).map(|v| format!("{}-", v));
                let max = distance.max.filter(|v| *v != 0.0).map(|v| v.to_string());
                parts.push(format!(
                    "Distance: {}{} miles",
                    min.unwrap_or_default(),
                    max.unwrap_or_default()
                ));
            }
        }

        if let Some(results) = &state.skill_results {
            parts.push(format!("\nSkill Results: {} completed", results.len()));
        }

        if let Some(candidates) = &state.candidates {
            parts.push(format!("\nCandidates: {} routes", candidates.len()));
        }

        if let Some(selected) = &state.selected_route {
            parts.push(format!("\nSelected: {} ({} mi)", selected.name, selected.distance));
        }

        if let Some(refined) = &state.refined_route {
            parts.push(format!("\nRefined: {} adjustments made", refined.adjustments.len()));
        }

        if !state.user_feedback.is_empty() {
            parts.push(format!("\nUser Feedback: {} comments", state.user_feedback.len()));
        }

        parts.join("\n")
    }

    fn advance(
        &mut self,
        operation: &'static str,
        from: WorkflowStage,
        to: WorkflowStage,
    ) -> Result<(), PlanError> {
        debug!(%operation, current = %self.state.stage, "RoutePlan::advance: called");
        if self.state.stage != from {
            debug!(%operation, "RoutePlan::advance: rejected");
            return Err(PlanError::InvalidTransition {
                operation,
                stage: self.state.stage,
            });
        }
        self.state.stage = to;
        info!(%operation, stage = %to, "Workflow advanced");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DistanceRange, Skill};

    fn candidates() -> Vec<RouteCandidate> {
        vec![
            RouteCandidate::new("route-1", "Tunitas Creek Loop", 92.0, 6800.0),
            RouteCandidate::new("route-2", "Coastal Cruise", 85.5, 4200.0),
        ]
    }

    #[test]
    fn test_new_plan_starts_at_query_received() {
        let plan = RoutePlan::new();
        assert_eq!(plan.stage(), WorkflowStage::QueryReceived);
        assert!(plan.state().user_feedback.is_empty());
        assert!(plan.state().query.is_none());
    }

    #[test]
    fn test_confirm_intent_only_from_query_received() {
        let mut plan = RoutePlan::new();
        plan.confirm_intent().unwrap();
        assert_eq!(plan.stage(), WorkflowStage::IntentConfirmed);

        let err = plan.confirm_intent().unwrap_err();
        assert_eq!(
            err,
            PlanError::InvalidTransition {
                operation: "confirm intent",
                stage: WorkflowStage::IntentConfirmed,
            }
        );
    }

    #[test]
    fn test_present_findings_requires_confirmed_intent() {
        let mut plan = RoutePlan::new();
        assert!(plan.present_findings().is_err());
        assert_eq!(plan.stage(), WorkflowStage::QueryReceived);

        plan.confirm_intent().unwrap();
        plan.present_findings().unwrap();
        assert_eq!(plan.stage(), WorkflowStage::FindingsPresented);
    }

    #[test]
    fn test_skill_results_accumulate() {
        let mut plan = RoutePlan::new();
        plan.add_skill_results(vec![SkillResult::new("history", "12 past rides")]);
        plan.add_skill_results(vec![
            SkillResult::new("climb", "3 climbs"),
            SkillResult::new("weather", "Fog until 10am"),
        ]);
        plan.add_insights(vec!["Headwind after noon".to_string()]);
        plan.add_insights(vec!["Cafe at mile 45".to_string()]);

        let state = plan.state();
        let names: Vec<_> = state
            .skill_results
            .unwrap()
            .into_iter()
            .map(|r| r.skill_name)
            .collect();
        assert_eq!(names, vec!["history", "climb", "weather"]);
        assert_eq!(state.insights.unwrap().len(), 2);
    }

    #[test]
    fn test_select_route_without_candidates() {
        let mut plan = RoutePlan::new();
        assert_eq!(plan.select_route("route-1"), Err(PlanError::NoCandidates));
    }

    #[test]
    fn test_select_unknown_route_leaves_state_unchanged() {
        let mut plan = RoutePlan::new();
        plan.set_candidates(candidates());
        plan.select_route("route-1").unwrap();
        plan.reset_to_stage(WorkflowStage::FindingsPresented);

        let before = plan.state();
        let err = plan.select_route("route-7").unwrap_err();
        assert_eq!(
            err,
            PlanError::RouteNotFound {
                id: "route-7".to_string()
            }
        );
        assert_eq!(plan.state(), before);
    }

    #[test]
    fn test_select_route_from_any_stage() {
        let mut plan = RoutePlan::new();
        plan.set_candidates(candidates());
        plan.select_route("route-2").unwrap();

        assert_eq!(plan.stage(), WorkflowStage::RouteSelected);
        assert_eq!(plan.state().selected_route.unwrap().name, "Coastal Cruise");
    }

    #[test]
    fn test_set_refined_route_forces_stage() {
        let mut plan = RoutePlan::new();
        plan.set_refined_route(RefinedRoute::new(candidates().remove(0), vec![]));
        assert_eq!(plan.stage(), WorkflowStage::RouteRefined);

        plan.approve_final().unwrap();
        assert_eq!(plan.stage(), WorkflowStage::FinalApproved);
    }

    #[test]
    fn test_approve_final_requires_refined_route() {
        let mut plan = RoutePlan::new();
        plan.set_candidates(candidates());
        plan.select_route("route-1").unwrap();

        let err = plan.approve_final().unwrap_err();
        assert!(err.to_string().contains("route_selected"));
    }

    #[test]
    fn test_feedback_stamped_with_stage_at_call_time() {
        let mut plan = RoutePlan::new();
        plan.add_user_feedback("avoid Highway 1");
        plan.confirm_intent().unwrap();
        plan.add_user_feedback("more on water stops");

        let feedback = plan.state().user_feedback;
        assert_eq!(feedback.len(), 2);
        assert_eq!(feedback[0].stage, WorkflowStage::QueryReceived);
        assert_eq!(feedback[0].feedback, "avoid Highway 1");
        assert_eq!(feedback[1].stage, WorkflowStage::IntentConfirmed);
    }

    #[test]
    fn test_reset_to_stage_is_unchecked() {
        let mut plan = RoutePlan::new();
        plan.reset_to_stage(WorkflowStage::FinalApproved);
        assert_eq!(plan.stage(), WorkflowStage::FinalApproved);
        plan.reset_to_stage(WorkflowStage::IntentConfirmed);
        assert_eq!(plan.stage(), WorkflowStage::IntentConfirmed);
    }

    #[test]
    fn test_state_snapshot_is_deep_copy() {
        let mut plan = RoutePlan::new();
        plan.set_query(ParsedQuery::new(vec!["Pescadero".to_string()]));
        plan.set_candidates(candidates());

        let mut snapshot = plan.state();
        snapshot.query.as_mut().unwrap().destinations.push("Half Moon Bay".to_string());
        snapshot.candidates.as_mut().unwrap()[0].highlights.push("tampered".to_string());
        snapshot.stage = WorkflowStage::FinalApproved;

        let state = plan.state();
        assert_eq!(state.query.unwrap().destinations, vec!["Pescadero"]);
        assert!(state.candidates.unwrap()[0].highlights.is_empty());
        assert_eq!(plan.stage(), WorkflowStage::QueryReceived);
    }

    #[test]
    fn test_summary_fresh_plan() {
        let plan = RoutePlan::new();
        assert_eq!(plan.summary(), "Current Stage: query_received");
    }

    #[test]
    fn test_summary_full() {
        let mut plan = RoutePlan::new();
        plan.set_query(
            ParsedQuery::new(vec!["Tunitas Creek".to_string(), "Pescadero".to_string()])
                .with_distance(Some(80.0), Some(100.0)),
        );
        plan.set_skills_needed(SkillsNeeded::new().with(Skill::Climb, true));
        plan.add_skill_results(vec![SkillResult::new("climb", "3 climbs")]);
        plan.set_candidates(candidates());
        plan.select_route("route-1").unwrap();
        plan.set_refined_route(RefinedRoute::new(
            candidates().remove(0),
            vec!["Skip Highway 1".to_string(), "Add water stop".to_string()],
        ));
        plan.add_user_feedback("looks great");

        let summary = plan.summary();
        assert!(summary.starts_with("Current Stage: route_refined"));
        assert!(summary.contains("Query: Tunitas Creek, Pescadero"));
        assert!(summary.contains("Distance: 80-100 miles"));
        assert!(summary.contains("Skill Results: 1 completed"));
        assert!(summary.contains("Candidates: 2 routes"));
        assert!(summary.contains("Selected: Tunitas Creek Loop (92 mi)"));
        assert!(summary.contains("Refined: 2 adjustments made"));
        assert!(summary.contains("User Feedback: 1 comments"));
    }

    #[test]
    fn test_summary_one_sided_distance() {
        let mut plan = RoutePlan::new();
        plan.set_query(ParsedQuery {
            destinations: vec!["Santa Cruz".to_string()],
            distance: Some(DistanceRange { min: None, max: Some(60.0) }),
            ..Default::default()
        });
        assert!(plan.summary().contains("Distance: 60 miles"));

        plan.set_query(ParsedQuery::new(vec![]).with_distance(Some(40.0), None));
        assert!(plan.summary().contains("Distance: 40- miles"));
    }

    #[test]
    fn test_from_state_round_trip() {
        let mut plan = RoutePlan::new();
        plan.set_candidates(candidates());
        plan.select_route("route-1").unwrap();

        let restored = RoutePlan::from_state(plan.state());
        assert_eq!(restored.stage(), WorkflowStage::RouteSelected);
        assert_eq!(restored.summary(), plan.summary());
    }
}
