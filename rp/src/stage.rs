//! Workflow stages and checkpoint names

use serde::{Deserialize, Serialize};

use crate::error::CheckpointError;

/// Stage in the route planning workflow
///
/// Declaration order is the forward order of the workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStage {
    /// Query parsed, waiting for the user to confirm intent
    #[default]
    QueryReceived,
    /// User confirmed their requirements
    IntentConfirmed,
    /// Research results have been shared
    FindingsPresented,
    /// User picked one of the candidates
    RouteSelected,
    /// Selected route has been fine-tuned
    RouteRefined,
    /// User approved the final route
    FinalApproved,
}

impl WorkflowStage {
    /// Every stage, in workflow order
    pub const ALL: [WorkflowStage; 6] = [
        Self::QueryReceived,
        Self::IntentConfirmed,
        Self::FindingsPresented,
        Self::RouteSelected,
        Self::RouteRefined,
        Self::FinalApproved,
    ];

    /// Snake-case name, as used in summaries and tool payloads
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::QueryReceived => "query_received",
            Self::IntentConfirmed => "intent_confirmed",
            Self::FindingsPresented => "findings_presented",
            Self::RouteSelected => "route_selected",
            Self::RouteRefined => "route_refined",
            Self::FinalApproved => "final_approved",
        }
    }

    /// Checkpoint the agent should run while sitting at this stage
    pub fn pending_checkpoint(&self) -> Option<CheckpointName> {
        match self {
            Self::QueryReceived => Some(CheckpointName::ConfirmIntent),
            Self::IntentConfirmed => Some(CheckpointName::PresentFindings),
            Self::FindingsPresented => Some(CheckpointName::SelectRoute),
            Self::RouteSelected => Some(CheckpointName::RefineRoute),
            Self::RouteRefined => Some(CheckpointName::PresentFinal),
            Self::FinalApproved => None,
        }
    }
}

impl std::fmt::Display for WorkflowStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for WorkflowStage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|stage| stage.as_str() == s.trim())
            .ok_or_else(|| format!("Unknown stage: {}", s))
    }
}

/// Named pause point in the workflow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CheckpointName {
    ConfirmIntent,
    PresentFindings,
    SelectRoute,
    RefineRoute,
    PresentFinal,
}

impl CheckpointName {
    pub const ALL: [CheckpointName; 5] = [
        Self::ConfirmIntent,
        Self::PresentFindings,
        Self::SelectRoute,
        Self::RefineRoute,
        Self::PresentFinal,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ConfirmIntent => "confirmIntent",
            Self::PresentFindings => "presentFindings",
            Self::SelectRoute => "selectRoute",
            Self::RefineRoute => "refineRoute",
            Self::PresentFinal => "presentFinal",
        }
    }

    /// Tag used for this checkpoint in tool payloads (`confirm_intent`, ...)
    pub fn presentation_tag(&self) -> &'static str {
        match self {
            Self::ConfirmIntent => "confirm_intent",
            Self::PresentFindings => "present_findings",
            Self::SelectRoute => "select_route",
            Self::RefineRoute => "refine_route",
            Self::PresentFinal => "present_final",
        }
    }
}

impl std::fmt::Display for CheckpointName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for CheckpointName {
    type Err = CheckpointError;

    /// Accepts both the camelCase name and the snake_case presentation tag
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|name| name.as_str() == s || name.presentation_tag() == s)
            .ok_or_else(|| CheckpointError::UnknownCheckpoint(s.to_string()))
    }
}
