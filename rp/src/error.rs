//! Workflow and checkpoint error types

use std::time::Duration;
use thiserror::Error;

use crate::stage::WorkflowStage;

/// Precondition violations raised by `RoutePlan`
///
/// None of these are retryable: the caller decides whether to report the
/// problem to the user or stay at the current stage.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanError {
    #[error("Cannot {operation} from stage: {stage}")]
    InvalidTransition { operation: &'static str, stage: WorkflowStage },

    #[error("No candidates available to select from")]
    NoCandidates,

    #[error("Route not found: {id}")]
    RouteNotFound { id: String },
}

/// Failure reported by an `AskUser` implementation
#[derive(Debug, Error)]
pub enum AskError {
    #[error("Input closed before a reply was received")]
    Closed,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

/// Errors from a checkpoint round trip
#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("Unknown checkpoint: {0}")]
    UnknownCheckpoint(String),

    #[error(transparent)]
    Ask(#[from] AskError),

    #[error("No reply after {0:?}")]
    Timeout(Duration),
}
