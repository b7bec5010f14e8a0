//! RoutePlan - checkpoint workflow for conversational route planning
//!
//! An LLM agent does the actual planning. This crate holds the structure
//! around it: a six-stage workflow state machine, the payloads presented at
//! each checkpoint, and the glue that turns a free-form user reply into a
//! structured action.
//!
//! # Workflow
//!
//! ```text
//! query_received --confirm_intent--> intent_confirmed
//! intent_confirmed --present_findings--> findings_presented
//! (any stage, candidates set) --select_route(id)--> route_selected
//! (any stage) --set_refined_route(route)--> route_refined
//! route_refined --approve_final--> final_approved
//! (any stage) --reset_to_stage(s)--> s
//! ```
//!
//! # Modules
//!
//! - [`types`] - Payload records (query, skills, candidates, refined route)
//! - [`stage`] - Workflow stages and checkpoint names
//! - [`plan`] - The `RoutePlan` state container
//! - [`parser`] - Keyword-based reply parsing
//! - [`format`] - Markdown rendering of checkpoint payloads
//! - [`checkpoint`] - Ask/format/parse composition
//! - [`presentation`] - Tool-facing request/response contract

pub mod checkpoint;
pub mod error;
pub mod format;
pub mod parser;
pub mod plan;
pub mod presentation;
pub mod stage;
pub mod types;

pub use checkpoint::{AskUser, CheckpointManager, CheckpointPayload};
pub use error::{AskError, CheckpointError, PlanError};
pub use format::format_message;
pub use parser::{CheckpointAction, CheckpointResponse, ResponseDetails, parse_response, parse_response_named};
pub use plan::{RoutePlan, RoutePlanState};
pub use presentation::{PresentRoutePlanInput, UserResponse};
pub use stage::{CheckpointName, WorkflowStage};
pub use types::{
    Constraints, DistanceRange, FeedbackEntry, IntakeStop, NutritionPlan, ParsedQuery, RefinedRoute, RouteCandidate,
    Skill, SkillResult, SkillsNeeded, Stop, StopKind,
};
