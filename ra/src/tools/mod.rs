//! Tool system for the planning agent
//!
//! Tools give the model access to the shared route plan, the user (through
//! checkpoints) and ride history. Each session gets one `ToolContext`
//! carrying the plan all tools operate on.

mod context;
mod error;
mod executor;
mod traits;

pub mod builtin;

pub use context::{SharedPlan, ToolContext, new_shared_plan};
pub use error::ToolError;
pub use executor::ToolExecutor;
pub use traits::{Tool, ToolResult};
