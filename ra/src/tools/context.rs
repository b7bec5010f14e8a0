//! ToolContext - execution context for tools

use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

use routeplan::RoutePlan;

/// Route plan shared by every tool in a session
pub type SharedPlan = Arc<Mutex<RoutePlan>>;

/// Create a fresh shared plan at `query_received`
pub fn new_shared_plan() -> SharedPlan {
    Arc::new(Mutex::new(RoutePlan::new()))
}

/// Execution context for tools - scoped to a single session
#[derive(Clone)]
pub struct ToolContext {
    /// Session ID, for log correlation
    pub session_id: String,

    /// The plan the workflow tools read and mutate
    pub plan: SharedPlan,
}

impl ToolContext {
    /// Create a context with a new session ID and an empty plan
    pub fn new() -> Self {
        Self::with_plan(new_shared_plan())
    }

    /// Create a context around an existing plan
    pub fn with_plan(plan: SharedPlan) -> Self {
        let session_id = uuid::Uuid::now_v7().to_string();
        debug!(%session_id, "ToolContext::with_plan: called");
        Self { session_id, plan }
    }

    /// Throw away the current plan and start over
    pub async fn reset_plan(&self) {
        debug!(session_id = %self.session_id, "ToolContext::reset_plan: called");
        *self.plan.lock().await = RoutePlan::new();
    }
}

impl Default for ToolContext {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ToolContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolContext")
            .field("session_id", &self.session_id)
            .finish()
    }
}
