//! Prompt Loader
//!
//! Loads prompt templates from the configured directory or falls back to
//! embedded defaults.

use std::path::PathBuf;

use eyre::{Result, eyre};
use handlebars::Handlebars;
use serde::Serialize;
use tracing::{debug, warn};

use routeplan::{CheckpointName, UserResponse, WorkflowStage};

use super::embedded;

fn stage_description(stage: WorkflowStage) -> &'static str {
    match stage {
        WorkflowStage::QueryReceived => "parse the rider's intent",
        WorkflowStage::IntentConfirmed => "the rider confirmed their requirements",
        WorkflowStage::FindingsPresented => "research results have been shared",
        WorkflowStage::RouteSelected => "the rider chose a route option",
        WorkflowStage::RouteRefined => "the route has been fine-tuned",
        WorkflowStage::FinalApproved => "the rider approved the final route",
    }
}

#[derive(Debug, Clone, Serialize)]
struct StageLine {
    number: usize,
    name: &'static str,
    description: &'static str,
}

/// Context for the system prompt
#[derive(Debug, Clone, Serialize)]
pub struct SystemContext {
    stages: Vec<StageLine>,
    pub strava_enabled: bool,
    pub strava_tools: Vec<String>,
}

impl SystemContext {
    /// Build the context; an empty tool list leaves the Strava section out
    pub fn new(strava_tools: Vec<String>) -> Self {
        let stages = WorkflowStage::ALL
            .iter()
            .enumerate()
            .map(|(i, stage)| StageLine {
                number: i + 1,
                name: stage.as_str(),
                description: stage_description(*stage),
            })
            .collect();
        Self {
            stages,
            strava_enabled: !strava_tools.is_empty(),
            strava_tools,
        }
    }
}

/// Context for a per-checkpoint guide
#[derive(Debug, Clone, Serialize)]
pub struct GuideContext {
    /// Text the rider was shown
    pub presentation: String,
    /// The rider's reply, verbatim
    pub reply: String,
    pub approved: bool,
    pub feedback: Option<String>,
    pub selected_route_id: Option<String>,
}

impl GuideContext {
    pub fn new(presentation: impl Into<String>, reply: impl Into<String>, response: &UserResponse) -> Self {
        Self {
            presentation: presentation.into(),
            reply: reply.into(),
            approved: response.approved,
            feedback: response.feedback.clone(),
            selected_route_id: response.selected_route_id.clone(),
        }
    }
}

/// Loads and renders prompt templates
pub struct PromptLoader {
    /// Handlebars template engine
    hbs: Handlebars<'static>,
    /// Override directory holding `<name>.hbs` files
    prompts_dir: Option<PathBuf>,
}

impl PromptLoader {
    /// Create a loader; a missing directory falls back to embedded prompts
    pub fn new(prompts_dir: Option<PathBuf>) -> Self {
        let prompts_dir = prompts_dir.filter(|dir| {
            let exists = dir.is_dir();
            if !exists {
                warn!(?dir, "Prompts directory not found, using embedded prompts");
            }
            exists
        });

        let mut hbs = Handlebars::new();
        hbs.register_escape_fn(handlebars::no_escape);
        Self { hbs, prompts_dir }
    }

    /// Create a loader that only uses embedded prompts (for testing)
    pub fn embedded_only() -> Self {
        Self::new(None)
    }

    /// Load a template by name
    ///
    /// Checks `<prompts_dir>/<name>.hbs` first, then the embedded fallback.
    fn load_template(&self, name: &str) -> Result<String> {
        if let Some(ref dir) = self.prompts_dir {
            let path = dir.join(format!("{}.hbs", name));
            if path.exists() {
                debug!("Loading prompt from override: {:?}", path);
                return std::fs::read_to_string(&path)
                    .map_err(|e| eyre!("Failed to read prompt {}: {}", path.display(), e));
            }
        }

        if let Some(content) = embedded::get_embedded(name) {
            debug!("Using embedded prompt: {}", name);
            return Ok(content.to_string());
        }

        Err(eyre!("Prompt template not found: {}", name))
    }

    /// Render a template with the given context
    pub fn render<T: Serialize>(&self, template_name: &str, context: &T) -> Result<String> {
        let template = self.load_template(template_name)?;
        debug!(%template_name, "PromptLoader::render: called");

        self.hbs
            .render_template(&template, context)
            .map_err(|e| eyre!("Failed to render template {}: {}", template_name, e))
    }

    /// Render the orchestrator system prompt
    pub fn system_prompt(&self, context: &SystemContext) -> Result<String> {
        self.render("system", context)
    }

    /// Render the guidance returned after a checkpoint
    pub fn guide(&self, checkpoint: CheckpointName, context: &GuideContext) -> Result<String> {
        self.render(&format!("guide-{}", checkpoint.presentation_tag()), context)
    }
}
