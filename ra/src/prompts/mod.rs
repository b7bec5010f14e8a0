//! Prompt templates for the planning agent

mod embedded;
mod loader;

pub use loader::{GuideContext, PromptLoader, SystemContext};
