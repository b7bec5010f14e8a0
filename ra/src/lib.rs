//! RouteAgent - the planning assistant around the `routeplan` workflow
//!
//! # Modules
//!
//! - [`config`] - YAML configuration with a fallback load chain
//! - [`llm`] - LLM client trait and the Anthropic implementation
//! - [`tools`] - Tools the model calls: workflow, checkpoints, Strava
//! - [`prompts`] - Handlebars system prompt and checkpoint guides
//! - [`agent`] - Tool-use session loop, REPL and console checkpoints

pub mod agent;
pub mod cli;
pub mod config;
pub mod llm;
pub mod prompts;
pub mod tools;

pub use agent::{AgentSession, ConsoleAsk, Repl, build_session};
pub use config::Config;
