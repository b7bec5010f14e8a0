use std::fs;
use std::path::Path;
use std::sync::Arc;

use clap::{CommandFactory, FromArgMatches};
use colored::Colorize;
use eyre::{Context, Result};
use tracing::{debug, info};

use routeagent::cli::{Cli, Command};
use routeagent::config::Config;
use routeagent::prompts::PromptLoader;
use routeagent::{ConsoleAsk, Repl, agent, llm};

fn parse_level(level: &str) -> tracing::Level {
    match level.to_uppercase().as_str() {
        "TRACE" => tracing::Level::TRACE,
        "DEBUG" => tracing::Level::DEBUG,
        "INFO" => tracing::Level::INFO,
        "WARN" | "WARNING" => tracing::Level::WARN,
        "ERROR" => tracing::Level::ERROR,
        _ => {
            eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", level);
            tracing::Level::INFO
        }
    }
}

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>, log_path: &Path) -> Result<()> {
    // Logging isn't initialized yet, so nothing here can log
    if let Some(log_dir) = log_path.parent() {
        fs::create_dir_all(log_dir).context("Failed to create log directory")?;
    }

    // Priority: CLI --log-level > config file > INFO
    let level = cli_log_level
        .or(config_log_level)
        .map(parse_level)
        .unwrap_or(tracing::Level::INFO);

    let log_file = fs::File::create(log_path).context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!(?level, log_file = %log_path.display(), "Logging initialized");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::from_arg_matches(&Cli::command().get_matches())?;

    // Log settings come from the config file before the full load
    let log_config = Config::load_log_config(cli.config.as_ref());
    setup_logging(cli.log_level.as_deref(), log_config.level.as_deref(), &log_config.file_path())
        .context("Failed to setup logging")?;

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    info!(model = %config.llm.model, strava = %config.strava.mode, "RouteAgent loaded config");

    debug!(command = ?cli.command, "main: dispatching command");
    match cli.command {
        None => cmd_chat(&config, None).await,
        Some(Command::Chat { query }) => cmd_chat(&config, query).await,
        Some(Command::Run { query }) => cmd_run(&config, &query).await,
        Some(Command::Config) => cmd_config(&config),
        Some(Command::Prompt) => cmd_prompt(&config),
    }
}

fn new_session(config: &Config) -> Result<routeagent::AgentSession> {
    config.validate()?;
    let llm = llm::create_client(&config.llm).context("Failed to create LLM client")?;
    agent::build_session(config, llm, Arc::new(ConsoleAsk::new()))
}

async fn cmd_chat(config: &Config, query: Option<String>) -> Result<()> {
    let session = new_session(config)?;
    Repl::new(session).run(query).await
}

async fn cmd_run(config: &Config, query: &str) -> Result<()> {
    let mut session = new_session(config)?;
    let reply = session.send(query).await?;
    println!("{}", reply);

    let summary = session.context().plan.lock().await.summary();
    println!();
    println!("{}", "Plan".bright_cyan().bold());
    println!("{}", summary);

    let usage = session.usage();
    info!(input_tokens = usage.input_tokens, output_tokens = usage.output_tokens, "Run complete");
    Ok(())
}

fn cmd_config(config: &Config) -> Result<()> {
    let yaml = serde_yaml::to_string(config).context("Failed to serialize config")?;
    print!("{}", yaml);
    Ok(())
}

fn cmd_prompt(config: &Config) -> Result<()> {
    let prompts = PromptLoader::new(config.agent.prompts_dir.clone());
    println!("{}", agent::system_prompt(config, &prompts)?);
    Ok(())
}
