//! Interactive planning REPL

use std::io::{self, Write};

use colored::Colorize;
use eyre::Result;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing::{debug, warn};

use crate::llm::{Role, StreamChunk};

use super::AgentSession;

/// Result of handling a slash command
#[derive(Debug, PartialEq, Eq)]
enum SlashResult {
    Continue,
    Quit,
}

fn print_chunk(chunk: &StreamChunk) {
    match chunk {
        StreamChunk::TextDelta(text) => {
            print!("{}", text);
            let _ = io::stdout().flush();
        }
        StreamChunk::ToolUseStart { name, .. } => {
            print!("\n{} ", format!("[calling {}]", name).dimmed());
            let _ = io::stdout().flush();
        }
        StreamChunk::ToolUseEnd { .. } | StreamChunk::MessageDone { .. } => {}
        StreamChunk::Error(err) => {
            eprintln!("\n{} {}", "Stream error:".red(), err);
        }
    }
}

/// Readline loop around an `AgentSession`
pub struct Repl {
    session: AgentSession,
}

impl Repl {
    pub fn new(session: AgentSession) -> Self {
        Self { session }
    }

    /// Run the REPL main loop
    pub async fn run(&mut self, initial_query: Option<String>) -> Result<()> {
        self.print_welcome();

        if let Some(query) = initial_query {
            println!("{} {}", ">".bright_green(), query);
            self.process_user_input(&query).await;
        }

        let mut rl = DefaultEditor::new().map_err(|e| eyre::eyre!("Failed to initialize readline: {}", e))?;

        loop {
            match rl.readline(&format!("{} ", ">".bright_green())) {
                Ok(line) => {
                    let input = line.trim();
                    if input.is_empty() {
                        continue;
                    }
                    let _ = rl.add_history_entry(input);

                    if input.starts_with('/') {
                        if self.handle_slash_command(input).await == SlashResult::Quit {
                            break;
                        }
                    } else {
                        self.process_user_input(input).await;
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    println!("^C");
                    continue;
                }
                Err(ReadlineError::Eof) => {
                    println!();
                    break;
                }
                Err(err) => {
                    return Err(eyre::eyre!("Readline error: {}", err));
                }
            }
        }

        let usage = self.session.usage();
        debug!(input_tokens = usage.input_tokens, output_tokens = usage.output_tokens, "Repl::run: exiting");
        println!("Happy riding!");
        Ok(())
    }

    fn print_welcome(&self) {
        println!();
        println!("{}", "RouteAgent - cycling route planner".bright_cyan().bold());
        println!("Describe the ride you want. Type {} for help, {} to quit", "/help".yellow(), "/quit".yellow());
        println!();
    }

    async fn handle_slash_command(&mut self, input: &str) -> SlashResult {
        let cmd = input.split_whitespace().next().unwrap_or("");

        match cmd {
            "/help" | "/h" => {
                self.print_help();
                SlashResult::Continue
            }
            "/quit" | "/q" | "/exit" => SlashResult::Quit,
            "/plan" | "/p" => {
                let summary = self.session.context().plan.lock().await.summary();
                println!();
                println!("{}", summary);
                println!();
                SlashResult::Continue
            }
            "/state" => {
                let state = self.session.context().plan.lock().await.state();
                match serde_json::to_string_pretty(&state) {
                    Ok(json) => println!("{}", json),
                    Err(e) => println!("{} {}", "Error:".red(), e),
                }
                SlashResult::Continue
            }
            "/clear" | "/c" => {
                self.session.reset().await;
                println!("{}", "Conversation and plan cleared.".dimmed());
                SlashResult::Continue
            }
            "/history" => {
                self.print_history();
                SlashResult::Continue
            }
            _ => {
                println!("{} Unknown command: {}", "?".yellow(), cmd);
                println!("Type {} for available commands", "/help".yellow());
                SlashResult::Continue
            }
        }
    }

    fn print_help(&self) {
        println!();
        println!("{}", "Available Commands:".bright_cyan());
        println!("  {:14} Show this help", "/help".yellow());
        println!("  {:14} Exit the REPL", "/quit".yellow());
        println!("  {:14} Show the plan summary", "/plan".yellow());
        println!("  {:14} Show the full plan state as JSON", "/state".yellow());
        println!("  {:14} Start over with an empty plan", "/clear".yellow());
        println!("  {:14} Show conversation history", "/history".yellow());
        println!();
    }

    fn print_history(&self) {
        let conversation = self.session.conversation();
        if conversation.is_empty() {
            println!("{}", "No conversation history.".dimmed());
            return;
        }

        println!();
        println!("{}", "Conversation History:".bright_cyan());
        for (i, msg) in conversation.iter().enumerate() {
            let role = match msg.role {
                Role::User => "User".bright_green(),
                Role::Assistant => "Assistant".bright_blue(),
            };
            println!("  {}. {}: {}", i + 1, role, msg.preview(50));
        }
        println!();
    }

    /// Errors are shown and the REPL keeps going
    async fn process_user_input(&mut self, input: &str) {
        if let Err(e) = self.session.send_streaming(input, &print_chunk).await {
            warn!(error = %e, "Exchange failed");
            println!();
            println!("{} {:#}", "Error:".red(), e);
        }
        println!();
        println!();
    }
}
