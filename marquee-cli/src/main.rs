// marquee-cli/src/main.rs
mod commands;
mod history;
mod models;
mod rendering;

use anyhow::{Context, Result};
use colored::*;
use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use rustyline::error::ReadlineError;
use rustyline::{Config, DefaultEditor};
use tracing::{debug, error, info, warn, Level};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    fmt::{self, time::LocalTime},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

use marquee_core::{
    turn_error_message, ChatConfig, ConfigError, OpenAiProvider, Orchestrator, Session,
    TurnOutcome,
};

use crate::commands::ReplCommand;
use crate::history::format_history;
use crate::rendering::print_formatted;

const CONFIG_FILENAME: &str = "Marquee.toml";
const LOG_FILE_NAME: &str = "marquee.log";

/// Uses the explicit path, else `Marquee.toml` in the current directory, else defaults.
fn load_cli_config(explicit: Option<&Path>) -> Result<ChatConfig, ConfigError> {
    if let Some(path) = explicit {
        info!(path = %path.display(), "Loading configuration from --config.");
        return ChatConfig::from_file(path);
    }
    let local = PathBuf::from(CONFIG_FILENAME);
    if local.is_file() {
        info!(path = %local.display(), "Found configuration file.");
        return ChatConfig::from_file(&local);
    }
    info!("No {} found, using built-in defaults.", CONFIG_FILENAME);
    Ok(ChatConfig::default())
}

fn init_logging(verbose: u8) -> Result<(WorkerGuard, PathBuf)> {
    let default_level = match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::default().add_directive(default_level.into()));

    let log_dir = dirs::cache_dir()
        .or_else(dirs::runtime_dir)
        .unwrap_or_else(env::temp_dir)
        .join("marquee");
    fs::create_dir_all(&log_dir)
        .with_context(|| format!("Failed to create log directory {}", log_dir.display()))?;

    let file_appender = tracing_appender::rolling::never(&log_dir, LOG_FILE_NAME);
    let (non_blocking_writer, guard) = tracing_appender::non_blocking(file_appender);

    let time_format = time::format_description::parse(
        "[year]-[month]-[day] [hour]:[minute]:[second].[subsecond digits:3]",
    )
    .context("Failed to parse log time format")?;
    let local_timer = LocalTime::new(time_format);

    let file_layer = fmt::layer()
        .with_writer(non_blocking_writer)
        .with_ansi(false)
        .with_target(true)
        .with_line_number(true)
        .with_timer(local_timer.clone());

    let stderr_layer = fmt::layer()
        .with_writer(io::stderr)
        .with_timer(local_timer)
        .with_target(false)
        .with_level(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .context("Failed to initialize logging")?;

    Ok((guard, log_dir.join(LOG_FILE_NAME)))
}

fn print_welcome_message() {
    println!("{}", "🤖 Movie recommendation chatbot is ready!".cyan().bold());
    println!("{}", "=".repeat(60));
    println!("{}", "Type 'quit', 'exit' or 'bye' to end the conversation".dimmed());
    println!("{}", "Type 'history' to see conversation history".dimmed());
    println!("{}", "Type 'clear' to clear conversation history".dimmed());
    println!("{}", "=".repeat(60));
}

fn print_goodbye(message: &str) {
    println!("\n{} {}", "🤖 AI:".cyan().bold(), message);
}

fn show_history(session: &Session) {
    match format_history(session.history()) {
        None => println!("📝 No conversation history yet."),
        Some(lines) => {
            println!("\n{}", "📝 Conversation History:".bold());
            println!("{}", "-".repeat(40));
            for line in lines {
                println!("{}", line);
            }
            println!("{}", "-".repeat(40));
        }
    }
}

fn new_spinner() -> Result<ProgressBar> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")?
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "-"]),
    );
    pb.set_message("Processing...");
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    Ok(pb)
}

fn print_outcome(outcome: &TurnOutcome) {
    for result in &outcome.tool_results {
        println!(
            "{}",
            format!("🔧 Called {} with args: {}", result.tool_name, result.input).dimmed()
        );
    }
    for warning in &outcome.warnings {
        println!("{} {}", "⚠ Warning:".yellow().bold(), warning);
    }
    println!("{}", "🤖 AI:".cyan().bold());
    print_formatted(&outcome.answer);
}

/// Runs a single turn (non-interactive).
async fn run_single_turn(orchestrator: &Orchestrator, session: &mut Session, text: &str) -> Result<()> {
    info!("Running non-interactive turn.");
    let system_prompt = orchestrator.config().system_prompt.as_str();
    match orchestrator.run_turn(session, text, Some(system_prompt)).await {
        Ok(outcome) => {
            for warning in &outcome.warnings {
                eprintln!("{} {}", "Warning:".yellow(), warning);
            }
            println!("{}", outcome.answer);
            Ok(())
        }
        Err(e) => {
            debug!(error = ?e, "Conversation turn failed.");
            let message = turn_error_message(&e);
            eprintln!("{}", message.red());
            Err(e.into())
        }
    }
}

/// Runs an interactive chat session using rustyline for a REPL experience.
async fn run_interactive(orchestrator: &Orchestrator, session: &mut Session) -> Result<()> {
    print_welcome_message();

    let rl_config = Config::builder()
        .history_ignore_space(true)
        .auto_add_history(true)
        .build();
    let mut rl = DefaultEditor::with_config(rl_config)?;
    let prompt = format!("\n{} ", "👤 You:".green().bold());

    loop {
        let line = match rl.readline(&prompt) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) => {
                info!("Ctrl-C at prompt, exiting interactive mode.");
                print_goodbye("Conversation interrupted. Goodbye!");
                break;
            }
            Err(ReadlineError::Eof) => {
                info!("EOF detected, exiting interactive mode.");
                print_goodbye("Goodbye! Thanks for chatting!");
                break;
            }
            Err(err) => {
                error!("Readline error: {:?}", err);
                return Err(anyhow::Error::new(err).context("Error reading input"));
            }
        };

        match ReplCommand::parse(&line) {
            ReplCommand::Quit => {
                print_goodbye("Goodbye! Thanks for chatting!");
                break;
            }
            ReplCommand::History => show_history(session),
            ReplCommand::Clear => {
                session.clear();
                println!("🧹 Conversation history cleared!");
            }
            ReplCommand::Empty => println!("Please enter a message."),
            ReplCommand::Message(text) => {
                let pb = new_spinner()?;
                let system_prompt = orchestrator.config().system_prompt.as_str();
                let result = tokio::select! {
                    result = orchestrator.run_turn(session, &text, Some(system_prompt)) => Some(result),
                    _ = tokio::signal::ctrl_c() => None,
                };
                pb.finish_and_clear();

                match result {
                    None => {
                        warn!("Interrupted during a turn.");
                        print_goodbye("Conversation interrupted. Goodbye!");
                        break;
                    }
                    Some(Ok(outcome)) => {
                        debug!(history_len = session.len(), "Turn completed.");
                        print_outcome(&outcome);
                    }
                    Some(Err(e)) => {
                        debug!(error = ?e, "Conversation turn failed.");
                        println!("{} {}", "🤖 AI:".cyan().bold(), turn_error_message(&e));
                    }
                }
            }
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = models::cli::Cli::parse();

    // --- Logging Setup ---
    let _guard = match init_logging(cli.verbose) {
        Ok((guard, log_path)) => {
            info!(log_path = %log_path.display(), "Logging initialized.");
            guard
        }
        Err(e) => {
            eprintln!("{} {:#}", "Error:".red(), e);
            return ExitCode::FAILURE;
        }
    };

    // --- Config and Credential ---
    let config = match load_cli_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            eprintln!("{} {}", "Setup error:".red(), e);
            return ExitCode::FAILURE;
        }
    };
    let api_key = match config.api_key() {
        Ok(key) => key,
        Err(e) => {
            error!("Missing credential: {}", e);
            eprintln!("{} {}", "Setup error:".red(), e);
            eprintln!(
                "Please set your {} environment variable (or add it to a .env file):",
                config.model.api_key_env_var
            );
            eprintln!("export {}='your-api-key-here'", config.model.api_key_env_var);
            return ExitCode::FAILURE;
        }
    };

    let provider = match OpenAiProvider::from_config(config.model.clone(), api_key) {
        Ok(provider) => provider,
        Err(e) => {
            error!("Failed to create provider: {:#}", e);
            eprintln!("{} {:#}", "Error:".red(), e);
            return ExitCode::FAILURE;
        }
    };
    let orchestrator = Orchestrator::new(config, Arc::new(provider));
    let mut session = Session::new();

    let result = match cli.turn {
        Some(text) => run_single_turn(&orchestrator, &mut session, &text).await,
        None => run_interactive(&orchestrator, &mut session).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Operation failed: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
