//! Textrelay - file-based message relay for tmux agent panes.
//!
//! This binary relays operator messages to agent panes by watching plain
//! files in a shared directory and typing notification nudges into tmux.
//!
//! # Commands
//!
//! - `textrelay init`: Create the relay directory and seed files
//! - `textrelay targets`: List the panes that would receive nudges
//! - `textrelay run`: Start the relay loop
//!
//! # Environment Variables
//!
//! See the [`textrelay::config`] module for available configuration options.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::signal;
use tracing::info;
use tracing_subscriber::EnvFilter;

use textrelay::bootstrap::bootstrap;
use textrelay::config::{Config, AGENT_SEED_FILES, HUMAN_FILE, STATUS_DIR, TRANSCRIPT_FILE};
use textrelay::error::RelayError;
use textrelay::relay::Relay;
use textrelay::tmux::{discover_targets, TmuxDelivery, TmuxError};

/// Textrelay - file-based message relay for tmux agent panes.
///
/// Watches an operator input file and agent response files in a shared
/// directory, routes messages by line-prefix tags, and nudges the
/// receiving tmux panes.
#[derive(Parser, Debug)]
#[command(name = "textrelay")]
#[command(author, version, about, long_about = None)]
#[command(after_help = "\
ENVIRONMENT VARIABLES:
    TEXTRELAY_DIR               Relay directory (default: current directory)
    TEXTRELAY_POLL_MS           Poll interval in milliseconds (default: 100)
    TEXTRELAY_ROTATE_SECS       Rotation check cadence in seconds (default: 60)
    TEXTRELAY_BACKOFF_MS        Sleep after a failed cycle in milliseconds (default: 1000)
    TEXTRELAY_OPERATOR_LABEL    Operator label in the transcript (default: Operator)
    TEXTRELAY_NUDGE             Text typed into recipient panes (default: check relay)
    TEXTRELAY_KEY_DELAY_MS      Delay between keystrokes (default: 4)
    TEXTRELAY_CONFIRM_DELAY_MS  Delay before the confirming Enter (default: 1000)

EXAMPLES:
    # Prepare the relay directory and seed files
    textrelay init

    # List the panes that will receive nudges
    textrelay targets

    # Start the relay in the current directory
    textrelay run

    # Relay a dedicated directory at a slower cadence
    export TEXTRELAY_DIR=/tmp/relay
    export TEXTRELAY_POLL_MS=250
    textrelay run
")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

/// CLI subcommands.
#[derive(Subcommand, Debug)]
enum Command {
    /// Create the relay directory and seed files.
    ///
    /// Seeds the operator and agent input files, the status directory,
    /// and the transcript header. Safe to run repeatedly; existing
    /// files are never overwritten.
    Init,

    /// List the tmux panes that would receive nudges.
    ///
    /// Position 0 is channel c1 ("Left"), position 1 is channel c2
    /// ("Right"). Must be run from inside tmux.
    Targets,

    /// Start the relay daemon.
    ///
    /// Polls the relay directory and types nudges into sibling panes.
    /// Must be run from a tmux pane in the window shared with the
    /// agents.
    Run,
}

fn main() -> Result<()> {
    // Parse command line arguments using clap
    let cli = Cli::parse();

    match cli.command {
        Command::Init => run_init(),
        Command::Targets => run_targets(),
        Command::Run => {
            // Initialize async runtime for the run command
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()
                .context("Failed to create tokio runtime")?;

            runtime.block_on(run_relay())
        }
    }
}

/// Runs the init command to prepare the relay directory.
fn run_init() -> Result<()> {
    let config = Config::from_env().context("Failed to load configuration")?;
    bootstrap(&config).context("Failed to prepare relay directory")?;

    println!("Relay directory ready: {}", config.dir.display());
    println!();
    println!("  {HUMAN_FILE}  - operator input (save the file to send)");
    for name in AGENT_SEED_FILES {
        println!("  {name}   - agent response file");
    }
    println!("  {TRANSCRIPT_FILE}     - transcript");
    println!("  {STATUS_DIR}/         - status files");
    println!();
    println!("Start the relay with 'textrelay run' from a tmux pane.");
    Ok(())
}

/// Runs the targets command to list sibling panes.
fn run_targets() -> Result<()> {
    match discover_targets() {
        Ok(targets) if targets.is_empty() => {
            // Print error to stderr and exit with code 1
            eprintln!("Error: No other panes in the current tmux window.");
            eprintln!("Split the window so the agents have panes to receive in.");
            std::process::exit(1);
        }
        Ok(targets) => {
            for target in targets {
                println!("{target}");
            }
            Ok(())
        }
        Err(TmuxError::NotInTmux) => {
            eprintln!("Error: not inside a tmux session.");
            eprintln!("Run 'textrelay targets' from a tmux pane.");
            std::process::exit(1);
        }
        Err(e) => Err(e.into()),
    }
}

/// Runs the relay daemon.
async fn run_relay() -> Result<()> {
    // Initialize logging
    init_logging();

    info!("Starting Textrelay");

    // Load configuration
    let config = Config::from_env().context("Failed to load configuration")?;

    info!(
        dir = %config.dir.display(),
        poll = ?config.poll_interval,
        nudge = %config.nudge_text,
        "Configuration loaded"
    );

    // Seed the relay directory before anything watches it
    bootstrap(&config).context("Failed to prepare relay directory")?;

    info!(path = %config.transcript_file().display(), "Transcript log ready");

    let targets = discover_targets().context(
        "Failed to discover tmux panes. Run textrelay from a pane in the \
         window shared with the agents.",
    )?;

    if targets.is_empty() {
        return Err(RelayError::NoTargets.into());
    }

    let pane_list = targets
        .iter()
        .map(|t| t.address())
        .collect::<Vec<_>>()
        .join(", ");
    info!(panes = %pane_list, count = targets.len(), "Pane targets discovered");

    let delivery = TmuxDelivery::new(config.key_delay, config.confirm_delay);
    let human_file = config.human_file();
    let mut relay = Relay::new(config, targets, delivery)?;

    info!(path = %human_file.display(), "Save the operator file to send a message");
    info!("Relay running. Press Ctrl+C to stop.");

    // Main poll loop, raced against the shutdown signal
    tokio::select! {
        _ = wait_for_shutdown() => {
            info!("Shutdown signal received");
        }
        result = relay.run() => {
            result?;
        }
    }

    info!("Relay stopped");
    Ok(())
}

/// Initializes the logging subsystem.
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_level(true)
        .init();
}

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn wait_for_shutdown() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
