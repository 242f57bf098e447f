//! Configuration module for Textrelay.
//!
//! This module handles parsing configuration from environment variables.
//! Every variable has a default, so a bare `textrelay run` inside a tmux
//! session works without any setup.
//!
//! # Environment Variables
//!
//! | Variable | Required | Default | Description |
//! |----------|----------|---------|-------------|
//! | `TEXTRELAY_DIR` | No | `.` | Relay directory holding the input files and transcript |
//! | `TEXTRELAY_POLL_MS` | No | 100 | Poll tick interval in milliseconds |
//! | `TEXTRELAY_ROTATE_SECS` | No | 60 | Seconds between transcript rotation checks |
//! | `TEXTRELAY_BACKOFF_MS` | No | 1000 | Sleep after a failed poll cycle |
//! | `TEXTRELAY_OPERATOR_LABEL` | No | `Operator` | Sender label for human messages in the transcript |
//! | `TEXTRELAY_NUDGE` | No | `check relay` | Text typed into recipient panes on delivery |
//! | `TEXTRELAY_KEY_DELAY_MS` | No | 4 | Delay between individual keystrokes |
//! | `TEXTRELAY_CONFIRM_DELAY_MS` | No | 1000 | Delay before the confirmation Enter resend |
//!
//! # Example
//!
//! ```no_run
//! use textrelay::config::Config;
//!
//! let config = Config::from_env().expect("Failed to load configuration");
//! println!("Relay directory: {}", config.dir.display());
//! ```

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Fixed name of the human-input file.
pub const HUMAN_FILE: &str = "input_human";

/// Agent-input files are discovered by this name prefix.
pub const AGENT_FILE_PREFIX: &str = "input_";

/// Canonical agent-input files seeded at bootstrap. Discovery also picks
/// up any other `input_*` file created later.
pub const AGENT_SEED_FILES: [&str; 2] = ["input_left", "input_right"];

/// Fixed name of the live transcript file. Dated archives are named
/// `core_log_YYYYMMDD` next to it.
pub const TRANSCRIPT_FILE: &str = "core_log";

/// Directory seeded with per-agent status files for the display layer.
pub const STATUS_DIR: &str = "hud";

/// Status files seeded inside [`STATUS_DIR`] at bootstrap.
pub const STATUS_FILES: [&str; 2] = ["status_left", "status_right"];

/// Default poll tick interval in milliseconds.
const DEFAULT_POLL_MS: u64 = 100;

/// Default rotation check cadence in seconds.
const DEFAULT_ROTATE_SECS: u64 = 60;

/// Default post-error backoff in milliseconds.
const DEFAULT_BACKOFF_MS: u64 = 1000;

/// Default sender label for human messages.
const DEFAULT_OPERATOR_LABEL: &str = "Operator";

/// Default notification text typed into recipient panes.
const DEFAULT_NUDGE: &str = "check relay";

/// Default inter-keystroke delay in milliseconds.
const DEFAULT_KEY_DELAY_MS: u64 = 4;

/// Default delay before the confirmation Enter resend in milliseconds.
const DEFAULT_CONFIRM_DELAY_MS: u64 = 1000;

/// Errors that can occur during configuration parsing.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Environment variable has an invalid value.
    #[error("invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Configuration for the relay process.
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory holding the input files, transcript, and status dir.
    pub dir: PathBuf,

    /// Interval between poll cycles.
    pub poll_interval: Duration,

    /// Interval between transcript rotation checks.
    pub rotate_interval: Duration,

    /// Sleep applied after a poll cycle fails before the loop resumes.
    pub error_backoff: Duration,

    /// Sender label under which human messages appear in the transcript.
    pub operator_label: String,

    /// Text typed into recipient panes to signal a pending message.
    pub nudge_text: String,

    /// Delay between individual keystrokes during delivery.
    pub key_delay: Duration,

    /// Delay before the confirmation Enter is re-sent.
    pub confirm_delay: Duration,
}

impl Config {
    /// Creates a new `Config` by parsing environment variables.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if any `TEXTRELAY_*` variable is set but
    /// cannot be parsed, or if `TEXTRELAY_POLL_MS` is zero.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Optional: TEXTRELAY_DIR (default: current directory)
        let dir = env::var("TEXTRELAY_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("."));

        // Optional: TEXTRELAY_POLL_MS (default: 100, must be > 0)
        let poll_ms = env_u64("TEXTRELAY_POLL_MS", DEFAULT_POLL_MS)?;
        if poll_ms == 0 {
            return Err(ConfigError::InvalidValue {
                key: "TEXTRELAY_POLL_MS".to_string(),
                message: "poll interval must be greater than 0".to_string(),
            });
        }

        let rotate_secs = env_u64("TEXTRELAY_ROTATE_SECS", DEFAULT_ROTATE_SECS)?;
        let backoff_ms = env_u64("TEXTRELAY_BACKOFF_MS", DEFAULT_BACKOFF_MS)?;
        let key_delay_ms = env_u64("TEXTRELAY_KEY_DELAY_MS", DEFAULT_KEY_DELAY_MS)?;
        let confirm_delay_ms = env_u64("TEXTRELAY_CONFIRM_DELAY_MS", DEFAULT_CONFIRM_DELAY_MS)?;

        // Optional: sender label and nudge text (free-form strings)
        let operator_label = env::var("TEXTRELAY_OPERATOR_LABEL")
            .unwrap_or_else(|_| DEFAULT_OPERATOR_LABEL.to_string());
        let nudge_text =
            env::var("TEXTRELAY_NUDGE").unwrap_or_else(|_| DEFAULT_NUDGE.to_string());

        Ok(Self {
            dir,
            poll_interval: Duration::from_millis(poll_ms),
            rotate_interval: Duration::from_secs(rotate_secs),
            error_backoff: Duration::from_millis(backoff_ms),
            operator_label,
            nudge_text,
            key_delay: Duration::from_millis(key_delay_ms),
            confirm_delay: Duration::from_millis(confirm_delay_ms),
        })
    }

    /// Path to the human-input file inside the relay directory.
    #[must_use]
    pub fn human_file(&self) -> PathBuf {
        self.dir.join(HUMAN_FILE)
    }

    /// Path to the live transcript file inside the relay directory.
    #[must_use]
    pub fn transcript_file(&self) -> PathBuf {
        self.dir.join(TRANSCRIPT_FILE)
    }

    /// Path to the status directory inside the relay directory.
    #[must_use]
    pub fn status_dir(&self) -> PathBuf {
        self.dir.join(STATUS_DIR)
    }
}

/// Reads an environment variable as a `u64`, falling back to `default`
/// when unset.
fn env_u64(key: &str, default: u64) -> Result<u64, ConfigError> {
    match env::var(key) {
        Ok(val) => val.parse::<u64>().map_err(|_| ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("expected non-negative integer, got '{val}'"),
        }),
        Err(_) => Ok(default),
    }
}
