//! Error types for Textrelay.
//!
//! Each module defines its own error enum; this module aggregates them
//! into [`RelayError`] for the orchestrator and binary, along with the
//! one startup precondition that has no recovery: a relay with nobody
//! to deliver to.

use thiserror::Error;

use crate::config::ConfigError;
use crate::tmux::TmuxError;
use crate::transcript::TranscriptError;
use crate::watcher::WatcherError;

/// Top-level error type for relay operations.
#[derive(Error, Debug)]
pub enum RelayError {
    /// Configuration parsing failed.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Watched-file inspection failed.
    #[error("watcher error: {0}")]
    Watcher(#[from] WatcherError),

    /// Transcript write or rotation failed.
    #[error("transcript error: {0}")]
    Transcript(#[from] TranscriptError),

    /// tmux discovery failed.
    #[error("tmux error: {0}")]
    Tmux(#[from] TmuxError),

    /// Filesystem operation outside a specific module failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// No delivery targets were discovered at startup.
    #[error("no delivery targets found: the relay needs at least one other pane in the current tmux window")]
    NoTargets,
}

/// Convenience alias for relay results.
pub type Result<T> = std::result::Result<T, RelayError>;
