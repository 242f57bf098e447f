//! tmux pane discovery and keystroke delivery.
//!
//! The relay's recipients are the sibling panes of the current tmux
//! window. Discovery queries tmux once at startup for the session,
//! window, and own pane, then lists the remaining panes in index order:
//! the first sibling is position 0 ("Left"), the second position 1
//! ("Right").
//!
//! Delivery types a short nudge into each recipient pane one keystroke at
//! a time with a fixed cadence (interactive programs drop batched input),
//! presses Enter, and presses Enter once more after a delay in case the
//! first was swallowed while the program was redrawing.
//!
//! All typing runs on a single worker task fed by a queue. Consecutive
//! dispatches can resolve to overlapping panes, and a pane receiving two
//! messages keystroke-by-keystroke at once would see them shuffled
//! together; the worker types each queued message to completion before
//! starting the next.
//!
//! This module is the collaborator side of the [`Delivery`] seam; the
//! poll loop never invokes tmux directly.

use std::process::Command;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::resolve::{Delivery, DeliveryTarget};

/// Errors from tmux discovery.
#[derive(Error, Debug)]
pub enum TmuxError {
    /// Process is not running inside a tmux session.
    #[error("not inside a tmux session (TMUX is unset)")]
    NotInTmux,

    /// Spawning tmux failed.
    #[error("failed to run tmux: {0}")]
    Io(#[from] std::io::Error),

    /// tmux ran but reported a failure.
    #[error("tmux {command} failed: {stderr}")]
    CommandFailed { command: String, stderr: String },
}

/// Discovers the ordered delivery targets: every pane of the current
/// window except the relay's own, addressed as `session:window.index`.
///
/// # Errors
///
/// Returns [`TmuxError::NotInTmux`] outside a tmux session, or a command
/// error if tmux cannot be queried. An empty result is not an error
/// here; the caller decides whether zero targets is fatal.
pub fn discover_targets() -> Result<Vec<DeliveryTarget>, TmuxError> {
    if std::env::var_os("TMUX").is_none() {
        return Err(TmuxError::NotInTmux);
    }

    let session = display_message("#S")?;
    let window = display_message("#I")?;
    let own_pane = display_message("#P")?;

    let pane_list = query(&[
        "list-panes",
        "-t",
        &format!("{session}:{window}"),
        "-F",
        "#{pane_index}",
    ])?;

    let targets = sibling_targets(&session, &window, &own_pane, &pane_list);
    debug!(
        session = %session,
        window = %window,
        own_pane = %own_pane,
        targets = targets.len(),
        "discovered tmux panes"
    );
    Ok(targets)
}

/// Builds targets from a newline-separated pane index list, excluding the
/// relay's own pane and preserving tmux's index order.
fn sibling_targets(
    session: &str,
    window: &str,
    own_pane: &str,
    pane_list: &str,
) -> Vec<DeliveryTarget> {
    pane_list
        .lines()
        .map(str::trim)
        .filter(|index| !index.is_empty() && *index != own_pane)
        .map(|index| DeliveryTarget::new(format!("{session}:{window}.{index}")))
        .collect()
}

fn display_message(format: &str) -> Result<String, TmuxError> {
    Ok(query(&["display-message", "-p", format])?.trim().to_string())
}

fn query(args: &[&str]) -> Result<String, TmuxError> {
    let output = Command::new("tmux").args(args).output()?;
    if !output.status.success() {
        return Err(TmuxError::CommandFailed {
            command: args.join(" "),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Replaces newlines with spaces so a multi-line text arrives as one
/// input line instead of submitting early on each embedded newline.
fn flatten_text(text: &str) -> String {
    text.replace('\n', " ")
}

/// One queued delivery: a resolved pane set and the text to type.
struct DeliveryJob {
    panes: Vec<String>,
    text: String,
}

/// [`Delivery`] implementation that types into panes via
/// `tmux send-keys` on a dedicated worker task.
///
/// [`dispatch`](Delivery::dispatch) queues and returns immediately; the
/// worker types jobs in arrival order, one at a time. Clones share the
/// worker. The worker is abandoned when the runtime shuts down, so an
/// in-flight message may be cut short on exit.
#[derive(Debug, Clone)]
pub struct TmuxDelivery {
    job_tx: mpsc::UnboundedSender<DeliveryJob>,
}

impl TmuxDelivery {
    /// Creates a delivery handle with the given typing cadence, spawning
    /// the typing worker on the current tokio runtime.
    #[must_use]
    pub fn new(key_delay: Duration, confirm_delay: Duration) -> Self {
        let (job_tx, job_rx) = mpsc::unbounded_channel::<DeliveryJob>();
        tokio::spawn(async move {
            process_jobs(job_rx, key_delay, confirm_delay).await;
        });
        Self { job_tx }
    }
}

impl Delivery for TmuxDelivery {
    fn dispatch(&self, targets: &[DeliveryTarget], text: &str) {
        let job = DeliveryJob {
            panes: targets.iter().map(|t| t.address().to_string()).collect(),
            text: flatten_text(text),
        };
        if self.job_tx.send(job).is_err() {
            warn!("typing worker is gone, message dropped");
        }
    }
}

/// Types queued jobs to completion in arrival order. Typing takes seconds
/// per pane; jobs arriving meanwhile wait in the queue rather than
/// interleaving keystrokes into the same pane.
async fn process_jobs(
    mut job_rx: mpsc::UnboundedReceiver<DeliveryJob>,
    key_delay: Duration,
    confirm_delay: Duration,
) {
    while let Some(job) = job_rx.recv().await {
        for pane in &job.panes {
            type_into_pane(pane, &job.text, key_delay, confirm_delay).await;
        }
    }
}

/// Types `text` into one pane a keystroke at a time, then Enter, then a
/// second Enter after the confirm delay.
async fn type_into_pane(pane: &str, text: &str, key_delay: Duration, confirm_delay: Duration) {
    debug!(pane = %pane, chars = text.chars().count(), "typing nudge");
    for ch in text.chars() {
        send_key(pane, &["-l", &ch.to_string()]).await;
        tokio::time::sleep(key_delay).await;
    }
    send_key(pane, &["C-m"]).await;
    tokio::time::sleep(confirm_delay).await;
    send_key(pane, &["C-m"]).await;
}

/// One `send-keys` invocation. Failures are logged and swallowed: the
/// relay never blocks on, or retries for, an unresponsive pane.
async fn send_key(pane: &str, keys: &[&str]) {
    let mut cmd = tokio::process::Command::new("tmux");
    cmd.args(["send-keys", "-t", pane]);
    cmd.args(keys);
    match cmd.output().await {
        Ok(output) if !output.status.success() => {
            warn!(
                pane = %pane,
                stderr = %String::from_utf8_lossy(&output.stderr).trim(),
                "send-keys failed"
            );
        }
        Ok(_) => {}
        Err(e) => warn!(pane = %pane, error = %e, "failed to spawn tmux"),
    }
}
