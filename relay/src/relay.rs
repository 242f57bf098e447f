//! The poll loop.
//!
//! [`Relay`] owns every piece of mutable state: the human-file snapshot,
//! the agent roster, the transcript handle, and the rotation clock. One
//! value, one loop, no locks. Each cycle runs three phases in a fixed
//! order so transcript ordering is deterministic:
//!
//! 1. rotation check (wall-clock gated, independent of message cadence),
//! 2. the human input file (detect, route, dispatch, log),
//! 3. every agent file in name order (detect, recolor, log), picking up
//!    newly created roster files first.
//!
//! A failed cycle logs the error and backs off briefly; nothing past
//! startup is fatal. Delivery goes through the [`Delivery`] seam as a
//! fire-and-forget dispatch, so slow pane typing never stalls detection.

use std::collections::BTreeMap;
use std::time::Instant;

use tokio::time::{self, MissedTickBehavior};
use tracing::{error, info};

use crate::config::Config;
use crate::error::Result;
use crate::normalize::TrimStyle;
use crate::resolve::{resolve, Delivery, DeliveryTarget};
use crate::routing::{parse_routing, RoutingTag};
use crate::transcript::{recolor_codes, Transcript};
use crate::watcher::{agent_label, detect, discover_agent_files, FileSnapshot};

/// The relay daemon.
pub struct Relay<D: Delivery> {
    config: Config,
    targets: Vec<DeliveryTarget>,
    delivery: D,
    transcript: Transcript,
    human: FileSnapshot,
    agents: BTreeMap<String, FileSnapshot>,
    last_rotation: Instant,
}

impl<D: Delivery> Relay<D> {
    /// Builds a relay over an already-discovered target list, priming
    /// snapshots from the current on-disk state so content present at
    /// startup is never replayed.
    ///
    /// The target list is taken as given; enforcing that it is non-empty
    /// is the caller's startup precondition, not a concern here.
    ///
    /// # Errors
    ///
    /// Returns an error if the initial snapshots cannot be read.
    pub fn new(config: Config, targets: Vec<DeliveryTarget>, delivery: D) -> Result<Self> {
        let transcript =
            Transcript::new(config.transcript_file(), config.operator_label.as_str());
        let human = FileSnapshot::prime(&config.human_file(), TrimStyle::Trailing)?;

        let mut agents = BTreeMap::new();
        for name in discover_agent_files(&config.dir)? {
            let snapshot = FileSnapshot::prime(&config.dir.join(&name), TrimStyle::Full)?;
            agents.insert(name, snapshot);
        }

        Ok(Self {
            config,
            targets,
            delivery,
            transcript,
            human,
            agents,
            last_rotation: Instant::now(),
        })
    }

    /// Drives the poll loop forever. The caller races this against its
    /// shutdown signal; cancellation between ticks is the graceful exit
    /// path, abandoning any in-flight delivery tasks.
    pub async fn run(&mut self) -> Result<()> {
        let mut interval = time::interval(self.config.poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            interval.tick().await;
            if let Err(e) = self.cycle() {
                error!(error = %e, "poll cycle failed");
                time::sleep(self.config.error_backoff).await;
            }
        }
    }

    /// Runs one poll cycle: rotation check, human input, then agents.
    ///
    /// # Errors
    ///
    /// Returns the first I/O failure encountered; the caller treats it
    /// as transient and retries after a backoff.
    pub fn cycle(&mut self) -> Result<()> {
        if self.last_rotation.elapsed() >= self.config.rotate_interval {
            self.last_rotation = Instant::now();
            if self.transcript.rotate()? {
                info!("transcript rotated");
            }
        }

        self.check_human()?;
        self.check_agents()?;
        Ok(())
    }

    /// Detects an operator message, routes it, dispatches nudges, and
    /// records the routed bodies in the transcript.
    fn check_human(&mut self) -> Result<()> {
        let detection = detect(&self.config.human_file(), &self.human, TrimStyle::Trailing)?;
        self.human = detection.snapshot;
        let Some(message) = detection.changed else {
            return Ok(());
        };

        info!(chars = message.chars().count(), "new operator message");

        let routed = parse_routing(&message);
        if routed.is_empty() {
            // Nothing routable (e.g. a lone dangling tag line): the
            // whole message broadcasts as-is.
            self.delivery.dispatch(&self.targets, &self.config.nudge_text);
            self.transcript.append(&self.config.operator_label, &message)?;
            return Ok(());
        }

        for (tag, body) in routed.iter() {
            if body.trim().is_empty() {
                continue;
            }
            let resolution = resolve(tag, &self.targets);
            info!(route = %resolution.label, "routing message");
            self.delivery
                .dispatch(resolution.targets, &self.config.nudge_text);

            let entry = match tag {
                RoutingTag::All => body.to_string(),
                tag => format!("[{tag}] {body}"),
            };
            self.transcript.append(&self.config.operator_label, &entry)?;
        }
        Ok(())
    }

    /// Re-discovers the agent roster, then logs any changed agent file
    /// under its display label. Agents never trigger delivery.
    fn check_agents(&mut self) -> Result<()> {
        // Files created since the last cycle join with an empty snapshot
        // so their first observed content is reported.
        for name in discover_agent_files(&self.config.dir)? {
            self.agents.entry(name).or_insert_with(FileSnapshot::empty);
        }

        let names: Vec<String> = self.agents.keys().cloned().collect();
        for name in names {
            let Some(last) = self.agents.get(&name).cloned() else {
                continue;
            };
            let path = self.config.dir.join(&name);
            let detection = detect(&path, &last, TrimStyle::Full)?;

            if let Some(message) = detection.changed {
                let label = agent_label(&name);
                info!(agent = %label, chars = message.chars().count(), "agent responded");
                self.transcript.append(label, &recolor_codes(&message))?;
            }
            self.agents.insert(name, detection.snapshot);
        }
        Ok(())
    }
}
