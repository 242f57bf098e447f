//! Textrelay - file-based message relay for tmux agent panes.
//!
//! This crate provides functionality for relaying text messages between a
//! human operator and agent processes through plain files in a shared
//! directory, using file modification as the signaling mechanism.
//!
//! # Overview
//!
//! The relay polls an operator input file and a dynamic set of agent
//! input files. When the operator saves a new message it is routed by
//! line-prefix tags (`c1-` .. `c5-`, `all-`), the selected tmux panes are
//! nudged by typing a short notification into them, and the message is
//! recorded in a colored transcript. Agent files flow the other way:
//! their changes are recorded in the transcript only, never dispatched.
//!
//! # Sessions
//!
//! The relay runs inside tmux and discovers its sibling panes once at
//! startup; pane position defines channel identity (position 0 is `c1`
//! "Left", position 1 is `c2` "Right"). No sockets, no daemons: the
//! shared directory is the whole wire protocol, so any editor or agent
//! that can write a file can participate.
//!
//! # Modules
//!
//! - [`bootstrap`]: Relay directory and seed file creation
//! - [`config`]: Configuration from environment variables
//! - [`error`]: Error types for relay operations
//! - [`normalize`]: Comment and whitespace stripping for watched files
//! - [`relay`]: The poll loop orchestrator
//! - [`resolve`]: Routing-tag to delivery-target resolution
//! - [`routing`]: Line-prefix routing tag parser
//! - [`tmux`]: Pane discovery and keystroke delivery
//! - [`transcript`]: Colored transcript logging with rotation
//! - [`watcher`]: Poll-based file change detection

pub mod bootstrap;
pub mod config;
pub mod error;
pub mod normalize;
pub mod relay;
pub mod resolve;
pub mod routing;
pub mod tmux;
pub mod transcript;
pub mod watcher;

pub use bootstrap::bootstrap;
pub use config::Config;
pub use error::{RelayError, Result};
pub use normalize::{normalize, TrimStyle};
pub use relay::Relay;
pub use resolve::{resolve, Delivery, DeliveryTarget, Resolution};
pub use routing::{parse_routing, RoutedMessage, RoutingTag};
pub use tmux::{discover_targets, TmuxDelivery, TmuxError};
pub use transcript::{recolor_codes, Transcript, TranscriptError};
pub use watcher::{detect, discover_agent_files, Detection, FileSnapshot, WatcherError};
