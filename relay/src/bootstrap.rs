//! Relay directory bootstrap.
//!
//! Seeds everything the relay and its collaborators expect on disk: the
//! human and canonical agent input files, the status directory for the
//! display layer, and the transcript session header. Input files are
//! seeded with a comment header (`# input_human`) so a fresh seed
//! normalizes to nothing and never looks like a message. Every step is
//! create-if-missing; existing files are never touched.

use std::fs;
use std::path::Path;

use tracing::info;

use crate::config::{Config, AGENT_SEED_FILES, STATUS_FILES};
use crate::error::Result;
use crate::transcript::Transcript;

/// Creates the relay directory layout.
///
/// # Errors
///
/// Returns an error if a directory or seed file cannot be created.
pub fn bootstrap(config: &Config) -> Result<()> {
    fs::create_dir_all(&config.dir)?;

    seed_input_file(&config.human_file())?;
    for name in AGENT_SEED_FILES {
        seed_input_file(&config.dir.join(name))?;
    }

    let status_dir = config.status_dir();
    fs::create_dir_all(&status_dir)?;
    for name in STATUS_FILES {
        let path = status_dir.join(name);
        if !path.exists() {
            fs::write(&path, "")?;
        }
    }

    let transcript = Transcript::new(config.transcript_file(), config.operator_label.as_str());
    transcript.init_header()?;

    info!(dir = %config.dir.display(), "relay directory ready");
    Ok(())
}

/// Seeds a watched input file with its comment header, e.g.
/// `# input_human` followed by a blank line.
fn seed_input_file(path: &Path) -> Result<()> {
    if path.exists() {
        return Ok(());
    }
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    fs::write(path, format!("# {name}\n\n"))?;
    Ok(())
}
