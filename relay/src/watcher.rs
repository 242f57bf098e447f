//! Poll-based change detection for watched files.
//!
//! Each watched file is represented by a small immutable [`FileSnapshot`]
//! holding the last-observed modification time and the last normalized
//! content that was acted upon. Every poll compares the on-disk state
//! against the snapshot and produces a successor snapshot; nothing is
//! mutated in place.
//!
//! A change is reported only when all three hold:
//! 1. the on-disk mtime strictly advanced past the snapshot,
//! 2. the normalized content is non-empty,
//! 3. it differs from the snapshot's content.
//!
//! This filters editor touch-without-edit saves, comment-only edits, and
//! agent heartbeat rewrites, and it prevents feedback loops where an
//! unchanged file would be relayed again on every save.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use std::time::SystemTime;

use thiserror::Error;

use crate::config::{AGENT_FILE_PREFIX, HUMAN_FILE};
use crate::normalize::{normalize, TrimStyle};

/// Errors that can occur while inspecting watched files.
#[derive(Error, Debug)]
pub enum WatcherError {
    /// Underlying filesystem operation failed.
    #[error("watch I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Last-seen state of one watched file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileSnapshot {
    /// Modification time observed on the last poll; `None` before the
    /// file was ever seen, so any on-disk mtime counts as newer.
    mtime: Option<SystemTime>,

    /// Normalized content last acted upon. Advances only when a change
    /// is reported; a save that normalizes back to this text is silent.
    content: String,
}

impl FileSnapshot {
    /// Snapshot for a file never seen before. Files joining the roster
    /// mid-run start here, so their first observed content is reported.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Primes a snapshot from the current on-disk state so content
    /// already present at startup is not replayed. A missing file primes
    /// as [`FileSnapshot::empty`].
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read.
    pub fn prime(path: &Path, style: TrimStyle) -> Result<Self, WatcherError> {
        let meta = match fs::metadata(path) {
            Ok(meta) => meta,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Self::empty()),
            Err(e) => return Err(e.into()),
        };
        let mtime = meta.modified()?;
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Self::empty()),
            Err(e) => return Err(e.into()),
        };
        Ok(Self {
            mtime: Some(mtime),
            content: normalize(&raw, style),
        })
    }
}

/// Outcome of polling one watched file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Detection {
    /// Successor snapshot to record for the next poll.
    pub snapshot: FileSnapshot,

    /// Normalized content, present only when a meaningful change was
    /// detected.
    pub changed: Option<String>,
}

/// Polls `path` against `last` and produces the successor snapshot.
///
/// The successor carries the observed mtime whenever it advanced, whether
/// or not content was reported; the content field advances only when a
/// change is reported. A missing file is "no change", not an error, so a
/// roster entry whose file disappears simply goes quiet.
///
/// # Errors
///
/// Returns an error for I/O failures other than the file being absent.
pub fn detect(
    path: &Path,
    last: &FileSnapshot,
    style: TrimStyle,
) -> Result<Detection, WatcherError> {
    let meta = match fs::metadata(path) {
        Ok(meta) => meta,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Ok(Detection {
                snapshot: last.clone(),
                changed: None,
            });
        }
        Err(e) => return Err(e.into()),
    };
    let observed = meta.modified()?;

    let advanced = last.mtime.map_or(true, |m| observed > m);
    if !advanced {
        return Ok(Detection {
            snapshot: last.clone(),
            changed: None,
        });
    }

    // The file can vanish between stat and read; treat that like absent.
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Ok(Detection {
                snapshot: last.clone(),
                changed: None,
            });
        }
        Err(e) => return Err(e.into()),
    };

    let normalized = normalize(&raw, style);
    if !normalized.is_empty() && normalized != last.content {
        Ok(Detection {
            snapshot: FileSnapshot {
                mtime: Some(observed),
                content: normalized.clone(),
            },
            changed: Some(normalized),
        })
    } else {
        Ok(Detection {
            snapshot: FileSnapshot {
                mtime: Some(observed),
                content: last.content.clone(),
            },
            changed: None,
        })
    }
}

/// Discovers agent-input files in `dir` by naming convention: regular
/// files whose name starts with the agent prefix, excluding the human
/// input file. Sorted by name, which is also the processing order, so
/// `input_left` always precedes `input_right`.
///
/// # Errors
///
/// Returns an error if the directory exists but cannot be listed.
pub fn discover_agent_files(dir: &Path) -> Result<Vec<String>, WatcherError> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut names = Vec::new();
    for entry in entries {
        let entry = entry?;
        let Ok(name) = entry.file_name().into_string() else {
            continue;
        };
        if !name.starts_with(AGENT_FILE_PREFIX) || name == HUMAN_FILE {
            continue;
        }
        if entry.file_type()?.is_file() {
            names.push(name);
        }
    }
    names.sort();
    Ok(names)
}

/// Transcript label for an agent file: the two canonical files map to
/// their pane-side names, anything else is labeled by its file name.
#[must_use]
pub fn agent_label(file_name: &str) -> &str {
    match file_name {
        "input_left" => "Left",
        "input_right" => "Right",
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;
    use std::time::Duration;
    use tempfile::TempDir;

    /// Filesystem mtime resolution guard between writes.
    fn settle() {
        sleep(Duration::from_millis(5));
    }

    #[test]
    fn test_missing_file_is_no_change() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("input_human");

        let detection = detect(&path, &FileSnapshot::empty(), TrimStyle::Trailing).unwrap();
        assert!(detection.changed.is_none());
        assert_eq!(detection.snapshot, FileSnapshot::empty());
    }

    #[test]
    fn test_prime_swallows_existing_content() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("input_human");
        fs::write(&path, "# header\nalready here\n").unwrap();

        let snapshot = FileSnapshot::prime(&path, TrimStyle::Trailing).unwrap();
        let detection = detect(&path, &snapshot, TrimStyle::Trailing).unwrap();
        assert!(detection.changed.is_none());
    }

    #[test]
    fn test_prime_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("absent");

        let snapshot = FileSnapshot::prime(&path, TrimStyle::Full).unwrap();
        assert_eq!(snapshot, FileSnapshot::empty());
    }

    #[test]
    fn test_new_content_detected_from_empty_seed() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("input_left");
        fs::write(&path, "  fresh response  \n").unwrap();

        let detection = detect(&path, &FileSnapshot::empty(), TrimStyle::Full).unwrap();
        assert_eq!(detection.changed.as_deref(), Some("fresh response"));
    }

    #[test]
    fn test_identical_resave_not_redelivered() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("input_human");
        fs::write(&path, "send this\n").unwrap();

        let detection = detect(&path, &FileSnapshot::empty(), TrimStyle::Trailing).unwrap();
        assert_eq!(detection.changed.as_deref(), Some("send this"));
        let snapshot = detection.snapshot;

        settle();
        fs::write(&path, "send this\n").unwrap();
        let detection = detect(&path, &snapshot, TrimStyle::Trailing).unwrap();
        assert!(detection.changed.is_none());
    }

    #[test]
    fn test_comment_only_edit_not_delivered() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("input_human");
        fs::write(&path, "message\n").unwrap();
        let snapshot = FileSnapshot::prime(&path, TrimStyle::Trailing).unwrap();

        settle();
        fs::write(&path, "message\n# a note to self\n").unwrap();
        let detection = detect(&path, &snapshot, TrimStyle::Trailing).unwrap();
        assert!(detection.changed.is_none());
    }

    #[test]
    fn test_comment_only_file_never_fires() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("input_right");
        fs::write(&path, "# input_right\n\n").unwrap();

        let detection = detect(&path, &FileSnapshot::empty(), TrimStyle::Full).unwrap();
        assert!(detection.changed.is_none());

        settle();
        fs::write(&path, "# still nothing\n").unwrap();
        let detection = detect(&path, &detection.snapshot, TrimStyle::Full).unwrap();
        assert!(detection.changed.is_none());
    }

    #[test]
    fn test_content_snapshot_advances_only_on_report() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("input_human");
        fs::write(&path, "alpha\n").unwrap();
        let snapshot = FileSnapshot::prime(&path, TrimStyle::Trailing).unwrap();

        settle();
        fs::write(&path, "beta\n").unwrap();
        let detection = detect(&path, &snapshot, TrimStyle::Trailing).unwrap();
        assert_eq!(detection.changed.as_deref(), Some("beta"));

        // Flipping back to the previous text is a fresh change: the
        // snapshot tracks the last DELIVERED content, not history.
        settle();
        fs::write(&path, "alpha\n").unwrap();
        let detection = detect(&path, &detection.snapshot, TrimStyle::Trailing).unwrap();
        assert_eq!(detection.changed.as_deref(), Some("alpha"));
    }

    #[test]
    fn test_unchanged_mtime_skips_read() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("input_left");
        fs::write(&path, "steady\n").unwrap();
        let snapshot = FileSnapshot::prime(&path, TrimStyle::Full).unwrap();

        let detection = detect(&path, &snapshot, TrimStyle::Full).unwrap();
        assert!(detection.changed.is_none());
        assert_eq!(detection.snapshot, snapshot);
    }

    #[test]
    fn test_discover_agent_files_by_convention() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("input_left"), "").unwrap();
        fs::write(dir.path().join("input_right"), "").unwrap();
        fs::write(dir.path().join("input_human"), "").unwrap();
        fs::write(dir.path().join("input_extra"), "").unwrap();
        fs::write(dir.path().join("core_log"), "").unwrap();
        fs::create_dir(dir.path().join("input_dir")).unwrap();

        let files = discover_agent_files(dir.path()).unwrap();
        assert_eq!(files, vec!["input_extra", "input_left", "input_right"]);
    }

    #[test]
    fn test_discover_missing_dir_is_empty() {
        let dir = TempDir::new().unwrap();
        let gone = dir.path().join("nope");

        let files = discover_agent_files(&gone).unwrap();
        assert!(files.is_empty());
    }

    #[test]
    fn test_agent_labels() {
        assert_eq!(agent_label("input_left"), "Left");
        assert_eq!(agent_label("input_right"), "Right");
        assert_eq!(agent_label("input_scout"), "input_scout");
    }
}
