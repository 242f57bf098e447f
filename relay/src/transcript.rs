//! Transcript logging with rotation.
//!
//! Every relayed message, human or agent, lands in a single chronological
//! transcript file. Entries are ANSI-colored for terminal viewers (`cat`
//! or `tail -f` of the live log): a dimmed timestamp bracket, a colored
//! sender label, then the body.
//!
//! # Rotation
//!
//! The live log is rotated on a wall-clock cadence, not per append: when
//! a rotation check finds more than [`ROTATE_THRESHOLD_LINES`] physical
//! lines, everything except the last [`ROTATE_KEEP_LINES`] lines is
//! appended to a dated archive (`<name>_YYYYMMDD`) and the live log is
//! rewritten with just the retained tail. Multiple rotations on the same
//! day accumulate into the same archive. Rotation reads, computes the
//! split, then overwrites; a writer racing the rewrite can lose an
//! append, which is an accepted limitation of the shared-file design.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use chrono::Local;
use regex::Regex;
use thiserror::Error;

/// Rotation triggers when the live log exceeds this many physical lines.
pub const ROTATE_THRESHOLD_LINES: usize = 500;

/// Physical lines retained in the live log after rotation.
pub const ROTATE_KEEP_LINES: usize = 100;

/// Timestamp format for entry brackets and the session header.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Date format suffixed to archive file names.
const ARCHIVE_DATE_FORMAT: &str = "%Y%m%d";

const DIM: &str = "\x1b[2m";
const RESET: &str = "\x1b[0m";

/// 256-color orange for the human operator's label.
const OPERATOR_COLOR: &str = "\x1b[38;5;214m";

/// Green for the primary agent label.
const LEFT_COLOR: &str = "\x1b[32m";

/// Magenta for the secondary agent label.
const RIGHT_COLOR: &str = "\x1b[35m";

/// Errors that can occur while writing or rotating the transcript.
#[derive(Error, Debug)]
pub enum TranscriptError {
    /// Underlying filesystem operation failed.
    #[error("transcript I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// The chronological transcript of all relayed traffic.
#[derive(Debug, Clone)]
pub struct Transcript {
    path: PathBuf,
    operator_label: String,
}

impl Transcript {
    /// Creates a transcript handle for the live log at `path`. The
    /// operator label gets the fixed operator color on append.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, operator_label: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            operator_label: operator_label.into(),
        }
    }

    /// Path of the live log file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path of today's archive file.
    #[must_use]
    pub fn archive_path(&self) -> PathBuf {
        let date = Local::now().format(ARCHIVE_DATE_FORMAT);
        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "log".to_string());
        self.path.with_file_name(format!("{name}_{date}"))
    }

    /// Writes the session header if the live log does not exist yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the header cannot be written.
    pub fn init_header(&self) -> Result<(), TranscriptError> {
        if self.path.exists() {
            return Ok(());
        }
        let started = Local::now().format(TIMESTAMP_FORMAT);
        fs::write(
            &self.path,
            format!("Core Communication Log\nSession started: {started}\n"),
        )?;
        Ok(())
    }

    /// Appends one entry: a blank separator line, the dimmed timestamp
    /// bracket with the colored sender label, then the body.
    ///
    /// # Errors
    ///
    /// Returns an error if the live log cannot be opened or written.
    pub fn append(&self, sender: &str, body: &str) -> Result<(), TranscriptError> {
        let timestamp = Local::now().format(TIMESTAMP_FORMAT);
        let sender_colored = self.colorize_sender(sender);

        let mut file = OpenOptions::new()
            .append(true)
            .create(true)
            .open(&self.path)?;
        write!(file, "\n{DIM}[{timestamp}]{RESET} {sender_colored}\n{body}\n")?;
        Ok(())
    }

    /// Rotates the live log if it exceeds the line threshold, appending
    /// the overflow to today's archive. Returns whether a rotation
    /// happened. A missing live log is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if the log or archive cannot be read or written.
    pub fn rotate(&self) -> Result<bool, TranscriptError> {
        if !self.path.exists() {
            return Ok(false);
        }

        let content = fs::read_to_string(&self.path)?;
        let lines: Vec<&str> = content.lines().collect();
        if lines.len() <= ROTATE_THRESHOLD_LINES {
            return Ok(false);
        }

        let (archived, kept) = lines.split_at(lines.len() - ROTATE_KEEP_LINES);

        let mut archive = OpenOptions::new()
            .append(true)
            .create(true)
            .open(self.archive_path())?;
        for line in archived {
            writeln!(archive, "{line}")?;
        }

        let mut retained = kept.join("\n");
        retained.push('\n');
        fs::write(&self.path, retained)?;
        Ok(true)
    }

    fn colorize_sender(&self, sender: &str) -> String {
        if sender == self.operator_label {
            format!("{OPERATOR_COLOR}{sender}{RESET}")
        } else if sender == "Left" {
            format!("{LEFT_COLOR}{sender}{RESET}")
        } else if sender == "Right" {
            format!("{RIGHT_COLOR}{sender}{RESET}")
        } else {
            sender.to_string()
        }
    }
}

static COLOR_CODE_RE: OnceLock<Regex> = OnceLock::new();

fn color_code_re() -> &'static Regex {
    COLOR_CODE_RE.get_or_init(|| Regex::new(r"\[(\d+(?:;\d+)*)m").expect("valid regex"))
}

/// Reinterprets bracketed numeric color markers in agent text (`[32m`,
/// `[38;5;214m`) into real ANSI escapes so they render in the transcript.
///
/// Agents write plain-text markers because their output files are edited
/// as ordinary text. Text that already carries a real escape gains a
/// doubled ESC byte; that quirk is longstanding and left as is.
#[must_use]
pub fn recolor_codes(text: &str) -> String {
    color_code_re().replace_all(text, "\x1b[${1}m").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_transcript(dir: &TempDir) -> Transcript {
        Transcript::new(dir.path().join("core_log"), "Kong")
    }

    #[test]
    fn test_append_creates_file_and_formats_entry() {
        let dir = TempDir::new().unwrap();
        let transcript = test_transcript(&dir);

        transcript.append("Kong", "hello there").unwrap();

        let content = fs::read_to_string(transcript.path()).unwrap();
        assert!(content.starts_with("\n\x1b[2m["));
        assert!(content.contains("]\x1b[0m \x1b[38;5;214mKong\x1b[0m\n"));
        assert!(content.ends_with("hello there\n"));
    }

    #[test]
    fn test_agent_sender_colors() {
        let dir = TempDir::new().unwrap();
        let transcript = test_transcript(&dir);

        transcript.append("Left", "from the left").unwrap();
        transcript.append("Right", "from the right").unwrap();

        let content = fs::read_to_string(transcript.path()).unwrap();
        assert!(content.contains("\x1b[32mLeft\x1b[0m"));
        assert!(content.contains("\x1b[35mRight\x1b[0m"));
    }

    #[test]
    fn test_unknown_sender_uncolored() {
        let dir = TempDir::new().unwrap();
        let transcript = test_transcript(&dir);

        transcript.append("stranger", "who dis").unwrap();

        let content = fs::read_to_string(transcript.path()).unwrap();
        assert!(content.contains("\x1b[0m stranger\n"));
        assert!(!content.contains("mstranger"));
    }

    #[test]
    fn test_init_header_once() {
        let dir = TempDir::new().unwrap();
        let transcript = test_transcript(&dir);

        transcript.init_header().unwrap();
        let first = fs::read_to_string(transcript.path()).unwrap();
        assert!(first.starts_with("Core Communication Log\nSession started: "));

        // A second call must not clobber an existing log.
        transcript.append("Kong", "kept").unwrap();
        transcript.init_header().unwrap();
        let second = fs::read_to_string(transcript.path()).unwrap();
        assert!(second.contains("kept"));
    }

    #[test]
    fn test_rotate_missing_file_is_noop() {
        let dir = TempDir::new().unwrap();
        let transcript = test_transcript(&dir);

        assert!(!transcript.rotate().unwrap());
    }

    #[test]
    fn test_rotate_at_threshold_is_noop() {
        let dir = TempDir::new().unwrap();
        let transcript = test_transcript(&dir);

        let lines: Vec<String> = (1..=ROTATE_THRESHOLD_LINES)
            .map(|i| format!("line {i}"))
            .collect();
        fs::write(transcript.path(), lines.join("\n") + "\n").unwrap();

        // Exactly 500 lines: rotation requires strictly more.
        assert!(!transcript.rotate().unwrap());
        assert!(!transcript.archive_path().exists());
    }

    #[test]
    fn test_rotate_splits_520_lines() {
        let dir = TempDir::new().unwrap();
        let transcript = test_transcript(&dir);

        let lines: Vec<String> = (1..=520).map(|i| format!("line {i}")).collect();
        fs::write(transcript.path(), lines.join("\n") + "\n").unwrap();

        assert!(transcript.rotate().unwrap());

        let live: Vec<String> = fs::read_to_string(transcript.path())
            .unwrap()
            .lines()
            .map(String::from)
            .collect();
        assert_eq!(live.len(), ROTATE_KEEP_LINES);
        assert_eq!(live.first().map(String::as_str), Some("line 421"));
        assert_eq!(live.last().map(String::as_str), Some("line 520"));

        let archived: Vec<String> = fs::read_to_string(transcript.archive_path())
            .unwrap()
            .lines()
            .map(String::from)
            .collect();
        assert_eq!(archived.len(), 420);
        assert_eq!(archived.first().map(String::as_str), Some("line 1"));
        assert_eq!(archived.last().map(String::as_str), Some("line 420"));
    }

    #[test]
    fn test_same_day_rotations_append_to_one_archive() {
        let dir = TempDir::new().unwrap();
        let transcript = test_transcript(&dir);

        let first: Vec<String> = (1..=510).map(|i| format!("a{i}")).collect();
        fs::write(transcript.path(), first.join("\n") + "\n").unwrap();
        assert!(transcript.rotate().unwrap());

        let second: Vec<String> = (1..=510).map(|i| format!("b{i}")).collect();
        fs::write(transcript.path(), second.join("\n") + "\n").unwrap();
        assert!(transcript.rotate().unwrap());

        let archived = fs::read_to_string(transcript.archive_path()).unwrap();
        let archived: Vec<&str> = archived.lines().collect();
        assert_eq!(archived.len(), 820);
        assert_eq!(archived.first(), Some(&"a1"));
        assert_eq!(archived[409], "a410");
        assert_eq!(archived[410], "b1");
        assert_eq!(archived.last(), Some(&"b410"));
    }

    #[test]
    fn test_second_rotate_after_trim_is_noop() {
        let dir = TempDir::new().unwrap();
        let transcript = test_transcript(&dir);

        let lines: Vec<String> = (1..=520).map(|i| format!("line {i}")).collect();
        fs::write(transcript.path(), lines.join("\n") + "\n").unwrap();

        assert!(transcript.rotate().unwrap());
        assert!(!transcript.rotate().unwrap());
    }

    #[test]
    fn test_recolor_codes_basic() {
        assert_eq!(recolor_codes("[32mgreen[0m"), "\x1b[32mgreen\x1b[0m");
        assert_eq!(recolor_codes("[38;5;214morange"), "\x1b[38;5;214morange");
    }

    #[test]
    fn test_recolor_codes_leaves_plain_text_alone() {
        assert_eq!(recolor_codes("no codes here"), "no codes here");
        assert_eq!(recolor_codes("[not-a-code]"), "[not-a-code]");
        assert_eq!(recolor_codes("array[3] = m"), "array[3] = m");
    }

    #[test]
    fn test_recolor_codes_doubles_existing_escape() {
        // A real escape followed by a bracketed code still matches the
        // bracketed part; the historical behavior doubles the ESC byte.
        assert_eq!(recolor_codes("\x1b[31mred"), "\x1b\x1b[31mred");
    }
}
