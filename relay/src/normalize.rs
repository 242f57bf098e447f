//! Content normalization for watched files.
//!
//! Raw file content is reduced to its meaningful lines before change
//! detection and routing: blank lines and comment lines (leading `#` after
//! trimming) are dropped, and each retained line is trimmed according to
//! the file's [`TrimStyle`].
//!
//! Human input keeps leading whitespace ([`TrimStyle::Trailing`]) so
//! intentional indentation in a prompt survives the relay; agent output is
//! trimmed on both sides ([`TrimStyle::Full`]). This asymmetry is part of
//! the external contract.

/// A line whose trimmed form starts with this marker is dropped.
const COMMENT_MARKER: char = '#';

/// How retained lines are trimmed during normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrimStyle {
    /// Trim trailing whitespace only, preserving leading indentation.
    /// Used for the human-input file.
    Trailing,

    /// Trim both sides. Used for agent-output files.
    Full,
}

/// Reduces raw file content to its meaningful lines.
///
/// Drops every line that is blank or a comment after trimming, trims the
/// survivors per `style`, and rejoins them with `\n` in their original
/// order. Idempotent for both styles.
///
/// # Example
///
/// ```
/// use textrelay::normalize::{normalize, TrimStyle};
///
/// let raw = "# input_human\n\n  hello\nworld  \n";
/// assert_eq!(normalize(raw, TrimStyle::Trailing), "  hello\nworld");
/// assert_eq!(normalize(raw, TrimStyle::Full), "hello\nworld");
/// ```
#[must_use]
pub fn normalize(raw: &str, style: TrimStyle) -> String {
    raw.split('\n')
        .filter(|line| {
            let trimmed = line.trim();
            !trimmed.is_empty() && !trimmed.starts_with(COMMENT_MARKER)
        })
        .map(|line| match style {
            TrimStyle::Trailing => line.trim_end(),
            TrimStyle::Full => line.trim(),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_input() {
        assert_eq!(normalize("", TrimStyle::Trailing), "");
        assert_eq!(normalize("", TrimStyle::Full), "");
    }

    #[test]
    fn test_comments_and_blanks_dropped() {
        let raw = "# header\n\n   \nbody\n# trailing comment\n";
        assert_eq!(normalize(raw, TrimStyle::Trailing), "body");
        assert_eq!(normalize(raw, TrimStyle::Full), "body");
    }

    #[test]
    fn test_indented_comment_dropped() {
        let raw = "   # not real content\nkeep me";
        assert_eq!(normalize(raw, TrimStyle::Trailing), "keep me");
    }

    #[test]
    fn test_trailing_style_preserves_indentation() {
        let raw = "    indented prompt   \nsecond line";
        assert_eq!(
            normalize(raw, TrimStyle::Trailing),
            "    indented prompt\nsecond line"
        );
    }

    #[test]
    fn test_full_style_trims_both_sides() {
        let raw = "    indented response   \n  second  ";
        assert_eq!(normalize(raw, TrimStyle::Full), "indented response\nsecond");
    }

    #[test]
    fn test_line_order_preserved() {
        let raw = "one\ntwo\nthree";
        assert_eq!(normalize(raw, TrimStyle::Full), "one\ntwo\nthree");
    }

    #[test]
    fn test_hash_mid_line_retained() {
        let raw = "issue #42 is fixed";
        assert_eq!(normalize(raw, TrimStyle::Full), "issue #42 is fixed");
    }

    #[test]
    fn test_crlf_endings() {
        let raw = "hello\r\nworld\r\n";
        assert_eq!(normalize(raw, TrimStyle::Trailing), "hello\nworld");
    }

    #[test]
    fn test_idempotent_trailing() {
        let samples = [
            "",
            "# only a comment",
            "  leading kept  \n\n# c\nnext",
            "a\nb\nc",
        ];
        for raw in samples {
            let once = normalize(raw, TrimStyle::Trailing);
            assert_eq!(normalize(&once, TrimStyle::Trailing), once, "raw: {raw:?}");
        }
    }

    #[test]
    fn test_idempotent_full() {
        let samples = ["", "  padded  ", "x\n   \ny", "# c1\n#c2"];
        for raw in samples {
            let once = normalize(raw, TrimStyle::Full);
            assert_eq!(normalize(&once, TrimStyle::Full), once, "raw: {raw:?}");
        }
    }
}
