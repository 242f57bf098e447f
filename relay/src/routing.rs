//! Routing mini-language parser.
//!
//! A human message may address a subset of recipients by beginning lines
//! with a routing tag. The grammar is part of the system's external
//! contract:
//!
//! ```text
//! c1-review the diff        tag line: opens channel 1
//! and leave comments        continuation: appended to channel 1
//! c2-run the tests          tag line: opens channel 2
//! all-stand by              tag line: opens broadcast
//! ```
//!
//! Tags are `c1-` through `c5-` and `all-`, matched case-sensitively at
//! the start of a line. Anything else is ordinary text: it extends the
//! currently open tag, or, before any tag has opened, becomes
//! broadcast-by-default content.
//!
//! # Accumulation semantics
//!
//! Per-tag bodies are collected as a list of lines and newline-joined at
//! flush time; the broadcast-by-default accumulator is raw string
//! concatenation with a trailing newline per line, trimmed once at end of
//! input. The two paths differ observably: blank untagged leading lines
//! materialize an `all` entry with an empty body, while a tag with no
//! accumulated lines produces no entry at all. Parsing never fails;
//! malformed input degrades to broadcast text.

use std::fmt;

/// Highest channel number recognized by the tag grammar.
pub const MAX_CHANNEL: u8 = 5;

/// A recipient selector derived from a `<tag>-` line prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoutingTag {
    /// Deliver to every known target.
    All,

    /// Deliver to one numbered channel (1-based).
    Channel(u8),
}

impl fmt::Display for RoutingTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoutingTag::All => write!(f, "all"),
            RoutingTag::Channel(n) => write!(f, "c{n}"),
        }
    }
}

/// Per-recipient message bodies in first-appearance order.
///
/// Keys are unique: a repeated tag replaces its body in place without
/// moving its position. Bodies are trimmed at flush time and are normally
/// non-empty; the blank-continuation edge cases documented on
/// [`parse_routing`] can produce an empty body, which callers skip before
/// delivery.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RoutedMessage {
    entries: Vec<(RoutingTag, String)>,
}

impl RoutedMessage {
    /// Body recorded for `tag`, if any.
    #[must_use]
    pub fn get(&self, tag: RoutingTag) -> Option<&str> {
        self.entries
            .iter()
            .find(|(t, _)| *t == tag)
            .map(|(_, body)| body.as_str())
    }

    /// True when parsing produced no entries (e.g. a lone dangling tag
    /// line); callers fall back to broadcasting the whole message.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of routed entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Entries in first-appearance order.
    pub fn iter(&self) -> impl Iterator<Item = (RoutingTag, &str)> {
        self.entries.iter().map(|(tag, body)| (*tag, body.as_str()))
    }

    /// Replace-or-push keeping the first-appearance position.
    fn insert(&mut self, tag: RoutingTag, body: String) {
        match self.entries.iter_mut().find(|(t, _)| *t == tag) {
            Some((_, existing)) => *existing = body,
            None => self.entries.push((tag, body)),
        }
    }

    /// Raw concatenation into the broadcast body, creating the entry at
    /// the current position on first use.
    fn append_broadcast(&mut self, line: &str) {
        if self.get(RoutingTag::All).is_none() {
            self.entries.push((RoutingTag::All, String::new()));
        }
        if let Some((_, body)) = self
            .entries
            .iter_mut()
            .find(|(t, _)| *t == RoutingTag::All)
        {
            body.push_str(line);
            body.push('\n');
        }
    }

    /// Final whitespace trim of the broadcast body, if present.
    fn trim_broadcast(&mut self) {
        if let Some((_, body)) = self
            .entries
            .iter_mut()
            .find(|(t, _)| *t == RoutingTag::All)
        {
            *body = body.trim().to_string();
        }
    }
}

/// Matches a recognized routing tag at the start of `line`, returning the
/// tag and the remainder after the `<tag>-` prefix.
fn match_tag(line: &str) -> Option<(RoutingTag, &str)> {
    if let Some(rest) = line.strip_prefix("all-") {
        return Some((RoutingTag::All, rest));
    }
    let bytes = line.as_bytes();
    if bytes.len() > 2 && bytes[0] == b'c' && bytes[2] == b'-' && bytes[1].is_ascii_digit() {
        let n = bytes[1] - b'0';
        if (1..=MAX_CHANNEL).contains(&n) {
            return Some((RoutingTag::Channel(n), &line[3..]));
        }
    }
    None
}

/// Flushes an open tag's accumulated lines into the map, if non-empty.
fn flush_open(routed: &mut RoutedMessage, current: Option<RoutingTag>, pending: &[&str]) {
    if let Some(tag) = current {
        if !pending.is_empty() {
            routed.insert(tag, pending.join("\n").trim().to_string());
        }
    }
}

/// Splits a message into per-recipient bodies.
///
/// Scans lines in order, right-trimming each, with a current tag
/// (initially none):
/// - A tag line flushes the previous tag's accumulated lines
///   (newline-joined, trimmed) if any were collected, then seeds the new
///   accumulator with the fully-trimmed remainder of the tag line (only
///   if non-empty).
/// - A non-tag line while a tag is open extends that tag's accumulator
///   verbatim, blank lines included (they survive the join).
/// - A non-tag line before any tag is broadcast-by-default content.
///
/// At end of input the open tag is flushed and the broadcast body is
/// trimmed. A message with no recognized tags yields a single
/// [`RoutingTag::All`] entry equal to the trimmed input; a lone `c1-`
/// with nothing following yields an empty map.
#[must_use]
pub fn parse_routing(message: &str) -> RoutedMessage {
    let mut routed = RoutedMessage::default();
    let mut current: Option<RoutingTag> = None;
    let mut pending: Vec<&str> = Vec::new();

    for line in message.split('\n') {
        let line = line.trim_end();
        if let Some((tag, rest)) = match_tag(line) {
            flush_open(&mut routed, current, &pending);
            current = Some(tag);
            pending.clear();
            let rest = rest.trim();
            if !rest.is_empty() {
                pending.push(rest);
            }
        } else if current.is_some() {
            pending.push(line);
        } else {
            routed.append_broadcast(line);
        }
    }

    flush_open(&mut routed, current, &pending);
    routed.trim_broadcast();
    routed
}
