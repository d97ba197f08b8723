use std::time::{Duration, Instant};

use tracing::{debug, trace};

/// Default budget for assembling one message, measured from its outer `{`.
pub const DEFAULT_MAX_MESSAGE_ASSEMBLY: Duration = Duration::from_millis(1000);

/// Default cap on the size of one message buffer: 64 KiB.
pub const DEFAULT_MAX_MESSAGE_LEN: usize = 64 * 1024;

/// Configuration for the [`Framer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FramerConfig {
    /// Time allowed between a message's outer `{` and its closing `}`.
    /// A message still open past this budget is discarded. Default: 1s.
    pub max_message_assembly: Duration,
    /// Maximum buffered message length in bytes. Default: 64 KiB.
    pub max_message_len: usize,
}

impl Default for FramerConfig {
    fn default() -> Self {
        Self {
            max_message_assembly: DEFAULT_MAX_MESSAGE_ASSEMBLY,
            max_message_len: DEFAULT_MAX_MESSAGE_LEN,
        }
    }
}

/// Incremental brace-depth framer.
///
/// Feed it characters as they arrive; it hands back each complete top-level
/// `{...}` object exactly as received. Braces inside `'...'` or `"..."` do not
/// count, and a backslash makes the next character literal.
///
/// Characters outside any object are line noise and are dropped. A message
/// that stays open longer than [`FramerConfig::max_message_assembly`] or grows
/// past [`FramerConfig::max_message_len`] is thrown away and framing restarts
/// from a neutral state, so a corrupted stream never wedges the link.
#[derive(Debug)]
pub struct Framer {
    config: FramerConfig,
    depth: usize,
    quote: Option<char>,
    escaped: bool,
    buffer: String,
    opened_at: Option<Instant>,
    last_complete: Option<Instant>,
    resets: u64,
}

impl Framer {
    /// Create a framer with default configuration.
    pub fn new() -> Self {
        Self::with_config(FramerConfig::default())
    }

    /// Create a framer with explicit configuration.
    pub fn with_config(config: FramerConfig) -> Self {
        Self {
            config,
            depth: 0,
            quote: None,
            escaped: false,
            buffer: String::new(),
            opened_at: None,
            last_complete: None,
            resets: 0,
        }
    }

    /// Feed one character. Returns the message it completes, if any.
    pub fn feed(&mut self, c: char) -> Option<String> {
        self.feed_at(c, Instant::now())
    }

    /// Feed a run of characters, returning every message completed along the way.
    pub fn feed_all(&mut self, input: &str) -> Vec<String> {
        let now = Instant::now();
        input.chars().filter_map(|c| self.feed_at(c, now)).collect()
    }

    /// Feed one character that arrived at `now`.
    pub fn feed_at(&mut self, c: char, now: Instant) -> Option<String> {
        if self.depth > 0 && self.assembly_expired(now) {
            self.force_reset(now, "assembly timeout");
        }

        if self.depth == 0 {
            if c == '{' {
                self.depth = 1;
                self.opened_at = Some(now);
                self.buffer.push(c);
            } else {
                trace!(?c, "dropping character outside message");
            }
            return None;
        }

        self.buffer.push(c);
        if self.buffer.len() > self.config.max_message_len {
            self.force_reset(now, "message too long");
            return None;
        }

        if self.escaped {
            self.escaped = false;
            return None;
        }

        match (self.quote, c) {
            (_, '\\') => self.escaped = true,
            (Some(open), c) if c == open => self.quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => self.quote = Some(c),
            (None, '{') => self.depth += 1,
            (None, '}') => {
                self.depth -= 1;
                if self.depth == 0 {
                    return Some(self.complete(now));
                }
            }
            _ => {}
        }

        None
    }

    /// Drop any partial message and return to the neutral state.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.clear_state();
    }

    /// True while a message is being assembled.
    pub fn is_assembling(&self) -> bool {
        self.depth > 0
    }

    /// Current brace depth.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Bytes buffered for the message in progress.
    pub fn pending_len(&self) -> usize {
        self.buffer.len()
    }

    /// Number of forced resets since creation.
    pub fn resets(&self) -> u64 {
        self.resets
    }

    /// When the last message completed or the last forced reset happened.
    pub fn last_complete(&self) -> Option<Instant> {
        self.last_complete
    }

    /// Current framer configuration.
    pub fn config(&self) -> &FramerConfig {
        &self.config
    }

    fn assembly_expired(&self, now: Instant) -> bool {
        self.opened_at.is_some_and(|opened| {
            now.saturating_duration_since(opened) > self.config.max_message_assembly
        })
    }

    fn complete(&mut self, now: Instant) -> String {
        let message = std::mem::take(&mut self.buffer);
        self.clear_state();
        self.last_complete = Some(now);
        message
    }

    fn force_reset(&mut self, now: Instant, reason: &'static str) {
        debug!(
            reason,
            discarded = self.buffer.len(),
            depth = self.depth,
            "framer resynchronised"
        );
        self.reset();
        self.last_complete = Some(now);
        self.resets += 1;
    }

    fn clear_state(&mut self) {
        self.depth = 0;
        self.quote = None;
        self.escaped = false;
        self.opened_at = None;
    }
}

impl Default for Framer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed_each(framer: &mut Framer, input: &str) -> Vec<String> {
        input.chars().filter_map(|c| framer.feed(c)).collect()
    }

    #[test]
    fn single_message() {
        let mut framer = Framer::new();
        let out = framer.feed_all(r#"{"Service":"PING","Id":1}"#);
        assert_eq!(out, vec![r#"{"Service":"PING","Id":1}"#.to_string()]);
        assert!(!framer.is_assembling());
        assert_eq!(framer.pending_len(), 0);
    }

    #[test]
    fn feed_and_feed_all_agree() {
        let stream = concat!(
            r#"junk{"Service":"A","x":{"y":"}{"}}"#,
            "\r\n",
            r#"{'Service':'B','q':"it's"}"#,
            r#"{"Service":"C","e":"\"}\\"}"#,
            r#"{"open":"#,
        );

        let mut one = Framer::new();
        let mut batch = Framer::new();

        let fed = feed_each(&mut one, stream);
        let batched = batch.feed_all(stream);

        assert_eq!(fed, batched);
        assert_eq!(fed.len(), 3);
        assert_eq!(one.depth(), batch.depth());
        assert_eq!(one.pending_len(), batch.pending_len());
    }

    #[test]
    fn one_message_per_top_level_group() {
        let mut framer = Framer::new();
        let out = framer.feed_all(r#"{"a":{"b":{}}}{"c":1}{}"#);

        assert_eq!(
            out,
            vec![
                r#"{"a":{"b":{}}}"#.to_string(),
                r#"{"c":1}"#.to_string(),
                "{}".to_string(),
            ]
        );
        assert_eq!(framer.pending_len(), 0);
        assert_eq!(framer.depth(), 0);
    }

    #[test]
    fn brace_inside_quotes_does_not_close() {
        let mut framer = Framer::new();
        let input = r#"{"a":"}"}%"#;

        let mut completed_at = None;
        for (idx, c) in input.chars().enumerate() {
            if let Some(message) = framer.feed(c) {
                assert!(completed_at.is_none(), "completed twice");
                assert_eq!(message, r#"{"a":"}"}"#);
                completed_at = Some(idx);
            }
        }

        assert_eq!(completed_at, Some(8));
        assert_eq!(framer.pending_len(), 0);
    }

    #[test]
    fn other_quote_char_is_literal_inside_quotes() {
        let mut framer = Framer::new();
        let out = framer.feed_all(r#"{"a":"'}'","b":'"}"'}"#);
        assert_eq!(out, vec![r#"{"a":"'}'","b":'"}"'}"#.to_string()]);
    }

    #[test]
    fn escaped_quote_does_not_toggle_quoting() {
        let mut framer = Framer::new();
        let input = r#"{"a":"x\"}y"}"#;

        let out = feed_each(&mut framer, &input[..input.len() - 1]);
        assert!(out.is_empty());
        assert!(framer.is_assembling());

        assert_eq!(framer.feed('}'), Some(input.to_string()));
    }

    #[test]
    fn escaped_backslash_is_literal() {
        let mut framer = Framer::new();
        let out = framer.feed_all(r#"{"path":"C:\\"}"#);
        assert_eq!(out, vec![r#"{"path":"C:\\"}"#.to_string()]);
    }

    #[test]
    fn escaped_brace_outside_quotes_is_literal() {
        let mut framer = Framer::new();
        assert!(framer.feed_all(r"{\}").is_empty());
        assert_eq!(framer.feed('}'), Some(r"{\}}".to_string()));
    }

    #[test]
    fn noise_between_messages_is_dropped() {
        let mut framer = Framer::new();
        let out = framer.feed_all("}}garbage{\"a\":1}\n\n%%{\"b\":2}");
        assert_eq!(out, vec!["{\"a\":1}".to_string(), "{\"b\":2}".to_string()]);
        assert_eq!(framer.depth(), 0);
    }

    #[test]
    fn stalled_message_is_reset_without_emitting() {
        let mut framer = Framer::new();
        let start = Instant::now();

        for c in r#"{"Service":"CAM"#.chars() {
            assert!(framer.feed_at(c, start).is_none());
        }
        assert!(framer.is_assembling());

        let later = start + DEFAULT_MAX_MESSAGE_ASSEMBLY + Duration::from_millis(1);
        let mut out = Vec::new();
        for c in r#"ERA"}{"Service":"PING"}"#.chars() {
            out.extend(framer.feed_at(c, later));
        }

        assert_eq!(out, vec![r#"{"Service":"PING"}"#.to_string()]);
        assert_eq!(framer.resets(), 1);
        assert_eq!(framer.last_complete(), Some(later));
    }

    #[test]
    fn stall_reset_restarts_on_open_brace() {
        let mut framer = Framer::new();
        let start = Instant::now();

        assert!(framer.feed_at('{', start).is_none());
        assert!(framer.feed_at('"', start).is_none());

        let later = start + Duration::from_secs(2);
        let mut out = Vec::new();
        for c in "{}".chars() {
            out.extend(framer.feed_at(c, later));
        }

        assert_eq!(out, vec!["{}".to_string()]);
        assert_eq!(framer.resets(), 1);
    }

    #[test]
    fn message_within_budget_is_kept() {
        let mut framer = Framer::new();
        let start = Instant::now();
        let input = r#"{"a":1}"#;
        let step = Duration::from_millis(100);

        let mut out = Vec::new();
        for (idx, c) in input.chars().enumerate() {
            out.extend(framer.feed_at(c, start + step * idx as u32));
        }

        assert_eq!(out, vec![input.to_string()]);
        assert_eq!(framer.resets(), 0);
    }

    #[test]
    fn oversized_message_is_discarded() {
        let mut framer = Framer::with_config(FramerConfig {
            max_message_len: 8,
            ..FramerConfig::default()
        });

        let out = framer.feed_all(r#"{"long":"value"}{"a":1}"#);
        assert_eq!(out, vec![r#"{"a":1}"#.to_string()]);
        assert_eq!(framer.resets(), 1);
    }

    #[test]
    fn reset_discards_partial_message() {
        let mut framer = Framer::new();
        framer.feed_all(r#"{"a":"unterminated"#);
        assert!(framer.is_assembling());

        framer.reset();
        assert!(!framer.is_assembling());
        assert_eq!(framer.pending_len(), 0);
        assert_eq!(framer.feed_all("{}"), vec!["{}".to_string()]);
    }

    #[test]
    fn multibyte_characters_pass_through() {
        let mut framer = Framer::new();
        let out = framer.feed_all(r#"{"Text":"grüße {✓}"}"#);
        assert_eq!(out, vec![r#"{"Text":"grüße {✓}"}"#.to_string()]);
    }
}
