//! Header-block framing for the event socket wire protocol.
//!
//! The switch speaks in blocks of `Key: Value` lines terminated by a blank
//! line:
//! ```text
//! Content-Type: command/reply\n
//! Reply-Text: +OK accepted\n
//! \n
//! ```
//! Keys and values are percent-encoded on the wire. Plain events arrive
//! wrapped in an outer frame whose `Content-Length` covers the event text; the
//! event's own `Content-Length` (when it carries a body) is kept under
//! [`INNER_CONTENT_LENGTH`] so both lengths survive in one block.

use std::mem;

use percent_encoding::{AsciiSet, CONTROLS, percent_decode_str, utf8_percent_encode};

use crate::error::CodecError;
use crate::state::ConnectionState;

/// Header naming the kind of block.
pub const CONTENT_TYPE: &str = "Content-Type";
/// Header declaring the length of the data following the block.
pub const CONTENT_LENGTH: &str = "Content-Length";
/// Key a second `Content-Length` in the same block is stored under.
pub const INNER_CONTENT_LENGTH: &str = "Content-Content-Length";
/// Conventional name of the body slot attached to a block.
pub const BODY_KEY: &str = "Content-Content";
/// Reply text carried by `command/reply` blocks.
pub const REPLY_TEXT: &str = "Reply-Text";
/// Identifier of a background job.
pub const JOB_UUID: &str = "Job-UUID";
/// Name of an event notification.
pub const EVENT_NAME: &str = "Event-Name";

/// Appended to every outbound command: its line end plus three blank lines.
pub const COMMAND_TERMINATOR: &str = "\n\n\n\n";

/// Largest event body the client agrees to read.
pub const MAX_BODY_LEN: usize = 16 * 1024 * 1024;

const HEADER_ENCODE_SET: &AsciiSet = &CONTROLS.add(b'%').add(b':').add(b' ');

/// An ordered set of decoded headers plus an optional body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderBlock {
    headers: Vec<(String, String)>,
    body: Option<String>,
}

impl HeaderBlock {
    /// Creates an empty block.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a block by inserting each pair in order.
    #[must_use]
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let mut block = Self::new();
        for (key, value) in pairs {
            block.insert(key, value);
        }
        block
    }

    /// Inserts a header.
    ///
    /// A second `Content-Length` is stored under [`INNER_CONTENT_LENGTH`].
    /// Any other repeated key replaces the earlier value in place.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let mut key = key.into();
        let value = value.into();
        if key == CONTENT_LENGTH && self.contains(CONTENT_LENGTH) {
            key = INNER_CONTENT_LENGTH.to_owned();
        }
        match self.headers.iter_mut().find(|(existing, _)| *existing == key) {
            Some(slot) => slot.1 = value,
            None => self.headers.push((key, value)),
        }
    }

    /// Looks up a header value.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(existing, _)| existing == key)
            .map(|(_, value)| value.as_str())
    }

    /// Returns `true` when the header is present.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Number of headers, not counting the body.
    #[must_use]
    pub fn len(&self) -> usize {
        self.headers.len()
    }

    /// Returns `true` when no header has been parsed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }

    /// Iterates the headers in arrival order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.headers
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }

    /// The `Content-Type` header.
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.get(CONTENT_TYPE)
    }

    /// The `Event-Name` header.
    #[must_use]
    pub fn event_name(&self) -> Option<&str> {
        self.get(EVENT_NAME)
    }

    /// The `Reply-Text` header.
    #[must_use]
    pub fn reply_text(&self) -> Option<&str> {
        self.get(REPLY_TEXT)
    }

    /// The `Job-UUID` header, ignoring empty values.
    #[must_use]
    pub fn job_uuid(&self) -> Option<&str> {
        self.get(JOB_UUID).filter(|uuid| !uuid.is_empty())
    }

    /// The body read after the block, if any.
    #[must_use]
    pub fn body(&self) -> Option<&str> {
        self.body.as_deref()
    }

    /// Attaches the body read after the block.
    pub fn attach_body(&mut self, body: String) {
        self.body = Some(body);
    }

    /// Serialises the headers as wire lines followed by the blank terminator.
    ///
    /// Characters the parser would strip or split on are percent-encoded, so
    /// the output parses back into the same pairs. The body is not included.
    #[must_use]
    pub fn to_wire(&self) -> String {
        let mut wire = String::new();
        for (key, value) in &self.headers {
            wire.push_str(&utf8_percent_encode(key, HEADER_ENCODE_SET).to_string());
            wire.push_str(": ");
            wire.push_str(&utf8_percent_encode(value, HEADER_ENCODE_SET).to_string());
            wire.push('\n');
        }
        wire.push('\n');
        wire
    }
}

/// Parses one header line into a decoded `(key, value)` pair.
///
/// Splits on the first colon and trims both halves before decoding. Lines
/// without a colon, or with an empty key, yield `None`.
#[must_use]
pub fn parse_header_line(line: &str) -> Option<(String, String)> {
    let (raw_key, raw_value) = strip_terminator(line).split_once(':')?;
    let key = decode(raw_key.trim());
    if key.is_empty() {
        return None;
    }
    Some((key, decode(raw_value.trim())))
}

fn decode(text: &str) -> String {
    percent_decode_str(text).decode_utf8_lossy().into_owned()
}

fn strip_terminator(line: &str) -> &str {
    let without_newline = line.strip_suffix('\n').unwrap_or(line);
    without_newline
        .strip_suffix('\r')
        .unwrap_or(without_newline)
}

/// Accumulates header lines into blocks.
#[derive(Debug, Default)]
pub struct BlockAssembler {
    current: HeaderBlock,
    discarding: bool,
}

impl BlockAssembler {
    /// Creates an assembler with nothing buffered.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one line, returning the block it completes.
    ///
    /// A blank line completes the block in progress; blank lines with nothing
    /// accumulated are skipped. Lines without a colon are dropped.
    pub fn push_line(&mut self, line: &str) -> Option<HeaderBlock> {
        if self.discarding {
            self.discarding = !strip_terminator(line).is_empty();
            return None;
        }
        if strip_terminator(line).is_empty() {
            if self.current.is_empty() {
                return None;
            }
            return Some(mem::take(&mut self.current));
        }
        if let Some((key, value)) = parse_header_line(line) {
            self.current.insert(key, value);
        }
        None
    }

    /// Reopens a completed block so following lines merge into it.
    pub fn hold(&mut self, block: HeaderBlock) {
        self.current = block;
    }

    /// Headers accumulated towards the next block.
    #[must_use]
    pub const fn in_progress(&self) -> &HeaderBlock {
        &self.current
    }

    /// Drops every line up to and including the next blank line.
    ///
    /// Used after a body that could not be read, so its bytes are not
    /// mistaken for headers of the next block.
    pub fn discard_through_blank_line(&mut self) {
        self.current = HeaderBlock::new();
        self.discarding = true;
    }

    /// Returns `true` while lines are being dropped.
    #[must_use]
    pub const fn is_discarding(&self) -> bool {
        self.discarding
    }

    /// Drops anything buffered.
    pub fn clear(&mut self) {
        self.current = HeaderBlock::new();
        self.discarding = false;
    }
}

/// Length of the body that must be read after `block`.
///
/// A body is only pulled for an inner `Content-Length` while subscribed;
/// outside that state the block is processed as-is.
///
/// # Errors
///
/// Returns [`CodecError::InvalidBodyLength`] when the declared length is not
/// a byte count, and [`CodecError::BodyTooLarge`] when it exceeds
/// [`MAX_BODY_LEN`].
pub fn inner_body_length(
    block: &HeaderBlock,
    state: ConnectionState,
) -> Result<Option<usize>, CodecError> {
    if !state.is_subscribed() {
        return Ok(None);
    }
    let Some(raw) = block.get(INNER_CONTENT_LENGTH) else {
        return Ok(None);
    };
    let length = raw
        .trim()
        .parse::<usize>()
        .map_err(|_| CodecError::InvalidBodyLength {
            value: raw.to_owned(),
        })?;
    if length > MAX_BODY_LEN {
        return Err(CodecError::BodyTooLarge {
            length,
            limit: MAX_BODY_LEN,
        });
    }
    Ok(Some(length))
}

/// Frames a command for the wire.
#[must_use]
pub fn encode_command(command: &str) -> String {
    format!("{command}{COMMAND_TERMINATOR}")
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn assemble(wire: &str) -> Vec<HeaderBlock> {
        let mut assembler = BlockAssembler::new();
        wire.split_inclusive('\n')
            .filter_map(|line| assembler.push_line(line))
            .collect()
    }

    #[rstest]
    #[case("Content-Type: auth/request\n", "Content-Type", "auth/request")]
    #[case("Reply-Text:   +OK accepted  \r\n", "Reply-Text", "+OK accepted")]
    #[case("Caller-Caller-ID-Name: Jane%20Doe\n", "Caller-Caller-ID-Name", "Jane Doe")]
    #[case("Event-Date-Local: 2024-01-02 10:11:12\n", "Event-Date-Local", "2024-01-02 10:11:12")]
    #[case("variable_sip_uri: sip%3A1000%40pbx\n", "variable_sip_uri", "sip:1000@pbx")]
    fn parses_header_lines(#[case] line: &str, #[case] key: &str, #[case] value: &str) {
        let parsed = parse_header_line(line).expect("line should parse");
        assert_eq!(parsed, (key.to_owned(), value.to_owned()));
    }

    #[rstest]
    #[case("no colon here\n")]
    #[case(": orphan value\n")]
    #[case("\n")]
    fn ignores_malformed_lines(#[case] line: &str) {
        assert!(parse_header_line(line).is_none());
    }

    #[test]
    fn blank_line_completes_block() {
        let blocks = assemble("Content-Type: command/reply\nReply-Text: +OK accepted\n\n");
        assert_eq!(blocks.len(), 1);
        let block = blocks.first().expect("one block");
        assert_eq!(block.content_type(), Some("command/reply"));
        assert_eq!(block.reply_text(), Some("+OK accepted"));
    }

    #[test]
    fn stray_blank_lines_yield_nothing() {
        let blocks = assemble("\n\n\nContent-Type: auth/request\n\n\n\n");
        assert_eq!(blocks.len(), 1);
    }

    #[test]
    fn malformed_lines_do_not_break_the_block() {
        let blocks = assemble("garbage\nContent-Type: auth/request\n\n");
        let block = blocks.first().expect("one block");
        assert_eq!(block.len(), 1);
        assert_eq!(block.content_type(), Some("auth/request"));
    }

    #[test]
    fn second_content_length_is_renamed() {
        let block = HeaderBlock::from_pairs([
            (CONTENT_LENGTH, "512"),
            (CONTENT_TYPE, "text/event-plain"),
            (EVENT_NAME, "BACKGROUND_JOB"),
            (CONTENT_LENGTH, "3"),
        ]);
        assert_eq!(block.get(CONTENT_LENGTH), Some("512"));
        assert_eq!(block.get(INNER_CONTENT_LENGTH), Some("3"));
        assert_eq!(block.len(), 4);
    }

    #[test]
    fn repeated_keys_overwrite_in_place() {
        let block = HeaderBlock::from_pairs([("A", "1"), ("B", "2"), ("A", "3")]);
        let pairs: Vec<_> = block.iter().collect();
        assert_eq!(pairs, vec![("A", "3"), ("B", "2")]);
    }

    #[test]
    fn held_block_keeps_accumulating() {
        let mut assembler = BlockAssembler::new();
        assert!(assembler.push_line("Content-Length: 80\n").is_none());
        assert!(assembler.push_line("Content-Type: text/event-plain\n").is_none());
        let meta = assembler.push_line("\n").expect("meta block");
        assembler.hold(meta);

        assert!(assembler.push_line("Event-Name: BACKGROUND_JOB\n").is_none());
        assert!(assembler.push_line("Content-Length: 3\n").is_none());
        let block = assembler.push_line("\n").expect("merged block");

        assert_eq!(block.get(CONTENT_LENGTH), Some("80"));
        assert_eq!(block.get(INNER_CONTENT_LENGTH), Some("3"));
        assert_eq!(block.event_name(), Some("BACKGROUND_JOB"));
    }

    #[test]
    fn serialised_blocks_parse_back_to_the_same_pairs() {
        let original = HeaderBlock::from_pairs([
            (CONTENT_LENGTH, "120"),
            (CONTENT_TYPE, "text/event-plain"),
            ("Caller-ID-Name", " Jane: 100% "),
            ("Empty", ""),
            ("Unicode", "Zoë"),
            (CONTENT_LENGTH, "3"),
        ]);

        let reparsed = assemble(&original.to_wire());

        assert_eq!(reparsed, vec![original]);
    }

    #[rstest]
    #[case(ConnectionState::Subscribed, Ok(Some(3)))]
    #[case(ConnectionState::Authed, Ok(None))]
    #[case(ConnectionState::Null, Ok(None))]
    fn body_is_only_pulled_while_subscribed(
        #[case] state: ConnectionState,
        #[case] expected: Result<Option<usize>, CodecError>,
    ) {
        let block = HeaderBlock::from_pairs([(CONTENT_LENGTH, "40"), (CONTENT_LENGTH, "3")]);
        assert_eq!(inner_body_length(&block, state), expected);
    }

    #[test]
    fn outer_length_alone_pulls_no_body() {
        let block = HeaderBlock::from_pairs([(CONTENT_LENGTH, "40")]);
        assert_eq!(
            inner_body_length(&block, ConnectionState::Subscribed),
            Ok(None)
        );
    }

    #[test]
    fn invalid_inner_length_is_reported() {
        let block = HeaderBlock::from_pairs([(CONTENT_LENGTH, "40"), (CONTENT_LENGTH, "lots")]);
        assert_eq!(
            inner_body_length(&block, ConnectionState::Subscribed),
            Err(CodecError::InvalidBodyLength {
                value: String::from("lots"),
            })
        );
    }

    #[rstest]
    #[case("18446744073709551615")]
    #[case("1000000000000")]
    fn oversized_inner_length_is_refused(#[case] declared: &str) {
        let block = HeaderBlock::from_pairs([(CONTENT_LENGTH, "40"), (CONTENT_LENGTH, declared)]);
        let error = inner_body_length(&block, ConnectionState::Subscribed)
            .expect_err("length above the ceiling");
        assert!(matches!(
            error,
            CodecError::BodyTooLarge {
                limit: MAX_BODY_LEN,
                ..
            }
        ));
    }

    #[test]
    fn length_at_the_ceiling_is_accepted() {
        let ceiling = MAX_BODY_LEN.to_string();
        let block =
            HeaderBlock::from_pairs([(CONTENT_LENGTH, "40"), (CONTENT_LENGTH, ceiling.as_str())]);
        assert_eq!(
            inner_body_length(&block, ConnectionState::Subscribed),
            Ok(Some(MAX_BODY_LEN))
        );
    }

    #[test]
    fn discarding_resumes_after_a_blank_line() {
        let mut assembler = BlockAssembler::new();
        assembler.push_line("Content-Type: text/event-plain\n");
        assembler.discard_through_blank_line();
        assert!(assembler.in_progress().is_empty());

        assert_eq!(assembler.push_line("-ERR stale: body\n"), None);
        assert_eq!(assembler.push_line("Content-Length: 12\n"), None);
        assert!(assembler.is_discarding());
        assert_eq!(assembler.push_line("\n"), None);
        assert!(!assembler.is_discarding());

        assembler.push_line("Event-Name: HEARTBEAT\n");
        let block = assembler.push_line("\n").expect("block after resync");
        assert_eq!(block.event_name(), Some("HEARTBEAT"));
        assert_eq!(block.len(), 1);
    }

    #[test]
    fn commands_are_framed_with_blank_lines() {
        assert_eq!(encode_command("bgapi status"), "bgapi status\n\n\n\n");
    }
}
