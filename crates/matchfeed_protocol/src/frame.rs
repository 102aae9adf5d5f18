//! Text frame codec.
//!
//! A frame is a command line, zero or more `key:value` header lines, a blank
//! line and a free-form body. On the wire every frame is followed by a single
//! [`FRAME_TERMINATOR`] byte, which the transport appends and strips.

use crate::error::{ProtocolError, ProtocolResult};

/// Byte that terminates a frame on the wire.
pub const FRAME_TERMINATOR: u8 = 0;

/// An untyped frame: command keyword, ordered headers and body.
///
/// Headers keep the order in which they were written or read, and duplicate
/// keys are preserved. [`RawFrame::header`] returns the first occurrence.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RawFrame {
    /// Command keyword (`CONNECT`, `MESSAGE`, ...).
    pub command: String,
    /// Header pairs in wire order.
    pub headers: Vec<(String, String)>,
    /// Frame body, empty when absent.
    pub body: String,
}

impl RawFrame {
    /// Creates a frame with no headers and an empty body.
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            headers: Vec::new(),
            body: String::new(),
        }
    }

    /// Appends a header.
    pub fn with_header(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.headers.push((key.into(), value.to_string()));
        self
    }

    /// Sets the body.
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// Returns the value of the first header named `key`.
    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Encodes the frame to text, without the terminator byte.
    pub fn encode(&self) -> String {
        let headers_len: usize = self
            .headers
            .iter()
            .map(|(k, v)| k.len() + v.len() + 2)
            .sum();
        let mut out = String::with_capacity(self.command.len() + headers_len + self.body.len() + 2);

        out.push_str(&self.command);
        out.push('\n');
        for (key, value) in &self.headers {
            out.push_str(key);
            out.push(':');
            out.push_str(value);
            out.push('\n');
        }
        out.push('\n');
        out.push_str(&self.body);
        out
    }

    /// Decodes a frame from text.
    ///
    /// Leading blank lines are skipped, trailing terminator bytes and CRLF
    /// line endings are tolerated. Header lines without a `:` are ignored.
    /// The body is everything after the first blank line, verbatim, so a
    /// body may itself contain blank lines.
    pub fn decode(text: &str) -> ProtocolResult<Self> {
        let text = text.trim_end_matches(char::from(FRAME_TERMINATOR));
        let unix;
        let text = if text.contains('\r') {
            unix = text.replace("\r\n", "\n");
            unix.as_str()
        } else {
            text
        };

        let mut command: Option<String> = None;
        let mut headers = Vec::new();
        let mut body_start = text.len();
        let mut offset = 0;

        for line in text.split_inclusive('\n') {
            offset += line.len();
            let trimmed = line.trim();

            if command.is_none() {
                if !trimmed.is_empty() {
                    command = Some(trimmed.to_string());
                }
                continue;
            }

            if trimmed.is_empty() {
                body_start = offset;
                break;
            }

            if let Some((key, value)) = trimmed.split_once(':') {
                headers.push((key.trim().to_string(), value.trim().to_string()));
            }
        }

        let command = command.ok_or(ProtocolError::EmptyFrame)?;

        Ok(Self {
            command,
            headers,
            body: text[body_start..].to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn encode_layout() {
        let frame = RawFrame::new("SUBSCRIBE")
            .with_header("destination", "/germany_japan")
            .with_header("id", 17)
            .with_header("receipt", 73);

        assert_eq!(
            frame.encode(),
            "SUBSCRIBE\ndestination:/germany_japan\nid:17\nreceipt:73\n\n"
        );
    }

    #[test]
    fn decode_tolerates_whitespace_and_terminator() {
        let text = "\n  RECEIPT  \r\n receipt-id : 12 \r\n\r\n\0";
        let frame = RawFrame::decode(text).unwrap();

        assert_eq!(frame.command, "RECEIPT");
        assert_eq!(frame.header("receipt-id"), Some("12"));
        assert_eq!(frame.body, "");
    }

    #[test]
    fn decode_keeps_blank_lines_in_body() {
        let text = "MESSAGE\ndestination:/a\n\nfirst\n\nsecond\n";
        let frame = RawFrame::decode(text).unwrap();

        assert_eq!(frame.body, "first\n\nsecond\n");
    }

    #[test]
    fn decode_without_blank_line_has_empty_body() {
        let frame = RawFrame::decode("CONNECTED\nversion:1.2").unwrap();
        assert_eq!(frame.header("version"), Some("1.2"));
        assert!(frame.body.is_empty());
    }

    #[test]
    fn decode_preserves_duplicate_headers_in_order() {
        let frame = RawFrame::decode("ERROR\nmessage:first\nbogus line\nmessage:second\n\n").unwrap();

        assert_eq!(
            frame.headers,
            vec![
                ("message".to_string(), "first".to_string()),
                ("message".to_string(), "second".to_string()),
            ]
        );
        assert_eq!(frame.header("message"), Some("first"));
    }

    #[test]
    fn decode_empty_input_fails() {
        assert_eq!(RawFrame::decode(" \n\n\0"), Err(ProtocolError::EmptyFrame));
    }

    proptest! {
        #[test]
        fn decode_reads_back_encoded_frames(
            command in "[A-Z]{1,12}",
            headers in prop::collection::vec(("[a-z][a-z-]{0,11}", "[a-zA-Z0-9/_.:-]{0,16}"), 0..6),
            body in "[ -~\n]{0,64}",
        ) {
            let frame = RawFrame { command, headers, body };
            let decoded = RawFrame::decode(&frame.encode()).unwrap();
            prop_assert_eq!(decoded, frame);
        }
    }
}
