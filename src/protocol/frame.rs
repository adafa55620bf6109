//! Request Framing
//!
//! Two small pieces sit between the socket and the tokenizer:
//!
//! - [`frame_length`] scans a stream buffer and reports how many bytes the
//!   next complete request occupies. TCP is a stream, so a read can hold
//!   half a request or several of them; the connection handler only hands
//!   complete requests to the parser.
//! - [`FrameWriter`] builds request frames. It is used to serialize parsed
//!   commands and by the client-side request serializer.
//!
//! The scanner follows the same contract as an incremental parser:
//!
//! - `Ok(Some(n))` - a complete request of `n` bytes is buffered
//! - `Ok(None)` - need more data
//! - `Err(e)` - the framing is malformed

use crate::protocol::parser::{ParseError, ParseResult};
use crate::protocol::token::{symbol, TokenKind, CRLF};

/// Maximum size for a single bulk string (512 MB, same as Redis)
pub const MAX_BULK_SIZE: usize = 512 * 1024 * 1024;

/// Returns the byte length of the next complete request in `buf`.
///
/// A buffer that does not start with `*` holds an inline request, which
/// ends at the first CRLF.
pub fn frame_length(buf: &[u8]) -> ParseResult<Option<usize>> {
    if buf.is_empty() {
        return Ok(None);
    }

    if buf[0] != symbol::ARRAY {
        return Ok(find_crlf(buf).map(|pos| pos + 2));
    }

    let header_end = match find_crlf(&buf[1..]) {
        Some(pos) => pos,
        None => return Ok(None),
    };

    let count = parse_length(&buf[1..1 + header_end])?;
    if count < 0 {
        return Err(ParseError::InvalidLength(count.to_string()));
    }

    let mut consumed = 1 + header_end + 2;
    for _ in 0..count {
        match element_length(&buf[consumed..])? {
            Some(len) => consumed += len,
            None => return Ok(None),
        }
    }

    Ok(Some(consumed))
}

/// Length of one array element: a bulk string or a single-line typed frame.
fn element_length(buf: &[u8]) -> ParseResult<Option<usize>> {
    let prefix = match buf.first() {
        Some(&prefix) => prefix,
        None => return Ok(None),
    };

    match prefix {
        symbol::BULK_STRING => {
            let length_end = match find_crlf(&buf[1..]) {
                Some(pos) => pos,
                None => return Ok(None),
            };

            let length = parse_length(&buf[1..1 + length_end])?;
            if length < 0 {
                return Err(ParseError::InvalidLength(length.to_string()));
            }

            let length = length as usize;
            if length > MAX_BULK_SIZE {
                return Err(ParseError::MessageTooLarge {
                    size: length,
                    max: MAX_BULK_SIZE,
                });
            }

            let data_start = 1 + length_end + 2;
            let total_needed = data_start + length + 2;
            if buf.len() < total_needed {
                return Ok(None);
            }

            if &buf[data_start + length..total_needed] != CRLF.as_bytes() {
                return Err(ParseError::ProtocolError(
                    "bulk string missing trailing CRLF".to_string(),
                ));
            }

            Ok(Some(total_needed))
        }
        symbol::ARRAY => Err(ParseError::ProtocolError(
            "nested arrays are not supported".to_string(),
        )),
        _ if TokenKind::from_symbol(prefix).is_some() => {
            Ok(find_crlf(&buf[1..]).map(|pos| 1 + pos + 2))
        }
        _ => Err(ParseError::ProtocolError(format!(
            "unexpected byte {:#04x} at start of element",
            prefix
        ))),
    }
}

fn parse_length(digits: &[u8]) -> ParseResult<i64> {
    std::str::from_utf8(digits)
        .ok()
        .and_then(|s| s.parse::<i64>().ok())
        .ok_or_else(|| ParseError::InvalidLength(String::from_utf8_lossy(digits).into_owned()))
}

/// Finds the position of CRLF in the buffer.
///
/// Returns the position of `\r` if found, or None if CRLF is not present.
#[inline]
pub fn find_crlf(buf: &[u8]) -> Option<usize> {
    buf.windows(2).position(|w| w == CRLF.as_bytes())
}

/// Picks the typed frame for a bare numeric literal.
pub fn number_kind(literal: &str) -> TokenKind {
    if literal.contains('.') {
        TokenKind::Float
    } else if literal.len() >= 10 {
        TokenKind::BigInt
    } else {
        TokenKind::Integer
    }
}

/// Builds a request frame: `*<n>\r\n` followed by `n` elements.
#[derive(Debug, Default, Clone)]
pub struct FrameWriter {
    body: String,
    len: usize,
}

impl FrameWriter {
    pub fn new() -> Self {
        Self::default()
    }

    fn line(&mut self, prefix: u8, literal: &str) -> &mut Self {
        self.body.push(prefix as char);
        self.body.push_str(literal);
        self.body.push_str(CRLF);
        self.len += 1;
        self
    }

    /// `$<len>\r\n<word>\r\n`
    pub fn bulk(&mut self, word: &str) -> &mut Self {
        self.body.push(symbol::BULK_STRING as char);
        self.body.push_str(&word.len().to_string());
        self.body.push_str(CRLF);
        self.body.push_str(word);
        self.body.push_str(CRLF);
        self.len += 1;
        self
    }

    pub fn integer(&mut self, literal: &str) -> &mut Self {
        self.line(symbol::INTEGER, literal)
    }

    pub fn big_integer(&mut self, literal: &str) -> &mut Self {
        self.line(symbol::BIG_INT, literal)
    }

    pub fn float(&mut self, literal: &str) -> &mut Self {
        self.line(symbol::FLOAT, literal)
    }

    pub fn boolean(&mut self, value: bool) -> &mut Self {
        self.line(symbol::BOOLEAN, if value { "t" } else { "f" })
    }

    /// Writes a bare number with the frame [`number_kind`] picks for it.
    pub fn number(&mut self, literal: &str) -> &mut Self {
        match number_kind(literal) {
            TokenKind::Float => self.float(literal),
            TokenKind::BigInt => self.big_integer(literal),
            _ => self.integer(literal),
        }
    }

    /// Number of elements written so far
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Prepends the array header and returns the finished frame.
    pub fn finish(self) -> String {
        let mut frame = String::with_capacity(self.body.len() + 8);
        frame.push(symbol::ARRAY as char);
        frame.push_str(&self.len.to_string());
        frame.push_str(CRLF);
        frame.push_str(&self.body);
        frame
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_complete_request() {
        let input = b"*2\r\n$3\r\nGET\r\n$5\r\nmykey\r\n";
        assert_eq!(frame_length(input).unwrap(), Some(input.len()));
    }

    #[test]
    fn test_typed_elements() {
        let input = b"*5\r\n$3\r\nSET\r\n$3\r\nkey\r\n:1\r\n$2\r\nEX\r\n:1\r\n";
        assert_eq!(frame_length(input).unwrap(), Some(input.len()));

        let input = b"*3\r\n$3\r\nSET\r\n$3\r\nkey\r\n#t\r\n";
        assert_eq!(frame_length(input).unwrap(), Some(input.len()));
    }

    #[test]
    fn test_incomplete_request() {
        assert_eq!(frame_length(b"").unwrap(), None);
        assert_eq!(frame_length(b"*2\r\n$3\r\nGET\r\n").unwrap(), None);
        assert_eq!(frame_length(b"*2\r\n$3\r\nGET\r\n$5\r\nmyk").unwrap(), None);
        assert_eq!(frame_length(b"*2").unwrap(), None);
    }

    #[test]
    fn test_pipelined_requests() {
        let first = b"*2\r\n$3\r\nGET\r\n$1\r\na\r\n";
        let mut buf = first.to_vec();
        buf.extend_from_slice(b"*2\r\n$3\r\nGET\r\n$1\r\nb\r\n");
        assert_eq!(frame_length(&buf).unwrap(), Some(first.len()));
    }

    #[test]
    fn test_inline_request() {
        assert_eq!(frame_length(b"GET key\r\nGET").unwrap(), Some(9));
        assert_eq!(frame_length(b"GET key").unwrap(), None);
    }

    #[test]
    fn test_malformed_framing() {
        assert!(matches!(
            frame_length(b"*x\r\n"),
            Err(ParseError::InvalidLength(_))
        ));
        assert!(matches!(
            frame_length(b"*1\r\n$-3\r\n"),
            Err(ParseError::InvalidLength(_))
        ));
        assert!(matches!(
            frame_length(b"*1\r\n$3\r\nGETXX"),
            Err(ParseError::ProtocolError(_))
        ));
        assert!(matches!(
            frame_length(b"*1\r\n*1\r\n"),
            Err(ParseError::ProtocolError(_))
        ));
        assert!(matches!(
            frame_length(b"*1\r\n$999999999999\r\n"),
            Err(ParseError::MessageTooLarge { .. })
        ));
    }

    #[test]
    fn test_writer() {
        let mut w = FrameWriter::new();
        w.bulk("SET").bulk("key").number("123.5");
        assert_eq!(w.len(), 3);
        assert_eq!(w.finish(), "*3\r\n$3\r\nSET\r\n$3\r\nkey\r\n,123.5\r\n");
    }

    #[test]
    fn test_number_kind() {
        assert_eq!(number_kind("20"), TokenKind::Integer);
        assert_eq!(number_kind("-20"), TokenKind::Integer);
        assert_eq!(number_kind("123.123"), TokenKind::Float);
        assert_eq!(number_kind("123123123123123"), TokenKind::BigInt);
    }
}
