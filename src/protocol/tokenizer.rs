//! Request Tokenizer
//!
//! Turns a raw request buffer into a lazy stream of [`Token`]s. The
//! tokenizer is context-free except for one thing: once it has produced a
//! bulk string header (`$`, a length, CRLF) it reads the next token as
//! exactly that many raw bytes. This keeps payloads such as `user:101` or
//! `hello world` intact while still handing the parser one token per frame
//! element.
//!
//! ```text
//!   *2\r\n$3\r\nGET\r\n$5\r\nmykey\r\n
//!   │ │ │  │ │ │  │  │  │ │ │   │   │
//!   │ │ │  │ │ │  │  │  │ │ │   │   └ CRLF
//!   │ │ │  │ │ │  │  │  │ │ │   └──── IDENT "mykey" (5 raw bytes)
//!   │ │ │  │ │ │  │  │  │ │ └──────── CRLF
//!   │ │ │  │ │ │  │  │  │ └────────── NUMBER "5"
//!   │ │ │  │ │ │  │  │  └──────────── BULKSTRING
//!   │ │ │  │ │ │  │  └─────────────── CRLF
//!   │ │ │  │ │ │  └────────────────── GET (3 raw bytes, keyword lookup)
//!   │ │ │  │ │ └───────────────────── CRLF
//!   │ │ │  │ └─────────────────────── NUMBER "3"
//!   │ │ │  └────────────────────────── BULKSTRING
//!   │ │ └──────────────────────────── CRLF
//!   │ └────────────────────────────── NUMBER "2"
//!   └──────────────────────────────── ARRAY
//! ```
//!
//! Tokenization never fails: malformed input yields an `Illegal` token and
//! the parser reports it. Once the input is exhausted every further call
//! returns `Eof`.

use crate::protocol::token::{Token, TokenKind, CRLF};
use bytes::Bytes;

/// Tracks how far into a bulk string header the tokenizer is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BulkState {
    Idle,
    /// Saw `$`
    Header,
    /// Saw `$` and a length
    Length(usize),
    /// Saw the header CRLF; the next token is `n` raw bytes
    Payload(usize),
}

/// A reusable tokenizer over one request buffer.
#[derive(Debug, Clone)]
pub struct Tokenizer {
    input: Bytes,
    position: usize,
    bulk: BulkState,
}

impl Tokenizer {
    pub fn new(input: impl Into<Bytes>) -> Self {
        Self {
            input: input.into(),
            position: 0,
            bulk: BulkState::Idle,
        }
    }

    /// Points the tokenizer at a new buffer, so one instance can serve every
    /// request on a connection.
    pub fn reset(&mut self, input: impl Into<Bytes>) {
        self.input = input.into();
        self.position = 0;
        self.bulk = BulkState::Idle;
    }

    /// Returns the next token from the input.
    pub fn next_token(&mut self) -> Token {
        if let BulkState::Payload(len) = self.bulk {
            self.bulk = BulkState::Idle;
            return self.read_payload(len);
        }

        let token = self.scan();

        self.bulk = match (self.bulk, token.kind) {
            (_, TokenKind::BulkString) => BulkState::Header,
            (BulkState::Header, TokenKind::Number) => match token.literal.parse::<usize>() {
                Ok(len) => BulkState::Length(len),
                Err(_) => BulkState::Idle,
            },
            (BulkState::Length(len), TokenKind::Crlf) => BulkState::Payload(len),
            _ => BulkState::Idle,
        };

        token
    }

    fn scan(&mut self) -> Token {
        self.skip_whitespace();

        let ch = match self.current() {
            Some(ch) => ch,
            None => return Token::eof(),
        };

        match ch {
            b'\r' => {
                if self.peek() == Some(b'\n') {
                    self.position += 2;
                    Token::new(TokenKind::Crlf, CRLF)
                } else {
                    self.position += 1;
                    Token::new(TokenKind::Illegal, "\r")
                }
            }
            b'"' => self.read_text(),
            b'-' if self.peek().is_some_and(|c| c.is_ascii_digit()) => self.read_number(),
            _ if ch.is_ascii_alphabetic() => self.read_identifier(),
            _ if ch.is_ascii_digit() => self.read_number(),
            _ => {
                self.position += 1;
                match TokenKind::from_symbol(ch) {
                    Some(kind) => Token::new(kind, (ch as char).to_string()),
                    None => Token::new(TokenKind::Illegal, self.escaped(self.position - 1, self.position)),
                }
            }
        }
    }

    #[inline]
    fn current(&self) -> Option<u8> {
        self.input.get(self.position).copied()
    }

    #[inline]
    fn peek(&self) -> Option<u8> {
        self.input.get(self.position + 1).copied()
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.current(), Some(b' ' | b'\t' | b'\n')) {
            self.position += 1;
        }
    }

    /// Printable form of raw bytes, for `Illegal` literals.
    fn escaped(&self, start: usize, end: usize) -> String {
        self.input[start..end].escape_ascii().to_string()
    }

    /// The bytes as text, or `None` when they are not valid UTF-8.
    fn utf8(&self, start: usize, end: usize) -> Option<String> {
        std::str::from_utf8(&self.input[start..end])
            .ok()
            .map(str::to_owned)
    }

    /// A word token (keyword or `Ident`), or `Illegal` for invalid UTF-8.
    fn word(&self, start: usize, end: usize) -> Token {
        match self.utf8(start, end) {
            Some(literal) => Token::new(TokenKind::lookup_ident(&literal), literal),
            None => Token::new(TokenKind::Illegal, self.escaped(start, end)),
        }
    }

    fn read_identifier(&mut self) -> Token {
        let start = self.position;
        while self
            .current()
            .is_some_and(|c| c.is_ascii_alphanumeric() || c == b'_')
        {
            self.position += 1;
        }

        self.word(start, self.position)
    }

    fn read_number(&mut self) -> Token {
        let start = self.position;
        if self.current() == Some(b'-') {
            self.position += 1;
        }

        let mut dots = 0;
        while let Some(c) = self.current() {
            match c {
                b'0'..=b'9' => {}
                b'.' => dots += 1,
                _ => break,
            }
            self.position += 1;
        }

        // Only ASCII digits, '-' and '.' were consumed
        let literal = self.escaped(start, self.position);
        if dots > 1 || literal.ends_with('.') {
            return Token::new(TokenKind::Illegal, literal);
        }

        Token::new(TokenKind::Number, literal)
    }

    fn read_text(&mut self) -> Token {
        let start = self.position + 1;
        match self.input[start..].iter().position(|&c| c == b'"') {
            Some(len) => {
                self.position = start + len + 1;
                match self.utf8(start, start + len) {
                    Some(literal) => Token::new(TokenKind::Text, literal),
                    None => Token::new(TokenKind::Illegal, self.escaped(start, start + len)),
                }
            }
            None => {
                let literal = self.escaped(self.position, self.input.len());
                self.position = self.input.len();
                Token::new(TokenKind::Illegal, literal)
            }
        }
    }

    fn read_payload(&mut self, len: usize) -> Token {
        let start = self.position;
        let end = match start.checked_add(len) {
            Some(end) if end <= self.input.len() => end,
            _ => {
                self.position = self.input.len();
                return Token::new(TokenKind::Illegal, self.escaped(start, self.input.len()));
            }
        };

        self.position = end;
        self.word(start, end)
    }
}

impl Iterator for Tokenizer {
    type Item = Token;

    /// Yields tokens up to, not including, `Eof`.
    fn next(&mut self) -> Option<Token> {
        let token = self.next_token();
        if token.is(TokenKind::Eof) {
            None
        } else {
            Some(token)
        }
    }
}
