//! Recursive-Descent Command Parser
//!
//! Consumes the token stream of one request and builds a single
//! [`Command`]. The grammar, left to right:
//!
//! ```text
//! request  = "*" NUMBER CRLF word args
//! word     = "$" NUMBER CRLF (IDENT | keyword) CRLF
//! value    = "#" ("t" | "f") CRLF
//!          | word
//!          | (":" | "(" | ",") NUMBER CRLF
//! integer  = (":" | "(") NUMBER CRLF | word            ; word holding digits
//! ```
//!
//! Per command:
//!
//! - `GET | GETDEL | INCR | DECR | EXISTS | STRLEN  key`
//! - `SET key value { EX integer | NX | XX }`
//! - `GETSET | APPEND  key value`
//! - `GETEX key EX integer`
//! - `INCRBY | DECRBY  key integer`
//! - `MGET | DEL  key { key }`
//! - `MSET key value { key value }`
//!
//! There is no recovery: the first unexpected token aborts the parse with
//! an error naming what was expected and what was found. The number of
//! elements declared in the array header must match the number consumed.
//!
//! The parser keeps two tokens of lookahead and can be [`reset`] onto a new
//! buffer, so a connection reuses one instance for all of its requests.
//!
//! [`reset`]: Parser::reset

use crate::protocol::ast::{Command, Expression};
use crate::protocol::token::{Token, TokenKind};
use crate::protocol::tokenizer::Tokenizer;
use bytes::Bytes;
use std::fmt::Display;
use std::str::FromStr;
use thiserror::Error;

/// Errors raised while framing or parsing a request.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ParseError {
    /// A token of the wrong kind
    #[error("token expected={expected}. got={got} ({literal:?})")]
    UnexpectedToken {
        expected: TokenKind,
        got: TokenKind,
        literal: String,
    },

    /// The tokenizer could not make sense of the input
    #[error("illegal token {0:?}")]
    IllegalToken(String),

    #[error("value expected (BOOLEAN, BULKSTRING, INTEGER, BIGINT or FLOAT). got={got} ({literal:?})")]
    ExpectedValue { got: TokenKind, literal: String },

    #[error("unknown command {0:?}")]
    UnknownCommand(String),

    /// A known keyword with no command behind it
    #[error("command not supported. got={0:?}")]
    UnsupportedCommand(String),

    #[error("invalid number {literal:?}: {reason}")]
    InvalidNumber { literal: String, reason: String },

    #[error("boolean expected 't' or 'f'. got={0:?}")]
    InvalidBoolean(String),

    #[error("unrecognized modifier {0:?}")]
    InvalidModifier(String),

    #[error("flags NX and XX are mutually exclusive")]
    ConflictingFlags,

    #[error("EX must be at least 1. got={0}")]
    InvalidExpiry(i64),

    #[error("array declared {declared} elements but the request has {actual}")]
    ArrayLengthMismatch { declared: usize, actual: usize },

    #[error("wrong number of arguments for '{0}' command")]
    MissingArguments(&'static str),

    /// Array or bulk length that is not a valid count
    #[error("invalid length: {0}")]
    InvalidLength(String),

    /// Framing violation (missing CRLF, nested array, ...)
    #[error("protocol error: {0}")]
    ProtocolError(String),

    #[error("message too large: {size} bytes (max: {max})")]
    MessageTooLarge { size: usize, max: usize },
}

/// Result type for parsing operations.
pub type ParseResult<T> = Result<T, ParseError>;

/// Parses one request frame into a command.
#[derive(Debug)]
pub struct Parser {
    tokenizer: Tokenizer,
    cur: Token,
    peek: Token,
    /// Array elements consumed so far
    elements: usize,
}

impl Parser {
    pub fn new(input: impl Into<Bytes>) -> Self {
        let mut tokenizer = Tokenizer::new(input);
        let cur = tokenizer.next_token();
        let peek = tokenizer.next_token();

        Self {
            tokenizer,
            cur,
            peek,
            elements: 0,
        }
    }

    /// Rewinds the parser onto a new request buffer.
    pub fn reset(&mut self, input: impl Into<Bytes>) {
        self.tokenizer.reset(input);
        self.cur = self.tokenizer.next_token();
        self.peek = self.tokenizer.next_token();
        self.elements = 0;
    }

    /// Parses the buffered request.
    pub fn parse(&mut self) -> ParseResult<Command> {
        self.elements = 0;
        let declared = self.parse_array_header()?;
        let word = self.parse_word()?;

        let command = match word.kind {
            TokenKind::Get => Command::Get {
                key: self.parse_key()?,
            },
            TokenKind::Set => self.parse_set()?,
            TokenKind::GetSet => {
                let key = self.parse_key()?;
                let value = self.parse_value()?;
                Command::GetSet { key, value }
            }
            TokenKind::GetEx => self.parse_getex()?,
            TokenKind::GetDel => Command::GetDel {
                key: self.parse_key()?,
            },
            TokenKind::Incr => Command::Incr {
                key: self.parse_key()?,
            },
            TokenKind::IncrBy => {
                let key = self.parse_key()?;
                let increment = self.parse_integer_arg()?;
                Command::IncrBy { key, increment }
            }
            TokenKind::Decr => Command::Decr {
                key: self.parse_key()?,
            },
            TokenKind::DecrBy => {
                let key = self.parse_key()?;
                let decrement = self.parse_integer_arg()?;
                Command::DecrBy { key, decrement }
            }
            TokenKind::Exists => Command::Exists {
                key: self.parse_key()?,
            },
            TokenKind::MGet => Command::MGet {
                keys: self.parse_keys("MGET")?,
            },
            TokenKind::MSet => self.parse_mset()?,
            TokenKind::Append => {
                let key = self.parse_key()?;
                let value = self.parse_value()?;
                Command::Append { key, value }
            }
            TokenKind::Strlen => Command::Strlen {
                key: self.parse_key()?,
            },
            TokenKind::Del => Command::Del {
                keys: self.parse_keys("DEL")?,
            },
            TokenKind::Substr | TokenKind::Config => {
                return Err(ParseError::UnsupportedCommand(word.literal))
            }
            _ => return Err(ParseError::UnknownCommand(word.literal)),
        };

        if !self.cur.is(TokenKind::Eof) {
            return Err(self.unexpected(TokenKind::Eof));
        }

        if self.elements != declared {
            return Err(ParseError::ArrayLengthMismatch {
                declared,
                actual: self.elements,
            });
        }

        Ok(command)
    }

    /// Moves one token forward and returns the token that was current.
    fn bump(&mut self) -> Token {
        let next = self.tokenizer.next_token();
        let peek = std::mem::replace(&mut self.peek, next);
        std::mem::replace(&mut self.cur, peek)
    }

    fn expect(&mut self, kind: TokenKind) -> ParseResult<Token> {
        if self.cur.is(kind) {
            Ok(self.bump())
        } else {
            Err(self.unexpected(kind))
        }
    }

    fn unexpected(&self, expected: TokenKind) -> ParseError {
        if self.cur.is(TokenKind::Illegal) {
            return ParseError::IllegalToken(self.cur.literal.clone());
        }

        ParseError::UnexpectedToken {
            expected,
            got: self.cur.kind,
            literal: self.cur.literal.clone(),
        }
    }

    /// `*<n>\r\n`
    fn parse_array_header(&mut self) -> ParseResult<usize> {
        self.expect(TokenKind::Array)?;
        let count = self.expect(TokenKind::Number)?;
        self.expect(TokenKind::Crlf)?;

        count
            .literal
            .parse::<usize>()
            .map_err(|_| ParseError::InvalidLength(count.literal))
    }

    /// `$<len>\r\n<word>\r\n`, returning the word token.
    fn parse_word(&mut self) -> ParseResult<Token> {
        self.expect(TokenKind::BulkString)?;
        let len = self.expect(TokenKind::Number)?;
        if len.literal.parse::<usize>().is_err() {
            return Err(ParseError::InvalidLength(len.literal));
        }
        self.expect(TokenKind::Crlf)?;

        if !self.cur.kind.is_word() {
            return Err(self.unexpected(TokenKind::Ident));
        }

        let word = self.bump();
        self.expect(TokenKind::Crlf)?;
        self.elements += 1;

        Ok(word)
    }

    fn parse_key(&mut self) -> ParseResult<String> {
        self.parse_word().map(|token| token.literal)
    }

    fn parse_keys(&mut self, command: &'static str) -> ParseResult<Vec<String>> {
        if self.cur.is(TokenKind::Eof) {
            return Err(ParseError::MissingArguments(command));
        }

        let mut keys = Vec::new();
        while !self.cur.is(TokenKind::Eof) {
            keys.push(self.parse_key()?);
        }

        Ok(keys)
    }

    /// `<symbol><number>\r\n`, returning the number token.
    fn parse_typed_number(&mut self) -> ParseResult<Token> {
        self.bump();
        let number = self.expect(TokenKind::Number)?;
        self.expect(TokenKind::Crlf)?;
        self.elements += 1;

        Ok(number)
    }

    fn parse_value(&mut self) -> ParseResult<Expression> {
        match self.cur.kind {
            TokenKind::Boolean => {
                if !self.peek.is(TokenKind::Ident) {
                    return Err(ParseError::InvalidBoolean(self.peek.literal.clone()));
                }

                self.bump();
                let token = self.bump();
                let value = match token.literal.as_str() {
                    "t" => true,
                    "f" => false,
                    _ => return Err(ParseError::InvalidBoolean(token.literal)),
                };
                self.expect(TokenKind::Crlf)?;
                self.elements += 1;

                Ok(Expression::Boolean { token, value })
            }
            TokenKind::BulkString => Ok(Expression::String {
                token: self.parse_word()?,
            }),
            TokenKind::Integer => {
                let token = self.parse_typed_number()?;
                let value = parse_number(&token)?;
                Ok(Expression::Integer { token, value })
            }
            TokenKind::BigInt => {
                let token = self.parse_typed_number()?;
                let value = parse_number(&token)?;
                Ok(Expression::BigInteger { token, value })
            }
            TokenKind::Float => {
                let token = self.parse_typed_number()?;
                let value = parse_number(&token)?;
                Ok(Expression::Float { token, value })
            }
            TokenKind::Illegal => Err(ParseError::IllegalToken(self.cur.literal.clone())),
            got => Err(ParseError::ExpectedValue {
                got,
                literal: self.cur.literal.clone(),
            }),
        }
    }

    /// An integer argument: a typed integer frame or a bulk word of digits.
    fn parse_integer_arg(&mut self) -> ParseResult<i64> {
        let token = match self.cur.kind {
            TokenKind::Integer | TokenKind::BigInt => self.parse_typed_number()?,
            TokenKind::BulkString => self.parse_word()?,
            _ => return Err(self.unexpected(TokenKind::Integer)),
        };

        parse_number(&token)
    }

    fn parse_set(&mut self) -> ParseResult<Command> {
        let key = self.parse_key()?;
        let value = self.parse_value()?;

        let mut ex = None;
        let mut nx = false;
        let mut xx = false;

        while !self.cur.is(TokenKind::Eof) {
            let modifier = self.parse_word()?;
            match modifier.kind {
                TokenKind::Ex => {
                    let ticks = self.parse_integer_arg()?;
                    if ticks < 1 {
                        return Err(ParseError::InvalidExpiry(ticks));
                    }
                    ex = Some(ticks);
                }
                TokenKind::Nx => nx = true,
                TokenKind::Xx => xx = true,
                _ => return Err(ParseError::InvalidModifier(modifier.literal)),
            }
        }

        if nx && xx {
            return Err(ParseError::ConflictingFlags);
        }

        Ok(Command::Set {
            key,
            value,
            ex,
            nx,
            xx,
        })
    }

    fn parse_getex(&mut self) -> ParseResult<Command> {
        let key = self.parse_key()?;

        if self.cur.is(TokenKind::Eof) {
            return Err(ParseError::MissingArguments("GETEX"));
        }

        let modifier = self.parse_word()?;
        if !modifier.is(TokenKind::Ex) {
            return Err(ParseError::UnexpectedToken {
                expected: TokenKind::Ex,
                got: modifier.kind,
                literal: modifier.literal,
            });
        }

        let ex = self.parse_integer_arg()?;
        Ok(Command::GetEx { key, ex })
    }

    fn parse_mset(&mut self) -> ParseResult<Command> {
        if self.cur.is(TokenKind::Eof) {
            return Err(ParseError::MissingArguments("MSET"));
        }

        let mut pairs = Vec::new();
        while !self.cur.is(TokenKind::Eof) {
            let key = self.parse_key()?;
            if self.cur.is(TokenKind::Eof) {
                return Err(ParseError::MissingArguments("MSET"));
            }
            pairs.push((key, self.parse_value()?));
        }

        Ok(Command::MSet { pairs })
    }
}

fn parse_number<T>(token: &Token) -> ParseResult<T>
where
    T: FromStr,
    T::Err: Display,
{
    token
        .literal
        .parse::<T>()
        .map_err(|e| ParseError::InvalidNumber {
            literal: token.literal.clone(),
            reason: e.to_string(),
        })
}

/// Parses a single request frame.
pub fn parse_command(input: impl Into<Bytes>) -> ParseResult<Command> {
    Parser::new(input).parse()
}
