//! Command and Value Nodes
//!
//! The parser produces exactly one [`Command`] per request. Value literals
//! inside a command are [`Expression`]s; each keeps the token it was read
//! from so error messages and re-serialization can refer back to the input.
//!
//! A command renders two ways:
//!
//! - `Display` gives the inline form typed at the client prompt
//!   (`SET key :1 EX 5 NX`). Feeding it to the request serializer yields
//!   the wire frame again.
//! - [`Command::to_frame`] gives the wire frame itself.

use crate::protocol::frame::FrameWriter;
use crate::protocol::token::{Token, TokenKind};
use std::fmt;

/// A value literal.
#[derive(Debug, Clone)]
pub enum Expression {
    /// `:n`, a machine-size integer
    Integer { token: Token, value: isize },
    /// `(n`, a 64-bit integer
    BigInteger { token: Token, value: i64 },
    /// `,f`
    Float { token: Token, value: f64 },
    /// `#t` / `#f`
    Boolean { token: Token, value: bool },
    /// A bulk string; the value is the token literal
    String { token: Token },
}

impl Expression {
    pub fn integer(value: isize) -> Self {
        Expression::Integer {
            token: Token::new(TokenKind::Number, value.to_string()),
            value,
        }
    }

    pub fn big_integer(value: i64) -> Self {
        Expression::BigInteger {
            token: Token::new(TokenKind::Number, value.to_string()),
            value,
        }
    }

    pub fn float(value: f64) -> Self {
        Expression::Float {
            token: Token::new(TokenKind::Number, value.to_string()),
            value,
        }
    }

    pub fn boolean(value: bool) -> Self {
        let literal = if value { "t" } else { "f" };
        Expression::Boolean {
            token: Token::new(TokenKind::Ident, literal),
            value,
        }
    }

    pub fn string(value: impl Into<String>) -> Self {
        Expression::String {
            token: Token::new(TokenKind::Ident, value),
        }
    }

    /// The token this expression was read from.
    pub fn token(&self) -> &Token {
        match self {
            Expression::Integer { token, .. }
            | Expression::BigInteger { token, .. }
            | Expression::Float { token, .. }
            | Expression::Boolean { token, .. }
            | Expression::String { token } => token,
        }
    }

    pub fn token_literal(&self) -> &str {
        &self.token().literal
    }

    /// Writes this literal as a typed frame element.
    pub fn write_frame(&self, writer: &mut FrameWriter) {
        match self {
            Expression::Integer { value, .. } => writer.integer(&value.to_string()),
            Expression::BigInteger { value, .. } => writer.big_integer(&value.to_string()),
            Expression::Float { value, .. } => writer.float(&value.to_string()),
            Expression::Boolean { value, .. } => writer.boolean(*value),
            Expression::String { token } => writer.bulk(&token.literal),
        };
    }
}

/// Literals compare by value; token spelling is not significant.
impl PartialEq for Expression {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Expression::Integer { value: a, .. }, Expression::Integer { value: b, .. }) => a == b,
            (Expression::BigInteger { value: a, .. }, Expression::BigInteger { value: b, .. }) => {
                a == b
            }
            (Expression::Float { value: a, .. }, Expression::Float { value: b, .. }) => a == b,
            (Expression::Boolean { value: a, .. }, Expression::Boolean { value: b, .. }) => a == b,
            (Expression::String { token: a }, Expression::String { token: b }) => {
                a.literal == b.literal
            }
            _ => false,
        }
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Integer { value, .. } => write!(f, ":{}", value),
            Expression::BigInteger { value, .. } => write!(f, "({}", value),
            Expression::Float { value, .. } => write!(f, ",{}", value),
            Expression::Boolean { value, .. } => write!(f, "#{}", if *value { 't' } else { 'f' }),
            Expression::String { token } => write!(f, "\"{}\"", token.literal),
        }
    }
}

/// A parsed request.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// `GET key`
    Get { key: String },
    /// `SET key value [EX n] [NX|XX]`
    Set {
        key: String,
        value: Expression,
        /// Time-to-live in scheduler ticks, always >= 1 when present
        ex: Option<i64>,
        nx: bool,
        xx: bool,
    },
    /// `GETSET key value`
    GetSet { key: String, value: Expression },
    /// `GETEX key EX n`
    GetEx { key: String, ex: i64 },
    /// `GETDEL key`
    GetDel { key: String },
    /// `INCR key`
    Incr { key: String },
    /// `INCRBY key n`
    IncrBy { key: String, increment: i64 },
    /// `DECR key`
    Decr { key: String },
    /// `DECRBY key n`
    DecrBy { key: String, decrement: i64 },
    /// `EXISTS key`
    Exists { key: String },
    /// `MGET key [key ...]`
    MGet { keys: Vec<String> },
    /// `MSET key value [key value ...]`
    MSet { pairs: Vec<(String, Expression)> },
    /// `APPEND key value`
    Append { key: String, value: Expression },
    /// `STRLEN key`
    Strlen { key: String },
    /// `DEL key [key ...]`
    Del { keys: Vec<String> },
}

impl Command {
    /// The command word, as it appears on the wire.
    pub fn name(&self) -> &'static str {
        match self {
            Command::Get { .. } => "GET",
            Command::Set { .. } => "SET",
            Command::GetSet { .. } => "GETSET",
            Command::GetEx { .. } => "GETEX",
            Command::GetDel { .. } => "GETDEL",
            Command::Incr { .. } => "INCR",
            Command::IncrBy { .. } => "INCRBY",
            Command::Decr { .. } => "DECR",
            Command::DecrBy { .. } => "DECRBY",
            Command::Exists { .. } => "EXISTS",
            Command::MGet { .. } => "MGET",
            Command::MSet { .. } => "MSET",
            Command::Append { .. } => "APPEND",
            Command::Strlen { .. } => "STRLEN",
            Command::Del { .. } => "DEL",
        }
    }

    /// Serializes the command as a request frame.
    pub fn to_frame(&self) -> String {
        let mut w = FrameWriter::new();
        w.bulk(self.name());

        match self {
            Command::Get { key }
            | Command::GetDel { key }
            | Command::Incr { key }
            | Command::Decr { key }
            | Command::Exists { key }
            | Command::Strlen { key } => {
                w.bulk(key);
            }
            Command::Set {
                key,
                value,
                ex,
                nx,
                xx,
            } => {
                w.bulk(key);
                value.write_frame(&mut w);
                if let Some(ex) = ex {
                    w.bulk("EX").number(&ex.to_string());
                }
                if *nx {
                    w.bulk("NX");
                }
                if *xx {
                    w.bulk("XX");
                }
            }
            Command::GetSet { key, value } | Command::Append { key, value } => {
                w.bulk(key);
                value.write_frame(&mut w);
            }
            Command::GetEx { key, ex } => {
                w.bulk(key).bulk("EX").number(&ex.to_string());
            }
            Command::IncrBy { key, increment: n } | Command::DecrBy { key, decrement: n } => {
                w.bulk(key).number(&n.to_string());
            }
            Command::MGet { keys } | Command::Del { keys } => {
                for key in keys {
                    w.bulk(key);
                }
            }
            Command::MSet { pairs } => {
                for (key, value) in pairs {
                    w.bulk(key);
                    value.write_frame(&mut w);
                }
            }
        }

        w.finish()
    }
}

/// Keys that are plain identifiers print bare, anything else is quoted.
struct Key<'a>(&'a str);

impl fmt::Display for Key<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bare = self.0.as_bytes().first().is_some_and(u8::is_ascii_alphabetic)
            && self
                .0
                .bytes()
                .all(|c| c.is_ascii_alphanumeric() || c == b'_');

        if bare {
            f.write_str(self.0)
        } else {
            write!(f, "\"{}\"", self.0)
        }
    }
}

/// The inline form, as typed into the CLI.
///
/// Strings are wrapped in `"` with no escaping, so a key or value that
/// itself contains `"` has no faithful inline form. Use
/// [`Command::to_frame`] when the text must be parsed again.
impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())?;

        match self {
            Command::Get { key }
            | Command::GetDel { key }
            | Command::Incr { key }
            | Command::Decr { key }
            | Command::Exists { key }
            | Command::Strlen { key } => write!(f, " {}", Key(key)),
            Command::Set {
                key,
                value,
                ex,
                nx,
                xx,
            } => {
                write!(f, " {} {}", Key(key), value)?;
                if let Some(ex) = ex {
                    write!(f, " EX {}", ex)?;
                }
                if *nx {
                    f.write_str(" NX")?;
                }
                if *xx {
                    f.write_str(" XX")?;
                }
                Ok(())
            }
            Command::GetSet { key, value } | Command::Append { key, value } => {
                write!(f, " {} {}", Key(key), value)
            }
            Command::GetEx { key, ex } => write!(f, " {} EX {}", Key(key), ex),
            Command::IncrBy { key, increment: n } | Command::DecrBy { key, decrement: n } => {
                write!(f, " {} {}", Key(key), n)
            }
            Command::MGet { keys } | Command::Del { keys } => {
                for key in keys {
                    write!(f, " {}", Key(key))?;
                }
                Ok(())
            }
            Command::MSet { pairs } => {
                for (key, value) in pairs {
                    write!(f, " {} {}", Key(key), value)?;
                }
                Ok(())
            }
        }
    }
}
