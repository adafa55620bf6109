//! Inline Request Serializer
//!
//! Converts a command line as typed at a prompt into a request frame:
//!
//! ```text
//! SET key "hello world" EX 20 NX
//!   -> *6\r\n$3\r\nSET\r\n$3\r\nkey\r\n$11\r\nhello world\r\n$2\r\nEX\r\n:20\r\n$2\r\nNX\r\n
//! ```
//!
//! | Input            | Frame element            |
//! |------------------|--------------------------|
//! | word / `"text"`  | bulk string              |
//! | `20`             | `:20`                    |
//! | `1.5`            | `,1.5`                   |
//! | `1234567890`     | `(1234567890` (10+ chars)|
//! | `#t` / `#f`      | boolean                  |
//! | `:n` `(n` `,f`   | passed through as typed  |

use crate::protocol::frame::FrameWriter;
use crate::protocol::parser::{ParseError, ParseResult};
use crate::protocol::token::TokenKind;
use crate::protocol::tokenizer::Tokenizer;

/// Serializes one inline command into a request frame.
pub fn serialize(line: &str) -> ParseResult<String> {
    let mut tokenizer = Tokenizer::new(line.to_owned());
    let mut w = FrameWriter::new();

    loop {
        let token = tokenizer.next_token();

        match token.kind {
            TokenKind::Eof => break,
            TokenKind::Crlf => continue,
            TokenKind::Illegal => return Err(ParseError::IllegalToken(token.literal)),
            TokenKind::Number => {
                w.number(&token.literal);
            }
            TokenKind::Text => {
                w.bulk(&token.literal);
            }
            kind if kind.is_word() => {
                w.bulk(&token.literal);
            }
            TokenKind::Boolean => {
                let next = tokenizer.next_token();
                match (next.kind, next.literal.as_str()) {
                    (TokenKind::Ident, "t") => w.boolean(true),
                    (TokenKind::Ident, "f") => w.boolean(false),
                    _ => return Err(ParseError::InvalidBoolean(next.literal)),
                };
            }
            kind @ (TokenKind::Integer | TokenKind::BigInt | TokenKind::Float) => {
                let next = tokenizer.next_token();
                if !next.is(TokenKind::Number) {
                    return Err(ParseError::UnexpectedToken {
                        expected: TokenKind::Number,
                        got: next.kind,
                        literal: next.literal,
                    });
                }

                match kind {
                    TokenKind::Integer => w.integer(&next.literal),
                    TokenKind::BigInt => w.big_integer(&next.literal),
                    _ => w.float(&next.literal),
                };
            }
            got => {
                return Err(ParseError::UnexpectedToken {
                    expected: TokenKind::Ident,
                    got,
                    literal: token.literal,
                })
            }
        }
    }

    if w.is_empty() {
        return Err(ParseError::ProtocolError("empty request".to_string()));
    }

    Ok(w.finish())
}
