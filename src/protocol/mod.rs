//! Request Protocol
//!
//! Everything between raw request bytes and a typed [`Command`].
//!
//! ## Overview
//!
//! A request is a RESP-style array whose first element is the command word
//! and whose remaining elements are keys, typed values and modifiers:
//!
//! ```text
//!   bytes ──> Tokenizer ──> Parser ──> Command
//!               (token)     (parser)    (ast)
//! ```
//!
//! ## Modules
//!
//! - `token`: Token kinds and the one-byte symbol table
//! - `tokenizer`: Lazy tokenizer with bulk-payload awareness
//! - `parser`: Recursive-descent parser producing a [`Command`]
//! - `ast`: [`Command`] and [`Expression`] nodes
//! - `frame`: Frame length scanner and [`FrameWriter`]
//! - `serializer`: Inline command line to request frame
//!
//! ## Example
//!
//! ```
//! use respkv::protocol::{parse_command, serialize, Command};
//!
//! let frame = serialize("GET mykey").unwrap();
//! assert_eq!(frame, "*2\r\n$3\r\nGET\r\n$5\r\nmykey\r\n");
//!
//! let cmd = parse_command(frame).unwrap();
//! assert_eq!(cmd, Command::Get { key: "mykey".to_string() });
//! ```

pub mod ast;
pub mod frame;
pub mod parser;
pub mod serializer;
pub mod token;
pub mod tokenizer;

pub use ast::{Command, Expression};
pub use frame::{find_crlf, frame_length, FrameWriter, MAX_BULK_SIZE};
pub use parser::{parse_command, ParseError, ParseResult, Parser};
pub use serializer::serialize;
pub use token::{Token, TokenKind, CRLF};
pub use tokenizer::Tokenizer;
