//! Token Kinds and the Wire Symbol Table
//!
//! Every structural frame in the protocol starts with a single ASCII byte.
//! The mapping is one byte per kind and is used in both directions: the
//! tokenizer turns bytes into kinds, and the frame writer turns kinds back
//! into bytes.
//!
//! ```text
//!   STRING  +    ERROR      -    INTEGER  :    BULKSTRING  $
//!   ARRAY   *    NULL       _    BOOLEAN  #    FLOAT       ,
//!   BIGINT  (    BULKERROR  !    VERBATIM =    MAPS        %
//!   ATTRIBUTES ` SETS       ~    PUSHES   >
//! ```

use std::fmt;

/// The CRLF terminator ending every frame
pub const CRLF: &str = "\r\n";

/// Wire bytes for the structural kinds
pub mod symbol {
    pub const STRING: u8 = b'+';
    pub const ERROR: u8 = b'-';
    pub const INTEGER: u8 = b':';
    pub const BULK_STRING: u8 = b'$';
    pub const ARRAY: u8 = b'*';
    pub const NULL: u8 = b'_';
    pub const BOOLEAN: u8 = b'#';
    pub const FLOAT: u8 = b',';
    pub const BIG_INT: u8 = b'(';
    pub const BULK_ERROR: u8 = b'!';
    pub const VERBATIM_STRING: u8 = b'=';
    pub const MAPS: u8 = b'%';
    pub const ATTRIBUTES: u8 = b'`';
    pub const SETS: u8 = b'~';
    pub const PUSHES: u8 = b'>';
}

/// The closed set of token kinds produced by the tokenizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Eof,
    Illegal,

    Crlf,
    /// A quoted run, `"..."`, with the quotes stripped
    Text,
    Ident,
    Number,

    // Structural symbols
    Array,
    BulkString,
    Integer,
    Float,
    BigInt,
    Boolean,
    String,
    Error,
    Null,
    BulkError,
    VerbatimString,
    Maps,
    Attributes,
    Sets,
    Pushes,

    // Commands
    Get,
    Set,
    GetSet,
    GetEx,
    GetDel,
    Incr,
    IncrBy,
    Decr,
    DecrBy,
    MGet,
    MSet,
    Append,
    Exists,
    Strlen,
    Substr,
    Del,
    Config,

    // Modifier arguments
    Nx,
    Xx,
    Ex,
}

/// Structural symbols and the byte each one is framed with.
const SYMBOLS: [(TokenKind, u8); 15] = [
    (TokenKind::String, symbol::STRING),
    (TokenKind::Error, symbol::ERROR),
    (TokenKind::Integer, symbol::INTEGER),
    (TokenKind::BulkString, symbol::BULK_STRING),
    (TokenKind::Array, symbol::ARRAY),
    (TokenKind::Null, symbol::NULL),
    (TokenKind::Boolean, symbol::BOOLEAN),
    (TokenKind::Float, symbol::FLOAT),
    (TokenKind::BigInt, symbol::BIG_INT),
    (TokenKind::BulkError, symbol::BULK_ERROR),
    (TokenKind::VerbatimString, symbol::VERBATIM_STRING),
    (TokenKind::Maps, symbol::MAPS),
    (TokenKind::Attributes, symbol::ATTRIBUTES),
    (TokenKind::Sets, symbol::SETS),
    (TokenKind::Pushes, symbol::PUSHES),
];

const KEYWORDS: [(&str, TokenKind); 20] = [
    ("GET", TokenKind::Get),
    ("SET", TokenKind::Set),
    ("GETSET", TokenKind::GetSet),
    ("GETEX", TokenKind::GetEx),
    ("GETDEL", TokenKind::GetDel),
    ("INCR", TokenKind::Incr),
    ("INCRBY", TokenKind::IncrBy),
    ("DECR", TokenKind::Decr),
    ("DECRBY", TokenKind::DecrBy),
    ("MGET", TokenKind::MGet),
    ("MSET", TokenKind::MSet),
    ("APPEND", TokenKind::Append),
    ("EXISTS", TokenKind::Exists),
    ("STRLEN", TokenKind::Strlen),
    ("SUBSTR", TokenKind::Substr),
    ("DEL", TokenKind::Del),
    ("CONFIG", TokenKind::Config),
    ("NX", TokenKind::Nx),
    ("XX", TokenKind::Xx),
    ("EX", TokenKind::Ex),
];

impl TokenKind {
    /// Returns the kind framed by `byte`, if it is a structural symbol.
    pub fn from_symbol(byte: u8) -> Option<TokenKind> {
        SYMBOLS
            .iter()
            .find(|(_, b)| *b == byte)
            .map(|(kind, _)| *kind)
    }

    /// Returns the byte a structural kind is framed with.
    pub fn symbol(self) -> Option<u8> {
        SYMBOLS
            .iter()
            .find(|(kind, _)| *kind == self)
            .map(|(_, b)| *b)
    }

    /// Command words and modifier arguments.
    pub fn is_keyword(self) -> bool {
        KEYWORDS.iter().any(|(_, kind)| *kind == self)
    }

    pub fn is_modifier(self) -> bool {
        matches!(self, TokenKind::Nx | TokenKind::Xx | TokenKind::Ex)
    }

    /// Kinds that can stand for a bare word: identifiers and keywords.
    pub fn is_word(self) -> bool {
        self == TokenKind::Ident || self.is_keyword()
    }

    /// Looks up an identifier in the keyword table (ASCII case-insensitive).
    pub fn lookup_ident(ident: &str) -> TokenKind {
        KEYWORDS
            .iter()
            .find(|(word, _)| word.eq_ignore_ascii_case(ident))
            .map(|(_, kind)| *kind)
            .unwrap_or(TokenKind::Ident)
    }

    /// Human readable name used in error messages.
    pub fn name(self) -> &'static str {
        match self {
            TokenKind::Eof => "EOF",
            TokenKind::Illegal => "ILLEGAL",
            TokenKind::Crlf => "CRLF",
            TokenKind::Text => "TEXT",
            TokenKind::Ident => "IDENT",
            TokenKind::Number => "NUMBER",
            TokenKind::Array => "ARRAY",
            TokenKind::BulkString => "BULKSTRING",
            TokenKind::Integer => "INTEGER",
            TokenKind::Float => "FLOAT",
            TokenKind::BigInt => "BIGINT",
            TokenKind::Boolean => "BOOLEAN",
            TokenKind::String => "STRING",
            TokenKind::Error => "ERROR",
            TokenKind::Null => "NULL",
            TokenKind::BulkError => "BULKERROR",
            TokenKind::VerbatimString => "VERBATIMSTRING",
            TokenKind::Maps => "MAPS",
            TokenKind::Attributes => "ATTRIBUTES",
            TokenKind::Sets => "SETS",
            TokenKind::Pushes => "PUSHES",
            TokenKind::Get => "GET",
            TokenKind::Set => "SET",
            TokenKind::GetSet => "GETSET",
            TokenKind::GetEx => "GETEX",
            TokenKind::GetDel => "GETDEL",
            TokenKind::Incr => "INCR",
            TokenKind::IncrBy => "INCRBY",
            TokenKind::Decr => "DECR",
            TokenKind::DecrBy => "DECRBY",
            TokenKind::MGet => "MGET",
            TokenKind::MSet => "MSET",
            TokenKind::Append => "APPEND",
            TokenKind::Exists => "EXISTS",
            TokenKind::Strlen => "STRLEN",
            TokenKind::Substr => "SUBSTR",
            TokenKind::Del => "DEL",
            TokenKind::Config => "CONFIG",
            TokenKind::Nx => "NX",
            TokenKind::Xx => "XX",
            TokenKind::Ex => "EX",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A single lexical unit: its kind plus the input slice it was read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub literal: String,
}

impl Token {
    pub fn new(kind: TokenKind, literal: impl Into<String>) -> Self {
        Self {
            kind,
            literal: literal.into(),
        }
    }

    pub fn eof() -> Self {
        Self::new(TokenKind::Eof, "")
    }

    #[inline]
    pub fn is(&self, kind: TokenKind) -> bool {
        self.kind == kind
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.literal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbol_table_is_bijective() {
        for (kind, byte) in SYMBOLS {
            assert_eq!(TokenKind::from_symbol(byte), Some(kind));
            assert_eq!(kind.symbol(), Some(byte));
        }

        let mut bytes: Vec<u8> = SYMBOLS.iter().map(|(_, b)| *b).collect();
        bytes.sort_unstable();
        bytes.dedup();
        assert_eq!(bytes.len(), SYMBOLS.len());
    }

    #[test]
    fn test_non_symbols() {
        assert_eq!(TokenKind::from_symbol(b'a'), None);
        assert_eq!(TokenKind::Ident.symbol(), None);
    }

    #[test]
    fn test_lookup_ident() {
        assert_eq!(TokenKind::lookup_ident("GET"), TokenKind::Get);
        assert_eq!(TokenKind::lookup_ident("getdel"), TokenKind::GetDel);
        assert_eq!(TokenKind::lookup_ident("Ex"), TokenKind::Ex);
        assert_eq!(TokenKind::lookup_ident("mykey"), TokenKind::Ident);
        assert_eq!(TokenKind::lookup_ident("GETS"), TokenKind::Ident);
    }

    #[test]
    fn test_word_kinds() {
        assert!(TokenKind::Ident.is_word());
        assert!(TokenKind::Set.is_word());
        assert!(TokenKind::Nx.is_modifier());
        assert!(!TokenKind::Number.is_word());
        assert!(!TokenKind::BulkString.is_keyword());
    }
}
