//! Stored Values
//!
//! The store keeps typed values, one variant per literal the parser can
//! produce. Each value has a [`ValueKind`] used for kind pinning and a
//! canonical text rendering that the evaluator sends back as the reply.
//!
//! | Literal      | Value         | Rendering        |
//! |--------------|---------------|------------------|
//! | `:n`         | `Int`         | `n`              |
//! | `(n`         | `Int64`       | `n`              |
//! | `,f`         | `Float`       | `f`              |
//! | `#t` / `#f`  | `Bool`        | `true` / `false` |
//! | bulk string  | `String`      | the string       |
//! | (miss)       | `Nil`         | `(nil)`          |

use crate::protocol::Expression;
use std::fmt;

/// A typed value held by the store.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(isize),
    Int64(i64),
    Bool(bool),
    String(String),
    Float(f64),
    /// Returned for a miss, never stored
    Nil,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Int,
    Int64,
    Bool,
    String,
    Float,
    Nil,
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Int(_) => ValueKind::Int,
            Value::Int64(_) => ValueKind::Int64,
            Value::Bool(_) => ValueKind::Bool,
            Value::String(_) => ValueKind::String,
            Value::Float(_) => ValueKind::Float,
            Value::Nil => ValueKind::Nil,
        }
    }

    #[inline]
    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }
}

impl From<&Expression> for Value {
    fn from(expr: &Expression) -> Self {
        match expr {
            Expression::Integer { value, .. } => Value::Int(*value),
            Expression::BigInteger { value, .. } => Value::Int64(*value),
            Expression::Float { value, .. } => Value::Float(*value),
            Expression::Boolean { value, .. } => Value::Bool(*value),
            Expression::String { token } => Value::String(token.literal.clone()),
        }
    }
}

impl From<Expression> for Value {
    fn from(expr: Expression) -> Self {
        match expr {
            Expression::String { token } => Value::String(token.literal),
            other => Value::from(&other),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{}", v),
            Value::Int64(v) => write!(f, "{}", v),
            Value::Bool(v) => write!(f, "{}", v),
            Value::String(s) => f.write_str(s),
            Value::Float(v) => write!(f, "{}", v),
            Value::Nil => f.write_str("(nil)"),
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueKind::Int => "int",
            ValueKind::Int64 => "int64",
            ValueKind::Bool => "bool",
            ValueKind::String => "string",
            ValueKind::Float => "float",
            ValueKind::Nil => "nil",
        };
        f.write_str(name)
    }
}
