//! Command Evaluation Module
//!
//! Takes parsed commands, executes them against the storage layer and
//! returns the reply text.
//!
//! ## Architecture
//!
//! ```text
//! Client Request
//!       │
//!       ▼
//! ┌─────────────────┐
//! │ Tokenizer/Parser│  (protocol module)
//! └────────┬────────┘
//!          │ Command
//!          ▼
//! ┌─────────────────┐
//! │   Evaluator     │  (this module)
//! └───┬─────────┬───┘
//!     │         │ insert(key, ttl)
//!     ▼         ▼
//!  Store    Scheduler   (storage module)
//! ```
//!
//! ## Supported Commands
//!
//! - `GET`, `SET [EX n] [NX|XX]`, `GETSET`, `GETEX`, `GETDEL`
//! - `INCR`, `INCRBY`, `DECR`, `DECRBY`
//! - `EXISTS`, `DEL`, `MGET`, `MSET`
//! - `APPEND`, `STRLEN`

pub mod evaluator;

pub use evaluator::{EvalError, Evaluator, OK};
