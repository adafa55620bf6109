//! # respkv - A Miniature In-Memory Key-Value Database
//!
//! respkv speaks a small RESP-like wire protocol with typed values. Requests
//! are tokenized, parsed into a command tree by a recursive-descent parser,
//! and evaluated against a kind-pinned in-memory store. Keys expire on a
//! logical clock driven by a min-heap scheduler.
//!
//! ## Features
//!
//! - **Typed values**: integers, 64-bit integers, floats, booleans and
//!   strings; a key keeps the kind of its first write until deleted
//! - **Strict parsing**: declared array lengths are checked and every
//!   malformed request gets a descriptive error
//! - **Logical-clock expiry**: `EX n` means "after n ticks", with the tick
//!   length chosen at startup
//! - **Async I/O**: Built on Tokio, one task per client connection
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │                               respkv                                 │
//! │                                                                      │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────┐               │
//! │  │ TCP Server  │───>│ Connection  │───>│  Tokenizer  │               │
//! │  │ (Listener)  │    │  Handler    │    │  + Parser   │               │
//! │  └─────────────┘    └─────────────┘    └──────┬──────┘               │
//! │                                               │ Command              │
//! │                                               ▼                      │
//! │                                        ┌─────────────┐               │
//! │                                        │  Evaluator  │               │
//! │                                        └──┬───────┬──┘               │
//! │                                           │       │                  │
//! │                               ┌───────────▼─┐   ┌─▼───────────────┐  │
//! │                               │    Store    │<──│    Scheduler    │  │
//! │                               │ RwLock<Map> │   │ heap + clock    │  │
//! │                               └─────────────┘   └────────▲────────┘  │
//! │                                                          │ tick()    │
//! │                                                 ┌────────┴────────┐  │
//! │                                                 │  ExpiryTicker   │  │
//! │                                                 │ (Tokio task)    │  │
//! │                                                 └─────────────────┘  │
//! └──────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```no_run
//! use respkv::commands::Evaluator;
//! use respkv::connection::{handle_connection, ConnectionStats};
//! use respkv::storage::ExpiryConfig;
//! use std::sync::Arc;
//! use tokio::net::TcpListener;
//!
//! #[tokio::main]
//! async fn main() -> std::io::Result<()> {
//!     let evaluator = Evaluator::new();
//!     let _ticker = evaluator.spawn_ticker(ExpiryConfig::default());
//!     let stats = Arc::new(ConnectionStats::new());
//!
//!     let listener = TcpListener::bind("127.0.0.1:6379").await?;
//!     loop {
//!         let (stream, addr) = listener.accept().await?;
//!         let evaluator = evaluator.clone();
//!         let stats = Arc::clone(&stats);
//!         tokio::spawn(handle_connection(stream, addr, evaluator, stats));
//!     }
//! }
//! ```
//!
//! ## Supported Commands
//!
//! - `GET key`, `GETDEL key`, `GETEX key EX n`, `GETSET key value`
//! - `SET key value [EX n] [NX|XX]`
//! - `INCR key` / `INCRBY key n`, `DECR key` / `DECRBY key n`
//! - `EXISTS key`, `DEL key [key ...]`
//! - `MGET key [key ...]`, `MSET key value [key value ...]`
//! - `APPEND key value`, `STRLEN key`
//!
//! ## Module Overview
//!
//! - [`protocol`]: Tokenizer, parser, command tree and request serializer
//! - [`storage`]: Typed store and logical-clock expiry scheduler
//! - [`commands`]: Command evaluation
//! - [`connection`]: Client connection management
//! - [`config`]: Server command-line configuration

pub mod commands;
pub mod config;
pub mod connection;
pub mod protocol;
pub mod storage;

// Re-export commonly used types for convenience
pub use commands::{EvalError, Evaluator};
pub use config::ServerConfig;
pub use connection::{handle_connection, ConnectionStats};
pub use protocol::{parse_command, serialize, Command, Expression, ParseError, Parser};
pub use storage::{ExpiryConfig, ExpiryTicker, Scheduler, Store, StoreError, Value};

/// The default port respkv listens on
pub const DEFAULT_PORT: u16 = 6379;

/// The default host respkv binds to
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Version of respkv
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
