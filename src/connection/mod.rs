//! Client Connections
//!
//! One tokio task per client. The task owns a read buffer and a reusable
//! [`Parser`](crate::protocol::Parser), and shares the [`Evaluator`] and the
//! [`ConnectionStats`] with every other connection.
//!
//! ## Request Path
//!
//! ```text
//!  socket bytes
//!       │
//!       ▼
//!  BytesMut ──frame_length()──┬── Ok(None) ──────> read more
//!                             ├── Err(e) ────────> clear buffer, "(error) e"
//!                             └── Ok(Some(n)) ───> split_to(n)
//!                                                      │
//!                        starts with '*' ? ────────────┤
//!                          yes: frame as is            │
//!                          no:  serialize(line)        │
//!                                                      ▼
//!                                              Parser::reset + parse
//!                                                      │ Command
//!                                                      ▼
//!                                               Evaluator::eval
//!                                                      │
//!                               "<reply>\r\n" or "(error) <msg>\r\n"
//! ```
//!
//! Every complete request in the buffer is answered before the writer is
//! flushed, so pipelined requests go out in one write. A failed request
//! only costs its own reply. The connection ends on EOF, on an I/O error,
//! or when a single request outgrows the read buffer limit.
//!
//! ## Example
//!
//! ```no_run
//! use respkv::commands::Evaluator;
//! use respkv::connection::{handle_connection, ConnectionStats};
//! use std::sync::Arc;
//! use tokio::net::TcpListener;
//!
//! # async fn serve() -> std::io::Result<()> {
//! let evaluator = Evaluator::new();
//! let stats = Arc::new(ConnectionStats::new());
//! let listener = TcpListener::bind("127.0.0.1:6379").await?;
//!
//! let (stream, addr) = listener.accept().await?;
//! tokio::spawn(handle_connection(stream, addr, evaluator.clone(), stats));
//! # Ok(())
//! # }
//! ```
//!
//! [`Evaluator`]: crate::commands::Evaluator

pub mod handler;

pub use handler::{handle_connection, ConnectionError, ConnectionHandler, ConnectionStats};
