//! Connection Handler Module
//!
//! This module handles individual client connections.
//! Each client gets its own handler task that runs in a loop,
//! reading requests and sending replies.
//!
//! ## Connection Lifecycle
//!
//! ```text
//! 1. Client connects (TCP handshake)
//!        │
//!        ▼
//! 2. ConnectionHandler spawned
//!        │
//!        ▼
//! 3. ┌──────────────────────────────┐
//!    │      Main Loop               │
//!    │                              │
//!    │  Read bytes from socket      │
//!    │         │                    │
//!    │         ▼                    │
//!    │  Cut one request frame       │
//!    │         │                    │
//!    │         ▼                    │
//!    │  Parse into a Command        │
//!    │         │                    │
//!    │         ▼                    │
//!    │  Evaluate, write reply       │
//!    │         │                    │
//!    │    [Loop back]               │
//!    └──────────────────────────────┘
//!        │
//!        ▼
//! 4. Client disconnects / I/O error
//! ```
//!
//! ## Replies
//!
//! Every request gets exactly one reply line: the evaluator's text followed
//! by CRLF, or `(error) <message>` followed by CRLF. Parse, evaluation and
//! framing errors are reported this way and the connection keeps serving;
//! only I/O failures and EOF end it.
//!
//! A request that does not start with `*` is an inline command line
//! (`SET key :1`) and is serialized into a frame before parsing.

use crate::commands::{EvalError, Evaluator};
use crate::protocol::token::symbol;
use crate::protocol::{frame_length, serialize, ParseError, Parser, CRLF};
use bytes::{Bytes, BytesMut};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufWriter};
use tokio::net::TcpStream;
use tracing::{debug, error, info, trace, warn};

/// Maximum size for the read buffer (1 MB)
const MAX_BUFFER_SIZE: usize = 1024 * 1024;

/// Initial buffer capacity
const INITIAL_BUFFER_SIZE: usize = 4096;

/// Prefix of error replies
const ERROR_PREFIX: &str = "(error) ";

/// Statistics for connection handling
#[derive(Debug, Default)]
pub struct ConnectionStats {
    /// Total number of connections accepted
    pub connections_accepted: AtomicU64,
    /// Currently active connections
    pub active_connections: AtomicU64,
    /// Total requests answered
    pub commands_processed: AtomicU64,
    /// Requests answered with an error
    pub commands_failed: AtomicU64,
    /// Total bytes read
    pub bytes_read: AtomicU64,
    /// Total bytes written
    pub bytes_written: AtomicU64,
}

impl ConnectionStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connection_opened(&self) {
        self.connections_accepted.fetch_add(1, Ordering::Relaxed);
        self.active_connections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn connection_closed(&self) {
        self.active_connections.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn command_processed(&self) {
        self.commands_processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn command_failed(&self) {
        self.commands_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn bytes_read(&self, count: usize) {
        self.bytes_read.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn bytes_written(&self, count: usize) {
        self.bytes_written
            .fetch_add(count as u64, Ordering::Relaxed);
    }
}

/// Why a single request failed. Reported to the client, never fatal.
#[derive(Debug, thiserror::Error)]
enum RequestError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Eval(#[from] EvalError),
}

/// Handles a single client connection.
pub struct ConnectionHandler {
    /// The TCP stream for this connection
    stream: BufWriter<TcpStream>,

    /// Client's address (for logging)
    addr: SocketAddr,

    /// Buffer for incoming data
    buffer: BytesMut,

    /// Shared across connections
    evaluator: Evaluator,

    /// Reset onto each request
    parser: Parser,

    /// Connection statistics (shared)
    stats: Arc<ConnectionStats>,
}

impl ConnectionHandler {
    pub fn new(
        stream: TcpStream,
        addr: SocketAddr,
        evaluator: Evaluator,
        stats: Arc<ConnectionStats>,
    ) -> Self {
        stats.connection_opened();

        Self {
            stream: BufWriter::new(stream),
            addr,
            buffer: BytesMut::with_capacity(INITIAL_BUFFER_SIZE),
            evaluator,
            parser: Parser::new(Bytes::new()),
            stats,
        }
    }

    /// Runs the main connection loop until the client disconnects or an
    /// I/O error occurs.
    pub async fn run(mut self) -> Result<(), ConnectionError> {
        info!(client = %self.addr, "Client connected");

        let result = self.main_loop().await;

        match &result {
            Ok(()) => info!(client = %self.addr, "Client disconnected gracefully"),
            Err(e) => match e {
                ConnectionError::ClientDisconnected => {
                    debug!(client = %self.addr, "Client disconnected")
                }
                ConnectionError::IoError(io_err)
                    if io_err.kind() == std::io::ErrorKind::ConnectionReset =>
                {
                    debug!(client = %self.addr, "Connection reset by client")
                }
                _ => warn!(client = %self.addr, error = %e, "Connection error"),
            },
        }

        self.stats.connection_closed();
        result
    }

    /// The main read-evaluate-reply loop.
    async fn main_loop(&mut self) -> Result<(), ConnectionError> {
        loop {
            let mut replied = false;

            while let Some(request) = self.next_request() {
                let reply = match request {
                    Ok(frame) if is_blank(&frame) => continue,
                    Ok(frame) => self.process(frame),
                    Err(e) => Err(RequestError::Parse(e)),
                };

                self.write_reply(reply).await?;
                replied = true;
            }

            if replied {
                self.stream.flush().await?;
            }

            self.read_more_data().await?;
        }
    }

    /// Cuts the next complete request frame off the buffer.
    ///
    /// Malformed framing discards everything buffered, since there is no
    /// reliable point to resynchronize at.
    fn next_request(&mut self) -> Option<Result<Bytes, ParseError>> {
        if self.buffer.is_empty() {
            return None;
        }

        match frame_length(&self.buffer) {
            Ok(Some(len)) => {
                let frame = self.buffer.split_to(len).freeze();
                trace!(
                    client = %self.addr,
                    consumed = len,
                    remaining = self.buffer.len(),
                    "Framed request"
                );
                Some(Ok(frame))
            }
            Ok(None) => {
                trace!(
                    client = %self.addr,
                    buffered = self.buffer.len(),
                    "Incomplete request, need more data"
                );
                None
            }
            Err(e) => {
                warn!(client = %self.addr, error = %e, "Malformed request framing");
                self.buffer.clear();
                Some(Err(e))
            }
        }
    }

    /// Parses and evaluates one request frame.
    fn process(&mut self, frame: Bytes) -> Result<String, RequestError> {
        if frame.first() == Some(&symbol::ARRAY) {
            self.parser.reset(frame);
        } else {
            let line = std::str::from_utf8(&frame).map_err(|_| {
                ParseError::ProtocolError("inline request is not valid UTF-8".to_string())
            })?;
            self.parser.reset(serialize(line)?);
        }

        let command = self.parser.parse()?;
        debug!(client = %self.addr, command = command.name(), "Executing command");

        Ok(self.evaluator.eval(command)?)
    }

    /// Reads more data from the socket into the buffer.
    async fn read_more_data(&mut self) -> Result<(), ConnectionError> {
        if self.buffer.len() >= MAX_BUFFER_SIZE {
            error!(
                client = %self.addr,
                size = self.buffer.len(),
                "Buffer size limit exceeded"
            );
            return Err(ConnectionError::BufferFull);
        }

        if self.buffer.capacity() - self.buffer.len() < 1024 {
            self.buffer.reserve(4096);
        }

        let n = self.stream.get_mut().read_buf(&mut self.buffer).await?;

        if n == 0 {
            if self.buffer.is_empty() {
                return Err(ConnectionError::ClientDisconnected);
            } else {
                return Err(ConnectionError::UnexpectedEof);
            }
        }

        self.stats.bytes_read(n);
        trace!(client = %self.addr, bytes = n, "Read data");

        Ok(())
    }

    /// Buffers one reply line. Flushed by the main loop once the batch of
    /// buffered requests is answered.
    async fn write_reply(
        &mut self,
        reply: Result<String, RequestError>,
    ) -> Result<(), ConnectionError> {
        self.stats.command_processed();

        let line = match reply {
            Ok(text) => text,
            Err(e) => {
                debug!(client = %self.addr, error = %e, "Request failed");
                self.stats.command_failed();
                format!("{}{}", ERROR_PREFIX, e)
            }
        };

        self.stream.write_all(line.as_bytes()).await?;
        self.stream.write_all(CRLF.as_bytes()).await?;

        let written = line.len() + CRLF.len();
        self.stats.bytes_written(written);
        trace!(client = %self.addr, bytes = written, "Queued reply");

        Ok(())
    }
}

/// An inline frame holding nothing but whitespace.
fn is_blank(frame: &[u8]) -> bool {
    frame.first() != Some(&symbol::ARRAY) && frame.iter().all(u8::is_ascii_whitespace)
}

/// Errors that end a connection.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    /// I/O error (network issue)
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Client disconnected normally
    #[error("Client disconnected")]
    ClientDisconnected,

    /// Unexpected end of stream (partial request)
    #[error("Unexpected end of stream")]
    UnexpectedEof,

    /// Buffer size limit exceeded
    #[error("Buffer size limit exceeded")]
    BufferFull,
}

/// Creates a [`ConnectionHandler`] and runs it to completion.
pub async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    evaluator: Evaluator,
    stats: Arc<ConnectionStats>,
) {
    let handler = ConnectionHandler::new(stream, addr, evaluator, stats);
    if let Err(e) = handler.run().await {
        match e {
            ConnectionError::ClientDisconnected => {}
            ConnectionError::IoError(ref io_err)
                if io_err.kind() == std::io::ErrorKind::ConnectionReset => {}
            _ => {
                debug!(client = %addr, error = %e, "Connection ended with error");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::net::TcpListener;

    async fn create_test_server() -> (SocketAddr, Evaluator, Arc<ConnectionStats>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let evaluator = Evaluator::new();
        let stats = Arc::new(ConnectionStats::new());

        let server_evaluator = evaluator.clone();
        let server_stats = Arc::clone(&stats);

        tokio::spawn(async move {
            while let Ok((stream, client_addr)) = listener.accept().await {
                tokio::spawn(handle_connection(
                    stream,
                    client_addr,
                    server_evaluator.clone(),
                    Arc::clone(&server_stats),
                ));
            }
        });

        (addr, evaluator, stats)
    }

    /// Reads exactly `expected.len()` bytes and compares them.
    async fn expect_reply(client: &mut TcpStream, expected: &str) {
        let mut buf = vec![0u8; expected.len()];
        tokio::time::timeout(Duration::from_secs(2), client.read_exact(&mut buf))
            .await
            .expect("timed out waiting for reply")
            .unwrap();
        assert_eq!(String::from_utf8_lossy(&buf), expected);
    }

    #[tokio::test]
    async fn test_get_missing_key() {
        let (addr, _, _) = create_test_server().await;
        let mut client = TcpStream::connect(addr).await.unwrap();

        client
            .write_all(b"*2\r\n$3\r\nGET\r\n$5\r\nmykey\r\n")
            .await
            .unwrap();
        expect_reply(&mut client, "(nil)\r\n").await;
    }

    #[tokio::test]
    async fn test_set_get() {
        let (addr, evaluator, _) = create_test_server().await;
        let mut client = TcpStream::connect(addr).await.unwrap();

        client
            .write_all(b"*3\r\n$3\r\nSET\r\n$4\r\nname\r\n$4\r\nAriz\r\n")
            .await
            .unwrap();
        expect_reply(&mut client, "OK\r\n").await;

        client
            .write_all(b"*2\r\n$3\r\nGET\r\n$4\r\nname\r\n")
            .await
            .unwrap();
        expect_reply(&mut client, "Ariz\r\n").await;

        assert!(evaluator.store().exists("name"));
    }

    #[tokio::test]
    async fn test_pipelined_commands() {
        let (addr, _, _) = create_test_server().await;
        let mut client = TcpStream::connect(addr).await.unwrap();

        client
            .write_all(b"*3\r\n$3\r\nSET\r\n$2\r\nk1\r\n$2\r\nv1\r\n*3\r\n$3\r\nSET\r\n$2\r\nk2\r\n$2\r\nv2\r\n*2\r\n$3\r\nGET\r\n$2\r\nk1\r\n*2\r\n$3\r\nGET\r\n$2\r\nk2\r\n")
            .await
            .unwrap();

        expect_reply(&mut client, "OK\r\nOK\r\nv1\r\nv2\r\n").await;
    }

    #[tokio::test]
    async fn test_split_request() {
        let (addr, _, _) = create_test_server().await;
        let mut client = TcpStream::connect(addr).await.unwrap();

        client.write_all(b"*3\r\n$3\r\nSET\r\n$3\r").await.unwrap();
        client.flush().await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        client.write_all(b"\nkey\r\n#t\r\n").await.unwrap();

        expect_reply(&mut client, "OK\r\n").await;
    }

    #[tokio::test]
    async fn test_inline_commands() {
        let (addr, _, _) = create_test_server().await;
        let mut client = TcpStream::connect(addr).await.unwrap();

        client
            .write_all(b"SET counter :5\r\n\r\nINCR counter\r\n")
            .await
            .unwrap();
        expect_reply(&mut client, "OK\r\n6\r\n").await;
    }

    #[tokio::test]
    async fn test_errors_keep_connection_open() {
        let (addr, _, stats) = create_test_server().await;
        let mut client = TcpStream::connect(addr).await.unwrap();

        client.write_all(b"*1\r\n$4\r\nPING\r\n").await.unwrap();
        expect_reply(&mut client, "(error) unknown command \"PING\"\r\n").await;

        client.write_all(b"INCR missing\r\n").await.unwrap();
        expect_reply(&mut client, "(error) key=\"missing\" not found\r\n").await;

        client.write_all(b"GET missing\r\n").await.unwrap();
        expect_reply(&mut client, "(nil)\r\n").await;

        assert_eq!(stats.commands_failed.load(Ordering::Relaxed), 2);
    }

    #[tokio::test]
    async fn test_malformed_framing_is_reported() {
        let (addr, _, _) = create_test_server().await;
        let mut client = TcpStream::connect(addr).await.unwrap();

        client.write_all(b"*1\r\n$-3\r\n").await.unwrap();
        expect_reply(&mut client, "(error) invalid length: -3\r\n").await;

        client.write_all(b"EXISTS k\r\n").await.unwrap();
        expect_reply(&mut client, "false\r\n").await;
    }

    #[tokio::test]
    async fn test_connection_stats() {
        let (addr, _, stats) = create_test_server().await;

        assert_eq!(stats.active_connections.load(Ordering::Relaxed), 0);

        let mut client = TcpStream::connect(addr).await.unwrap();

        // Give the server time to accept the connection
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(stats.connections_accepted.load(Ordering::Relaxed), 1);
        assert_eq!(stats.active_connections.load(Ordering::Relaxed), 1);

        client.write_all(b"EXISTS k\r\n").await.unwrap();
        expect_reply(&mut client, "false\r\n").await;

        assert_eq!(stats.commands_processed.load(Ordering::Relaxed), 1);
        assert!(stats.bytes_read.load(Ordering::Relaxed) > 0);
        assert_eq!(stats.bytes_written.load(Ordering::Relaxed), 7);

        drop(client);

        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(stats.active_connections.load(Ordering::Relaxed), 0);
    }
}
