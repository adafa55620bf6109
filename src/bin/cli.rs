//! respkv-cli
//!
//! Reads inline commands from stdin, one per line, turns each into a
//! request frame and prints the server's reply.
//!
//! ```text
//! $ respkv-cli -p 6379
//! 127.0.0.1:6379> SET counter :1
//! OK
//! 127.0.0.1:6379> INCRBY counter :41
//! 42
//! ```

use anyhow::Context;
use clap::Parser;
use respkv::protocol::serialize;
use respkv::{DEFAULT_HOST, DEFAULT_PORT};
use std::io::{IsTerminal, Write};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

#[derive(Parser, Debug)]
#[command(name = "respkv-cli", version, about = "Interactive client for respkv")]
struct Args {
    /// Server host
    #[arg(long, env = "RESPKV_HOST", default_value = DEFAULT_HOST)]
    host: String,

    /// Server port
    #[arg(short, long, env = "PORT", default_value_t = DEFAULT_PORT)]
    port: u16,
}

fn prompt(addr: &str, interactive: bool) -> std::io::Result<()> {
    if interactive {
        print!("{}> ", addr);
        std::io::stdout().flush()?;
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let addr = format!("{}:{}", args.host, args.port);

    let stream = TcpStream::connect(&addr)
        .await
        .with_context(|| format!("could not connect to {}", addr))?;
    let (read_half, mut write_half) = stream.into_split();
    let mut replies = BufReader::new(read_half);

    let interactive = std::io::stdin().is_terminal();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut reply = Vec::new();

    prompt(&addr, interactive)?;
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            prompt(&addr, interactive)?;
            continue;
        }

        let frame = match serialize(line) {
            Ok(frame) => frame,
            Err(e) => {
                println!("(error) {}", e);
                prompt(&addr, interactive)?;
                continue;
            }
        };

        write_half.write_all(frame.as_bytes()).await?;
        write_half.flush().await?;

        // Multi-line replies separate lines with a bare LF
        reply.clear();
        while !reply.ends_with(b"\r\n") {
            if replies.read_until(b'\n', &mut reply).await? == 0 {
                anyhow::bail!("connection closed by server");
            }
        }
        reply.truncate(reply.len() - 2);
        println!("{}", String::from_utf8_lossy(&reply));

        prompt(&addr, interactive)?;
    }

    Ok(())
}
