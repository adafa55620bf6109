//! Server Configuration
//!
//! Command-line flags, each with an environment variable fallback:
//!
//! ```text
//! respkv --host 0.0.0.0 --port 6380 --tick-ms 250
//! PORT=6380 RESPKV_TICK_MS=250 respkv
//! ```

use crate::storage::ExpiryConfig;
use crate::{DEFAULT_HOST, DEFAULT_PORT};
use clap::Parser;
use std::time::Duration;

/// Settings for the `respkv` server binary.
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(name = "respkv", version, about = "A miniature in-memory key-value database")]
pub struct ServerConfig {
    /// Host to bind to
    #[arg(long, env = "RESPKV_HOST", default_value = DEFAULT_HOST)]
    pub host: String,

    /// Port to listen on
    #[arg(short, long, env = "PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Milliseconds per logical expiry tick; `EX n` expires after n ticks
    #[arg(
        long,
        env = "RESPKV_TICK_MS",
        default_value_t = 1000,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub tick_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            tick_ms: 1000,
        }
    }
}

impl ServerConfig {
    /// Returns the bind address as `host:port`.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn expiry_config(&self) -> ExpiryConfig {
        ExpiryConfig {
            tick_interval: Duration::from_millis(self.tick_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::try_parse_from(["respkv"]).unwrap();
        assert_eq!(config.host, DEFAULT_HOST);
        assert_eq!(config.tick_ms, 1000);
        assert_eq!(config.expiry_config().tick_interval, Duration::from_secs(1));
    }

    #[test]
    fn test_flags() {
        let config = ServerConfig::try_parse_from([
            "respkv", "--host", "0.0.0.0", "-p", "6380", "--tick-ms", "250",
        ])
        .unwrap();

        assert_eq!(config.bind_address(), "0.0.0.0:6380");
        assert_eq!(
            config.expiry_config().tick_interval,
            Duration::from_millis(250)
        );
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(ServerConfig::try_parse_from(["respkv", "--port", "not-a-port"]).is_err());
        assert!(ServerConfig::try_parse_from(["respkv", "--port", "70000"]).is_err());
        assert!(ServerConfig::try_parse_from(["respkv", "--tick-ms", "0"]).is_err());
    }

    #[test]
    fn test_default_matches_parser() {
        assert_eq!(ServerConfig::default().bind_address(), "127.0.0.1:6379");
    }
}
