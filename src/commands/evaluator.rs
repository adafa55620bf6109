//! Command Evaluator
//!
//! Executes a parsed [`Command`] against the shared [`Store`] and
//! [`Scheduler`] and produces the reply text.
//!
//! ## Replies
//!
//! | Command                  | Reply                                   |
//! |--------------------------|-----------------------------------------|
//! | `GET` / `GETDEL`         | value, or `(nil)` on a miss             |
//! | `GETEX`                  | same as `GET`                           |
//! | `SET` / `MSET`           | `OK`                                    |
//! | `GETSET`                 | the new value                           |
//! | `INCR*` / `DECR*`        | the new value                           |
//! | `EXISTS`                 | `true` / `false`                        |
//! | `MGET`                   | `1) v1`, `2) (nil)`, ... one per line   |
//! | `DEL`                    | number of keys removed                  |
//! | `APPEND` / `STRLEN`      | length in bytes                         |
//!
//! One evaluator is shared by every connection. Cloning it is cheap; the
//! clones point at the same store and scheduler.

use crate::protocol::Command;
use crate::storage::{
    ExpiryConfig, ExpiryTicker, Scheduler, SetCondition, Store, StoreError, Value,
};
use std::sync::Arc;
use thiserror::Error;
use tracing::trace;

/// Success marker for write commands
pub const OK: &str = "OK";

/// Errors that abort a single command.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EvalError {
    #[error(transparent)]
    Store(StoreError),

    #[error("key={0:?} not found")]
    KeyNotFound(String),

    #[error("flag XX set when key does not exist. key={0:?}")]
    FlagXx(String),

    #[error("flag NX set when key does exist. key={0:?}")]
    FlagNx(String),

    #[error("EX must be at least 1. got={0}")]
    InvalidExpiry(i64),

    #[error("increment or decrement would overflow")]
    Overflow,
}

impl From<StoreError> for EvalError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(key) => EvalError::KeyNotFound(key),
            StoreError::Overflow => EvalError::Overflow,
            other => EvalError::Store(other),
        }
    }
}

/// Executes commands against one store and one expiry scheduler.
#[derive(Debug, Clone)]
pub struct Evaluator {
    store: Arc<Store>,
    scheduler: Arc<Scheduler>,
}

impl Default for Evaluator {
    fn default() -> Self {
        Self::new()
    }
}

impl Evaluator {
    /// Creates an empty store and a scheduler whose expirations delete from it.
    pub fn new() -> Self {
        let store = Arc::new(Store::new());
        let target = Arc::clone(&store);
        let scheduler = Arc::new(Scheduler::new(move |key| target.delete(key)));

        Self { store, scheduler }
    }

    /// Starts the background tick task for this evaluator's scheduler.
    pub fn spawn_ticker(&self, config: ExpiryConfig) -> ExpiryTicker {
        ExpiryTicker::start(Arc::clone(&self.scheduler), config)
    }

    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    pub fn scheduler(&self) -> &Arc<Scheduler> {
        &self.scheduler
    }

    /// Executes a command and returns the reply text.
    pub fn eval(&self, command: Command) -> Result<String, EvalError> {
        trace!(command = %command, "Evaluating");

        match command {
            Command::Get { key } => Ok(self.get(&key)),
            Command::GetDel { key } => {
                self.scheduler.cancel(&key);
                Ok(self.store.take(&key).unwrap_or(Value::Nil).to_string())
            }
            Command::GetSet { key, value } => {
                let value = Value::from(value);
                let reply = value.to_string();
                self.store.set(&key, value)?;
                Ok(reply)
            }
            Command::GetEx { key, ex } => {
                if ex < 1 {
                    return Err(EvalError::InvalidExpiry(ex));
                }
                self.scheduler.insert(&key, ex);
                Ok(self.get(&key))
            }
            Command::Set {
                key,
                value,
                ex,
                nx,
                xx,
            } => self.set(key, Value::from(value), ex, nx, xx),
            Command::Incr { key } => self.incr_by(&key, 1),
            Command::IncrBy { key, increment } => self.incr_by(&key, increment),
            Command::Decr { key } => self.incr_by(&key, -1),
            Command::DecrBy { key, decrement } => {
                let delta = decrement.checked_neg().ok_or(EvalError::Overflow)?;
                self.incr_by(&key, delta)
            }
            Command::Exists { key } => Ok(self.store.exists(&key).to_string()),
            Command::MGet { keys } => {
                let lines: Vec<String> = keys
                    .iter()
                    .enumerate()
                    .map(|(i, key)| format!("{}) {}", i + 1, self.get(key)))
                    .collect();
                Ok(lines.join("\n"))
            }
            Command::MSet { pairs } => {
                for (key, value) in pairs {
                    self.store.set(&key, Value::from(value))?;
                }
                Ok(OK.to_string())
            }
            Command::Append { key, value } => {
                let suffix = Value::from(value).to_string();
                Ok(self.store.append(&key, &suffix)?.to_string())
            }
            Command::Strlen { key } => Ok(self.store.strlen(&key)?.to_string()),
            Command::Del { keys } => {
                let removed = keys
                    .iter()
                    .filter(|key| {
                        self.scheduler.cancel(key);
                        self.store.delete(key)
                    })
                    .count();
                Ok(removed.to_string())
            }
        }
    }

    fn get(&self, key: &str) -> String {
        self.store.get(key).unwrap_or(Value::Nil).to_string()
    }

    fn set(
        &self,
        key: String,
        value: Value,
        ex: Option<i64>,
        nx: bool,
        xx: bool,
    ) -> Result<String, EvalError> {
        if let Some(ex) = ex.filter(|ex| *ex < 1) {
            return Err(EvalError::InvalidExpiry(ex));
        }

        let condition = match (nx, xx) {
            (false, false) => SetCondition::Always,
            (true, false) => SetCondition::IfAbsent,
            (false, true) => SetCondition::IfPresent,
            (true, true) if self.store.exists(&key) => return Err(EvalError::FlagNx(key)),
            (true, true) => return Err(EvalError::FlagXx(key)),
        };

        if !self.store.set_if(&key, value, condition)? {
            return Err(match condition {
                SetCondition::IfPresent => EvalError::FlagXx(key),
                _ => EvalError::FlagNx(key),
            });
        }

        if let Some(ex) = ex {
            self.scheduler.insert(&key, ex);
        }

        Ok(OK.to_string())
    }

    fn incr_by(&self, key: &str, delta: i64) -> Result<String, EvalError> {
        Ok(self.store.incr_by(key, delta)?.to_string())
    }
}
