//! Storage Module
//!
//! The typed key space and the logical-clock expiry machinery.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────┐
//! │                Store                 │
//! │   RwLock<HashMap<String, Value>>     │
//! │   (kind pinned per key)              │
//! └──────────────────────────────────────┘
//!                    ▲
//!                    │ delete(key)
//!      ┌─────────────┴─────────────┐
//!      │         Scheduler         │
//!      │  Mutex<{TimerHeap, clock}>│
//!      └─────────────┬─────────────┘
//!                    ▲ tick()
//!      ┌─────────────┴─────────────┐
//!      │       ExpiryTicker        │
//!      │  (Background Tokio Task)  │
//!      └───────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```
//! use respkv::storage::{Scheduler, Store, Value};
//! use std::sync::Arc;
//!
//! let store = Arc::new(Store::new());
//! let target = Arc::clone(&store);
//! let scheduler = Scheduler::new(move |key| target.delete(key));
//!
//! store.set("session", Value::String("token123".into())).unwrap();
//! scheduler.insert("session", 1);
//!
//! scheduler.tick();
//! assert!(!store.exists("session"));
//! ```

pub mod engine;
pub mod expiry;
pub mod timer;
pub mod value;

pub use engine::{SetCondition, Store, StoreError};
pub use expiry::{ExpireCallback, ExpiryConfig, ExpiryTicker, Scheduler};
pub use timer::{TimerEntry, TimerHeap};
pub use value::{Value, ValueKind};
