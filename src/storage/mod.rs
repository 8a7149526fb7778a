//! Storage Engine Module
//!
//! The core of lazykv: a thread-safe key-value map with lazy TTL eviction,
//! and the glob matcher used to enumerate its keys.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────┐
//! │                  Store                   │
//! │   RwLock<HashMap<String, Entry>>         │
//! │                                          │
//! │   get ─────┐   set / delete ──┐          │
//! │   (shared) │   (exclusive)    │          │
//! │            ▼                  ▼          │
//! │       lazy eviction of expired entries   │
//! │                                          │
//! │   keys(pattern) ──> GlobPattern          │
//! └──────────────────────────────────────────┘
//! ```
//!
//! ## Features
//!
//! - **RwLock**: Multiple concurrent readers, exclusive writers
//! - **TTL Support**: Absolute unix-second expiry per entry
//! - **Lazy Expiry**: Expired keys are cleaned up when touched, never by a timer
//! - **Glob Lookup**: `*`, `?`, `[...]`, `[^...]` and `\` escapes
//!
//! ## Example
//!
//! ```
//! use lazykv::storage::{Store, NEVER_EXPIRES};
//! use std::sync::Arc;
//!
//! let store = Arc::new(Store::new());
//!
//! store.set("user:1", "ada", NEVER_EXPIRES);
//! store.set("user:2", "grace", NEVER_EXPIRES);
//! store.set("session", "abc", NEVER_EXPIRES);
//!
//! let mut users = store.keys("user:?").unwrap();
//! users.sort();
//! assert_eq!(users, vec!["user:1", "user:2"]);
//! ```

pub mod engine;
pub mod glob;

pub use engine::{expiry_from_ttl, unix_now, Entry, StorageStats, Store, NEVER_EXPIRES};
pub use glob::{GlobError, GlobPattern};
