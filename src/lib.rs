//! # lazykv - An In-Memory Key-Value Cache with Lazy Expiry
//!
//! lazykv keeps string values in a single process-wide map. Every entry
//! carries an absolute expiry in unix seconds, and expired entries are
//! removed only when something touches them: a `GET` of the key, or a `KEYS`
//! scan that walks past it. There is no background sweeper.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                            lazykv                            │
//! │                                                              │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────┐       │
//! │  │ TCP Server  │───>│ Connection  │───>│  Command    │       │
//! │  │ (Listener)  │    │  Handler    │    │  Handler    │       │
//! │  └─────────────┘    └──────┬──────┘    └──────┬──────┘       │
//! │                            │                  │              │
//! │                            ▼                  ▼              │
//! │                     ┌─────────────┐    ┌──────────────────┐  │
//! │                     │    RESP     │    │      Store       │  │
//! │                     │   Parser    │    │ RwLock<HashMap>  │  │
//! │                     └─────────────┘    │  + glob matcher  │  │
//! │                                        └──────────────────┘  │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```
//! use lazykv::storage::{expiry_from_ttl, Store, NEVER_EXPIRES};
//!
//! let store = Store::new();
//! assert_eq!(store.set("user:1", "alice", NEVER_EXPIRES), None);
//! store.set("user:2", "bob", expiry_from_ttl(60));
//!
//! assert_eq!(store.get("user:1"), Some("alice".to_string()));
//!
//! let mut keys = store.keys("user:*").unwrap();
//! keys.sort();
//! assert_eq!(keys, vec!["user:1", "user:2"]);
//! ```
//!
//! ## Supported Commands
//!
//! - `GET key`
//! - `SET key value [EX seconds | EXAT unix-seconds]` (replies with the previous value)
//! - `DEL key` (replies with the removed value)
//! - `KEYS [pattern]`
//! - `PING [message]`, `ECHO message`, `DBSIZE`, `INFO`, `COMMAND`
//!
//! ## Module Overview
//!
//! - [`storage`]: the store and the glob pattern matcher
//! - [`protocol`]: RESP parser and types
//! - [`commands`]: command dispatch onto the store
//! - [`connection`]: per-client connection tasks
//! - [`config`]: command-line configuration for the server binary

pub mod commands;
pub mod config;
pub mod connection;
pub mod protocol;
pub mod storage;

pub use commands::CommandHandler;
pub use config::{CliAction, ConfigError, ServerConfig};
pub use connection::{handle_connection, ConnectionStats};
pub use protocol::{ParseError, RespParser, RespValue};
pub use storage::{GlobError, GlobPattern, Store};

/// The default port lazykv listens on
pub const DEFAULT_PORT: u16 = 6380;

/// The default host lazykv binds to
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Version of lazykv
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
