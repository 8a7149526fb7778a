//! Client Connections
//!
//! One async task per client. The task owns its read buffer and parser and
//! shares the [`Store`](crate::storage::Store) with every other task through
//! the [`CommandHandler`](crate::commands::CommandHandler).
//!
//! ```ignore
//! use lazykv::connection::{handle_connection, ConnectionStats};
//! use lazykv::commands::CommandHandler;
//! use lazykv::storage::Store;
//! use std::sync::Arc;
//!
//! let store = Arc::new(Store::new());
//! let stats = Arc::new(ConnectionStats::new());
//!
//! let (stream, addr) = listener.accept().await?;
//! let handler = CommandHandler::new(Arc::clone(&store));
//! tokio::spawn(handle_connection(stream, addr, handler, Arc::clone(&stats)));
//! ```

pub mod handler;

pub use handler::{handle_connection, ConnectionError, ConnectionHandler, ConnectionStats};
