//! RESP Protocol
//!
//! The wire format of the lazykv server. Clients send commands as RESP
//! arrays of bulk strings (or as plain inline text lines); the server answers
//! with a single RESP value per command.
//!
//! - `types`: [`RespValue`] and its serialization
//! - `parser`: incremental frame parser
//!
//! ## Example
//!
//! ```
//! use lazykv::protocol::{parse_message, RespValue};
//!
//! let data = b"*2\r\n$3\r\nGET\r\n$4\r\nname\r\n";
//! let (value, consumed) = parse_message(data).unwrap().unwrap();
//! assert_eq!(consumed, data.len());
//! assert_eq!(value.to_string(), "1) \"GET\"\n2) \"name\"");
//!
//! let reply = RespValue::from_option(None);
//! assert_eq!(&reply.serialize()[..], b"$-1\r\n");
//! ```

pub mod parser;
pub mod types;

pub use parser::{parse_message, ParseError, ParseResult, RespParser};
pub use types::RespValue;
