//! RESP Reply and Request Values
//!
//! Each RESP value starts with a type prefix byte and ends with CRLF:
//!
//! | Prefix | Type          | Example                       |
//! |--------|---------------|-------------------------------|
//! | `+`    | Simple string | `+OK\r\n`                     |
//! | `-`    | Error         | `-ERR invalid pattern\r\n`    |
//! | `:`    | Integer       | `:3\r\n`                      |
//! | `$`    | Bulk string   | `$5\r\nhello\r\n`             |
//! | `$-1`  | Null          | `$-1\r\n`                     |
//! | `*`    | Array         | `*1\r\n$3\r\naaa\r\n`         |
//!
//! lazykv answers a missing key with Null, and everything it stores is text,
//! so [`RespValue::from_option`] and [`RespValue::string_array`] cover most
//! replies.

use bytes::{BufMut, Bytes, BytesMut};
use std::fmt;

/// The CRLF terminator
pub const CRLF: &[u8] = b"\r\n";

/// RESP type prefixes
pub mod prefix {
    pub const SIMPLE_STRING: u8 = b'+';
    pub const ERROR: u8 = b'-';
    pub const INTEGER: u8 = b':';
    pub const BULK_STRING: u8 = b'$';
    pub const ARRAY: u8 = b'*';
}

/// A value on the wire, in either direction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RespValue {
    /// `+<string>\r\n`, cannot contain CRLF
    SimpleString(String),

    /// `-<message>\r\n`
    Error(String),

    /// `:<integer>\r\n`
    Integer(i64),

    /// `$<length>\r\n<data>\r\n`
    BulkString(Bytes),

    /// `$-1\r\n` (also produced for a `*-1\r\n` null array)
    Null,

    /// `*<count>\r\n<element>...`
    Array(Vec<RespValue>),
}

impl RespValue {
    /// Creates a simple string reply.
    pub fn simple_string(s: impl Into<String>) -> Self {
        RespValue::SimpleString(s.into())
    }

    /// Creates an error reply.
    ///
    /// # Example
    /// ```
    /// use lazykv::protocol::RespValue;
    /// let err = RespValue::error("ERR unknown command 'FOO'");
    /// assert_eq!(&err.serialize()[..], b"-ERR unknown command 'FOO'\r\n");
    /// ```
    pub fn error(s: impl Into<String>) -> Self {
        RespValue::Error(s.into())
    }

    pub fn integer(n: i64) -> Self {
        RespValue::Integer(n)
    }

    /// Creates a bulk string reply.
    pub fn bulk_string(data: impl Into<Bytes>) -> Self {
        RespValue::BulkString(data.into())
    }

    pub fn null() -> Self {
        RespValue::Null
    }

    pub fn array(values: Vec<RespValue>) -> Self {
        RespValue::Array(values)
    }

    pub fn ok() -> Self {
        RespValue::SimpleString("OK".to_string())
    }

    pub fn pong() -> Self {
        RespValue::SimpleString("PONG".to_string())
    }

    /// Bulk string for `Some`, Null for `None`.
    pub fn from_option(value: Option<String>) -> Self {
        match value {
            Some(v) => RespValue::BulkString(Bytes::from(v)),
            None => RespValue::Null,
        }
    }

    /// Array of bulk strings.
    pub fn string_array<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        RespValue::Array(
            items
                .into_iter()
                .map(|s| RespValue::BulkString(Bytes::from(s.into())))
                .collect(),
        )
    }

    /// Serializes the value into a fresh buffer.
    pub fn serialize(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.encoded_len_hint());
        self.serialize_into(&mut buf);
        buf.freeze()
    }

    /// Appends the wire form of the value to `buf`.
    pub fn serialize_into(&self, buf: &mut BytesMut) {
        match self {
            RespValue::SimpleString(s) => write_line(buf, prefix::SIMPLE_STRING, s.as_bytes()),
            RespValue::Error(s) => write_line(buf, prefix::ERROR, s.as_bytes()),
            RespValue::Integer(n) => write_line(buf, prefix::INTEGER, n.to_string().as_bytes()),
            RespValue::BulkString(data) => {
                write_line(buf, prefix::BULK_STRING, data.len().to_string().as_bytes());
                buf.put_slice(data);
                buf.put_slice(CRLF);
            }
            RespValue::Null => write_line(buf, prefix::BULK_STRING, b"-1"),
            RespValue::Array(values) => {
                write_line(buf, prefix::ARRAY, values.len().to_string().as_bytes());
                for value in values {
                    value.serialize_into(buf);
                }
            }
        }
    }

    // Close enough to avoid regrowing for typical replies
    fn encoded_len_hint(&self) -> usize {
        match self {
            RespValue::BulkString(data) => data.len() + 16,
            RespValue::Array(values) => 16 + values.iter().map(Self::encoded_len_hint).sum::<usize>(),
            _ => 32,
        }
    }

    /// Returns true if this value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, RespValue::Null)
    }

    /// Returns true if this value is an error.
    pub fn is_error(&self) -> bool {
        matches!(self, RespValue::Error(_))
    }

    /// Text of a SimpleString, or of a BulkString holding valid UTF-8.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            RespValue::SimpleString(s) => Some(s),
            RespValue::BulkString(b) => std::str::from_utf8(b).ok(),
            _ => None,
        }
    }
}

fn write_line(buf: &mut BytesMut, prefix: u8, body: &[u8]) {
    buf.reserve(body.len() + 3);
    buf.put_u8(prefix);
    buf.put_slice(body);
    buf.put_slice(CRLF);
}

impl fmt::Display for RespValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RespValue::SimpleString(s) => write!(f, "{}", s),
            RespValue::Error(s) => write!(f, "(error) {}", s),
            RespValue::Integer(n) => write!(f, "(integer) {}", n),
            RespValue::BulkString(data) => match std::str::from_utf8(data) {
                Ok(s) => write!(f, "\"{}\"", s),
                Err(_) => write!(f, "(binary data, {} bytes)", data.len()),
            },
            RespValue::Null => write!(f, "(nil)"),
            RespValue::Array(values) if values.is_empty() => write!(f, "(empty array)"),
            RespValue::Array(values) => {
                for (i, v) in values.iter().enumerate() {
                    if i > 0 {
                        writeln!(f)?;
                    }
                    write!(f, "{}) {}", i + 1, v)?;
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_serialize() {
        assert_eq!(&RespValue::ok().serialize()[..], b"+OK\r\n");
        assert_eq!(&RespValue::integer(-42).serialize()[..], b":-42\r\n");
        assert_eq!(&RespValue::null().serialize()[..], b"$-1\r\n");
        assert_eq!(
            &RespValue::error("ERR invalid pattern").serialize()[..],
            b"-ERR invalid pattern\r\n"
        );
    }

    #[test]
    fn test_bulk_string_serialize() {
        let value = RespValue::bulk_string("hello");
        assert_eq!(&value.serialize()[..], b"$5\r\nhello\r\n");

        // Length is in bytes, not characters
        let value = RespValue::bulk_string("é");
        assert_eq!(&value.serialize()[..], "$2\r\né\r\n".as_bytes());
    }

    #[test]
    fn test_from_option() {
        assert_eq!(RespValue::from_option(None), RespValue::Null);
        assert_eq!(
            RespValue::from_option(Some("v".to_string())),
            RespValue::bulk_string("v")
        );
    }

    #[test]
    fn test_string_array_serialize() {
        let value = RespValue::string_array(vec!["aaa".to_string(), "b".to_string()]);
        assert_eq!(&value.serialize()[..], b"*2\r\n$3\r\naaa\r\n$1\r\nb\r\n");

        let empty = RespValue::string_array(Vec::<String>::new());
        assert_eq!(&empty.serialize()[..], b"*0\r\n");
    }

    #[test]
    fn test_serialize_into_appends() {
        let mut buf = BytesMut::new();
        RespValue::ok().serialize_into(&mut buf);
        RespValue::null().serialize_into(&mut buf);
        assert_eq!(&buf[..], b"+OK\r\n$-1\r\n");
    }

    #[test]
    fn test_display() {
        assert_eq!(RespValue::null().to_string(), "(nil)");
        assert_eq!(RespValue::string_array(["a", "b"]).to_string(), "1) \"a\"\n2) \"b\"");
    }
}
