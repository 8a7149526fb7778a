//! Incremental RESP Parser
//!
//! TCP delivers a byte stream, not messages. The connection handler appends
//! whatever arrives to a buffer and asks the parser for the next frame:
//!
//! - `Ok(Some((value, consumed)))`: a full frame; drop `consumed` bytes
//! - `Ok(None)`: the frame is not complete yet; read more
//! - `Err(ParseError)`: the stream is garbage; give up on the client
//!
//! Besides proper RESP arrays, plain text lines such as `KEYS user:*` are
//! accepted as "inline" commands, which makes the server usable from
//! `telnet` or `nc`.

use crate::protocol::types::{prefix, RespValue};
use bytes::Bytes;
use thiserror::Error;

/// Errors that can occur during RESP parsing.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ParseError {
    /// Length or integer line that is not a decimal number
    #[error("invalid integer: {0:?}")]
    InvalidInteger(String),

    /// Simple string, error, or inline command that is not UTF-8
    #[error("invalid UTF-8 in {0}")]
    InvalidUtf8(&'static str),

    /// Negative length other than the -1 null marker
    #[error("invalid length: {0}")]
    InvalidLength(i64),

    /// Protocol violation (missing CRLF, empty inline command, ...)
    #[error("protocol error: {0}")]
    Protocol(&'static str),

    /// Bulk string larger than the limit
    #[error("bulk string too large: {size} bytes (max: {max})")]
    TooLarge { size: usize, max: usize },

    /// Arrays nested deeper than the limit
    #[error("arrays nested deeper than {0} levels")]
    TooDeep(usize),
}

/// Result type for parsing operations.
pub type ParseResult<T> = Result<T, ParseError>;

/// Maximum size for a single bulk string (512 MiB)
pub const MAX_BULK_SIZE: usize = 512 * 1024 * 1024;

/// Maximum array nesting depth
pub const MAX_NESTING_DEPTH: usize = 32;

/// A RESP frame parser.
///
/// Holds no buffered data itself; the caller owns the buffer and advances
/// it by the returned `consumed` count.
#[derive(Debug, Default)]
pub struct RespParser {
    /// Buffer length the last incomplete frame needs, if a bulk header said so
    pending_len: Option<usize>,
}

impl RespParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attempts to parse one frame from the start of `buf`.
    pub fn parse(&mut self, buf: &[u8]) -> ParseResult<Option<(RespValue, usize)>> {
        let mut cursor = Cursor {
            buf,
            pos: 0,
            needed: None,
        };
        let result = cursor.value(0);
        self.pending_len = match &result {
            Ok(None) => cursor.needed,
            _ => None,
        };

        match result? {
            Some(value) => Ok(Some((value, cursor.pos))),
            None => Ok(None),
        }
    }

    /// After an incomplete parse that stopped inside a bulk string payload,
    /// the buffer length required before that payload is complete.
    ///
    /// Lets a caller accept a large value without lifting its general
    /// buffer limit. The declared length is already capped at
    /// [`MAX_BULK_SIZE`].
    pub fn pending_len(&self) -> Option<usize> {
        self.pending_len
    }
}

/// Parses a single frame from `buf`.
pub fn parse_message(buf: &[u8]) -> ParseResult<Option<(RespValue, usize)>> {
    RespParser::new().parse(buf)
}

/// Read position over a borrowed buffer. `None` from any method means the
/// buffer ends before the frame does.
struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
    /// Set when a bulk payload runs past the end of `buf`
    needed: Option<usize>,
}

impl<'a> Cursor<'a> {
    fn value(&mut self, depth: usize) -> ParseResult<Option<RespValue>> {
        if depth > MAX_NESTING_DEPTH {
            return Err(ParseError::TooDeep(MAX_NESTING_DEPTH));
        }

        let Some(&first) = self.buf.get(self.pos) else {
            return Ok(None);
        };

        match first {
            prefix::SIMPLE_STRING => {
                self.pos += 1;
                Ok(self.text_line("simple string")?.map(RespValue::SimpleString))
            }
            prefix::ERROR => {
                self.pos += 1;
                Ok(self.text_line("error")?.map(RespValue::Error))
            }
            prefix::INTEGER => {
                self.pos += 1;
                Ok(self.number()?.map(RespValue::Integer))
            }
            prefix::BULK_STRING => {
                self.pos += 1;
                self.bulk_string()
            }
            prefix::ARRAY => {
                self.pos += 1;
                self.array(depth)
            }
            _ => self.inline(),
        }
    }

    /// Returns the bytes up to the next CRLF and moves past it.
    fn line(&mut self) -> Option<&'a [u8]> {
        let buf: &'a [u8] = self.buf;
        let rest = &buf[self.pos..];
        let end = rest.windows(2).position(|w| w == b"\r\n")?;
        self.pos += end + 2;
        Some(&rest[..end])
    }

    fn text_line(&mut self, what: &'static str) -> ParseResult<Option<String>> {
        match self.line() {
            Some(raw) => std::str::from_utf8(raw)
                .map(|s| Some(s.to_string()))
                .map_err(|_| ParseError::InvalidUtf8(what)),
            None => Ok(None),
        }
    }

    fn number(&mut self) -> ParseResult<Option<i64>> {
        let Some(raw) = self.line() else {
            return Ok(None);
        };
        let text = String::from_utf8_lossy(raw);
        text.parse::<i64>()
            .map(Some)
            .map_err(|_| ParseError::InvalidInteger(text.into_owned()))
    }

    /// `$<len>\r\n<data>\r\n` with the prefix already consumed.
    fn bulk_string(&mut self) -> ParseResult<Option<RespValue>> {
        let len = match self.number()? {
            None => return Ok(None),
            Some(-1) => return Ok(Some(RespValue::Null)),
            Some(n) if n < 0 => return Err(ParseError::InvalidLength(n)),
            Some(n) => n as usize,
        };

        if len > MAX_BULK_SIZE {
            return Err(ParseError::TooLarge {
                size: len,
                max: MAX_BULK_SIZE,
            });
        }

        let end = self.pos + len;
        if self.buf.len() < end + 2 {
            self.needed = Some(end + 2);
            return Ok(None);
        }
        if &self.buf[end..end + 2] != b"\r\n" {
            return Err(ParseError::Protocol("bulk string missing trailing CRLF"));
        }

        let data = Bytes::copy_from_slice(&self.buf[self.pos..end]);
        self.pos = end + 2;
        Ok(Some(RespValue::BulkString(data)))
    }

    /// `*<count>\r\n<element>...` with the prefix already consumed.
    fn array(&mut self, depth: usize) -> ParseResult<Option<RespValue>> {
        let count = match self.number()? {
            None => return Ok(None),
            Some(-1) => return Ok(Some(RespValue::Null)),
            Some(n) if n < 0 => return Err(ParseError::InvalidLength(n)),
            Some(n) => n as usize,
        };

        // Never trust the count for preallocation
        let mut elements = Vec::with_capacity(count.min(64));
        for _ in 0..count {
            match self.value(depth + 1)? {
                Some(element) => elements.push(element),
                None => return Ok(None),
            }
        }

        Ok(Some(RespValue::Array(elements)))
    }

    /// A whitespace-separated command line.
    fn inline(&mut self) -> ParseResult<Option<RespValue>> {
        let Some(raw) = self.line() else {
            return Ok(None);
        };
        let line =
            std::str::from_utf8(raw).map_err(|_| ParseError::InvalidUtf8("inline command"))?;

        let parts: Vec<RespValue> = line
            .split_whitespace()
            .map(|part| RespValue::BulkString(Bytes::copy_from_slice(part.as_bytes())))
            .collect();

        if parts.is_empty() {
            return Err(ParseError::Protocol("empty inline command"));
        }

        Ok(Some(RespValue::Array(parts)))
    }
}
