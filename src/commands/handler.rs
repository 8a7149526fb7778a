//! Command Handler
//!
//! Translates parsed RESP commands into [`Store`] calls and store results
//! into RESP replies.
//!
//! | Command                                   | Reply                                  |
//! |-------------------------------------------|----------------------------------------|
//! | `GET key`                                 | value, or nil                          |
//! | `SET key value [EX seconds \| EXAT unix]` | previous live value, or nil            |
//! | `DEL key`                                 | removed live value, or nil             |
//! | `KEYS [pattern]`                          | array of live keys                     |
//! | `PING [message]`                          | `PONG` or the message                  |
//! | `ECHO message`                            | the message                            |
//! | `DBSIZE`                                  | entries in the map                     |
//! | `INFO`                                    | server and operation counters          |
//! | `COMMAND`                                 | supported command names                |
//!
//! `SET` and `DEL` always hand back the previous value, so a client can tell
//! "created" from "replaced" without a second round trip. `EX` is relative to
//! the server clock and may be zero or negative, in which case the entry is
//! stored already expired and disappears on first access.

use crate::protocol::RespValue;
use crate::storage::{expiry_from_ttl, Store, NEVER_EXPIRES};
use bytes::Bytes;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// Names reported by `COMMAND`.
const COMMANDS: &[&str] = &[
    "GET", "SET", "DEL", "KEYS", "PING", "ECHO", "DBSIZE", "INFO", "COMMAND",
];

/// Executes commands against a shared store.
///
/// Cheap to clone: every connection gets its own handler pointing at the
/// same [`Store`].
#[derive(Debug, Clone)]
pub struct CommandHandler {
    store: Arc<Store>,
    /// Server start time for INFO
    start_time: Instant,
}

impl CommandHandler {
    /// Creates a new command handler with the given store.
    pub fn new(store: Arc<Store>) -> Self {
        Self {
            store,
            start_time: Instant::now(),
        }
    }

    /// Executes a command and returns the reply.
    ///
    /// `command` is expected to be an array whose first element is the
    /// command name; anything else yields an error reply.
    pub fn execute(&self, command: RespValue) -> RespValue {
        let args = match command {
            RespValue::Array(args) if !args.is_empty() => args,
            RespValue::Array(_) => return RespValue::error("ERR empty command"),
            _ => return RespValue::error("ERR invalid command format"),
        };

        let name = match args[0].as_str() {
            Some(s) => s.to_uppercase(),
            None => return RespValue::error("ERR invalid command name"),
        };

        self.dispatch(&name, &args[1..])
    }

    fn dispatch(&self, cmd: &str, args: &[RespValue]) -> RespValue {
        match cmd {
            "GET" => self.cmd_get(args),
            "SET" => self.cmd_set(args),
            "DEL" => self.cmd_del(args),
            "KEYS" => self.cmd_keys(args),

            "PING" => self.cmd_ping(args),
            "ECHO" => self.cmd_echo(args),
            "DBSIZE" => self.cmd_dbsize(args),
            "INFO" => self.cmd_info(args),
            "COMMAND" => RespValue::string_array(COMMANDS.iter().copied()),

            _ => RespValue::error(format!("ERR unknown command '{}'", cmd)),
        }
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    fn wrong_arity(cmd: &str) -> RespValue {
        RespValue::error(format!(
            "ERR wrong number of arguments for '{}' command",
            cmd
        ))
    }

    /// Keys and values are text; a non-UTF-8 argument is rejected.
    fn text(value: &RespValue) -> Result<String, RespValue> {
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| RespValue::error("ERR arguments must be valid UTF-8 strings"))
    }

    fn integer(value: &RespValue) -> Result<i64, RespValue> {
        match value {
            RespValue::Integer(n) => Ok(*n),
            other => other
                .as_str()
                .and_then(|s| s.parse().ok())
                .ok_or_else(|| RespValue::error("ERR value is not an integer or out of range")),
        }
    }

    // ========================================================================
    // Store Commands
    // ========================================================================

    /// GET key
    fn cmd_get(&self, args: &[RespValue]) -> RespValue {
        let [key] = args else {
            return Self::wrong_arity("GET");
        };
        match Self::text(key) {
            Ok(key) => RespValue::from_option(self.store.get(&key)),
            Err(reply) => reply,
        }
    }

    /// SET key value [EX seconds | EXAT unix-seconds]
    fn cmd_set(&self, args: &[RespValue]) -> RespValue {
        match self.try_set(args) {
            Ok(reply) | Err(reply) => reply,
        }
    }

    fn try_set(&self, args: &[RespValue]) -> Result<RespValue, RespValue> {
        let (key, value, options) = match args {
            [key, value, options @ ..] => (Self::text(key)?, Self::text(value)?, options),
            _ => return Err(Self::wrong_arity("SET")),
        };

        let expires_at = match options {
            [] => NEVER_EXPIRES,
            [option, amount] => {
                let amount = Self::integer(amount)?;
                match option.as_str().map(str::to_uppercase).as_deref() {
                    Some("EX") => expiry_from_ttl(amount),
                    Some("EXAT") => amount,
                    _ => return Err(RespValue::error("ERR syntax error")),
                }
            }
            _ => return Err(RespValue::error("ERR syntax error")),
        };

        Ok(RespValue::from_option(self.store.set(key, value, expires_at)))
    }

    /// DEL key
    fn cmd_del(&self, args: &[RespValue]) -> RespValue {
        let [key] = args else {
            return Self::wrong_arity("DEL");
        };
        match Self::text(key) {
            Ok(key) => RespValue::from_option(self.store.delete(&key)),
            Err(reply) => reply,
        }
    }

    /// KEYS [pattern]
    fn cmd_keys(&self, args: &[RespValue]) -> RespValue {
        let pattern = match args {
            [] => String::new(),
            [pattern] => match Self::text(pattern) {
                Ok(p) => p,
                Err(reply) => return reply,
            },
            _ => return Self::wrong_arity("KEYS"),
        };

        match self.store.keys(&pattern) {
            Ok(keys) => RespValue::string_array(keys),
            Err(e) => {
                debug!(pattern = %pattern, error = %e, "Rejected KEYS pattern");
                RespValue::error(format!("ERR invalid pattern: {}", e))
            }
        }
    }

    // ========================================================================
    // Server Commands
    // ========================================================================

    /// PING [message]
    fn cmd_ping(&self, args: &[RespValue]) -> RespValue {
        match args {
            [] => RespValue::pong(),
            [message] => message.clone(),
            _ => Self::wrong_arity("PING"),
        }
    }

    /// ECHO message
    fn cmd_echo(&self, args: &[RespValue]) -> RespValue {
        match args {
            [message] => message.clone(),
            _ => Self::wrong_arity("ECHO"),
        }
    }

    /// DBSIZE
    fn cmd_dbsize(&self, args: &[RespValue]) -> RespValue {
        if !args.is_empty() {
            return Self::wrong_arity("DBSIZE");
        }
        RespValue::integer(self.store.len() as i64)
    }

    /// INFO
    fn cmd_info(&self, args: &[RespValue]) -> RespValue {
        if !args.is_empty() {
            return Self::wrong_arity("INFO");
        }
        let stats = self.store.stats();
        let uptime = self.start_time.elapsed().as_secs();

        let info = format!(
            "# Server\r\n\
             lazykv_version:{}\r\n\
             os:{}\r\n\
             uptime_in_seconds:{}\r\n\
             \r\n\
             # Keyspace\r\n\
             keys:{}\r\n\
             expired_keys:{}\r\n\
             \r\n\
             # Operations\r\n\
             get_ops:{}\r\n\
             set_ops:{}\r\n\
             del_ops:{}\r\n\
             keys_ops:{}\r\n",
            crate::VERSION,
            std::env::consts::OS,
            uptime,
            stats.keys,
            stats.expired,
            stats.get_ops,
            stats.set_ops,
            stats.del_ops,
            stats.keys_ops,
        );

        RespValue::bulk_string(Bytes::from(info))
    }
}
