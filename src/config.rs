//! Server Configuration
//!
//! Command-line options for the `lazykv` binary:
//!
//! ```text
//! -h, --host <HOST>         Host to bind to (default: 127.0.0.1)
//! -p, --port <PORT>         Port to listen on (default: 6380)
//! -l, --log-level <FILTER>  Log filter, e.g. "debug" or "lazykv=trace" (default: info)
//! -v, --version             Print version information
//!     --help                Print help
//! ```
//!
//! `RUST_LOG`, when set, takes precedence over `--log-level`.

use crate::{DEFAULT_HOST, DEFAULT_PORT};
use thiserror::Error;

/// Default log filter
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Errors from parsing command-line arguments.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} requires a value")]
    MissingValue(String),

    #[error("invalid port number: {0}")]
    InvalidPort(String),

    #[error("unknown argument: {0}")]
    UnknownArgument(String),
}

/// Server configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Default tracing filter directive
    pub log_level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            log_level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

/// What the binary should do after parsing its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliAction {
    Run(ServerConfig),
    Help,
    Version,
}

impl ServerConfig {
    /// Parses arguments, not including the program name.
    pub fn from_args<I, S>(args: I) -> Result<CliAction, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut config = ServerConfig::default();
        let mut args = args.into_iter().map(Into::into);

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--host" | "-h" => {
                    config.host = args.next().ok_or(ConfigError::MissingValue(arg))?;
                }
                "--port" | "-p" => {
                    let value = args.next().ok_or(ConfigError::MissingValue(arg))?;
                    config.port = value.parse().map_err(|_| ConfigError::InvalidPort(value))?;
                }
                "--log-level" | "-l" => {
                    config.log_level = args.next().ok_or(ConfigError::MissingValue(arg))?;
                }
                "--help" => return Ok(CliAction::Help),
                "--version" | "-v" => return Ok(CliAction::Version),
                _ => return Err(ConfigError::UnknownArgument(arg)),
            }
        }

        Ok(CliAction::Run(config))
    }

    /// Returns the bind address as a string
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Help text printed for `--help`.
pub fn help_text() -> String {
    format!(
        r#"
lazykv - In-Memory Key-Value Cache with Lazy Expiry

USAGE:
    lazykv [OPTIONS]

OPTIONS:
    -h, --host <HOST>         Host to bind to (default: {host})
    -p, --port <PORT>         Port to listen on (default: {port})
    -l, --log-level <FILTER>  Log filter (default: {level}; RUST_LOG overrides)
    -v, --version             Print version information
        --help                Print this help message

CONNECTING:
    Any RESP client works, or plain text over nc:
    $ redis-cli -p {port}
    127.0.0.1:{port}> SET session abc EX 60
    (nil)
    127.0.0.1:{port}> KEYS sess*
    1) "session"
"#,
        host = DEFAULT_HOST,
        port = DEFAULT_PORT,
        level = DEFAULT_LOG_LEVEL,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<CliAction, ConfigError> {
        ServerConfig::from_args(args.iter().copied())
    }

    #[test]
    fn test_defaults() {
        let action = parse(&[]).unwrap();
        assert_eq!(action, CliAction::Run(ServerConfig::default()));

        let config = ServerConfig::default();
        assert_eq!(config.bind_address(), "127.0.0.1:6380");
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_all_options() {
        let action = parse(&["--host", "0.0.0.0", "-p", "7000", "-l", "debug"]).unwrap();
        assert_eq!(
            action,
            CliAction::Run(ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 7000,
                log_level: "debug".to_string(),
            })
        );
    }

    #[test]
    fn test_help_and_version() {
        assert_eq!(parse(&["--help"]).unwrap(), CliAction::Help);
        assert_eq!(parse(&["-p", "1", "-v"]).unwrap(), CliAction::Version);
        assert!(help_text().contains("--log-level"));
    }

    #[test]
    fn test_errors() {
        assert_eq!(
            parse(&["--port"]),
            Err(ConfigError::MissingValue("--port".to_string()))
        );
        assert_eq!(
            parse(&["-p", "99999"]),
            Err(ConfigError::InvalidPort("99999".to_string()))
        );
        assert_eq!(
            parse(&["--verbose"]),
            Err(ConfigError::UnknownArgument("--verbose".to_string()))
        );
        assert_eq!(
            ConfigError::MissingValue("-h".to_string()).to_string(),
            "-h requires a value"
        );
    }
}
