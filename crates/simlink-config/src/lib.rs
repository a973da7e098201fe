//! Shared configuration for the simlink client.
//!
//! Configuration is layered by `ortho_config`: built-in defaults, then an
//! optional TOML file (`--config-path` or `SIMLINK_CONFIG_PATH`), then
//! `SIMLINK_*` environment variables, then command-line flags.

use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};

mod defaults;
mod endpoint;
mod logging;

pub use defaults::{
    DEFAULT_COMMAND_PORT, DEFAULT_CONNECT_TIMEOUT_MS, DEFAULT_HOST, DEFAULT_LOG_FILTER,
    default_connect_timeout_ms, default_log_filter, default_log_filter_string,
    default_log_format, default_server_endpoint,
};
pub use endpoint::{EndpointParseError, ServerEndpoint};
pub use logging::{LogFormat, LogFormatParseError};

/// Client configuration resolved from every layer.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "SIMLINK")]
pub struct Config {
    /// Command server endpoint.
    #[ortho_config(default = default_server_endpoint())]
    pub server: ServerEndpoint,
    /// Connection timeout in milliseconds.
    #[ortho_config(default = default_connect_timeout_ms())]
    pub connect_timeout_ms: u64,
    /// Read deadline applied to the socket; blocks forever when absent.
    pub read_timeout_ms: Option<u64>,
    /// Overrides the protocol version advertised during negotiation.
    pub api_version: Option<u32>,
    /// `tracing` filter expression.
    #[ortho_config(default = default_log_filter_string())]
    pub log_filter: String,
    /// Log output format.
    #[ortho_config(default = default_log_format())]
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: default_server_endpoint(),
            connect_timeout_ms: DEFAULT_CONNECT_TIMEOUT_MS,
            read_timeout_ms: None,
            api_version: None,
            log_filter: default_log_filter_string(),
            log_format: default_log_format(),
        }
    }
}

impl Config {
    /// Command server endpoint.
    #[must_use]
    pub const fn server(&self) -> &ServerEndpoint {
        &self.server
    }

    /// Connection timeout.
    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Read deadline, when configured.
    #[must_use]
    pub fn read_timeout(&self) -> Option<Duration> {
        self.read_timeout_ms.map(Duration::from_millis)
    }

    /// Protocol version override, when configured.
    #[must_use]
    pub const fn api_version(&self) -> Option<u32> {
        self.api_version
    }

    /// `tracing` filter expression.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        self.log_filter.as_str()
    }

    /// Log output format.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }
}
