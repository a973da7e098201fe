use crate::endpoint::ServerEndpoint;
use crate::logging::LogFormat;

/// TCP port the simulator's command server listens on out of the box.
pub const DEFAULT_COMMAND_PORT: u16 = 4820;

/// Default host for the command server.
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default connection timeout in milliseconds.
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 5_000;

/// Default log filter expression used by the binaries.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Default log filter expression used by the binaries.
#[must_use]
pub const fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Owned log filter value used where allocation is required (e.g. serde).
#[must_use]
pub fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Default logging format for the binaries.
#[must_use]
pub const fn default_log_format() -> LogFormat {
    LogFormat::Compact
}

/// Computes the default command server endpoint.
#[must_use]
pub fn default_server_endpoint() -> ServerEndpoint {
    ServerEndpoint::tcp(DEFAULT_HOST, DEFAULT_COMMAND_PORT)
}

/// Default connection timeout in milliseconds.
#[must_use]
pub const fn default_connect_timeout_ms() -> u64 {
    DEFAULT_CONNECT_TIMEOUT_MS
}
