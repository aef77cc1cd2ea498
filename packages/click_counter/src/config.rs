//! Connection settings for the click counter client.

use std::time::Duration;

/// Host used when none is configured.
pub const DEFAULT_HOST: &str = "0.0.0.0";
/// Port used when none is configured.
pub const DEFAULT_PORT: u16 = 8765;
/// Interval between heartbeat pings while connected.
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);
/// Number of automatic reconnects before giving up.
pub const DEFAULT_MAX_RECONNECT_ATTEMPTS: u32 = 5;
/// Backoff unit. The n-th reconnect waits `n` times this long.
pub const DEFAULT_RECONNECT_BASE_DELAY: Duration = Duration::from_millis(2000);

/// Settings for a [`crate::ClickCounterClient`].
///
/// The endpoint is always `ws://{host}:{port}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Counter server host name or address.
    pub host: String,
    /// Counter server port.
    pub port: u16,
    /// Time between heartbeat pings while connected.
    pub heartbeat_interval: Duration,
    /// Automatic reconnects allowed after a close before the session fails.
    pub max_reconnect_attempts: u32,
    /// Backoff unit. The n-th reconnect waits `n` times this long.
    pub reconnect_base_delay: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
            max_reconnect_attempts: DEFAULT_MAX_RECONNECT_ATTEMPTS,
            reconnect_base_delay: DEFAULT_RECONNECT_BASE_DELAY,
        }
    }
}

impl ClientConfig {
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Self::default()
        }
    }

    #[must_use]
    pub const fn with_heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self
    }

    #[must_use]
    pub const fn with_max_reconnect_attempts(mut self, attempts: u32) -> Self {
        self.max_reconnect_attempts = attempts;
        self
    }

    #[must_use]
    pub const fn with_reconnect_base_delay(mut self, delay: Duration) -> Self {
        self.reconnect_base_delay = delay;
        self
    }

    /// The websocket URL to connect to.
    #[must_use]
    pub fn url(&self) -> String {
        format!("ws://{}:{}", self.host, self.port)
    }
}
