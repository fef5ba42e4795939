//! Client configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default port of the remote player's API server.
pub const DEFAULT_PORT: u16 = 26538;

const DEFAULT_HOST: &str = "localhost";
const DEFAULT_API_VERSION: &str = "v1";
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(5000);
const MIN_POLL_INTERVAL: Duration = Duration::from_millis(100);
const DEFAULT_MAX_RECONNECT_DELAY: Duration = Duration::from_millis(15_000);
const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(1500);
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_AUTH_TIMEOUT: Duration = Duration::from_secs(60);
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(1);

/// How the client keeps its state mirror in sync with the remote player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncMode {
    /// Persistent event stream; the remote player pushes every change.
    #[default]
    Push,
    /// Periodic fetch of the query endpoints, with optimistic local updates
    /// for commands.
    Poll,
}

// ── Configuration ───────────────────────────────────────────────────

/// Configuration for a [`RemotePlayerClient`](crate::RemotePlayerClient).
///
/// The only required field is `client_name`, which identifies this client to
/// the remote player during the consent flow and namespaces the persisted
/// token.
///
/// # Example
///
/// ```
/// use remote_player_client::{RemotePlayerConfig, SyncMode};
/// use std::time::Duration;
///
/// let config = RemotePlayerConfig::new("my-widget")
///     .with_host("192.168.1.20")
///     .with_mode(SyncMode::Poll)
///     .with_poll_interval(Duration::from_secs(2));
///
/// assert_eq!(config.api_base(), "http://192.168.1.20:26538/api/v1");
/// assert_eq!(config.credential_key(), "my-widget_accessToken");
/// ```
///
/// The struct can also be embedded in a host application's settings file.
/// Durations are given in milliseconds and every field except `client_name`
/// may be omitted:
///
/// ```toml
/// client_name = "my-widget"
/// mode = "poll"
/// poll_interval = 2000
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemotePlayerConfig {
    /// Name presented to the remote player when asking for consent.
    pub client_name: String,
    /// Host name or address of the remote player. Defaults to `localhost`.
    #[serde(default = "default_host")]
    pub host: String,
    /// Defaults to **26538**.
    #[serde(default = "default_port")]
    pub port: u16,
    /// API version segment of every URL. Defaults to `v1`.
    #[serde(default = "default_api_version")]
    pub api_version: String,
    /// Use `https`/`wss` instead of `http`/`ws`.
    #[serde(default)]
    pub secure: bool,
    #[serde(default)]
    pub mode: SyncMode,
    /// Interval between polls in [`SyncMode::Poll`].
    ///
    /// Defaults to **5 seconds**. Values below 100 ms are clamped.
    #[serde(default = "default_poll_interval", with = "duration_ms::poll_interval")]
    pub poll_interval: Duration,
    /// Ceiling of the reconnect backoff. Defaults to **15 seconds**.
    #[serde(default = "default_max_reconnect_delay", with = "duration_ms")]
    pub max_reconnect_delay: Duration,
    /// Delay between a command and its confirming refetch in poll mode.
    /// Defaults to **1.5 seconds**.
    #[serde(default = "default_settle_delay", with = "duration_ms")]
    pub settle_delay: Duration,
    /// Timeout of API requests. Defaults to **10 seconds**.
    #[serde(default = "default_request_timeout", with = "duration_ms")]
    pub request_timeout: Duration,
    /// Timeout of the consent request, which stays open while the user
    /// decides. Defaults to **60 seconds**.
    #[serde(default = "default_auth_timeout", with = "duration_ms")]
    pub auth_timeout: Duration,
    /// Timeout for opening the event stream. Defaults to **10 seconds**.
    #[serde(default = "default_connect_timeout", with = "duration_ms")]
    pub connect_timeout: Duration,
    /// How long [`shutdown`](crate::RemotePlayerClient::shutdown) waits for the
    /// sync task before aborting it. Defaults to **1 second**; zero aborts
    /// immediately.
    #[serde(default = "default_shutdown_timeout", with = "duration_ms")]
    pub shutdown_timeout: Duration,
}

impl RemotePlayerConfig {
    /// Create a configuration for `client_name` with default values.
    pub fn new(client_name: impl Into<String>) -> Self {
        Self {
            client_name: client_name.into(),
            host: default_host(),
            port: DEFAULT_PORT,
            api_version: default_api_version(),
            secure: false,
            mode: SyncMode::Push,
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_reconnect_delay: DEFAULT_MAX_RECONNECT_DELAY,
            settle_delay: DEFAULT_SETTLE_DELAY,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            auth_timeout: DEFAULT_AUTH_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    #[must_use]
    pub fn with_api_version(mut self, api_version: impl Into<String>) -> Self {
        self.api_version = api_version.into();
        self
    }

    /// Switch to `https` and `wss` URLs.
    #[must_use]
    pub fn with_secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    #[must_use]
    pub fn with_mode(mut self, mode: SyncMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set the poll interval. Values below 100 ms are clamped.
    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval.max(MIN_POLL_INTERVAL);
        self
    }

    #[must_use]
    pub fn with_max_reconnect_delay(mut self, delay: Duration) -> Self {
        self.max_reconnect_delay = delay;
        self
    }

    #[must_use]
    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_auth_timeout(mut self, timeout: Duration) -> Self {
        self.auth_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the timeout for the graceful shutdown.
    ///
    /// A zero timeout aborts the sync task immediately.
    #[must_use]
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    // ── Derived endpoints ───────────────────────────────────────────

    /// `http(s)://host:port`
    pub fn origin(&self) -> String {
        let scheme = if self.secure { "https" } else { "http" };
        format!("{scheme}://{}:{}", self.host, self.port)
    }

    /// Versioned API base, without a trailing slash.
    pub fn api_base(&self) -> String {
        format!("{}/api/{}", self.origin(), self.api_version)
    }

    /// URL of the consent endpoint. The client name is percent-encoded into
    /// a single path segment.
    pub fn auth_url(&self) -> String {
        format!(
            "{}/auth/{}",
            self.origin(),
            urlencoding::encode(&self.client_name)
        )
    }

    /// URL of the push event stream.
    pub fn event_stream_url(&self) -> String {
        let scheme = if self.secure { "wss" } else { "ws" };
        format!(
            "{scheme}://{}:{}/api/{}/ws",
            self.host, self.port, self.api_version
        )
    }

    /// Key under which the bearer token is persisted.
    pub fn credential_key(&self) -> String {
        format!("{}_accessToken", self.client_name)
    }
}

fn default_host() -> String {
    DEFAULT_HOST.to_owned()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_api_version() -> String {
    DEFAULT_API_VERSION.to_owned()
}

fn default_poll_interval() -> Duration {
    DEFAULT_POLL_INTERVAL
}

fn default_max_reconnect_delay() -> Duration {
    DEFAULT_MAX_RECONNECT_DELAY
}

fn default_settle_delay() -> Duration {
    DEFAULT_SETTLE_DELAY
}

fn default_request_timeout() -> Duration {
    DEFAULT_REQUEST_TIMEOUT
}

fn default_auth_timeout() -> Duration {
    DEFAULT_AUTH_TIMEOUT
}

fn default_connect_timeout() -> Duration {
    DEFAULT_CONNECT_TIMEOUT
}

fn default_shutdown_timeout() -> Duration {
    DEFAULT_SHUTDOWN_TIMEOUT
}

/// Durations as whole milliseconds.
mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        let millis = u64::try_from(value.as_millis()).unwrap_or(u64::MAX);
        serializer.serialize_u64(millis)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }

    pub mod poll_interval {
        use std::time::Duration;

        use serde::{Deserializer, Serializer};

        pub fn serialize<S: Serializer>(
            value: &Duration,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            super::serialize(value, serializer)
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Duration, D::Error> {
            super::deserialize(deserializer)
                .map(|interval| interval.max(crate::config::MIN_POLL_INTERVAL))
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = RemotePlayerConfig::new("widget");
        assert_eq!(config.host, "localhost");
        assert_eq!(config.port, 26538);
        assert_eq!(config.api_version, "v1");
        assert!(!config.secure);
        assert_eq!(config.mode, SyncMode::Push);
        assert_eq!(config.poll_interval, Duration::from_millis(5000));
        assert_eq!(config.max_reconnect_delay, Duration::from_millis(15_000));
        assert_eq!(config.settle_delay, Duration::from_millis(1500));
        assert_eq!(config.shutdown_timeout, Duration::from_secs(1));
    }

    #[test]
    fn endpoints_follow_host_port_and_scheme() {
        let config = RemotePlayerConfig::new("widget")
            .with_host("10.0.0.2")
            .with_port(9000)
            .with_api_version("v2");
        assert_eq!(config.api_base(), "http://10.0.0.2:9000/api/v2");
        assert_eq!(config.auth_url(), "http://10.0.0.2:9000/auth/widget");
        assert_eq!(config.event_stream_url(), "ws://10.0.0.2:9000/api/v2/ws");

        let secure = config.with_secure(true);
        assert_eq!(secure.api_base(), "https://10.0.0.2:9000/api/v2");
        assert_eq!(secure.event_stream_url(), "wss://10.0.0.2:9000/api/v2/ws");
    }

    #[test]
    fn auth_url_encodes_client_name_as_one_segment() {
        let config = RemotePlayerConfig::new("my widget/x?y");
        assert_eq!(
            config.auth_url(),
            "http://localhost:26538/auth/my%20widget%2Fx%3Fy"
        );
    }

    #[test]
    fn poll_interval_is_clamped() {
        let config = RemotePlayerConfig::new("widget").with_poll_interval(Duration::ZERO);
        assert_eq!(config.poll_interval, Duration::from_millis(100));
    }

    #[test]
    fn parses_minimal_toml() {
        let config: RemotePlayerConfig = toml::from_str(r#"client_name = "widget""#).unwrap();
        assert_eq!(config, RemotePlayerConfig::new("widget"));
    }

    #[test]
    fn parses_toml_overrides_in_milliseconds() {
        let config: RemotePlayerConfig = toml::from_str(
            r#"
            client_name = "widget"
            host = "media-pc"
            secure = true
            mode = "poll"
            poll_interval = 20
            max_reconnect_delay = 30000
            settle_delay = 500
            "#,
        )
        .unwrap();
        assert_eq!(config.host, "media-pc");
        assert!(config.secure);
        assert_eq!(config.mode, SyncMode::Poll);
        assert_eq!(config.poll_interval, Duration::from_millis(100));
        assert_eq!(config.max_reconnect_delay, Duration::from_secs(30));
        assert_eq!(config.settle_delay, Duration::from_millis(500));
        assert_eq!(config.port, DEFAULT_PORT);
    }

    #[test]
    fn missing_client_name_is_an_error() {
        let result = toml::from_str::<RemotePlayerConfig>("port = 1");
        assert!(result.is_err());
    }

    #[test]
    fn json_round_trip_uses_milliseconds() {
        let config = RemotePlayerConfig::new("widget").with_settle_delay(Duration::from_millis(250));
        let value = serde_json::to_value(&config).unwrap();
        assert_eq!(value["settle_delay"], 250);
        let back: RemotePlayerConfig = serde_json::from_value(value).unwrap();
        assert_eq!(back, config);
    }
}
