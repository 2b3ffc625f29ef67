//! Connection configuration
//!
//! Values come from the environment (see [`RealtimeConfig::from_env`]). The
//! app key is deliberately not validated here: an empty key is reported by
//! [`ConnectionManager::connect`](crate::connection::ConnectionManager::connect)
//! as a configuration error so it shows up in the connection state.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use url::Url;

use crate::error::{RealtimeError, RealtimeResult};

/// Pusher protocol revision spoken by the transport
pub const PROTOCOL_VERSION: u8 = 7;

/// Client name reported in the socket URL
pub const CLIENT_NAME: &str = "procure-sync";

const DEFAULT_CLUSTER: &str = "mt1";
const DEFAULT_ACTIVITY_TIMEOUT_SECS: u64 = 120;
const DEFAULT_MAX_RETRIES: u32 = 6;
const DEFAULT_PORT: u16 = 3030;
const DEFAULT_CACHE_DIR: &str = ".cache/procure-sync";

/// Options for a single transport connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectOptions {
    /// Cluster region (e.g. `eu`, `mt1`)
    pub cluster: String,
    /// Use `wss://` on port 443 instead of `ws://` on port 80
    pub force_tls: bool,
    /// Self-hosted endpoint override (soketi, reverb, ...)
    pub host: Option<String>,
    pub port: Option<u16>,
    /// Endpoint that signs private channel subscriptions
    pub auth_endpoint: Option<Url>,
    /// Bearer token sent to the auth endpoint
    pub auth_token: Option<String>,
    /// Idle time after which a keepalive ping is sent
    pub activity_timeout: Duration,
    /// Transport-level reconnect attempts before giving up
    pub max_retries: u32,
}

impl Default for ConnectOptions {
    fn default() -> Self {
        Self {
            cluster: DEFAULT_CLUSTER.to_string(),
            force_tls: true,
            host: None,
            port: None,
            auth_endpoint: None,
            auth_token: None,
            activity_timeout: Duration::from_secs(DEFAULT_ACTIVITY_TIMEOUT_SECS),
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }
}

impl ConnectOptions {
    /// Create options for a cluster with defaults for everything else
    pub fn for_cluster(cluster: impl Into<String>) -> Self {
        Self {
            cluster: cluster.into(),
            ..Default::default()
        }
    }

    /// Build the WebSocket URL for an app key
    pub fn socket_url(&self, key: &str) -> RealtimeResult<Url> {
        let scheme = if self.force_tls { "wss" } else { "ws" };
        let host = match &self.host {
            Some(host) => host.clone(),
            None => format!("ws-{}.pusher.com", self.cluster),
        };
        let port = self.port.unwrap_or(if self.force_tls { 443 } else { 80 });

        let raw = format!(
            "{}://{}:{}/app/{}?protocol={}&client={}&version={}&flash=false",
            scheme,
            host,
            port,
            key,
            PROTOCOL_VERSION,
            CLIENT_NAME,
            env!("CARGO_PKG_VERSION")
        );

        Url::parse(&raw)
            .map_err(|e| RealtimeError::Configuration(format!("invalid socket url {}: {}", raw, e)))
    }
}

/// Everything needed to open the realtime connection
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RealtimeConfig {
    pub app_key: String,
    pub options: ConnectOptions,
}

impl RealtimeConfig {
    /// Load configuration from process environment variables
    pub fn from_env() -> Self {
        Self::from_vars(|name| env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_vars<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let defaults = ConnectOptions::default();

        let force_tls = match get("PUSHER_FORCE_TLS") {
            Some(v) => !matches!(v.to_ascii_lowercase().as_str(), "0" | "false" | "no" | "off"),
            None => defaults.force_tls,
        };

        let auth_endpoint = get("PUSHER_AUTH_ENDPOINT").and_then(|raw| match Url::parse(&raw) {
            Ok(url) => Some(url),
            Err(e) => {
                tracing::warn!(value = %raw, error = %e, "ignoring invalid PUSHER_AUTH_ENDPOINT");
                None
            }
        });

        let options = ConnectOptions {
            cluster: get("PUSHER_CLUSTER").unwrap_or(defaults.cluster),
            force_tls,
            host: get("PUSHER_HOST"),
            port: get("PUSHER_PORT").and_then(|v| v.parse().ok()),
            auth_endpoint,
            auth_token: get("PUSHER_AUTH_TOKEN"),
            activity_timeout: get("PUSHER_ACTIVITY_TIMEOUT_SECS")
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.activity_timeout),
            max_retries: get("PUSHER_MAX_RETRIES")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_retries),
        };

        Self {
            app_key: get("PUSHER_APP_KEY").unwrap_or_default(),
            options,
        }
    }
}

/// Settings of the `procure-sync` binary itself
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Bind address of the status API
    pub addr: SocketAddr,
    /// Directory of the JSONL fallback cache
    pub cache_dir: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([127, 0, 0, 1], DEFAULT_PORT)),
            cache_dir: PathBuf::from(DEFAULT_CACHE_DIR),
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> RealtimeResult<Self> {
        Self::from_vars(|name| env::var(name).ok())
    }

    /// An unparsable bind address is a configuration error; a relative cache
    /// directory is kept relative to the working directory.
    pub fn from_vars<F>(lookup: F) -> RealtimeResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let addr = match lookup("PROCURE_SYNC_ADDR").map(|v| v.trim().to_string()) {
            Some(raw) if !raw.is_empty() => raw.parse().map_err(|e| {
                RealtimeError::Configuration(format!("invalid PROCURE_SYNC_ADDR {}: {}", raw, e))
            })?,
            _ => defaults.addr,
        };
        let cache_dir = lookup("PROCURE_SYNC_CACHE_DIR")
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .unwrap_or(defaults.cache_dir);

        Ok(Self { addr, cache_dir })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = RealtimeConfig::from_vars(vars(&[]));
        assert!(config.app_key.is_empty());
        assert_eq!(config.options, ConnectOptions::default());
    }

    #[test]
    fn test_reads_all_variables() {
        let config = RealtimeConfig::from_vars(vars(&[
            ("PUSHER_APP_KEY", " abc123 "),
            ("PUSHER_CLUSTER", "eu"),
            ("PUSHER_FORCE_TLS", "false"),
            ("PUSHER_PORT", "6001"),
            ("PUSHER_HOST", "localhost"),
            ("PUSHER_AUTH_ENDPOINT", "https://app.example.com/broadcasting/auth"),
            ("PUSHER_AUTH_TOKEN", "tok"),
            ("PUSHER_ACTIVITY_TIMEOUT_SECS", "30"),
            ("PUSHER_MAX_RETRIES", "2"),
        ]));

        assert_eq!(config.app_key, "abc123");
        assert_eq!(config.options.cluster, "eu");
        assert!(!config.options.force_tls);
        assert_eq!(config.options.port, Some(6001));
        assert_eq!(config.options.host.as_deref(), Some("localhost"));
        assert!(config.options.auth_endpoint.is_some());
        assert_eq!(config.options.activity_timeout, Duration::from_secs(30));
        assert_eq!(config.options.max_retries, 2);
    }

    #[test]
    fn test_invalid_auth_endpoint_is_ignored() {
        let config = RealtimeConfig::from_vars(vars(&[("PUSHER_AUTH_ENDPOINT", "not a url")]));
        assert!(config.options.auth_endpoint.is_none());
    }

    #[test]
    fn test_socket_url_tls_cluster() {
        let url = ConnectOptions::for_cluster("eu").socket_url("key1").unwrap();
        assert_eq!(url.scheme(), "wss");
        assert_eq!(url.host_str(), Some("ws-eu.pusher.com"));
        assert_eq!(url.path(), "/app/key1");
        assert!(url.query().unwrap().contains("protocol=7"));
    }

    #[test]
    fn test_socket_url_host_override() {
        let options = ConnectOptions {
            force_tls: false,
            host: Some("127.0.0.1".to_string()),
            port: Some(6001),
            ..Default::default()
        };
        let url = options.socket_url("local").unwrap();
        assert_eq!(url.as_str().split('?').next(), Some("ws://127.0.0.1:6001/app/local"));
    }

    #[test]
    fn test_server_config() {
        let config = ServerConfig::from_vars(vars(&[])).unwrap();
        assert_eq!(config.addr.port(), 3030);
        assert_eq!(config.cache_dir, PathBuf::from(".cache/procure-sync"));

        let config = ServerConfig::from_vars(vars(&[
            ("PROCURE_SYNC_ADDR", "0.0.0.0:8080"),
            ("PROCURE_SYNC_CACHE_DIR", "/var/cache/sync"),
        ]))
        .unwrap();
        assert_eq!(config.addr.port(), 8080);
        assert_eq!(config.cache_dir, PathBuf::from("/var/cache/sync"));

        assert!(matches!(
            ServerConfig::from_vars(vars(&[("PROCURE_SYNC_ADDR", "nowhere")])),
            Err(RealtimeError::Configuration(_))
        ));
    }
}
