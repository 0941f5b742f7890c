//! Bridge configuration
//!
//! Connection parameters are read once from the environment (or CLI flags)
//! at startup and frozen into an immutable [`BridgeConfig`] that is passed
//! explicitly into the session manager and forwarder. There is no ambient
//! global configuration state.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use url::Url;

/// Port assumed when the connection string omits one.
pub const DEFAULT_MQTT_PORT: u16 = 1883;

/// Fatal configuration errors. These exit the process before any network
/// operation is attempted; nothing here is retried.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unsupported broker scheme '{scheme}' in '{input}' (expected tcp:// or mqtt://)")]
    UnsupportedScheme { scheme: String, input: String },

    #[error("invalid broker address: {0}")]
    InvalidBrokerUrl(String),

    #[error("invalid forward URL '{input}': {reason}")]
    InvalidTarget { input: String, reason: String },
}

/// Transports the bridge knows how to speak to the broker over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrokerTransport {
    /// Plain TCP, written as `tcp://` or the conventional `mqtt://` alias.
    Tcp,
}

impl FromStr for BrokerTransport {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "tcp" | "mqtt" => Ok(BrokerTransport::Tcp),
            _ => Err(()),
        }
    }
}

/// Where the broker lives, parsed once at startup from
/// `scheme://host[:port]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionDescriptor {
    pub transport: BrokerTransport,
    pub host: String,
    pub port: u16,
}

impl fmt::Display for ConnectionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Parse a broker connection string into a [`ConnectionDescriptor`].
///
/// A string without `://` defaults to the `tcp` scheme; a missing port
/// defaults to [`DEFAULT_MQTT_PORT`]. Any scheme outside the supported set
/// fails with [`ConfigError::UnsupportedScheme`].
pub fn parse_connection(input: &str) -> Result<ConnectionDescriptor, ConfigError> {
    let trimmed = input.trim();
    let with_scheme = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("tcp://{trimmed}")
    };

    let url =
        Url::parse(&with_scheme).map_err(|_| ConfigError::InvalidBrokerUrl(input.to_string()))?;

    let transport = url
        .scheme()
        .parse::<BrokerTransport>()
        .map_err(|()| ConfigError::UnsupportedScheme {
            scheme: url.scheme().to_string(),
            input: input.to_string(),
        })?;

    // Non-special schemes can parse with an empty host; reject both shapes
    let host = match url.host_str() {
        Some(host) if !host.is_empty() => host.to_string(),
        _ => return Err(ConfigError::InvalidBrokerUrl(input.to_string())),
    };
    let port = url.port().unwrap_or(DEFAULT_MQTT_PORT);

    Ok(ConnectionDescriptor {
        transport,
        host,
        port,
    })
}

/// Normalize an optional delivery target.
///
/// An unset, empty, or whitespace-only value means "log only, never
/// forward" and is a valid configuration, not an error.
pub fn parse_target(input: Option<&str>) -> Result<Option<Url>, ConfigError> {
    match input.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(s) => Url::parse(s)
            .map(Some)
            .map_err(|e| ConfigError::InvalidTarget {
                input: s.to_string(),
                reason: e.to_string(),
            }),
    }
}

/// Immutable bridge configuration, built once at startup.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Parsed broker address.
    pub broker: ConnectionDescriptor,
    /// Topic pattern, subscribed to verbatim (broker-native wildcards).
    pub topic: String,
    /// Delivery target; `None` means decoded events are logged but never
    /// forwarded.
    pub target: Option<Url>,
}

impl BridgeConfig {
    pub fn from_parts(
        broker_url: &str,
        topic: &str,
        forward_url: Option<&str>,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            broker: parse_connection(broker_url)?,
            topic: topic.to_string(),
            target: parse_target(forward_url)?,
        })
    }
}
