//! Client Configuration Settings
//!
//! Loaded from environment variables. Unparseable optional values fall back
//! to their defaults; values that would make the client meaningless are
//! rejected.

use std::time::Duration;

use crate::domain::feed::DEFAULT_HISTORY_LEN;

/// Default signaling endpoint.
pub const DEFAULT_SIGNALING_URL: &str = "http://localhost:8182/offer";

/// Default data channel label.
pub const DEFAULT_CHANNEL_LABEL: &str = "marketPx";

/// Signaling exchange settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignalingSettings {
    /// Endpoint receiving the offer.
    pub url: String,
    /// HTTP request timeout (`None` = wait indefinitely).
    pub timeout: Option<Duration>,
}

impl Default for SignalingSettings {
    fn default() -> Self {
        Self {
            url: DEFAULT_SIGNALING_URL.to_string(),
            timeout: None,
        }
    }
}

/// Transport settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportSettings {
    /// STUN/TURN server URLs.
    pub ice_servers: Vec<String>,
    /// Label of the price data channel.
    pub channel_label: String,
}

impl Default for TransportSettings {
    fn default() -> Self {
        Self {
            ice_servers: Vec::new(),
            channel_label: DEFAULT_CHANNEL_LABEL.to_string(),
        }
    }
}

/// Complete client configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Signaling exchange settings.
    pub signaling: SignalingSettings,
    /// Transport settings.
    pub transport: TransportSettings,
    /// Number of retained update records.
    pub history_len: usize,
    /// Prometheus listener port (0 = disabled).
    pub metrics_port: u16,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            signaling: SignalingSettings::default(),
            transport: TransportSettings::default(),
            history_len: DEFAULT_HISTORY_LEN,
            metrics_port: 0,
        }
    }
}

impl ClientConfig {
    /// Create configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if `PX_HISTORY_LEN` is zero or a URL is empty.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create configuration through `lookup`.
    ///
    /// # Errors
    ///
    /// See [`ClientConfig::from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let url = lookup("PX_SIGNALING_URL").unwrap_or(defaults.signaling.url);
        if url.trim().is_empty() {
            return Err(ConfigError::EmptyValue("PX_SIGNALING_URL".to_string()));
        }

        let history_len = parse_or(&lookup, "PX_HISTORY_LEN", defaults.history_len);
        if history_len == 0 {
            return Err(ConfigError::InvalidValue {
                key: "PX_HISTORY_LEN".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }

        let timeout_secs: u64 = parse_or(&lookup, "PX_SIGNALING_TIMEOUT_SECS", 0);

        let channel_label = lookup("PX_CHANNEL_LABEL")
            .filter(|label| !label.is_empty())
            .unwrap_or(defaults.transport.channel_label);

        let ice_servers = lookup("PX_ICE_SERVERS")
            .map(|raw| parse_list(&raw))
            .unwrap_or_default();

        Ok(Self {
            signaling: SignalingSettings {
                url,
                timeout: (timeout_secs > 0).then(|| Duration::from_secs(timeout_secs)),
            },
            transport: TransportSettings {
                ice_servers,
                channel_label,
            },
            history_len,
            metrics_port: parse_or(&lookup, "PX_METRICS_PORT", defaults.metrics_port),
        })
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Environment variable has empty value.
    #[error("environment variable {0} cannot be empty")]
    EmptyValue(String),
    /// Environment variable has an unusable value.
    #[error("invalid value for {key}: {reason}")]
    InvalidValue {
        /// Variable name.
        key: String,
        /// Why it was rejected.
        reason: String,
    },
}

fn parse_or<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> T {
    lookup(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<ClientConfig, ConfigError> {
        let vars: HashMap<&str, &str> = vars.iter().copied().collect();
        ClientConfig::from_lookup(|key| vars.get(key).map(|v| (*v).to_string()))
    }

    #[test]
    fn defaults_when_unset() {
        let config = config(&[]).unwrap();
        assert_eq!(config, ClientConfig::default());
        assert_eq!(config.signaling.url, DEFAULT_SIGNALING_URL);
        assert_eq!(config.signaling.timeout, None);
        assert_eq!(config.history_len, 10);
        assert_eq!(config.transport.channel_label, "marketPx");
        assert!(config.transport.ice_servers.is_empty());
        assert_eq!(config.metrics_port, 0);
    }

    #[test]
    fn reads_overrides() {
        let config = config(&[
            ("PX_SIGNALING_URL", "http://10.0.0.5:9000/offer"),
            ("PX_HISTORY_LEN", "25"),
            ("PX_CHANNEL_LABEL", "futuresPx"),
            ("PX_ICE_SERVERS", "stun:stun.l.google.com:19302, ,turn:relay:3478"),
            ("PX_SIGNALING_TIMEOUT_SECS", "15"),
            ("PX_METRICS_PORT", "9464"),
        ])
        .unwrap();

        assert_eq!(config.signaling.url, "http://10.0.0.5:9000/offer");
        assert_eq!(config.signaling.timeout, Some(Duration::from_secs(15)));
        assert_eq!(config.history_len, 25);
        assert_eq!(config.transport.channel_label, "futuresPx");
        assert_eq!(
            config.transport.ice_servers,
            vec!["stun:stun.l.google.com:19302", "turn:relay:3478"]
        );
        assert_eq!(config.metrics_port, 9464);
    }

    #[test]
    fn unparseable_numbers_fall_back() {
        let config = config(&[
            ("PX_HISTORY_LEN", "lots"),
            ("PX_METRICS_PORT", "99999"),
            ("PX_SIGNALING_TIMEOUT_SECS", "-1"),
        ])
        .unwrap();
        assert_eq!(config.history_len, DEFAULT_HISTORY_LEN);
        assert_eq!(config.metrics_port, 0);
        assert_eq!(config.signaling.timeout, None);
    }

    #[test]
    fn zero_history_is_rejected() {
        let err = config(&[("PX_HISTORY_LEN", "0")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "PX_HISTORY_LEN"));
    }

    #[test]
    fn empty_url_is_rejected() {
        let err = config(&[("PX_SIGNALING_URL", "  ")]).unwrap_err();
        assert!(matches!(err, ConfigError::EmptyValue(_)));
    }
}
