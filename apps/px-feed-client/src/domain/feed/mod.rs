//! Price Feed Types
//!
//! Inbound data channel frames are single lines of the form `<key> <value>`.
//! A frame is parsed into a [`PriceTick`] and folded into a [`FeedState`],
//! which pairs the latest value per key with a bounded arrival history.
//!
//! Parsing and applying are separate steps: [`PriceTick::parse`] rejects
//! frames that do not match the two-token shape, and [`FeedState::apply`] is
//! total over well-formed ticks.

mod history;
mod state;
mod view;

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub use history::{BoundedHistory, DEFAULT_HISTORY_LEN, UpdateRecord};
pub use state::{FeedState, PriceSnapshot};
pub use view::{HistoryRow, HistoryView, UNAVAILABLE};

// =============================================================================
// Errors
// =============================================================================

/// Reasons an inbound frame is not a valid price tick.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MalformedMessageError {
    /// Frame has no whitespace between key and value.
    #[error("missing separator in frame: {raw:?}")]
    MissingSeparator {
        /// The offending frame.
        raw: String,
    },

    /// Frame starts with whitespace or is empty.
    #[error("empty security key in frame: {raw:?}")]
    EmptyKey {
        /// The offending frame.
        raw: String,
    },

    /// Value token is not a decimal number.
    #[error("invalid value {value:?} for {key}")]
    InvalidValue {
        /// Security key of the frame.
        key: String,
        /// The unparseable value token.
        value: String,
    },

    /// Frame payload is not valid UTF-8 text.
    #[error("frame is not valid UTF-8 ({len} bytes)")]
    NotText {
        /// Payload length in bytes.
        len: usize,
    },
}

impl MalformedMessageError {
    /// Short label used for metrics.
    #[must_use]
    pub const fn reason(&self) -> &'static str {
        match self {
            Self::MissingSeparator { .. } => "missing_separator",
            Self::EmptyKey { .. } => "empty_key",
            Self::InvalidValue { .. } => "invalid_value",
            Self::NotText { .. } => "not_text",
        }
    }
}

// =============================================================================
// Security Key
// =============================================================================

/// Non-empty security key (e.g. `AAPL`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SecurityKey(String);

impl SecurityKey {
    /// Create a key, returning `None` when empty.
    #[must_use]
    pub fn new(key: impl Into<String>) -> Option<Self> {
        let key = key.into();
        if key.is_empty() { None } else { Some(Self(key)) }
    }

    /// Key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SecurityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::borrow::Borrow<str> for SecurityKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

// =============================================================================
// Price Tick
// =============================================================================

/// One parsed inbound frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceTick {
    /// Security key.
    pub key: SecurityKey,
    /// Latest value for the key.
    pub value: Decimal,
    /// Original frame text.
    pub raw: String,
}

impl PriceTick {
    /// Parse a `<key> <value>` frame.
    ///
    /// The frame is split on the first whitespace run only; anything after a
    /// second token is ignored.
    ///
    /// # Errors
    ///
    /// Returns [`MalformedMessageError`] when the key or value is missing or
    /// the value is not a decimal number.
    pub fn parse(raw: &str) -> Result<Self, MalformedMessageError> {
        if raw.is_empty() || raw.starts_with(char::is_whitespace) {
            return Err(MalformedMessageError::EmptyKey {
                raw: raw.to_string(),
            });
        }

        let Some((key, rest)) = raw.split_once(char::is_whitespace) else {
            return Err(MalformedMessageError::MissingSeparator {
                raw: raw.to_string(),
            });
        };

        let value_token = rest
            .trim_start()
            .split(char::is_whitespace)
            .next()
            .unwrap_or_default();
        if value_token.is_empty() {
            return Err(MalformedMessageError::MissingSeparator {
                raw: raw.to_string(),
            });
        }

        let value = parse_value(value_token).ok_or_else(|| MalformedMessageError::InvalidValue {
            key: key.to_string(),
            value: value_token.to_string(),
        })?;

        let key = SecurityKey::new(key).ok_or_else(|| MalformedMessageError::EmptyKey {
            raw: raw.to_string(),
        })?;

        Ok(Self {
            key,
            value,
            raw: raw.to_string(),
        })
    }

    /// Parse a binary frame, rejecting payloads that are not UTF-8.
    ///
    /// # Errors
    ///
    /// Returns [`MalformedMessageError::NotText`] for non-UTF-8 payloads and
    /// the errors of [`PriceTick::parse`] otherwise.
    pub fn parse_bytes(payload: &[u8]) -> Result<Self, MalformedMessageError> {
        let text = std::str::from_utf8(payload)
            .map_err(|_| MalformedMessageError::NotText { len: payload.len() })?;
        Self::parse(text)
    }
}

/// Accepts plain and scientific notation (`101.5`, `1e3`).
///
/// `Decimal::from_str` tolerates `_` digit separators, so the token's
/// alphabet is checked first.
fn parse_value(token: &str) -> Option<Decimal> {
    if !token
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | '.' | 'e' | 'E'))
    {
        return None;
    }
    Decimal::from_str(token)
        .or_else(|_| Decimal::from_scientific(token))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn parses_key_and_value() {
        let tick = PriceTick::parse("AAPL 100").unwrap();
        assert_eq!(tick.key.as_str(), "AAPL");
        assert_eq!(tick.value, Decimal::from(100));
        assert_eq!(tick.raw, "AAPL 100");
    }

    #[test]
    fn splits_on_first_whitespace_run_only() {
        let tick = PriceTick::parse("NQ \t  18250.25 extra tokens").unwrap();
        assert_eq!(tick.key.as_str(), "NQ");
        assert_eq!(tick.value, Decimal::from_str("18250.25").unwrap());
        assert_eq!(tick.raw, "NQ \t  18250.25 extra tokens");
    }

    #[test]
    fn accepts_scientific_notation() {
        let tick = PriceTick::parse("ES 5.1e3").unwrap();
        assert_eq!(tick.value, Decimal::from(5100));
    }

    #[test_case("AAPL" ; "no separator")]
    #[test_case("AAPL " ; "trailing separator only")]
    fn rejects_missing_value(raw: &str) {
        assert!(matches!(
            PriceTick::parse(raw),
            Err(MalformedMessageError::MissingSeparator { .. })
        ));
    }

    #[test_case("" ; "empty frame")]
    #[test_case(" 100" ; "leading whitespace")]
    fn rejects_empty_key(raw: &str) {
        assert!(matches!(
            PriceTick::parse(raw),
            Err(MalformedMessageError::EmptyKey { .. })
        ));
    }

    #[test_case("AAPL abc" ; "alphabetic")]
    #[test_case("AAPL NaN" ; "nan")]
    #[test_case("AAPL 1.2.3" ; "two dots")]
    #[test_case("AAPL 1_000" ; "underscore")]
    #[test_case("AAPL 1_2_3" ; "repeated underscores")]
    fn rejects_non_numeric_value(raw: &str) {
        let err = PriceTick::parse(raw).unwrap_err();
        assert_eq!(err.reason(), "invalid_value");
    }

    #[test]
    fn rejects_binary_payload() {
        let err = PriceTick::parse_bytes(&[0xff, 0xfe, 0x00]).unwrap_err();
        assert_eq!(err, MalformedMessageError::NotText { len: 3 });
    }

    #[test]
    fn parses_text_payload() {
        let tick = PriceTick::parse_bytes(b"MSFT 200").unwrap();
        assert_eq!(tick.key.as_str(), "MSFT");
    }

    #[test]
    fn security_key_rejects_empty() {
        assert!(SecurityKey::new("").is_none());
        assert_eq!(SecurityKey::new("GOOG").unwrap().to_string(), "GOOG");
    }
}
