//! Configuration Module
//!
//! Environment-driven configuration for the feed client.

mod settings;

pub use settings::{
    ClientConfig, ConfigError, DEFAULT_CHANNEL_LABEL, DEFAULT_SIGNALING_URL, SignalingSettings,
    TransportSettings,
};
