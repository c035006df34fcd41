//! Domain Layer - Core feed and negotiation types.
//!
//! This layer contains the price feed reducer and the negotiation state
//! vocabulary with no transport dependencies. Everything here is pure Rust
//! and can be exercised without a peer connection.

/// Price tick parsing, snapshot and bounded history.
pub mod feed;

/// Negotiation states, session descriptions and lifecycle events.
pub mod negotiation;
