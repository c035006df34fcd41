//! Application Layer - Negotiation engine, session driver and ports.
//!
//! The services here depend only on the domain and on the port traits; the
//! concrete transport and signaling adapters live in infrastructure.

/// Port interfaces for the transport substrate, signaling and observers.
pub mod ports;

/// Negotiation engine and feed session driver.
pub mod services;
