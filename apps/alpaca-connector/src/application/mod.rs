//! Application Layer - Ports and the connector service.
//!
//! The connector talks to Alpaca only through the ports defined here, so it
//! can be driven by mocks in tests.

/// Port interfaces for the REST API and the live bar stream.
pub mod ports;

/// The market data connector.
pub mod services;
