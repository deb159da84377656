//! Configuration Module
//!
//! Explicit connector configuration, with an environment-variable constructor.

mod settings;

pub use settings::{
    AlpacaConfig, Credentials, DEFAULT_DATA_URL, DataFeed, RetryConfig, WebSocketSettings,
    metrics_port_from_env,
};
