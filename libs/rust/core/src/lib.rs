//! Core shared utilities for gateway services: layered configuration and tracing setup.

pub mod config;
pub mod telemetry;

pub use config::{load_config, load_config_from, GatewayConfig, ServerConfig};
pub use telemetry::init_tracing;
