//! Layered gateway configuration: built-in defaults, then an optional YAML file,
//! then `GATEWAY__*` environment overrides.

use anyhow::Result;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE_ENV: &str = "GATEWAY_CONFIG_FILE";
pub const DEFAULT_CONFIG_FILE: &str = "config.yaml";
const ENV_PREFIX: &str = "GATEWAY";

#[derive(Debug, Deserialize, Clone)]
pub struct GatewayConfig {
    pub model_dir: PathBuf,
    pub log_dir: PathBuf,
    pub log_level: String,
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl GatewayConfig {
    /// `host:port`, with IPv6 literals bracketed.
    pub fn bind_addr(&self) -> String {
        let host = self.server.host.as_str();
        if host.contains(':') && !host.starts_with('[') {
            format!("[{}]:{}", host, self.server.port)
        } else {
            format!("{}:{}", host, self.server.port)
        }
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            model_dir: PathBuf::from("models"),
            log_dir: PathBuf::from("logs"),
            log_level: "info".into(),
            server: ServerConfig { host: "0.0.0.0".into(), port: 8000 },
        }
    }
}

/// Loads config from `$GATEWAY_CONFIG_FILE` (default `config.yaml`) plus the process environment.
pub fn load_config() -> Result<GatewayConfig> {
    let file = std::env::var(CONFIG_FILE_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_FILE.into());
    load_config_from(Some(Path::new(&file)), None)
}

/// `env` replaces the process environment as the override source when given.
pub fn load_config_from(file: Option<&Path>, env: Option<HashMap<String, String>>) -> Result<GatewayConfig> {
    let defaults = GatewayConfig::default();
    let mut builder = config::Config::builder()
        .set_default("model_dir", defaults.model_dir.to_string_lossy().into_owned())?
        .set_default("log_dir", defaults.log_dir.to_string_lossy().into_owned())?
        .set_default("log_level", defaults.log_level.as_str())?
        .set_default("server.host", defaults.server.host.as_str())?
        .set_default("server.port", i64::from(defaults.server.port))?;
    if let Some(path) = file {
        builder = builder.add_source(config::File::from(path).format(config::FileFormat::Yaml).required(false));
    }
    builder = builder.add_source(
        config::Environment::with_prefix(ENV_PREFIX)
            .separator("__")
            .try_parsing(true)
            .source(env),
    );
    let cfg: GatewayConfig = builder.build()?.try_deserialize()?;
    Ok(cfg)
}
