use anyhow::{Context, Result};
use once_cell::sync::OnceCell;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

static TRACING_INIT: OnceCell<PathBuf> = OnceCell::new();

/// Log file name for a process started at `now`, e.g. `2024-05-01_13-45-09.log`.
pub fn log_file_name(now: chrono::DateTime<chrono::Local>) -> String {
    format!("{}.log", now.format("%Y-%m-%d_%H-%M-%S"))
}

/// Installs the global subscriber: console output plus one timestamped file under `log_dir`.
/// `RUST_LOG` wins over `default_level`. Returns the path of the log file; later calls are no-ops
/// returning the first path.
pub fn init_tracing(service: &str, log_dir: &Path, default_level: &str) -> Result<PathBuf> {
    let path = TRACING_INIT.get_or_try_init(|| -> Result<PathBuf> {
        std::fs::create_dir_all(log_dir).with_context(|| format!("creating log dir {}", log_dir.display()))?;
        let path = log_dir.join(log_file_name(chrono::Local::now()));
        let file = File::create(&path).with_context(|| format!("creating log file {}", path.display()))?;

        let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
        let json = std::env::var("GATEWAY_JSON_LOG").ok().map(|v| v=="1" || v.eq_ignore_ascii_case("true")).unwrap_or(false);
        let console = if json {
            fmt::layer().json().flatten_event(true).with_current_span(true).with_span_list(false).boxed()
        } else {
            fmt::layer().with_target(true).with_line_number(true).boxed()
        };
        let file_layer = fmt::layer().with_ansi(false).with_target(true).with_writer(Arc::new(file));
        tracing_subscriber::registry().with(env_filter).with(console).with(file_layer).try_init()?;
        Ok(path)
    })?;
    info!(target: "gateway", service, log_file = %path.display(), "tracing initialized");
    Ok(path.clone())
}
