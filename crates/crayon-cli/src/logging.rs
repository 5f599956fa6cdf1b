//! Tracing subscriber setup

use crate::cli::LogLevel;
use crayon_config::{LogFormat, LoggingConfig};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

/// Level to log at: `--log-level` wins, then `--verbose`, then the config
/// file. An unparseable config level falls back to `warn`.
pub fn resolve_level(flag: Option<LogLevel>, verbose: bool, config: &LoggingConfig) -> LevelFilter {
    if let Some(level) = flag {
        return level.into();
    }
    if verbose {
        return LevelFilter::DEBUG;
    }
    config.level.parse().unwrap_or(LevelFilter::WARN)
}

/// Install the global subscriber. Only the crayon crates log at `level`;
/// everything else stays at `warn` unless `RUST_LOG` says otherwise.
pub fn init(level: LevelFilter, format: LogFormat) {
    let directives = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        format!(
            "warn,crayon_core={level},crayon_config={level},crayon_lua={level},crayon_cli={level}"
        )
    });
    let filter = EnvFilter::new(directives);

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    let result = match format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    if let Err(e) = result {
        eprintln!("Logging already initialized: {e}");
    }
}
