//! Structured logging init, mirroring the corpus's `tracing_subscriber`
//! registry setup (env filter + a formatting layer chosen by a `json`
//! toggle). No distributed-tracing exporter is wired up here: the core has
//! no service boundary of its own to export spans across.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Clone, Copy, Debug, Default)]
pub struct LoggingSettings {
    pub json: bool,
}

/// Initializes the global `tracing` subscriber. Should be called once, near
/// the start of the embedding process's `main`.
pub fn init_logs(settings: LoggingSettings) {
    let env_filter = EnvFilter::builder()
        .with_default_directive(tracing::level_filters::LevelFilter::INFO.into())
        .from_env_lossy();

    let registry = tracing_subscriber::registry().with(env_filter);

    if settings.json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer()).init();
    }
}
