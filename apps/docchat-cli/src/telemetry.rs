use anyhow::anyhow;
use docchat_core::config::LogSettings;
use tracing_subscriber::EnvFilter;

/// Install the global subscriber. `RUST_LOG` wins over the configured level.
pub fn init_tracing(settings: &LogSettings) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&settings.level))?;
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);
    let installed = if settings.json { builder.json().try_init() } else { builder.compact().try_init() };
    installed.map_err(|e| anyhow!("failed to install tracing subscriber: {e}"))
}
