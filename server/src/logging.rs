use tracing::info;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt};

use crate::config::LoggingSettings;

/// Installs the global subscriber. `RUST_LOG` wins over the configured level.
pub fn setup_logging(
    settings: &LoggingSettings,
    json_format: bool,
) -> Result<(), TryInitError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&settings.level));
    let registry = tracing_subscriber::registry().with(filter);

    if json_format || settings.json_format {
        registry
            .with(fmt::layer().json().with_file(false).with_line_number(false).with_thread_names(true))
            .try_init()?;
    } else {
        registry
            .with(fmt::layer().with_file(false).with_line_number(false).with_target(true))
            .try_init()?;
    }

    info!(level = %settings.level, json = json_format || settings.json_format, "Logging initialized");
    Ok(())
}
