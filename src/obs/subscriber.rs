// crates.io
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};
// self
use crate::{config::LogFormat, error::ConfigError};

/// Installs the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over `level` when set.
pub fn setup_tracing(level: &str, format: LogFormat) -> Result<(), ConfigError> {
	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
	let registry = tracing_subscriber::registry().with(filter);

	match format {
		LogFormat::Json => registry.with(fmt::layer().json()).try_init(),
		LogFormat::Text => registry.with(fmt::layer()).try_init(),
	}
	.map_err(ConfigError::tracing)
}
