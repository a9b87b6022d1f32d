//! Command-line and environment configuration.
//!
//! Every option can be supplied as a flag or through its environment variable. Values are
//! read once at startup and validated into [`Settings`].

// std
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
// crates.io
use clap::{ArgAction, Parser, ValueEnum};
// self
use crate::{
	_prelude::*,
	auth::Credentials,
	error::ConfigError,
	http::DEFAULT_UPSTREAM_TIMEOUT,
	lifecycle::DEFAULT_SAFETY_MARGIN,
};

/// Spotify's token endpoint.
pub const DEFAULT_TOKEN_URL: &str = "https://accounts.spotify.com/api/token";
/// Spotify's Web API base.
pub const DEFAULT_API_BASE_URL: &str = "https://api.spotify.com/v1";

/// Log output format.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
	/// Human-readable lines.
	#[default]
	Text,
	/// One JSON object per event.
	Json,
}

/// Credential relay between a handheld device and the Spotify Web API.
#[derive(Clone, Parser)]
#[command(name = "spotify-relay", version, about, long_about = None)]
pub struct Cli {
	/// Address to bind to.
	#[arg(long, env = "HOST", default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED))]
	pub host: IpAddr,

	/// Port to listen on.
	#[arg(short, long, env = "PORT", default_value_t = 10000)]
	pub port: u16,

	/// OAuth client identifier (single-tenant mode).
	#[arg(long, env = "SPOTIFY_CLIENT_ID")]
	pub client_id: Option<String>,

	/// OAuth client secret (single-tenant mode).
	#[arg(long, env = "SPOTIFY_CLIENT_SECRET", hide_env_values = true)]
	pub client_secret: Option<String>,

	/// Long-lived refresh token (single-tenant mode).
	#[arg(long, env = "SPOTIFY_REFRESH_TOKEN", hide_env_values = true)]
	pub refresh_token: Option<String>,

	/// Token endpoint of the authorization server.
	#[arg(long, env = "RELAY_TOKEN_URL", default_value = DEFAULT_TOKEN_URL)]
	pub token_url: Url,

	/// Base URL of the resource API.
	#[arg(long, env = "RELAY_API_BASE_URL", default_value = DEFAULT_API_BASE_URL)]
	pub api_base_url: Url,

	/// Seconds before expiry at which the access token is renewed.
	#[arg(
		long,
		env = "RELAY_SAFETY_MARGIN_SECS",
		default_value_t = DEFAULT_SAFETY_MARGIN.whole_seconds().unsigned_abs()
	)]
	pub safety_margin_secs: u64,

	/// Upper bound for every upstream call, in seconds.
	#[arg(
		long,
		env = "RELAY_UPSTREAM_TIMEOUT_SECS",
		default_value_t = DEFAULT_UPSTREAM_TIMEOUT.as_secs()
	)]
	pub upstream_timeout_secs: u64,

	/// Refresh once before accepting connections (single-tenant mode only).
	#[arg(long, env = "RELAY_STARTUP_REFRESH", default_value_t = true, action = ArgAction::Set)]
	pub startup_refresh: bool,

	/// Disable the permissive CORS layer.
	#[arg(long, env = "RELAY_DISABLE_CORS")]
	pub disable_cors: bool,

	/// Log level (trace, debug, info, warn, error); `RUST_LOG` overrides it.
	#[arg(long, env = "RELAY_LOG_LEVEL", default_value = "info")]
	pub log_level: String,

	/// Log format.
	#[arg(long, env = "RELAY_LOG_FORMAT", value_enum, default_value_t)]
	pub log_format: LogFormat,
}
impl Cli {
	/// Validates the parsed options.
	pub fn settings(&self) -> Result<Settings, ConfigError> {
		if self.upstream_timeout_secs == 0 {
			return Err(ConfigError::ZeroDuration { setting: "RELAY_UPSTREAM_TIMEOUT_SECS" });
		}

		let safety_margin = i64::try_from(self.safety_margin_secs)
			.map(Duration::seconds)
			.map_err(|_| ConfigError::DurationOutOfRange { setting: "RELAY_SAFETY_MARGIN_SECS" })?;

		Ok(Settings {
			bind_addr: SocketAddr::new(self.host, self.port),
			credentials: self.credentials()?,
			token_endpoint: self.token_url.clone(),
			api_base: self.api_base_url.clone(),
			safety_margin,
			upstream_timeout: StdDuration::from_secs(self.upstream_timeout_secs),
			startup_refresh: self.startup_refresh,
			cors: !self.disable_cors,
		})
	}

	fn credentials(&self) -> Result<Option<Credentials>, ConfigError> {
		match (&self.client_id, &self.client_secret, &self.refresh_token) {
			(None, None, None) => Ok(None),
			(Some(id), Some(secret), Some(refresh)) =>
				Ok(Some(Credentials::new(id.as_str(), secret.as_str(), refresh.as_str())?)),
			(None, ..) => Err(ConfigError::PartialCredentials { missing: "SPOTIFY_CLIENT_ID" }),
			(_, None, _) =>
				Err(ConfigError::PartialCredentials { missing: "SPOTIFY_CLIENT_SECRET" }),
			(.., None) =>
				Err(ConfigError::PartialCredentials { missing: "SPOTIFY_REFRESH_TOKEN" }),
		}
	}
}

/// Validated runtime settings.
#[derive(Clone, Debug)]
pub struct Settings {
	/// Listener address.
	pub bind_addr: SocketAddr,
	/// Fixed credentials; `None` selects multi-tenant mode.
	pub credentials: Option<Credentials>,
	/// Token endpoint of the authorization server.
	pub token_endpoint: Url,
	/// Base URL of the resource API.
	pub api_base: Url,
	/// Renewal window before expiry.
	pub safety_margin: Duration,
	/// Per-request upstream timeout.
	pub upstream_timeout: StdDuration,
	/// Whether to refresh once before binding.
	pub startup_refresh: bool,
	/// Whether the permissive CORS layer is installed.
	pub cors: bool,
}
