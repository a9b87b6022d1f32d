//! HTTP surface the device talks to.
//!
//! [`router`] wires the routes onto an [`AppState`]; [`run`] builds the state from
//! [`Settings`], performs the optional startup refresh, and serves until Ctrl-C or SIGTERM.

pub mod response;
pub mod state;

mod routes;

pub use state::{AppState, TenantMode};

// crates.io
use axum::{
	Router,
	routing::{any, get, post},
};
use tokio::{net::TcpListener, signal};
use tower_http::{
	cors::{Any, CorsLayer},
	trace::TraceLayer,
};
// self
use crate::{
	_prelude::*,
	config::Settings,
	error::ConfigError,
	forward::Forwarder,
	http::ReqwestHttpClient,
	lifecycle::ReqwestTokenManager,
	oauth::ReqwestTransportErrorMapper,
};

/// Builds the relay router.
pub fn router(state: Arc<AppState>, cors: bool) -> Router {
	let router = Router::new()
		.route("/health", get(routes::health))
		.route("/refresh", get(routes::refresh).post(routes::refresh))
		.route("/auth/refresh", get(routes::refresh).post(routes::refresh))
		.route("/player", get(routes::player))
		.route("/playlists", get(routes::playlists))
		.route("/play_playlist", post(routes::play_playlist))
		.route("/shuffle", post(routes::shuffle))
		.route("/repeat", post(routes::repeat))
		.route("/spotify/me/player/play", post(routes::play))
		.route("/spotify/me/player/pause", post(routes::pause))
		.route("/spotify/me/player/next", post(routes::next))
		.route("/spotify/me/player/previous", post(routes::previous))
		.route("/spotify/me/player/volume", post(routes::volume))
		.route("/spotify/me/player/devices", get(routes::devices))
		.route("/proxy/{*path}", any(routes::proxy))
		.with_state(state)
		.layer(TraceLayer::new_for_http());

	if cors {
		router.layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
	} else {
		router
	}
}

/// Assembles the relay from `settings` and serves until a shutdown signal arrives.
pub async fn run(settings: Settings) -> Result<()> {
	let http_client = ReqwestHttpClient::without_redirects()
		.map_err(ConfigError::HttpClient)?
		.with_timeout(settings.upstream_timeout);
	let tokens = ReqwestTokenManager::with_http_client(
		settings.token_endpoint.clone(),
		http_client,
		ReqwestTransportErrorMapper,
	)
	.with_safety_margin(settings.safety_margin);
	let forwarder = Forwarder::new(Arc::new(tokens), settings.api_base.clone());
	let state = Arc::new(AppState::new(forwarder, settings.credentials.clone()));

	if settings.startup_refresh {
		state.startup_refresh().await;
	}

	let listener = TcpListener::bind(settings.bind_addr).await.map_err(Error::Server)?;

	tracing::info!(
		addr = %listener.local_addr().map_err(Error::Server)?,
		multi_tenant = matches!(state.mode(), TenantMode::Multi),
		"Relay listening."
	);

	axum::serve(listener, router(state, settings.cors))
		.with_graceful_shutdown(shutdown_signal())
		.await
		.map_err(Error::Server)?;

	tracing::info!("Relay stopped.");

	Ok(())
}

async fn shutdown_signal() {
	let ctrl_c = async {
		if let Err(e) = signal::ctrl_c().await {
			tracing::error!(error = %e, "Ctrl-C handler could not be installed.");
			std::future::pending::<()>().await;
		}
	};
	#[cfg(unix)]
	let terminate = async {
		match signal::unix::signal(signal::unix::SignalKind::terminate()) {
			Ok(mut stream) => {
				stream.recv().await;
			},
			Err(e) => {
				tracing::error!(error = %e, "SIGTERM handler could not be installed.");
				std::future::pending::<()>().await;
			},
		}
	};
	#[cfg(not(unix))]
	let terminate = std::future::pending::<()>();

	tokio::select! {
		() = ctrl_c => {},
		() = terminate => {},
	}

	tracing::info!("Shutdown signal received; draining connections.");
}
