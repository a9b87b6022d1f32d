//! Shared state behind the router: tenant mode, active credentials, and uptime.

// std
use std::time::Instant;
// self
use crate::{
	_prelude::*,
	auth::Credentials,
	error::{AuthError, ProxyError},
	forward::Forwarder,
	lifecycle::TokenManager,
};

/// Where credentials for refreshes and forwards come from.
#[derive(Clone, Debug)]
pub enum TenantMode {
	/// Credentials fixed at startup; caller-supplied ones are ignored.
	Single(Credentials),
	/// Credentials supplied by the device through the refresh route.
	Multi,
}

/// Shared state behind every route.
#[derive(Debug)]
pub struct AppState {
	/// Authenticated forwarder (and, through it, the token lifecycle manager).
	pub forwarder: Forwarder,
	mode: TenantMode,
	active: RwLock<Option<Credentials>>,
	started_at: Instant,
}
impl AppState {
	/// Creates state for single-tenant mode when `credentials` is set, multi-tenant otherwise.
	pub fn new(forwarder: Forwarder, credentials: Option<Credentials>) -> Self {
		let mode = credentials.map_or(TenantMode::Multi, TenantMode::Single);

		Self { forwarder, mode, active: RwLock::new(None), started_at: Instant::now() }
	}

	/// Token lifecycle manager.
	pub fn tokens(&self) -> &TokenManager {
		self.forwarder.tokens()
	}

	/// Tenant mode selected at startup.
	pub fn mode(&self) -> &TenantMode {
		&self.mode
	}

	/// Credentials used for the next refresh or forward.
	pub fn credentials(&self) -> Result<Credentials, ProxyError> {
		match &self.mode {
			TenantMode::Single(credentials) => Ok(credentials.clone()),
			TenantMode::Multi => self
				.active
				.read()
				.clone()
				.ok_or(ProxyError::Unauthorized(AuthError::MissingCredentials)),
		}
	}

	/// Records caller-supplied credentials after they produced a token (multi-tenant only).
	pub fn activate(&self, credentials: Credentials) {
		if matches!(self.mode, TenantMode::Multi) {
			*self.active.write() = Some(credentials);
		}
	}

	/// Seconds since the state was created.
	pub fn uptime(&self) -> f64 {
		self.started_at.elapsed().as_secs_f64()
	}

	/// Performs the one-shot refresh run before the listener is bound.
	///
	/// Failures are logged; the server starts regardless.
	pub async fn startup_refresh(&self) {
		let TenantMode::Single(credentials) = &self.mode else {
			tracing::info!("No fixed credentials configured; skipping the startup refresh.");

			return;
		};

		match self.tokens().force_refresh(credentials).await {
			Ok(state) => {
				tracing::info!(expires_at = %state.expires_at(), "Startup refresh succeeded.")
			},
			Err(err) => tracing::warn!(error = %err, "Startup refresh failed; serving anyway."),
		}
	}
}
