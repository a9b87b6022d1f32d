//! Refresh-grant orchestration with a single-flight guard and margin-based renewal.
//!
//! [`TokenManager::get_valid_token`] hands out the cached token while it stays valid for longer
//! than the safety margin. Otherwise the caller takes the refresh guard, re-checks the state
//! (another caller may have refreshed while it waited), and only then performs the
//! `grant_type=refresh_token` exchange. A failed exchange leaves the previous state untouched.

// self
use crate::{
	_prelude::*,
	auth::{Credentials, TokenSecret, TokenState, TokenStatus},
	error::AuthError,
	http::UpstreamHttpClient,
	lifecycle::TokenManager,
	oauth::{RefreshFacade, RefreshedToken, TransportErrorMapper},
	obs::{self, OperationKind, OperationSpan, Outcome},
};

const KIND: OperationKind = OperationKind::Refresh;

impl<C, M> TokenManager<C, M>
where
	C: ?Sized + UpstreamHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Returns a copy of the current token state.
	pub fn snapshot(&self) -> TokenState {
		self.state.read().clone()
	}

	/// Classifies the cached token against the safety margin without refreshing.
	pub fn status(&self) -> TokenStatus {
		self.state.read().status_at(self.clock.now(), self.safety_margin)
	}

	/// Performs the refresh grant and replaces the token state on success.
	///
	/// Concurrent callers are serialised; each one still performs its own exchange.
	pub async fn refresh(&self, credentials: &Credentials) -> Result<TokenState, AuthError> {
		self.serialised_exchange("refresh", credentials).await
	}

	/// Unconditionally refreshes, bypassing the expiry check.
	pub async fn force_refresh(&self, credentials: &Credentials) -> Result<TokenState, AuthError> {
		self.serialised_exchange("force_refresh", credentials).await
	}

	/// Returns a token that stays valid for longer than the safety margin, refreshing first
	/// when the cached one is missing or stale.
	pub async fn get_valid_token(
		&self,
		credentials: &Credentials,
	) -> Result<TokenSecret, AuthError> {
		self.observe("get_valid_token", async move {
			if let Some(token) = self.fresh_token() {
				return Ok(token);
			}

			let _singleflight = self.refresh_guard.lock().await;

			if let Some(token) = self.fresh_token() {
				tracing::debug!("Reusing token refreshed by a concurrent caller.");

				return Ok(token);
			}

			let state = self.exchange(credentials).await?;

			state.access_token().cloned().ok_or_else(|| AuthError::InvalidTokenResponse {
				reason: "refresh produced no access token".into(),
				status: None,
			})
		})
		.await
	}

	async fn serialised_exchange(
		&self,
		stage: &'static str,
		credentials: &Credentials,
	) -> Result<TokenState, AuthError> {
		self.observe(stage, async move {
			let _singleflight = self.refresh_guard.lock().await;

			self.exchange(credentials).await
		})
		.await
	}

	async fn observe<T, Fut>(&self, stage: &'static str, fut: Fut) -> Result<T, AuthError>
	where
		Fut: Future<Output = Result<T, AuthError>>,
	{
		let span = OperationSpan::new(KIND, stage);

		obs::record_outcome(KIND, Outcome::Attempt);

		let result = span.instrument(fut).await;

		obs::record_outcome(KIND, Outcome::of(&result));

		result
	}

	fn fresh_token(&self) -> Option<TokenSecret> {
		let token =
			self.state.read().usable_at(self.clock.now(), self.safety_margin).cloned();

		if token.is_some() {
			self.refresh_metrics.record_cache_hit();
		}

		token
	}

	async fn exchange(&self, credentials: &Credentials) -> Result<TokenState, AuthError> {
		self.refresh_metrics.record_exchange();

		let facade = <RefreshFacade<C, M>>::new(
			credentials,
			&self.token_endpoint,
			self.http_client.clone(),
			self.transport_mapper.clone(),
		);
		let issued = facade
			.refresh_token(credentials.refresh_token())
			.await
			.and_then(|refreshed| self.issue(refreshed));
		let state = match issued {
			Ok(state) => state,
			Err(err) => {
				self.refresh_metrics.record_failure();

				tracing::warn!(
					error = %err,
					upstream_status = ?err.upstream_status(),
					"Refresh grant failed; keeping the previous token state."
				);

				return Err(err);
			},
		};

		*self.state.write() = state.clone();

		self.refresh_metrics.record_success();

		tracing::info!(expires_at = %state.expires_at(), "Access token refreshed.");

		Ok(state)
	}

	fn issue(&self, refreshed: RefreshedToken) -> Result<TokenState, AuthError> {
		let state = TokenState::issued(
			refreshed.access_token.expose(),
			self.clock.now(),
			refreshed.expires_in,
		)
		.ok_or_else(|| AuthError::InvalidTokenResponse {
			reason: "expires_in exceeds the supported range".into(),
			status: refreshed.status,
		})?;

		if refreshed.expires_in <= self.safety_margin {
			tracing::warn!(
				lifetime_secs = refreshed.expires_in.whole_seconds(),
				margin_secs = self.safety_margin.whole_seconds(),
				"Issued token lifetime does not exceed the safety margin."
			);
		}
		if refreshed.rotated_refresh_token.is_some() {
			tracing::debug!("Authorization server returned a rotated refresh token; ignoring it.");
		}

		Ok(state)
	}
}
