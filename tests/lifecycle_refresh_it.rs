mod common;

// std
use std::time::Duration as StdDuration;
// crates.io
use httpmock::prelude::*;
use time::{Duration, OffsetDateTime, macros};
// self
use common::*;
use spotify_relay::{
	auth::TokenStatus,
	clock::ManualClock,
	error::{AuthError, TransportError},
	lifecycle::ReqwestTokenManager,
	oauth::ReqwestTransportErrorMapper,
	url::Url,
};

#[tokio::test]
async fn refresh_sets_expiry_from_reported_lifetime() -> color_eyre::Result<()> {
	let server = MockServer::start_async().await;
	let token = mock_token(&server, "access-1", 3600).await;
	let manager = token_manager(&server);
	let before = OffsetDateTime::now_utc();
	let state = manager.refresh(&credentials()).await?;
	let after = OffsetDateTime::now_utc();

	token.assert_async().await;

	assert_eq!(state.access_token().map(|t| t.expose()), Some("access-1"));
	assert!(state.expires_at() >= before + Duration::hours(1));
	assert!(state.expires_at() <= after + Duration::hours(1));
	assert_eq!(manager.snapshot(), state);
	assert_eq!(manager.status(), TokenStatus::Fresh);

	Ok(())
}

#[tokio::test]
async fn rejected_refresh_keeps_previous_state() {
	let server = MockServer::start_async().await;
	let mut token = mock_token(&server, "access-1", 3600).await;
	let manager = token_manager(&server);
	let seeded = manager.refresh(&credentials()).await.expect("Seed refresh should succeed.");

	token.delete_async().await;

	let rejection = mock_token_rejection(&server, 400).await;
	let err = manager.force_refresh(&credentials()).await.expect_err("Rejected grant should fail.");

	rejection.assert_async().await;

	match &err {
		AuthError::Rejected { status, body, .. } => {
			assert_eq!(*status, 400);
			assert!(body.contains("invalid_grant"), "Upstream body should be preserved: {body}.");
		},
		other => panic!("Unexpected error: {other:?}."),
	}

	assert_eq!(manager.snapshot(), seeded);
	assert_eq!(manager.refresh_metrics.failures(), 1);
	assert_eq!(manager.refresh_metrics.successes(), 1);
}

#[tokio::test]
async fn valid_token_is_reused_without_upstream_call() {
	let server = MockServer::start_async().await;
	let token = mock_token(&server, "access-1", 3600).await;
	let manager = token_manager(&server);
	let first = manager.get_valid_token(&credentials()).await.expect("First call should refresh.");
	let second = manager.get_valid_token(&credentials()).await.expect("Second call should reuse.");

	token.assert_calls_async(1).await;

	assert_eq!(first, second);
	assert_eq!(manager.refresh_metrics.exchanges(), 1);
	assert_eq!(manager.refresh_metrics.cache_hits(), 1);
}

#[tokio::test]
async fn token_inside_margin_triggers_exactly_one_refresh() {
	let server = MockServer::start_async().await;
	// Lifetime shorter than the margin, so every lookup sees a stale token.
	let token = mock_token(&server, "short-lived", 30).await;
	let manager = token_manager(&server);

	manager.refresh(&credentials()).await.expect("Seed refresh should succeed.");
	token.assert_calls_async(1).await;

	let access =
		manager.get_valid_token(&credentials()).await.expect("Stale token should be refreshed.");

	token.assert_calls_async(2).await;

	assert_eq!(access.expose(), "short-lived");
	assert_eq!(manager.status(), TokenStatus::Expiring);
}

#[tokio::test]
async fn concurrent_stale_callers_share_one_exchange() {
	let server = MockServer::start_async().await;
	let body = token_body("shared", 3600).to_string();
	let token = server
		.mock_async(|when, then| {
			when.method(POST).path(TOKEN_PATH);
			then.status(200)
				.header("content-type", "application/json")
				.delay(StdDuration::from_millis(200))
				.body(body);
		})
		.await;
	let manager = token_manager(&server);
	let credentials = credentials();
	let (a, b, c, d) = tokio::join!(
		manager.get_valid_token(&credentials),
		manager.get_valid_token(&credentials),
		manager.get_valid_token(&credentials),
		manager.get_valid_token(&credentials),
	);

	token.assert_calls_async(1).await;

	for result in [a, b, c, d] {
		assert_eq!(result.expect("Every caller should receive a token.").expose(), "shared");
	}
}

#[tokio::test]
async fn slow_authorization_server_times_out() {
	let server = MockServer::start_async().await;
	let body = token_body("late", 3600).to_string();
	let _token = server
		.mock_async(|when, then| {
			when.method(POST).path(TOKEN_PATH);
			then.status(200)
				.header("content-type", "application/json")
				.delay(StdDuration::from_secs(2))
				.body(body);
		})
		.await;
	let manager = ReqwestTokenManager::with_http_client(
		token_endpoint(&server),
		http_client(StdDuration::from_millis(200)),
		ReqwestTransportErrorMapper,
	);
	let err = manager.refresh(&credentials()).await.expect_err("Slow server should time out.");

	assert!(matches!(err, AuthError::Transport(TransportError::Timeout)), "Got {err:?}.");
	assert!(!manager.snapshot().has_token());
}

#[tokio::test]
async fn malformed_token_response_is_reported() {
	let server = MockServer::start_async().await;
	let _token = server
		.mock_async(|when, then| {
			when.method(POST).path(TOKEN_PATH);
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"access_token\":\"a\",\"token_type\":\"Bearer\"}");
		})
		.await;
	let manager = token_manager(&server);
	let err = manager.refresh(&credentials()).await.expect_err("Missing lifetime should fail.");

	assert!(matches!(err, AuthError::InvalidTokenResponse { status: Some(200), .. }));
	assert!(!manager.snapshot().has_token());
}

#[tokio::test]
async fn startup_then_cache_then_expiry_scenario() {
	let server = MockServer::start_async().await;
	let token = mock_token(&server, "access-scenario", 3600).await;
	let clock = ManualClock::new(macros::datetime!(2025-06-01 12:00 UTC));
	let manager = token_manager(&server).with_clock(clock.clone());
	let credentials = credentials();
	let startup = manager.force_refresh(&credentials).await.expect("Startup refresh should work.");

	assert_eq!(startup.expires_at(), macros::datetime!(2025-06-01 13:00 UTC));
	token.assert_calls_async(1).await;

	manager.get_valid_token(&credentials).await.expect("Cached token should be returned.");
	token.assert_calls_async(1).await;

	clock.advance(Duration::minutes(58));
	manager.get_valid_token(&credentials).await.expect("Token should still be fresh.");
	token.assert_calls_async(1).await;

	// Exactly at `expires_at - margin` the token counts as stale.
	clock.set(macros::datetime!(2025-06-01 12:59 UTC));

	let renewed = manager.get_valid_token(&credentials).await.expect("Stale token should renew.");

	token.assert_calls_async(2).await;

	assert_eq!(renewed.expose(), "access-scenario");
	assert_eq!(manager.snapshot().expires_at(), macros::datetime!(2025-06-01 13:59 UTC));
}

#[tokio::test]
async fn force_refresh_bypasses_fresh_cache() {
	let server = MockServer::start_async().await;
	let token = mock_token(&server, "access-forced", 3600).await;
	let manager = token_manager(&server);
	let credentials = credentials();

	manager.get_valid_token(&credentials).await.expect("Initial refresh should work.");
	manager.force_refresh(&credentials).await.expect("Forced refresh should work.");
	manager.get_valid_token(&credentials).await.expect("Cached token should be returned.");

	token.assert_calls_async(2).await;
}

#[tokio::test]
async fn unrepresentable_lifetime_is_rejected_without_touching_state() {
	let server = MockServer::start_async().await;
	let token = mock_token(&server, "access-forever", 1_000_000_000_000).await;
	let manager = token_manager(&server);
	let err = manager.refresh(&credentials()).await.expect_err("Huge lifetime should fail.");

	token.assert_async().await;

	match &err {
		AuthError::InvalidTokenResponse { reason, status } => {
			assert_eq!(reason, "expires_in exceeds the supported range");
			assert_eq!(*status, Some(200));
		},
		other => panic!("Unexpected error: {other:?}."),
	}

	assert!(!manager.snapshot().has_token());
	assert_eq!(manager.refresh_metrics.exchanges(), 1);
	assert_eq!(manager.refresh_metrics.failures(), 1);
	assert_eq!(manager.refresh_metrics.successes(), 0);
}

#[tokio::test]
async fn token_endpoint_redirects_are_not_followed() {
	let server = MockServer::start_async().await;
	let elsewhere = mock_token(&server, "unused", 3600).await;
	let redirect = server
		.mock_async(|when, then| {
			when.method(POST).path("/moved");
			then.status(307).header("location", server.url(TOKEN_PATH));
		})
		.await;
	let manager = ReqwestTokenManager::with_http_client(
		Url::parse(&server.url("/moved")).expect("Redirecting endpoint should parse."),
		http_client(StdDuration::from_secs(5)),
		ReqwestTransportErrorMapper,
	);
	let err = manager.refresh(&credentials()).await.expect_err("Redirect should not be followed.");

	redirect.assert_async().await;
	elsewhere.assert_calls_async(0).await;

	assert_eq!(err.upstream_status(), Some(307), "Got {err:?}.");
	assert!(!manager.snapshot().has_token());
}
