//! Shared fixtures for the relay integration tests.

#![allow(dead_code)]

// std
use std::time::Duration as StdDuration;
// crates.io
use base64::{Engine, engine::general_purpose::STANDARD};
use httpmock::{Mock, prelude::*};
use serde_json::{Value, json};
// self
use spotify_relay::{
	auth::Credentials,
	forward::Forwarder,
	http::ReqwestHttpClient,
	lifecycle::ReqwestTokenManager,
	oauth::ReqwestTransportErrorMapper,
	url::Url,
};

pub const CLIENT_ID: &str = "client-relay";
pub const CLIENT_SECRET: &str = "secret-relay";
pub const REFRESH_TOKEN: &str = "refresh-abc";
pub const TOKEN_PATH: &str = "/api/token";
pub const API_PATH: &str = "/v1";

pub fn credentials() -> Credentials {
	Credentials::new(CLIENT_ID, CLIENT_SECRET, REFRESH_TOKEN)
		.expect("Credential fixture should be valid.")
}

pub fn basic_auth_header() -> String {
	format!("Basic {}", STANDARD.encode(format!("{CLIENT_ID}:{CLIENT_SECRET}")))
}

pub fn refresh_form_body() -> String {
	format!("grant_type=refresh_token&refresh_token={REFRESH_TOKEN}")
}

pub fn token_body(access_token: &str, expires_in: u64) -> Value {
	json!({
		"access_token": access_token,
		"token_type": "Bearer",
		"scope": "user-read-playback-state",
		"expires_in": expires_in
	})
}

/// Mocks a successful refresh grant that only matches the exact Basic header and form body.
pub async fn mock_token<'a>(
	server: &'a MockServer,
	access_token: &str,
	expires_in: u64,
) -> Mock<'a> {
	let body = token_body(access_token, expires_in).to_string();

	server
		.mock_async(|when, then| {
			when.method(POST)
				.path(TOKEN_PATH)
				.header("authorization", basic_auth_header())
				.body(refresh_form_body());
			then.status(200).header("content-type", "application/json").body(body);
		})
		.await
}

/// Mocks a rejected refresh grant.
pub async fn mock_token_rejection(server: &MockServer, status: u16) -> Mock<'_> {
	let body = json!({ "error": "invalid_grant", "error_description": "Invalid refresh token" });

	server
		.mock_async(|when, then| {
			when.method(POST).path(TOKEN_PATH);
			then.status(status)
				.header("content-type", "application/json")
				.body(body.to_string());
		})
		.await
}

pub fn token_endpoint(server: &MockServer) -> Url {
	Url::parse(&server.url(TOKEN_PATH)).expect("Mock token endpoint should parse.")
}

pub fn api_base(server: &MockServer) -> Url {
	Url::parse(&server.url(API_PATH)).expect("Mock API base should parse.")
}

pub fn http_client(timeout: StdDuration) -> ReqwestHttpClient {
	ReqwestHttpClient::default().with_timeout(timeout)
}

pub fn token_manager(server: &MockServer) -> ReqwestTokenManager {
	ReqwestTokenManager::with_http_client(
		token_endpoint(server),
		http_client(StdDuration::from_secs(5)),
		ReqwestTransportErrorMapper,
	)
}

pub fn forwarder(server: &MockServer) -> Forwarder {
	Forwarder::new(token_manager(server).into(), api_base(server))
}
