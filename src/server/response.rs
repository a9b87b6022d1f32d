//! Error rendering and upstream relay helpers shared by the route handlers.

// crates.io
use axum::{
	Json,
	body::Body,
	http::{
		HeaderMap, StatusCode,
		header::{CONTENT_TYPE, RETRY_AFTER},
	},
	response::{IntoResponse, Response},
};
use serde_json::{Map, Value, json};
// self
use crate::{
	_prelude::*,
	error::{AuthError, CredentialsError, ProxyError},
	forward::UpstreamResponse,
};

/// Failures a route handler can answer with.
#[derive(Debug, ThisError)]
pub enum RouteError {
	/// Forwarding failed.
	#[error(transparent)]
	Proxy(#[from] ProxyError),
	/// Refresh grant failed.
	#[error("Token refresh failed.")]
	Refresh(#[source] AuthError),
	/// A required query parameter is absent.
	#[error("Missing `{0}` query parameter.")]
	MissingParam(&'static str),
	/// Caller-supplied credentials are unusable.
	#[error(transparent)]
	Credentials(#[from] CredentialsError),
	/// Request body is not valid JSON.
	#[error("Request body is not valid JSON: {0}.")]
	InvalidBody(String),
}
impl IntoResponse for RouteError {
	fn into_response(self) -> Response {
		match self {
			Self::Proxy(err) => err.into_response(),
			Self::Refresh(err) =>
				error_response(StatusCode::UNAUTHORIZED, "Token refresh failed.", Some(&err)),
			err => error_response(StatusCode::BAD_REQUEST, &err.to_string(), None),
		}
	}
}

impl IntoResponse for ProxyError {
	fn into_response(self) -> Response {
		let status =
			StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
		let message = match &self {
			Self::UpstreamFailure(source) => source.to_string(),
			err => err.to_string(),
		};
		let auth = match &self {
			Self::Unauthorized(source) => Some(source),
			_ => None,
		};

		error_response(status, &message, auth)
	}
}

/// Relays an upstream response unchanged (status, body, `Content-Type`, `Retry-After`).
pub fn relay(upstream: UpstreamResponse) -> Response {
	let mut headers = HeaderMap::new();

	if let Some(value) = upstream.content_type {
		headers.insert(CONTENT_TYPE, value);
	}
	if let Some(value) = upstream.retry_after {
		headers.insert(RETRY_AFTER, value);
	}

	(upstream.status, headers, Body::from(upstream.body)).into_response()
}

/// Answers `{"success": true}` for upstream successes and relays anything else.
pub fn acknowledge(upstream: UpstreamResponse) -> Response {
	if upstream.is_success() { success() } else { relay(upstream) }
}

/// `{"success": true}`.
pub fn success() -> Response {
	Json(json!({ "success": true })).into_response()
}

fn error_response(status: StatusCode, message: &str, auth: Option<&AuthError>) -> Response {
	let mut body = Map::new();

	body.insert("error".into(), Value::from(message));

	if let Some(err) = auth {
		body.insert("detail".into(), Value::from(err.to_string()));

		if let Some(upstream_status) = err.upstream_status() {
			body.insert("upstreamStatus".into(), Value::from(upstream_status));
		}
		if let Some(upstream_body) = err.upstream_body() {
			body.insert("upstreamBody".into(), Value::from(upstream_body));
		}
	}

	(status, Json(Value::Object(body))).into_response()
}
