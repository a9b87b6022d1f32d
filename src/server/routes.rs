//! Route handlers; each one is a thin caller of
//! [`Forwarder::forward`](crate::forward::Forwarder::forward).

// std
use std::collections::HashMap;
// crates.io
use axum::{
	Json,
	body::Bytes,
	extract::{Path, Query, RawQuery, State},
	http::Method,
	response::{IntoResponse, Response},
};
use serde_json::json;
// self
use crate::{
	_prelude::*,
	auth::CredentialsPayload,
	forward::{ForwardRequest, UpstreamResponse},
	player::{self, NowPlaying},
	server::{
		response::{self, RouteError},
		state::{AppState, TenantMode},
	},
};

type Params = Query<HashMap<String, String>>;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthReport {
	status: &'static str,
	has_token: bool,
	#[serde(with = "time::serde::rfc3339")]
	token_expiry: OffsetDateTime,
	#[serde(with = "time::serde::rfc3339")]
	timestamp: OffsetDateTime,
	uptime: f64,
}

pub(super) async fn health(State(state): State<Arc<AppState>>) -> Json<impl Serialize> {
	let snapshot = state.tokens().snapshot();

	Json(HealthReport {
		status: "ok",
		has_token: snapshot.has_token(),
		token_expiry: snapshot.expires_at(),
		timestamp: state.tokens().now(),
		uptime: state.uptime(),
	})
}

pub(super) async fn refresh(
	State(state): State<Arc<AppState>>,
	Query(query): Query<CredentialsPayload>,
	body: Bytes,
) -> Result<Response, RouteError> {
	let payload = if body.is_empty() {
		query
	} else {
		let body = serde_json::from_slice::<CredentialsPayload>(&body)
			.map_err(|e| RouteError::InvalidBody(e.to_string()))?;

		query.or(body)
	};
	let supplied = match state.mode() {
		TenantMode::Multi => payload.into_credentials()?,
		TenantMode::Single(_) => {
			if !payload.is_empty() {
				tracing::debug!("Ignoring caller-supplied credentials in single-tenant mode.");
			}

			None
		},
	};
	let credentials = match supplied {
		Some(credentials) => credentials,
		None => state.credentials()?,
	};

	state.tokens().force_refresh(&credentials).await.map_err(RouteError::Refresh)?;
	state.activate(credentials);

	Ok(response::success())
}

pub(super) async fn player(State(state): State<Arc<AppState>>) -> Result<Response, RouteError> {
	let upstream = forward(&state, ForwardRequest::new(Method::GET, "me/player")).await?;

	if !upstream.is_success() {
		return Ok(response::relay(upstream));
	}

	Ok(Json(NowPlaying::from_upstream(&upstream.json())).into_response())
}

pub(super) async fn playlists(State(state): State<Arc<AppState>>) -> Result<Response, RouteError> {
	let request = ForwardRequest::new(Method::GET, "me/playlists").with_query_param("limit", "20");
	let upstream = forward(&state, request).await?;

	if !upstream.is_success() {
		return Ok(response::relay(upstream));
	}

	let playlists = player::playlists_from_upstream(&upstream.json());

	Ok(Json(json!({ "playlists": playlists })).into_response())
}

pub(super) async fn play_playlist(
	State(state): State<Arc<AppState>>,
	Query(params): Params,
) -> Result<Response, RouteError> {
	let id = required(&params, "id")?;
	let request = ForwardRequest::new(Method::PUT, "me/player/play")
		.with_json(&json!({ "context_uri": format!("spotify:playlist:{id}") }));

	Ok(response::acknowledge(forward(&state, request).await?))
}

pub(super) async fn shuffle(
	State(state): State<Arc<AppState>>,
	Query(params): Params,
) -> Result<Response, RouteError> {
	control_with_param(&state, "me/player/shuffle", &params, "state").await
}

pub(super) async fn repeat(
	State(state): State<Arc<AppState>>,
	Query(params): Params,
) -> Result<Response, RouteError> {
	control_with_param(&state, "me/player/repeat", &params, "state").await
}

pub(super) async fn volume(
	State(state): State<Arc<AppState>>,
	Query(params): Params,
) -> Result<Response, RouteError> {
	control_with_param(&state, "me/player/volume", &params, "volume_percent").await
}

pub(super) async fn play(State(state): State<Arc<AppState>>) -> Result<Response, RouteError> {
	control(&state, Method::PUT, "me/player/play").await
}

pub(super) async fn pause(State(state): State<Arc<AppState>>) -> Result<Response, RouteError> {
	control(&state, Method::PUT, "me/player/pause").await
}

pub(super) async fn next(State(state): State<Arc<AppState>>) -> Result<Response, RouteError> {
	control(&state, Method::POST, "me/player/next").await
}

pub(super) async fn previous(State(state): State<Arc<AppState>>) -> Result<Response, RouteError> {
	control(&state, Method::POST, "me/player/previous").await
}

pub(super) async fn devices(State(state): State<Arc<AppState>>) -> Result<Response, RouteError> {
	let upstream = forward(&state, ForwardRequest::new(Method::GET, "me/player/devices")).await?;

	Ok(response::relay(upstream))
}

pub(super) async fn proxy(
	State(state): State<Arc<AppState>>,
	method: Method,
	Path(path): Path<String>,
	RawQuery(raw_query): RawQuery,
	body: Bytes,
) -> Result<Response, RouteError> {
	let query = raw_query
		.map(|raw| url::form_urlencoded::parse(raw.as_bytes()).into_owned().collect())
		.unwrap_or_default();
	let request = ForwardRequest::new(method, path).with_query(query).with_body(body.to_vec());

	Ok(response::relay(forward(&state, request).await?))
}

async fn control(state: &AppState, method: Method, target: &str) -> Result<Response, RouteError> {
	Ok(response::acknowledge(forward(state, ForwardRequest::new(method, target)).await?))
}

async fn control_with_param(
	state: &AppState,
	target: &str,
	params: &HashMap<String, String>,
	key: &'static str,
) -> Result<Response, RouteError> {
	let value = required(params, key)?;
	let request = ForwardRequest::new(Method::PUT, target).with_query_param(key, value);

	Ok(response::acknowledge(forward(state, request).await?))
}

async fn forward(
	state: &AppState,
	request: ForwardRequest,
) -> Result<UpstreamResponse, RouteError> {
	let credentials = state.credentials()?;

	Ok(state.forwarder.forward(&credentials, request).await?)
}

fn required<'a>(
	params: &'a HashMap<String, String>,
	key: &'static str,
) -> Result<&'a str, RouteError> {
	params
		.get(key)
		.map(String::as_str)
		.filter(|value| !value.is_empty())
		.ok_or(RouteError::MissingParam(key))
}
