//! Authenticated forwarder: turns a [`ForwardRequest`] into an upstream API call.
//!
//! Every call first obtains a token from the [`TokenManager`]. When none can be obtained the
//! upstream API is never contacted. Otherwise the request is sent with
//! `Authorization: Bearer <token>` and whatever status and body come back are returned as-is;
//! only transport failures (no response at all) surface as errors.

// crates.io
use oauth2::{
	AsyncHttpClient,
	http::{
		self, HeaderValue, Method, StatusCode,
		header::{AUTHORIZATION, CONTENT_TYPE, RETRY_AFTER},
	},
};
// self
use crate::{
	_prelude::*,
	auth::Credentials,
	error::{ProxyError, TransportError},
	http::{ReqwestHttpClient, ResponseMetadataSlot, UpstreamHttpClient},
	lifecycle::TokenManager,
	oauth::{ReqwestTransportErrorMapper, TransportErrorMapper},
	obs::{self, OperationKind, OperationSpan, Outcome},
};

const KIND: OperationKind = OperationKind::Forward;

/// Inbound request reduced to what the upstream call needs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ForwardRequest {
	/// Method issued upstream.
	pub method: Method,
	/// Resource path relative to the API base URL.
	pub target: String,
	/// Query parameters passed through verbatim.
	pub query: Vec<(String, String)>,
	/// Optional JSON body.
	pub body: Option<Vec<u8>>,
}
impl ForwardRequest {
	/// Creates a request without query parameters or body.
	pub fn new(method: Method, target: impl Into<String>) -> Self {
		Self { method, target: target.into(), query: Vec::new(), body: None }
	}

	/// Appends a single query parameter.
	pub fn with_query_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
		self.query.push((key.into(), value.into()));

		self
	}

	/// Replaces the query parameters.
	pub fn with_query(mut self, query: Vec<(String, String)>) -> Self {
		self.query = query;

		self
	}

	/// Attaches a raw body; empty bodies count as absent.
	pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
		let body = body.into();

		self.body = if body.is_empty() { None } else { Some(body) };

		self
	}

	/// Serialises `value` as the JSON body.
	pub fn with_json(self, value: &serde_json::Value) -> Self {
		self.with_body(value.to_string())
	}
}

/// Upstream answer relayed back to the device.
#[derive(Clone, Debug)]
pub struct UpstreamResponse {
	/// Upstream status code.
	pub status: StatusCode,
	/// Upstream `Content-Type`, if any.
	pub content_type: Option<HeaderValue>,
	/// Upstream `Retry-After`, if any.
	pub retry_after: Option<HeaderValue>,
	/// Raw upstream body.
	pub body: Vec<u8>,
}
impl UpstreamResponse {
	/// Returns `true` for 2xx statuses.
	pub fn is_success(&self) -> bool {
		self.status.is_success()
	}

	/// Parses the body as JSON; empty or non-JSON bodies yield `Value::Null`.
	pub fn json(&self) -> serde_json::Value {
		serde_json::from_slice(&self.body).unwrap_or(serde_json::Value::Null)
	}
}

/// Relays requests to the resource API with a live access token attached.
pub struct Forwarder<C = ReqwestHttpClient, M = ReqwestTransportErrorMapper>
where
	C: ?Sized + UpstreamHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	tokens: Arc<TokenManager<C, M>>,
	api_base: Url,
}
impl<C, M> Forwarder<C, M>
where
	C: ?Sized + UpstreamHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Creates a forwarder that draws tokens from `tokens` and targets `api_base`.
	pub fn new(tokens: Arc<TokenManager<C, M>>, api_base: Url) -> Self {
		Self { tokens, api_base }
	}

	/// Token lifecycle manager backing this forwarder.
	pub fn tokens(&self) -> &Arc<TokenManager<C, M>> {
		&self.tokens
	}

	/// Base URL every target is joined onto.
	pub fn api_base(&self) -> &Url {
		&self.api_base
	}

	/// Forwards `request` upstream with a valid token attached.
	pub async fn forward(
		&self,
		credentials: &Credentials,
		request: ForwardRequest,
	) -> Result<UpstreamResponse, ProxyError> {
		let span = OperationSpan::new(KIND, "forward");

		obs::record_outcome(KIND, Outcome::Attempt);

		let result = span
			.instrument(async move {
				let url = self.upstream_url(&request.target, &request.query)?;
				let token = self
					.tokens
					.get_valid_token(credentials)
					.await
					.map_err(ProxyError::Unauthorized)?;
				let mut builder = http::Request::builder()
					.method(request.method.clone())
					.uri(url.as_str())
					.header(AUTHORIZATION, token.bearer());

				if request.body.is_some() {
					builder = builder.header(CONTENT_TYPE, "application/json");
				}

				let upstream_request = builder
					.body(request.body.unwrap_or_default())
					.map_err(|e| ProxyError::UpstreamFailure(TransportError::InvalidRequest(e)))?;
				let slot = ResponseMetadataSlot::default();
				let handle = self.tokens.http_client.with_metadata(slot.clone());
				let response = handle.call(upstream_request).await.map_err(|err| {
					ProxyError::UpstreamFailure(
						self.tokens.transport_mapper.map_transport_error(slot.take().as_ref(), err),
					)
				})?;
				let (parts, body) = response.into_parts();

				tracing::debug!(
					method = %request.method,
					target = %request.target,
					status = parts.status.as_u16(),
					"Upstream call completed."
				);

				Ok(UpstreamResponse {
					status: parts.status,
					content_type: parts.headers.get(CONTENT_TYPE).cloned(),
					retry_after: parts.headers.get(RETRY_AFTER).cloned(),
					body,
				})
			})
			.await;

		if let Err(err) = &result {
			tracing::warn!(error = %err, "Forwarding failed.");
		}

		obs::record_outcome(KIND, Outcome::of(&result));

		result
	}

	fn upstream_url(&self, target: &str, query: &[(String, String)]) -> Result<Url, ProxyError> {
		let invalid = |reason: &str| ProxyError::InvalidTarget {
			target: target.into(),
			reason: reason.into(),
		};
		let relative = target.trim_start_matches('/');

		if relative.split(['/', '?']).any(|segment| segment == "..") {
			return Err(invalid("parent segments are not allowed"));
		}

		let base_path = self.api_base.path().trim_end_matches('/');
		let base = self.api_base.as_str().trim_end_matches('/');
		let mut url =
			Url::parse(&format!("{base}/{relative}")).map_err(|e| invalid(&e.to_string()))?;

		if !url.path().starts_with(&format!("{base_path}/")) {
			return Err(invalid("target escapes the API base path"));
		}
		if !query.is_empty() {
			url.query_pairs_mut().extend_pairs(query);
		}

		Ok(url)
	}
}
impl<C, M> Debug for Forwarder<C, M>
where
	C: ?Sized + UpstreamHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Forwarder").field("api_base", &self.api_base.as_str()).finish()
	}
}
