//! Transport primitives shared by the refresh grant and the forwarder.
//!
//! [`UpstreamHttpClient`] is the relay's only dependency on an HTTP stack. It hands out
//! [`AsyncHttpClient`] handles that each carry a [`ResponseMetadataSlot`]; the `oauth2` crate
//! drives those handles for the refresh grant and the forwarder calls them directly. Once a
//! response status is known, handles record it (plus `Retry-After` and, for failures, the raw
//! body) so error mapping can report upstream detail even after `oauth2` has consumed the
//! response.

// crates.io
use oauth2::{AsyncHttpClient, HttpClientError, HttpRequest, HttpResponse};
use reqwest::{
	header::{HeaderMap, RETRY_AFTER},
	redirect::Policy,
};
use time::format_description::well_known::Rfc2822;
// self
use crate::_prelude::*;

/// Timeout applied to every upstream call unless overridden.
pub const DEFAULT_UPSTREAM_TIMEOUT: StdDuration = StdDuration::from_secs(10);

/// Abstraction over HTTP transports used for both token exchanges and forwarded calls.
///
/// Implementations must be `Send + Sync + 'static` so a single transport can be shared by the
/// lifecycle manager and the forwarder, and the handles they return must own whatever state
/// their request futures need so those futures remain `Send`.
pub trait UpstreamHttpClient
where
	Self: 'static + Send + Sync,
{
	/// Concrete error emitted by the underlying transport.
	type TransportError: 'static + Send + Sync + StdError;

	/// [`AsyncHttpClient`] handle tied to a [`ResponseMetadataSlot`].
	type Handle: for<'c> AsyncHttpClient<
			'c,
			Error = HttpClientError<Self::TransportError>,
			Future: 'c + Send,
		>
		+ 'static
		+ Send
		+ Sync;

	/// Builds a handle that records outcomes in `slot`.
	///
	/// # Metadata Contract
	///
	/// - Call [`ResponseMetadataSlot::take`] before submitting the request so stale data never
	///   leaks across calls.
	/// - Once a response (successful or not) arrives, save its status with
	///   [`ResponseMetadataSlot::store`]; include the body for non-success statuses.
	fn with_metadata(&self, slot: ResponseMetadataSlot) -> Self::Handle;
}

/// Metadata captured from the most recent upstream response.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResponseMetadata {
	/// HTTP status code, if a response arrived.
	pub status: Option<u16>,
	/// Retry-After hint expressed as a relative duration.
	pub retry_after: Option<Duration>,
	/// Raw body of a non-success response.
	pub body: Option<String>,
}
impl ResponseMetadata {
	/// Returns `true` when a non-2xx status was recorded.
	pub fn is_failure(&self) -> bool {
		self.status.is_some_and(|status| !(200..300).contains(&status))
	}
}

/// Thread-safe slot for sharing [`ResponseMetadata`] between transport and error layers.
#[derive(Clone, Debug, Default)]
pub struct ResponseMetadataSlot(Arc<Mutex<Option<ResponseMetadata>>>);
impl ResponseMetadataSlot {
	/// Stores new metadata for the current request.
	pub fn store(&self, meta: ResponseMetadata) {
		*self.0.lock() = Some(meta);
	}

	/// Returns the captured metadata, if any, consuming it from the slot.
	pub fn take(&self) -> Option<ResponseMetadata> {
		self.0.lock().take()
	}
}

/// reqwest-backed transport with a bounded per-request timeout.
///
/// Token requests should not follow redirects: a redirected refresh grant would resend the
/// client credentials to an unverified host. [`ReqwestHttpClient::without_redirects`] and
/// [`Default`] build such a client; a custom [`ReqwestClient`] passed to
/// [`ReqwestHttpClient::with_client`] must disable redirect following itself.
#[derive(Clone, Debug)]
pub struct ReqwestHttpClient {
	client: ReqwestClient,
	timeout: StdDuration,
}
impl ReqwestHttpClient {
	/// Wraps an existing reqwest [`ReqwestClient`] using the default timeout.
	pub fn with_client(client: ReqwestClient) -> Self {
		Self { client, timeout: DEFAULT_UPSTREAM_TIMEOUT }
	}

	/// Builds a client that surfaces `3xx` responses instead of following them.
	pub fn without_redirects() -> Result<Self, ReqwestError> {
		ReqwestClient::builder().redirect(Policy::none()).build().map(Self::with_client)
	}

	/// Overrides the per-request timeout.
	pub fn with_timeout(mut self, timeout: StdDuration) -> Self {
		self.timeout = timeout;

		self
	}

	/// Per-request timeout applied to every call.
	pub fn timeout(&self) -> StdDuration {
		self.timeout
	}
}
impl Default for ReqwestHttpClient {
	// reqwest's own `Default` panics on the same builder failure.
	fn default() -> Self {
		Self::without_redirects().unwrap_or_else(|_| Self::with_client(ReqwestClient::default()))
	}
}
impl AsRef<ReqwestClient> for ReqwestHttpClient {
	fn as_ref(&self) -> &ReqwestClient {
		&self.client
	}
}
impl UpstreamHttpClient for ReqwestHttpClient {
	type Handle = InstrumentedHandle;
	type TransportError = ReqwestError;

	fn with_metadata(&self, slot: ResponseMetadataSlot) -> Self::Handle {
		InstrumentedHandle(Arc::new(InstrumentedHttpClient {
			client: self.client.clone(),
			timeout: self.timeout,
			slot,
		}))
	}
}

struct InstrumentedHttpClient {
	client: ReqwestClient,
	timeout: StdDuration,
	slot: ResponseMetadataSlot,
}

/// Handle returned by [`ReqwestHttpClient`] that satisfies [`UpstreamHttpClient`].
#[derive(Clone)]
pub struct InstrumentedHandle(Arc<InstrumentedHttpClient>);
impl<'c> AsyncHttpClient<'c> for InstrumentedHandle {
	type Error = HttpClientError<ReqwestError>;
	type Future =
		Pin<Box<dyn Future<Output = Result<HttpResponse, Self::Error>> + 'c + Send + Sync>>;

	fn call(&'c self, request: HttpRequest) -> Self::Future {
		let client = Arc::clone(&self.0);

		Box::pin(async move {
			client.slot.take();

			let mut request: reqwest::Request = request.try_into().map_err(Box::new)?;

			*request.timeout_mut() = Some(client.timeout);

			let response = client.client.execute(request).await.map_err(Box::new)?;
			let status = response.status();
			let headers = response.headers().to_owned();
			let retry_after = parse_retry_after(&headers);
			let body = response.bytes().await.map_err(Box::new)?.to_vec();
			let failure_body =
				(!status.is_success()).then(|| String::from_utf8_lossy(&body).into_owned());

			client.slot.store(ResponseMetadata {
				status: Some(status.as_u16()),
				retry_after,
				body: failure_body,
			});

			let mut response_new = HttpResponse::new(body);

			*response_new.status_mut() = status;
			*response_new.headers_mut() = headers;

			Ok(response_new)
		})
	}
}

/// Parses a `Retry-After` header given either as delta-seconds or an HTTP date.
pub fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
	let value = headers.get(RETRY_AFTER)?;
	let raw = value.to_str().ok()?.trim();

	if let Ok(secs) = raw.parse::<u32>() {
		return Some(Duration::seconds(i64::from(secs)));
	}
	if let Ok(moment) = OffsetDateTime::parse(raw, &Rfc2822) {
		let delta = moment - OffsetDateTime::now_utc();

		if delta.is_positive() {
			return Some(delta);
		}
	}

	None
}

#[cfg(test)]
mod tests {
	// crates.io
	use reqwest::header::HeaderValue;
	// self
	use super::*;

	#[test]
	fn retry_after_accepts_delta_seconds() {
		let mut headers = HeaderMap::new();

		headers.insert(RETRY_AFTER, HeaderValue::from_static("17"));

		assert_eq!(parse_retry_after(&headers), Some(Duration::seconds(17)));
	}

	#[test]
	fn retry_after_ignores_past_dates_and_garbage() {
		let mut headers = HeaderMap::new();

		headers.insert(RETRY_AFTER, HeaderValue::from_static("Wed, 21 Oct 2015 07:28:00 GMT"));

		assert_eq!(parse_retry_after(&headers), None);

		headers.insert(RETRY_AFTER, HeaderValue::from_static("soon"));

		assert_eq!(parse_retry_after(&headers), None);
		assert_eq!(parse_retry_after(&HeaderMap::new()), None);
	}

	#[test]
	fn metadata_slot_take_clears_value() {
		let slot = ResponseMetadataSlot::default();

		slot.store(ResponseMetadata { status: Some(503), ..Default::default() });

		let meta = slot.take().expect("Stored metadata should be returned.");

		assert!(meta.is_failure());
		assert!(slot.take().is_none());
	}

	#[test]
	fn reqwest_client_defaults_to_bounded_timeout() {
		let client = ReqwestHttpClient::default();

		assert_eq!(client.timeout(), DEFAULT_UPSTREAM_TIMEOUT);
		assert_eq!(
			client.with_timeout(StdDuration::from_millis(250)).timeout(),
			StdDuration::from_millis(250)
		);
	}
}
