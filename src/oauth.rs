//! Refresh-grant facade over the `oauth2` crate plus the transport error seam.

// crates.io
use oauth2::{
	ClientId, ClientSecret, EndpointNotSet, EndpointSet, HttpClientError, RefreshToken,
	RequestTokenError, TokenResponse, TokenUrl,
	basic::{BasicClient, BasicErrorResponse, BasicRequestTokenError, BasicTokenResponse},
};
// self
use crate::{
	_prelude::*,
	auth::{Credentials, TokenSecret},
	error::{AuthError, TransportError},
	http::{ResponseMetadata, ResponseMetadataSlot, UpstreamHttpClient},
};

type ConfiguredBasicClient =
	BasicClient<EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>;

/// Maps HTTP transport failures into relay [`TransportError`] values.
pub trait TransportErrorMapper<E>
where
	Self: 'static + Send + Sync,
	E: 'static + Send + Sync + StdError,
{
	/// Converts an [`HttpClientError`] emitted by the transport into a relay error.
	fn map_transport_error(
		&self,
		metadata: Option<&ResponseMetadata>,
		error: HttpClientError<E>,
	) -> TransportError;
}

/// Default mapper for reqwest-backed transports.
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransportErrorMapper;
impl TransportErrorMapper<ReqwestError> for ReqwestTransportErrorMapper {
	fn map_transport_error(
		&self,
		_: Option<&ResponseMetadata>,
		err: HttpClientError<ReqwestError>,
	) -> TransportError {
		match err {
			HttpClientError::Reqwest(inner) => TransportError::from(*inner),
			HttpClientError::Http(inner) => TransportError::InvalidRequest(inner),
			HttpClientError::Io(inner) => TransportError::Io(inner),
			HttpClientError::Other(message) => TransportError::Other { message },
			_ => TransportError::Other { message: "unrecognised transport failure".into() },
		}
	}
}

/// Outcome of one successful refresh-grant exchange.
#[derive(Clone, Debug)]
pub struct RefreshedToken {
	/// Newly issued access token.
	pub access_token: TokenSecret,
	/// Lifetime reported by the authorization server.
	pub expires_in: Duration,
	/// Replacement refresh token, when the server rotated it.
	pub rotated_refresh_token: Option<TokenSecret>,
	/// HTTP status of the token response.
	pub status: Option<u16>,
}

/// Performs `grant_type=refresh_token` exchanges for a single credential triple.
///
/// Client authentication uses HTTP Basic (`base64(client_id:client_secret)`), which is the
/// `oauth2` crate's default auth type.
pub(crate) struct RefreshFacade<C, M>
where
	C: ?Sized + UpstreamHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	oauth_client: ConfiguredBasicClient,
	http_client: Arc<C>,
	error_mapper: Arc<M>,
}
impl<C, M> RefreshFacade<C, M>
where
	C: ?Sized + UpstreamHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	pub(crate) fn new(
		credentials: &Credentials,
		token_endpoint: &Url,
		http_client: Arc<C>,
		error_mapper: Arc<M>,
	) -> Self {
		let oauth_client = BasicClient::new(ClientId::new(credentials.client_id().to_owned()))
			.set_client_secret(ClientSecret::new(credentials.client_secret().expose().to_owned()))
			.set_token_uri(TokenUrl::from_url(token_endpoint.clone()));

		Self { oauth_client, http_client, error_mapper }
	}

	pub(crate) async fn refresh_token(
		&self,
		refresh_token: &TokenSecret,
	) -> Result<RefreshedToken, AuthError> {
		let meta = ResponseMetadataSlot::default();
		let instrumented = self.http_client.with_metadata(meta.clone());
		let refresh_secret = RefreshToken::new(refresh_token.expose().to_owned());
		let response = self
			.oauth_client
			.exchange_refresh_token(&refresh_secret)
			.request_async(&instrumented)
			.await
			.map_err(|err| map_request_error(meta.take(), err, self.error_mapper.as_ref()))?;

		map_refresh_token_response(meta.take().and_then(|m| m.status), response)
	}
}

fn map_refresh_token_response(
	status: Option<u16>,
	response: BasicTokenResponse,
) -> Result<RefreshedToken, AuthError> {
	let invalid = |reason: &str| AuthError::InvalidTokenResponse { reason: reason.into(), status };
	let access_token = response.access_token().secret();

	if access_token.is_empty() {
		return Err(invalid("access_token is empty"));
	}

	let expires_in = response.expires_in().ok_or_else(|| invalid("expires_in is missing"))?;
	let expires_in = i64::try_from(expires_in.as_secs())
		.map_err(|_| invalid("expires_in exceeds the supported range"))?;

	if expires_in <= 0 {
		return Err(invalid("expires_in must be positive"));
	}

	Ok(RefreshedToken {
		access_token: TokenSecret::new(access_token.to_owned()),
		expires_in: Duration::seconds(expires_in),
		rotated_refresh_token: response
			.refresh_token()
			.map(|token| TokenSecret::new(token.secret().to_owned())),
		status,
	})
}

fn map_request_error<E, M>(
	meta: Option<ResponseMetadata>,
	err: BasicRequestTokenError<HttpClientError<E>>,
	mapper: &M,
) -> AuthError
where
	E: 'static + Send + Sync + StdError,
	M: ?Sized + TransportErrorMapper<E>,
{
	match err {
		RequestTokenError::ServerResponse(response) => map_server_response_error(meta, &response),
		RequestTokenError::Request(error) =>
			AuthError::Transport(mapper.map_transport_error(meta.as_ref(), error)),
		RequestTokenError::Parse(source, body) => {
			let body = String::from_utf8_lossy(&body).into_owned();

			match meta {
				Some(meta) if meta.is_failure() => rejected(meta, body),
				meta => AuthError::TokenResponseParse {
					source,
					status: meta.and_then(|m| m.status),
					body,
				},
			}
		},
		RequestTokenError::Other(message) => match meta {
			Some(meta) if meta.is_failure() => rejected(meta, message),
			meta => AuthError::InvalidTokenResponse {
				reason: message,
				status: meta.and_then(|m| m.status),
			},
		},
	}
}

fn map_server_response_error(
	meta: Option<ResponseMetadata>,
	response: &BasicErrorResponse,
) -> AuthError {
	let fallback = serde_json::to_string(response).unwrap_or_default();

	match meta {
		Some(meta) if meta.status.is_some() => rejected(meta, fallback),
		meta => AuthError::Rejected {
			status: 400,
			body: fallback,
			retry_after: meta.and_then(|m| m.retry_after),
		},
	}
}

// Prefers the captured upstream body over whatever `oauth2` reconstructed.
fn rejected(meta: ResponseMetadata, fallback: String) -> AuthError {
	AuthError::Rejected {
		status: meta.status.unwrap_or(500),
		body: meta.body.unwrap_or(fallback),
		retry_after: meta.retry_after,
	}
}
