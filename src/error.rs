//! Relay-level error types shared by the token lifecycle, the forwarder, and the server.

// self
use crate::_prelude::*;

/// Relay-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical relay error exposed by top-level APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Local configuration problem detected at startup.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Refresh grant failed.
	#[error(transparent)]
	Auth(#[from] AuthError),
	/// Forwarding failed.
	#[error(transparent)]
	Proxy(#[from] ProxyError),
	/// Listener could not be bound or the server loop failed.
	#[error("Server I/O failed.")]
	Server(#[source] std::io::Error),
}

/// Configuration and validation failures raised while assembling the relay.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// Only part of the credential triple was supplied.
	#[error("Credentials must be supplied together; `{missing}` is missing.")]
	PartialCredentials {
		/// Name of the first missing setting.
		missing: &'static str,
	},
	/// Supplied credentials failed validation.
	#[error(transparent)]
	InvalidCredentials(#[from] CredentialsError),
	/// A duration setting is zero where a positive value is required.
	#[error("`{setting}` must be greater than zero.")]
	ZeroDuration {
		/// Setting name.
		setting: &'static str,
	},
	/// A duration setting does not fit the supported range.
	#[error("`{setting}` exceeds the supported range.")]
	DurationOutOfRange {
		/// Setting name.
		setting: &'static str,
	},
	/// The upstream HTTP client could not be built.
	#[error("Upstream HTTP client could not be built.")]
	HttpClient(#[source] ReqwestError),
	/// The tracing subscriber could not be installed.
	#[error("Tracing subscriber could not be installed.")]
	Tracing {
		/// Underlying initialisation failure.
		#[source]
		source: BoxError,
	},
}
impl ConfigError {
	/// Wraps a subscriber initialisation failure.
	pub fn tracing(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Tracing { source: Box::new(src) }
	}
}

/// Validation failures for a credential triple.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum CredentialsError {
	/// A credential field was empty or whitespace.
	#[error("`{field}` cannot be empty.")]
	Empty {
		/// Field name.
		field: &'static str,
	},
	/// A credential field contains whitespace.
	#[error("`{field}` contains whitespace.")]
	ContainsWhitespace {
		/// Field name.
		field: &'static str,
	},
	/// Caller supplied some but not all of the credential fields.
	#[error("`{missing}` is required when credentials are supplied.")]
	Incomplete {
		/// Name of the first missing field.
		missing: &'static str,
	},
}

/// Failures raised while obtaining an access token from the authorization server.
#[derive(Debug, ThisError)]
pub enum AuthError {
	/// No credential triple is available to perform the refresh grant.
	#[error("No credentials are available for the refresh grant.")]
	MissingCredentials,
	/// Authorization server answered with a non-success status.
	#[error("Authorization server rejected the refresh grant with HTTP {status}.")]
	Rejected {
		/// HTTP status returned by the authorization server.
		status: u16,
		/// Raw response body.
		body: String,
		/// Retry-After hint, if supplied.
		retry_after: Option<Duration>,
	},
	/// Authorization server answered with JSON that could not be parsed.
	#[error("Authorization server returned malformed token JSON.")]
	TokenResponseParse {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
		/// HTTP status, when available.
		status: Option<u16>,
		/// Raw response body.
		body: String,
	},
	/// Token response parsed but cannot be used.
	#[error("Token response is unusable: {reason}.")]
	InvalidTokenResponse {
		/// Description of the defect.
		reason: String,
		/// HTTP status, when available.
		status: Option<u16>,
	},
	/// Authorization server could not be reached.
	#[error(transparent)]
	Transport(#[from] TransportError),
}
impl AuthError {
	/// HTTP status reported by the authorization server, when one was received.
	pub fn upstream_status(&self) -> Option<u16> {
		match self {
			Self::Rejected { status, .. } => Some(*status),
			Self::TokenResponseParse { status, .. } | Self::InvalidTokenResponse { status, .. } =>
				*status,
			Self::MissingCredentials | Self::Transport(_) => None,
		}
	}

	/// Raw body returned by the authorization server, when one was received.
	pub fn upstream_body(&self) -> Option<&str> {
		match self {
			Self::Rejected { body, .. } | Self::TokenResponseParse { body, .. } => Some(body),
			_ => None,
		}
	}
}

/// Transport-level failures (network, timeout, request construction).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the upstream server.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// The bounded upstream timeout elapsed.
	#[error("Upstream server did not answer before the timeout elapsed.")]
	Timeout,
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling the upstream server.")]
	Io(#[from] std::io::Error),
	/// The outbound request could not be constructed.
	#[error("Upstream request could not be constructed.")]
	InvalidRequest(#[from] oauth2::http::Error),
	/// Transport reported a failure without a typed source.
	#[error("HTTP client error occurred while calling the upstream server: {message}.")]
	Other {
		/// Transport-supplied message.
		message: String,
	},
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		if e.is_timeout() { Self::Timeout } else { Self::network(e) }
	}
}

/// Failures raised by [`Forwarder::forward`](crate::forward::Forwarder::forward).
#[derive(Debug, ThisError)]
pub enum ProxyError {
	/// No valid access token could be obtained; the upstream API was not called.
	#[error("No valid access token is available.")]
	Unauthorized(#[source] AuthError),
	/// The resource API call failed after a token was attached.
	#[error("Upstream request failed.")]
	UpstreamFailure(#[source] TransportError),
	/// The target resource cannot be joined onto the API base URL.
	#[error("Target `{target}` is not a valid upstream resource: {reason}.")]
	InvalidTarget {
		/// Offending target.
		target: String,
		/// Why it was rejected.
		reason: String,
	},
}
impl ProxyError {
	/// HTTP status the relay answers with for this failure.
	pub fn status_code(&self) -> u16 {
		match self {
			Self::Unauthorized(_) => 401,
			Self::UpstreamFailure(_) => 500,
			Self::InvalidTarget { .. } => 400,
		}
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn auth_error_exposes_upstream_detail() {
		let err = AuthError::Rejected {
			status: 400,
			body: "{\"error\":\"invalid_grant\"}".into(),
			retry_after: None,
		};

		assert_eq!(err.upstream_status(), Some(400));
		assert_eq!(err.upstream_body(), Some("{\"error\":\"invalid_grant\"}"));
		assert_eq!(AuthError::MissingCredentials.upstream_status(), None);
		assert_eq!(AuthError::from(TransportError::Timeout).upstream_body(), None);
	}

	#[test]
	fn proxy_error_status_codes() {
		assert_eq!(ProxyError::Unauthorized(AuthError::MissingCredentials).status_code(), 401);
		assert_eq!(ProxyError::UpstreamFailure(TransportError::Timeout).status_code(), 500);
		assert_eq!(
			ProxyError::InvalidTarget { target: "../x".into(), reason: "traversal".into() }
				.status_code(),
			400
		);
	}
}
