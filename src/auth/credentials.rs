//! Credential triples identifying one authorization grant.

// self
use crate::{_prelude::*, auth::TokenSecret, error::CredentialsError};

/// Client identifier, client secret, and refresh token for a single grant.
///
/// A triple is immutable once built; each refresh operation borrows it as-is.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
	client_id: String,
	client_secret: TokenSecret,
	refresh_token: TokenSecret,
}
impl Credentials {
	/// Validates and builds a credential triple.
	pub fn new(
		client_id: impl Into<String>,
		client_secret: impl Into<String>,
		refresh_token: impl Into<String>,
	) -> Result<Self, CredentialsError> {
		let client_id = client_id.into();
		let client_secret = client_secret.into();
		let refresh_token = refresh_token.into();

		validate_field("client_id", &client_id)?;
		validate_field("client_secret", &client_secret)?;
		validate_field("refresh_token", &refresh_token)?;

		Ok(Self {
			client_id,
			client_secret: TokenSecret::new(client_secret),
			refresh_token: TokenSecret::new(refresh_token),
		})
	}

	/// OAuth 2.0 client identifier.
	pub fn client_id(&self) -> &str {
		&self.client_id
	}

	/// OAuth 2.0 client secret.
	pub fn client_secret(&self) -> &TokenSecret {
		&self.client_secret
	}

	/// Long-lived refresh token.
	pub fn refresh_token(&self) -> &TokenSecret {
		&self.refresh_token
	}
}
impl Debug for Credentials {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Credentials")
			.field("client_id", &self.client_id)
			.field("client_secret", &"<redacted>")
			.field("refresh_token", &"<redacted>")
			.finish()
	}
}

/// Caller-supplied credential fields, accepted from a query string or a JSON body.
///
/// Both `camelCase` and `snake_case` field names are accepted.
#[derive(Clone, Default, Deserialize)]
pub struct CredentialsPayload {
	/// Client identifier.
	#[serde(default, alias = "clientId")]
	pub client_id: Option<String>,
	/// Client secret.
	#[serde(default, alias = "clientSecret")]
	pub client_secret: Option<String>,
	/// Refresh token.
	#[serde(default, alias = "refreshToken")]
	pub refresh_token: Option<String>,
}
impl CredentialsPayload {
	/// Returns `true` when the caller supplied none of the fields.
	pub fn is_empty(&self) -> bool {
		self.client_id.is_none() && self.client_secret.is_none() && self.refresh_token.is_none()
	}

	/// Fills fields missing here from `other`.
	pub fn or(self, other: Self) -> Self {
		Self {
			client_id: self.client_id.or(other.client_id),
			client_secret: self.client_secret.or(other.client_secret),
			refresh_token: self.refresh_token.or(other.refresh_token),
		}
	}

	/// Converts the payload into validated credentials.
	///
	/// An empty payload yields `Ok(None)`; a partial one is rejected.
	pub fn into_credentials(self) -> Result<Option<Credentials>, CredentialsError> {
		if self.is_empty() {
			return Ok(None);
		}

		let client_id = self.client_id.ok_or(CredentialsError::Incomplete { missing: "clientId" })?;
		let client_secret =
			self.client_secret.ok_or(CredentialsError::Incomplete { missing: "clientSecret" })?;
		let refresh_token =
			self.refresh_token.ok_or(CredentialsError::Incomplete { missing: "refreshToken" })?;

		Credentials::new(client_id, client_secret, refresh_token).map(Some)
	}
}
impl Debug for CredentialsPayload {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("CredentialsPayload")
			.field("client_id", &self.client_id)
			.field("client_secret_set", &self.client_secret.is_some())
			.field("refresh_token_set", &self.refresh_token.is_some())
			.finish()
	}
}

fn validate_field(field: &'static str, value: &str) -> Result<(), CredentialsError> {
	if value.trim().is_empty() {
		return Err(CredentialsError::Empty { field });
	}
	if value.chars().any(char::is_whitespace) {
		return Err(CredentialsError::ContainsWhitespace { field });
	}

	Ok(())
}
