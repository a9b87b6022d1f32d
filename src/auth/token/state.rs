//! Process-wide access-token state and its freshness rules.

// self
use crate::{_prelude::*, auth::TokenSecret};

/// Freshness of the cached access token at a given instant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenStatus {
	/// No access token has been obtained yet.
	Missing,
	/// Token stays valid for longer than the safety margin.
	Fresh,
	/// Token is still valid but expires within the safety margin.
	Expiring,
	/// Token passed its expiry instant.
	Expired,
}

/// Snapshot of the current access token and the instant after which it is invalid.
///
/// A state is only ever replaced wholesale. When no token is present the expiry instant is
/// meaningless and pinned to the Unix epoch, so the state always reads as expired.
#[derive(Clone, PartialEq, Eq)]
pub struct TokenState {
	access_token: Option<TokenSecret>,
	issued_at: Option<OffsetDateTime>,
	expires_at: OffsetDateTime,
}
impl TokenState {
	/// State held before the first successful refresh.
	pub fn empty() -> Self {
		Self { access_token: None, issued_at: None, expires_at: OffsetDateTime::UNIX_EPOCH }
	}

	/// State produced by a successful refresh at `issued_at` with the reported lifetime.
	///
	/// Returns `None` when the expiry instant falls outside the representable date range.
	pub fn issued(
		access_token: impl Into<String>,
		issued_at: OffsetDateTime,
		lifetime: Duration,
	) -> Option<Self> {
		let expires_at = issued_at.checked_add(lifetime)?;

		Some(Self {
			access_token: Some(TokenSecret::new(access_token)),
			issued_at: Some(issued_at),
			expires_at,
		})
	}

	/// Current access token, if any. Callers must avoid logging it.
	pub fn access_token(&self) -> Option<&TokenSecret> {
		self.access_token.as_ref()
	}

	/// Returns `true` once a token has been obtained.
	pub fn has_token(&self) -> bool {
		self.access_token.is_some()
	}

	/// Instant the token was obtained.
	pub fn issued_at(&self) -> Option<OffsetDateTime> {
		self.issued_at
	}

	/// Instant after which the token must be treated as invalid.
	pub fn expires_at(&self) -> OffsetDateTime {
		self.expires_at
	}

	/// Classifies the token at `now` against the provided safety margin.
	pub fn status_at(&self, now: OffsetDateTime, margin: Duration) -> TokenStatus {
		if self.access_token.is_none() {
			return TokenStatus::Missing;
		}
		if now >= self.expires_at {
			return TokenStatus::Expired;
		}
		if self.expires_at - now > margin {
			return TokenStatus::Fresh;
		}

		TokenStatus::Expiring
	}

	/// Returns the token only if it stays valid for longer than `margin` after `now`.
	pub fn usable_at(&self, now: OffsetDateTime, margin: Duration) -> Option<&TokenSecret> {
		match self.status_at(now, margin) {
			TokenStatus::Fresh => self.access_token.as_ref(),
			_ => None,
		}
	}

	/// Time left until expiry, clamped at zero.
	pub fn remaining_at(&self, now: OffsetDateTime) -> Duration {
		if self.access_token.is_none() || now >= self.expires_at {
			Duration::ZERO
		} else {
			self.expires_at - now
		}
	}
}
impl Default for TokenState {
	fn default() -> Self {
		Self::empty()
	}
}
impl Debug for TokenState {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenState")
			.field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
			.field("issued_at", &self.issued_at)
			.field("expires_at", &self.expires_at)
			.finish()
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;

	const MARGIN: Duration = Duration::seconds(60);

	#[test]
	fn status_transitions_cover_all_states() {
		let issued = macros::datetime!(2025-01-01 00:00 UTC);
		let state = TokenState::issued("access", issued, Duration::hours(1))
			.expect("One-hour lifetime should be representable.");

		assert_eq!(TokenState::empty().status_at(issued, MARGIN), TokenStatus::Missing);
		assert_eq!(
			state.status_at(macros::datetime!(2025-01-01 00:30 UTC), MARGIN),
			TokenStatus::Fresh
		);
		assert_eq!(
			state.status_at(macros::datetime!(2025-01-01 00:59 UTC), MARGIN),
			TokenStatus::Expiring
		);
		assert_eq!(
			state.status_at(macros::datetime!(2025-01-01 01:00 UTC), MARGIN),
			TokenStatus::Expired
		);
	}

	#[test]
	fn margin_boundary_is_treated_as_stale() {
		let issued = macros::datetime!(2025-01-01 00:00 UTC);
		let state = TokenState::issued("access", issued, Duration::hours(1))
			.expect("One-hour lifetime should be representable.");
		let boundary = state.expires_at() - MARGIN;

		assert!(state.usable_at(boundary - Duration::seconds(1), MARGIN).is_some());
		assert!(state.usable_at(boundary, MARGIN).is_none());
	}

	#[test]
	fn empty_state_reads_as_expired_at_epoch() {
		let state = TokenState::empty();

		assert!(!state.has_token());
		assert_eq!(state.expires_at(), OffsetDateTime::UNIX_EPOCH);
		assert_eq!(state.remaining_at(OffsetDateTime::now_utc()), Duration::ZERO);
		assert!(state.usable_at(OffsetDateTime::UNIX_EPOCH, Duration::ZERO).is_none());
	}

	#[test]
	fn debug_redacts_access_token() {
		let state =
			TokenState::issued("very-secret", macros::datetime!(2025-01-01 00:00 UTC), MARGIN)
				.expect("One-minute lifetime should be representable.");

		assert!(!format!("{state:?}").contains("very-secret"));
	}

	#[test]
	fn unrepresentable_expiry_is_rejected() {
		let issued = macros::datetime!(2025-01-01 00:00 UTC);
		let lifetime = Duration::seconds(1_000_000_000_000);

		assert!(TokenState::issued("access", issued, lifetime).is_none());
	}
}
