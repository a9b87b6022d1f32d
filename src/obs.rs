//! Observability helpers for relay operations.
//!
//! # Feature Flags
//!
//! - Spans named `spotify_relay.operation` carry the `operation` (refresh or forward) and
//!   `stage` (call site) fields and are always emitted through `tracing`.
//! - Enable `metrics` to increment the `spotify_relay_operation_total` counter for every
//!   attempt/success/failure, labeled by `operation` + `outcome`.

mod counters;
mod span;
mod subscriber;

pub use counters::*;
pub use span::*;
pub use subscriber::*;

// self
use crate::_prelude::*;

/// Operation kinds observed by the relay.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OperationKind {
	/// Refresh-grant exchanges and cached-token lookups.
	Refresh,
	/// Authenticated forwarding to the resource API.
	Forward,
}
impl OperationKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			OperationKind::Refresh => "refresh",
			OperationKind::Forward => "forward",
		}
	}
}
impl Display for OperationKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Outcome {
	/// Entry to an operation.
	Attempt,
	/// Successful completion.
	Success,
	/// Failure propagated back to the caller.
	Failure,
}
impl Outcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Outcome::Attempt => "attempt",
			Outcome::Success => "success",
			Outcome::Failure => "failure",
		}
	}

	/// Maps a result onto its outcome label.
	pub fn of<T, E>(result: &std::result::Result<T, E>) -> Self {
		if result.is_ok() { Outcome::Success } else { Outcome::Failure }
	}
}
impl Display for Outcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
