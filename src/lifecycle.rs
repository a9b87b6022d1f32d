//! Token lifecycle manager: holds the process-wide [`TokenState`] and renews it.
//!
//! The manager owns the transport used for refresh-grant exchanges, the authorization
//! server's token endpoint, and the safety margin that decides when a cached token is too
//! close to expiry to hand out. Refreshes are serialised behind a single-flight guard so a
//! burst of callers that all observe a stale token produce exactly one upstream exchange.

mod metrics;
mod refresh;

pub use metrics::RefreshMetrics;

// self
use crate::{
	_prelude::*,
	auth::TokenState,
	clock::{Clock, SystemClock},
	http::{ReqwestHttpClient, UpstreamHttpClient},
	oauth::{ReqwestTransportErrorMapper, TransportErrorMapper},
};

/// Default window before expiry during which a token counts as stale.
pub const DEFAULT_SAFETY_MARGIN: Duration = Duration::seconds(60);

/// Manager specialised for the crate's default reqwest transport stack.
pub type ReqwestTokenManager = TokenManager<ReqwestHttpClient, ReqwestTransportErrorMapper>;

/// Owns the access token and the policy for renewing it.
pub struct TokenManager<C = ReqwestHttpClient, M = ReqwestTransportErrorMapper>
where
	C: ?Sized + UpstreamHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// HTTP client wrapper shared by refresh exchanges and forwarded calls.
	pub http_client: Arc<C>,
	/// Mapper applied to transport-layer errors before surfacing them to callers.
	pub transport_mapper: Arc<M>,
	/// Counters describing exchanges and cache reuse.
	pub refresh_metrics: Arc<RefreshMetrics>,
	token_endpoint: Url,
	safety_margin: Duration,
	clock: Arc<dyn Clock>,
	state: RwLock<TokenState>,
	refresh_guard: AsyncMutex<()>,
}
impl<C, M> TokenManager<C, M>
where
	C: ?Sized + UpstreamHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Creates a manager that reuses the caller-provided transport + mapper pair.
	pub fn with_http_client(
		token_endpoint: Url,
		http_client: impl Into<Arc<C>>,
		mapper: impl Into<Arc<M>>,
	) -> Self {
		Self {
			http_client: http_client.into(),
			transport_mapper: mapper.into(),
			refresh_metrics: Default::default(),
			token_endpoint,
			safety_margin: DEFAULT_SAFETY_MARGIN,
			clock: Arc::new(SystemClock),
			state: RwLock::new(TokenState::empty()),
			refresh_guard: AsyncMutex::new(()),
		}
	}

	/// Overrides the safety margin (defaults to 60 seconds); negative values clamp to zero.
	pub fn with_safety_margin(mut self, margin: Duration) -> Self {
		self.safety_margin = if margin.is_negative() { Duration::ZERO } else { margin };

		self
	}

	/// Replaces the time source used for expiry bookkeeping.
	pub fn with_clock(mut self, clock: impl Clock) -> Self {
		self.clock = Arc::new(clock);

		self
	}

	/// Token endpoint of the authorization server.
	pub fn token_endpoint(&self) -> &Url {
		&self.token_endpoint
	}

	/// Window before expiry during which the cached token is renewed.
	pub fn safety_margin(&self) -> Duration {
		self.safety_margin
	}

	/// Current instant according to the configured clock.
	pub fn now(&self) -> OffsetDateTime {
		self.clock.now()
	}
}
impl ReqwestTokenManager {
	/// Creates a manager backed by its own reqwest transport.
	pub fn new(token_endpoint: Url) -> Self {
		Self::with_http_client(
			token_endpoint,
			ReqwestHttpClient::default(),
			ReqwestTransportErrorMapper,
		)
	}
}
impl<C, M> Debug for TokenManager<C, M>
where
	C: ?Sized + UpstreamHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenManager")
			.field("token_endpoint", &self.token_endpoint.as_str())
			.field("safety_margin", &self.safety_margin)
			.field("state", &*self.state.read())
			.finish()
	}
}
