//! Token acquisition orchestrated by [`TokenBroker`].

pub mod common;

mod client_credentials;
mod metrics;

pub use common::*;
pub use metrics::AttemptMetrics;

// self
use crate::{
	_prelude::*,
	http::TokenHttpClient,
	provider::{AadProviderStrategy, AadSettings, ProviderStrategy},
	store::CredentialStore,
};
#[cfg(feature = "reqwest")] use crate::http::ReqwestHttpClient;

#[cfg(feature = "reqwest")]
/// Broker specialized for the crate's default reqwest transport.
pub type ReqwestBroker = TokenBroker<ReqwestHttpClient>;

/// Acquires Azure AD tokens and writes refreshed ones back to a credential store.
///
/// The broker owns the HTTP client, the credential store, the immutable provider settings, and
/// the strategy that turns failed attempts into user-facing messages. Account-specific inputs
/// travel in each [`TokenRequest`].
#[derive(Clone)]
pub struct TokenBroker<C>
where
	C: ?Sized + TokenHttpClient,
{
	/// HTTP client wrapper used for every token endpoint request.
	pub http_client: Arc<C>,
	/// Store receiving tokens obtained with incomplete credentials.
	pub store: Arc<dyn CredentialStore>,
	/// Endpoint, scope, and transport settings.
	pub settings: Arc<AadSettings>,
	/// Strategy classifying failed attempts.
	pub strategy: Arc<dyn ProviderStrategy>,
	/// Pacing between attempts.
	pub retry_policy: RetryPolicy,
	/// Shared counters for token endpoint attempts.
	pub attempt_metrics: Arc<AttemptMetrics>,
}
impl<C> TokenBroker<C>
where
	C: ?Sized + TokenHttpClient,
{
	/// Creates a broker that reuses the caller-provided transport.
	pub fn with_http_client(
		store: Arc<dyn CredentialStore>,
		settings: impl Into<Arc<AadSettings>>,
		http_client: impl Into<Arc<C>>,
	) -> Self {
		Self {
			http_client: http_client.into(),
			store,
			settings: settings.into(),
			strategy: Arc::new(AadProviderStrategy::default()),
			retry_policy: RetryPolicy::default(),
			attempt_metrics: Default::default(),
		}
	}

	/// Replaces the failure classification strategy.
	pub fn with_strategy(mut self, strategy: Arc<dyn ProviderStrategy>) -> Self {
		self.strategy = strategy;

		self
	}

	/// Replaces the retry pacing.
	pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
		self.retry_policy = policy;

		self
	}
}
#[cfg(feature = "reqwest")]
impl TokenBroker<ReqwestHttpClient> {
	/// Creates a broker with a reqwest transport built from `settings`.
	pub fn new(store: Arc<dyn CredentialStore>, settings: AadSettings) -> Result<Self> {
		let http_client = ReqwestHttpClient::from_settings(&settings)?;

		Ok(Self::with_http_client(store, settings, http_client))
	}
}
impl<C> Debug for TokenBroker<C>
where
	C: ?Sized + TokenHttpClient,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenBroker")
			.field("settings", &self.settings)
			.field("retry_policy", &self.retry_policy)
			.field("attempt_metrics", &self.attempt_metrics)
			.finish()
	}
}
