//! Request, outcome, and retry types shared by broker flows.

// crates.io
use rand::Rng;
// self
use crate::{
	_prelude::*,
	auth::{AccessToken, AccountName, Secret},
	config::{AccountConfig, ProxyUri},
	provider::{Classification, FailureReason},
};

/// Inputs of a single token acquisition.
#[derive(Clone, Debug)]
pub struct TokenRequest {
	/// Account the credentials belong to; refreshed tokens are saved under it.
	pub account: AccountName,
	/// Azure AD tenant identifier.
	pub tenant_id: String,
	/// Azure AD application (client) identifier.
	pub client_id: String,
	/// Azure AD client secret.
	pub client_secret: Secret,
	/// Proxy applied to both `http` and `https` traffic.
	pub proxy: Option<ProxyUri>,
	/// Attempt budget; zero is treated as one.
	pub attempts: u32,
}
impl TokenRequest {
	/// Creates a single-attempt request without a proxy.
	pub fn new(
		account: AccountName,
		tenant_id: impl Into<String>,
		client_id: impl Into<String>,
		client_secret: impl Into<Secret>,
	) -> Self {
		Self {
			account,
			tenant_id: tenant_id.into(),
			client_id: client_id.into(),
			client_secret: client_secret.into(),
			proxy: None,
			attempts: 1,
		}
	}

	/// Builds a request from stored account configuration, including its proxy.
	pub fn from_account(account: AccountName, config: &AccountConfig) -> Self {
		Self {
			proxy: config.proxy_uri(),
			..Self::new(
				account,
				config.aad_tenant_id.clone(),
				config.aad_client_id.clone(),
				config.aad_client_secret.clone(),
			)
		}
	}

	/// Overrides the attempt budget.
	pub fn with_retries(mut self, attempts: u32) -> Self {
		self.attempts = attempts;

		self
	}

	/// Routes the request through `proxy`.
	pub fn with_proxy(mut self, proxy: impl Into<Option<ProxyUri>>) -> Self {
		self.proxy = proxy.into();

		self
	}

	/// Effective number of attempts.
	pub fn attempt_budget(&self) -> u32 {
		self.attempts.max(1)
	}

	/// Returns `true` when tenant, client identifier, and client secret are all set.
	///
	/// Tokens obtained with an incomplete triple are written back to the credential store.
	pub fn has_complete_credentials(&self) -> bool {
		!self.tenant_id.is_empty() && !self.client_id.is_empty() && !self.client_secret.is_empty()
	}
}

/// Pacing between token attempts.
///
/// The default retries immediately.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
	/// Fixed pause before each retry.
	pub delay: Duration,
	/// Upper bound of the random extra pause added to `delay`.
	pub jitter: Duration,
	/// Whether a provider `Retry-After` hint may lengthen the pause.
	pub honor_retry_after: bool,
	/// Ceiling applied to every computed pause.
	pub max_delay: Duration,
}
impl RetryPolicy {
	const DEFAULT_MAX_DELAY: Duration = Duration::seconds(60);

	/// Retries without pausing.
	pub fn immediate() -> Self {
		Self {
			delay: Duration::ZERO,
			jitter: Duration::ZERO,
			honor_retry_after: false,
			max_delay: Self::DEFAULT_MAX_DELAY,
		}
	}

	/// Pauses for `delay` before each retry.
	pub fn fixed(delay: Duration) -> Self {
		Self { delay: delay.max(Duration::ZERO), ..Self::immediate() }
	}

	/// Adds up to `jitter` of random extra pause.
	pub fn with_jitter(mut self, jitter: Duration) -> Self {
		self.jitter = jitter.max(Duration::ZERO);

		self
	}

	/// Honors `Retry-After` hints up to `max_delay`.
	pub fn honor_retry_after(mut self, max_delay: Duration) -> Self {
		self.honor_retry_after = true;
		self.max_delay = max_delay.max(Duration::ZERO);

		self
	}

	/// Computes the pause before the next attempt.
	pub fn delay_for(&self, retry_after: Option<Duration>) -> Duration {
		let mut delay = self.delay + self.jitter_sample();

		if self.honor_retry_after
			&& let Some(hint) = retry_after
		{
			delay = delay.max(hint);
		}

		delay.clamp(Duration::ZERO, self.max_delay)
	}

	fn jitter_sample(&self) -> Duration {
		let max_ms = i64::try_from(self.jitter.whole_milliseconds()).unwrap_or(i64::MAX);

		if max_ms <= 0 {
			return Duration::ZERO;
		}

		Duration::milliseconds(rand::rng().random_range(0..=max_ms))
	}
}
impl Default for RetryPolicy {
	fn default() -> Self {
		Self::immediate()
	}
}

/// Terminal failure of a token acquisition.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
#[error("{message}")]
pub struct TokenFailure {
	/// User-facing message.
	pub message: String,
	/// Failure category of the last attempt.
	pub reason: FailureReason,
	/// Number of HTTP attempts made.
	pub attempts: u32,
}
impl TokenFailure {
	/// Builds a failure from a classification.
	pub fn new(classification: Classification, attempts: u32) -> Self {
		Self { message: classification.message, reason: classification.reason, attempts }
	}

	/// Returns `true` when no HTTP response was received.
	pub fn is_connectivity(&self) -> bool {
		matches!(self.reason, FailureReason::Connectivity)
	}
}

/// Result of [`TokenBroker::acquire_token`](crate::flows::TokenBroker::acquire_token).
#[derive(Clone, Debug)]
pub enum TokenOutcome {
	/// The provider issued a token.
	Granted(AccessToken),
	/// Every attempt failed.
	Rejected(TokenFailure),
}
impl TokenOutcome {
	/// Returns `true` for [`TokenOutcome::Granted`].
	pub fn is_granted(&self) -> bool {
		matches!(self, Self::Granted(_))
	}

	/// Issued token, if any.
	pub fn token(&self) -> Option<&AccessToken> {
		match self {
			Self::Granted(token) => Some(token),
			Self::Rejected(_) => None,
		}
	}

	/// Terminal failure, if any.
	pub fn failure(&self) -> Option<&TokenFailure> {
		match self {
			Self::Granted(_) => None,
			Self::Rejected(failure) => Some(failure),
		}
	}

	/// Converts into a standard [`Result`](std::result::Result).
	pub fn into_result(self) -> std::result::Result<AccessToken, TokenFailure> {
		match self {
			Self::Granted(token) => Ok(token),
			Self::Rejected(failure) => Err(failure),
		}
	}
}
