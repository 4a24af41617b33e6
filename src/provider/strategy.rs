//! Provider strategy hooks that customize token requests and classify failed attempts.
//!
//! Implementations work on crate-owned data so flows never hand transport-specific types to a
//! strategy.

// self
use crate::{_prelude::*, provider::ErrorCodeTable};

/// Message used when no HTTP response was received at all.
pub const CONNECTIVITY_MESSAGE: &str = "Unable to request Databricks instance. Please validate the provided Databricks and Proxy configurations or check the network connectivity.";

/// Strategy hook that allows providers to decorate requests and classify failures.
///
/// Implementors are required to be `Send + Sync`. Override only what you need;
/// `augment_token_request` has a default no-op implementation.
pub trait ProviderStrategy: Send + Sync {
	/// Maps a failed token attempt onto a reason and a user-facing message.
	fn classify_failure(&self, ctx: &FailureContext) -> Classification;

	/// Gives providers a chance to add form parameters before dispatching.
	///
	/// `grant_type`, `scope`, `client_id`, and `client_secret` are always sent and are not
	/// part of `form`.
	fn augment_token_request(&self, _form: &mut BTreeMap<String, String>) {}
}

/// Why a token attempt failed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FailureReason {
	/// A provider error code or HTTP status matched the error-code table.
	Classified {
		/// Table key that matched.
		code: String,
	},
	/// An HTTP response arrived but nothing in it matched the table.
	Unclassified {
		/// HTTP status code of the response.
		status: u16,
	},
	/// No HTTP response was received.
	Connectivity,
}

/// Result of [`ProviderStrategy::classify_failure`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Classification {
	/// Failure category.
	pub reason: FailureReason,
	/// Message surfaced to the caller.
	pub message: String,
}
impl Classification {
	/// Classification for failures that never produced an HTTP response.
	pub fn connectivity() -> Self {
		Self { reason: FailureReason::Connectivity, message: CONNECTIVITY_MESSAGE.into() }
	}

	/// Generic classification for responses the table does not recognize.
	pub fn unclassified(status: u16) -> Self {
		Self {
			reason: FailureReason::Unclassified { status },
			message: format!(
				"Response status: {status}. Unable to validate Azure Active Directory Credentials.Check logs for more details."
			),
		}
	}
}

/// Context passed to strategies when classifying a failed attempt.
///
/// Only primitive data is kept (status code, provider error code, network flag) so strategies
/// stay decoupled from the HTTP client.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FailureContext {
	/// HTTP status code returned by the provider, when a response arrived.
	pub http_status: Option<u16>,
	/// First entry of the provider's `error_codes` array.
	pub error_code: Option<String>,
	/// Indicates that no HTTP response was received.
	pub network_error: bool,
}
impl FailureContext {
	/// Creates an empty context.
	pub fn new() -> Self {
		Self::default()
	}

	/// Convenience constructor for transport-level failures.
	pub fn network_failure() -> Self {
		Self { network_error: true, ..Self::default() }
	}

	/// Adds an HTTP status code.
	pub fn with_http_status(mut self, status: u16) -> Self {
		self.http_status = Some(status);

		self
	}

	/// Adds the provider's error code.
	pub fn with_error_code(mut self, code: impl Into<String>) -> Self {
		self.error_code = Some(code.into());

		self
	}
}

/// Strategy that resolves failures through an [`ErrorCodeTable`].
///
/// The provider error code wins over the HTTP status. Responses matching neither get a generic
/// message quoting the status, and failures without any response use
/// [`CONNECTIVITY_MESSAGE`] without inspecting a body.
#[derive(Clone, Debug, Default)]
pub struct AadProviderStrategy {
	table: ErrorCodeTable,
}
impl AadProviderStrategy {
	/// Creates a strategy backed by `table`.
	pub fn new(table: ErrorCodeTable) -> Self {
		Self { table }
	}

	/// Table consulted by this strategy.
	pub fn table(&self) -> &ErrorCodeTable {
		&self.table
	}
}
impl Display for AadProviderStrategy {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("aad-provider-strategy")
	}
}
impl ProviderStrategy for AadProviderStrategy {
	fn classify_failure(&self, ctx: &FailureContext) -> Classification {
		if ctx.network_error {
			return Classification::connectivity();
		}

		if let Some(code) = ctx.error_code.as_deref()
			&& let Some(message) = self.table.lookup(code)
		{
			return Classification {
				reason: FailureReason::Classified { code: code.to_owned() },
				message: message.to_owned(),
			};
		}

		match ctx.http_status {
			Some(status) => match self.table.lookup_status(status) {
				Some(message) => Classification {
					reason: FailureReason::Classified { code: status.to_string() },
					message: message.to_owned(),
				},
				None => Classification::unclassified(status),
			},
			None => Classification::connectivity(),
		}
	}
}
