//! Optional observability helpers for add-on flows.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit structured spans named `databricks_addon.flow` with the `flow` and
//!   `stage` (call site) fields, plus the per-attempt events logged by each flow.
//! - Enable `metrics` to increment the `databricks_addon_flow_total` counter for every
//!   attempt/success/failure, labeled by `flow` + `outcome`, and the
//!   `databricks_addon_token_request_total` counter for every HTTP call to the token endpoint.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Flow kinds observed by the crate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowKind {
	/// Client-credentials token acquisition.
	ClientCredentials,
	/// Account configuration lookup.
	CredentialFetch,
	/// Access token persistence.
	CredentialSave,
	/// Proxy settings lookup.
	ProxyLookup,
}
impl FlowKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowKind::ClientCredentials => "client_credentials",
			FlowKind::CredentialFetch => "credential_fetch",
			FlowKind::CredentialSave => "credential_save",
			FlowKind::ProxyLookup => "proxy_lookup",
		}
	}
}
impl Display for FlowKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowOutcome {
	/// Entry to a flow helper.
	Attempt,
	/// Successful completion.
	Success,
	/// Failure reported back to the caller.
	Failure,
}
impl FlowOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowOutcome::Attempt => "attempt",
			FlowOutcome::Success => "success",
			FlowOutcome::Failure => "failure",
		}
	}
}
impl Display for FlowOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
