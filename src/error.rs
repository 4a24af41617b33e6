//! Crate-level error types shared across flows, stores, and the splunkd client.
//!
//! Token endpoint rejections are not errors: they are reported as
//! [`TokenFailure`](crate::flows::TokenFailure) values. [`Error`] covers local configuration
//! problems, splunkd failures, and the storage failures that must reach the caller.

// self
use crate::_prelude::*;

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Credential store failure.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// splunkd REST failure.
	#[cfg(feature = "reqwest")]
	#[error(transparent)]
	Splunk(#[from] crate::splunk::SplunkError),
}

/// Configuration and validation failures.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// Proxy URI was rejected by the transport.
	#[error("Proxy URI is invalid.")]
	InvalidProxy {
		/// Underlying transport failure.
		#[source]
		source: BoxError,
	},
	/// Token endpoint URL cannot be rendered.
	#[error("Token endpoint URL is invalid.")]
	InvalidEndpoint {
		/// Underlying parsing failure.
		#[source]
		source: oauth2::url::ParseError,
	},
	/// Account configuration payload cannot be parsed.
	#[error("Account configuration is malformed.")]
	InvalidAccountConfig {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
	/// Account name failed validation.
	#[error(transparent)]
	InvalidAccountName(#[from] crate::auth::IdentifierError),
	/// Provider settings failed validation.
	#[error(transparent)]
	InvalidSettings(#[from] crate::provider::AadSettingsError),
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}

	/// Wraps a transport's proxy parsing failure inside [`ConfigError`].
	pub fn invalid_proxy(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::InvalidProxy { source: Box::new(src) }
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::error::Error as _;
	// self
	use super::*;
	use crate::store::StoreError;

	#[test]
	fn store_error_converts_with_source() {
		let store_error = StoreError::Backend { message: "splunkd unreachable".into() };
		let error: Error = store_error.clone().into();

		assert!(matches!(error, Error::Storage(_)));
		assert!(error.to_string().contains("splunkd unreachable"));

		let source = error.source().expect("Storage errors should expose their source.");

		assert_eq!(source.to_string(), store_error.to_string());
	}
}
