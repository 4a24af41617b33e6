//! Provider error codes and HTTP statuses mapped to user-facing messages.

// self
use crate::_prelude::*;

/// Lookup table from provider error codes (or HTTP status codes) to actionable messages.
///
/// Keys are compared as strings so AAD's numeric `error_codes` and HTTP statuses share a single
/// namespace.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ErrorCodeTable(BTreeMap<String, String>);
impl ErrorCodeTable {
	/// Returns the table shipped with the add-on.
	pub fn aad() -> Self {
		Self::from_entries([
			("700016", "Invalid Client ID provided."),
			("900023", "Invalid Tenant ID provided."),
			("7000215", "Invalid Client Secret provided."),
			("403", "Client secret may have expired. Please configure a valid Client secret."),
			("404", "Invalid API endpoint."),
			("500", "Internal server error."),
			("400", "Bad request. The request is malformed."),
			("429", "API limit exceeded. Please try again after some time."),
		])
	}

	/// Creates an empty table.
	pub fn empty() -> Self {
		Self(BTreeMap::new())
	}

	/// Builds a table from `(code, message)` pairs.
	pub fn from_entries<I, K, V>(entries: I) -> Self
	where
		I: IntoIterator<Item = (K, V)>,
		K: Into<String>,
		V: Into<String>,
	{
		Self(entries.into_iter().map(|(code, message)| (code.into(), message.into())).collect())
	}

	/// Adds or replaces a single entry.
	pub fn with_entry(mut self, code: impl Into<String>, message: impl Into<String>) -> Self {
		self.0.insert(code.into(), message.into());

		self
	}

	/// Looks up the message registered for `code`.
	pub fn lookup(&self, code: &str) -> Option<&str> {
		self.0.get(code).map(String::as_str)
	}

	/// Looks up the message registered for an HTTP status code.
	pub fn lookup_status(&self, status: u16) -> Option<&str> {
		self.lookup(&status.to_string())
	}

	/// Number of registered entries.
	pub fn len(&self) -> usize {
		self.0.len()
	}

	/// Returns `true` when no entries are registered.
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}
}
impl Default for ErrorCodeTable {
	fn default() -> Self {
		Self::aad()
	}
}
