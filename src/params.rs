//! Notebook parameter parsing for the `param1=val1||param2=val2` format.

// self
use crate::_prelude::*;

/// Raised when a notebook parameter string is malformed.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
#[error(
	"Invalid format for parameter notebook_params. Provide the value in 'param1=val1||param2=val2' format."
)]
pub struct ParamsError {
	/// Offending `key=value` item.
	pub item: String,
}

/// Parses `key1=val1||key2=val2` into a key-sorted map.
///
/// Keys and values are trimmed. Anything after a second `=` in an item is dropped, and later
/// duplicates replace earlier ones. An empty (or blank) input yields an empty map.
pub fn parse_notebook_params(raw: &str) -> Result<BTreeMap<String, String>, ParamsError> {
	let mut params = BTreeMap::new();

	if raw.trim().is_empty() {
		return Ok(params);
	}

	for item in raw.split("||") {
		let mut parts = item.split('=');
		let key = parts.next().unwrap_or_default();
		let Some(value) = parts.next() else {
			return Err(ParamsError { item: item.to_owned() });
		};

		params.insert(key.trim().to_owned(), value.trim().to_owned());
	}

	Ok(params)
}
