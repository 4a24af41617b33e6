//! Typed account and proxy configuration.
//!
//! splunkd hands configuration back as loosely typed JSON: booleans as `"1"`/`"true"`, ports as
//! strings, unset fields as `""` or `null`. The types here enumerate every recognized key and
//! normalize those shapes on the way in, so the rest of the crate only sees [`Option`]s and
//! real booleans.

// self
use crate::{_prelude::*, auth::Secret, error::ConfigError};

/// Returns `true` for the values Splunk treats as an enabled flag.
///
/// Matches `1`, `true`, `t`, `yes`, and `y`, ignoring case and surrounding whitespace.
pub fn is_true(value: &str) -> bool {
	matches!(value.trim().to_ascii_uppercase().as_str(), "1" | "TRUE" | "T" | "Y" | "YES")
}

/// Proxy protocol configured for outbound requests.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProxyType {
	/// Plain HTTP proxy.
	Http,
	/// HTTP proxy reached over TLS.
	Https,
	/// SOCKS4 proxy.
	Socks4,
	/// SOCKS5 proxy.
	Socks5,
}
impl ProxyType {
	/// URI scheme for this proxy type.
	pub const fn as_str(self) -> &'static str {
		match self {
			ProxyType::Http => "http",
			ProxyType::Https => "https",
			ProxyType::Socks4 => "socks4",
			ProxyType::Socks5 => "socks5",
		}
	}
}
impl Display for ProxyType {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
impl FromStr for ProxyType {
	type Err = UnknownProxyType;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.trim().to_ascii_lowercase().as_str() {
			"http" => Ok(ProxyType::Http),
			"https" => Ok(ProxyType::Https),
			"socks4" => Ok(ProxyType::Socks4),
			"socks5" => Ok(ProxyType::Socks5),
			_ => Err(UnknownProxyType(s.to_owned())),
		}
	}
}

/// Error returned when a proxy type string is not recognized.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
#[error("Unknown proxy type `{0}`.")]
pub struct UnknownProxyType(pub String);

/// Proxy settings as stored by the add-on.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxySettings {
	/// Whether the proxy is enabled.
	#[serde(rename = "proxy_enabled", deserialize_with = "de::flag")]
	pub enabled: bool,
	/// Proxy host name or address.
	#[serde(
		rename = "proxy_url",
		deserialize_with = "de::non_empty",
		skip_serializing_if = "Option::is_none"
	)]
	pub url: Option<String>,
	/// Proxy port.
	#[serde(rename = "proxy_port", deserialize_with = "de::port", skip_serializing_if = "Option::is_none")]
	pub port: Option<u16>,
	/// Proxy protocol.
	#[serde(
		rename = "proxy_type",
		deserialize_with = "de::proxy_type",
		skip_serializing_if = "Option::is_none"
	)]
	pub kind: Option<ProxyType>,
	/// Proxy username.
	#[serde(
		rename = "proxy_username",
		deserialize_with = "de::non_empty",
		skip_serializing_if = "Option::is_none"
	)]
	pub username: Option<String>,
	/// Proxy password.
	#[serde(
		rename = "proxy_password",
		deserialize_with = "de::non_empty",
		skip_serializing_if = "Option::is_none"
	)]
	pub password: Option<Secret>,
}
impl ProxySettings {
	/// Assembles the proxy URI `type://[user:pass@]url[:port]`.
	///
	/// Returns `None` unless the proxy is enabled and both a URL and a type are configured.
	/// Credentials are included only when both are present, percent-encoded with no safe
	/// characters.
	pub fn uri(&self) -> Option<ProxyUri> {
		if !self.enabled {
			return None;
		}

		let url = self.url.as_deref()?;
		let kind = self.kind?;
		let mut authority = match self.port.filter(|port| *port != 0) {
			Some(port) => format!("{url}:{port}"),
			None => url.to_owned(),
		};

		if let (Some(username), Some(password)) = (self.username.as_deref(), self.password.as_ref())
		{
			authority = format!(
				"{}:{}@{authority}",
				urlencoding::encode(username),
				urlencoding::encode(password.expose())
			);
		}

		Some(ProxyUri::new(format!("{kind}://{authority}")))
	}
}

/// Assembled proxy URI, applied to both `http` and `https` traffic.
///
/// The URI may embed credentials, so formatting redacts the user-info component.
#[derive(Clone, PartialEq, Eq)]
pub struct ProxyUri(Secret);
impl ProxyUri {
	/// Wraps an already assembled URI.
	pub fn new(uri: impl Into<String>) -> Self {
		Self(Secret::new(uri))
	}

	/// Returns the full URI, credentials included.
	pub fn expose(&self) -> &str {
		self.0.expose()
	}

	/// Returns the URI with any user-info replaced by `<redacted>`.
	pub fn redacted(&self) -> String {
		let raw = self.expose();
		let Some((scheme, rest)) = raw.split_once("://") else {
			return raw.to_owned();
		};

		match rest.rsplit_once('@') {
			Some((_, host)) => format!("{scheme}://<redacted>@{host}"),
			None => raw.to_owned(),
		}
	}
}
impl Debug for ProxyUri {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("ProxyUri").field(&self.redacted()).finish()
	}
}
impl Display for ProxyUri {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.redacted())
	}
}

/// Account configuration returned by the credential store.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccountConfig {
	/// Azure AD tenant identifier.
	#[serde(deserialize_with = "de::null_as_default")]
	pub aad_tenant_id: String,
	/// Azure AD application (client) identifier.
	#[serde(deserialize_with = "de::null_as_default")]
	pub aad_client_id: String,
	/// Azure AD client secret.
	#[serde(deserialize_with = "de::null_as_default")]
	pub aad_client_secret: Secret,
	/// Most recently persisted access token.
	#[serde(deserialize_with = "de::non_empty", skip_serializing_if = "Option::is_none")]
	pub aad_access_token: Option<Secret>,
	/// Proxy settings stored alongside the account.
	#[serde(flatten)]
	pub proxy: ProxySettings,
}
impl AccountConfig {
	/// Parses the JSON body returned by the credential endpoint.
	pub fn from_json(bytes: &[u8]) -> Result<Self, ConfigError> {
		let mut deserializer = serde_json::Deserializer::from_slice(bytes);

		serde_path_to_error::deserialize(&mut deserializer)
			.map_err(|source| ConfigError::InvalidAccountConfig { source })
	}

	/// Returns `true` when tenant, client identifier, and client secret are all set.
	pub fn has_complete_credentials(&self) -> bool {
		!self.aad_tenant_id.is_empty()
			&& !self.aad_client_id.is_empty()
			&& !self.aad_client_secret.is_empty()
	}

	/// Proxy URI derived from the embedded proxy settings.
	pub fn proxy_uri(&self) -> Option<ProxyUri> {
		self.proxy.uri()
	}
}

mod de {
	// crates.io
	use serde::{Deserializer, de::Error as _};
	// self
	use super::*;

	#[derive(Deserialize)]
	#[serde(untagged)]
	enum FlagRepr {
		Bool(bool),
		Number(i64),
		Text(String),
	}

	#[derive(Deserialize)]
	#[serde(untagged)]
	enum PortRepr {
		Number(u16),
		Text(String),
	}

	pub(super) fn flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
	where
		D: Deserializer<'de>,
	{
		Ok(match Option::<FlagRepr>::deserialize(deserializer)? {
			Some(FlagRepr::Bool(value)) => value,
			Some(FlagRepr::Number(value)) => value != 0,
			Some(FlagRepr::Text(value)) => is_true(&value),
			None => false,
		})
	}

	pub(super) fn port<'de, D>(deserializer: D) -> Result<Option<u16>, D::Error>
	where
		D: Deserializer<'de>,
	{
		match Option::<PortRepr>::deserialize(deserializer)? {
			Some(PortRepr::Number(value)) => Ok(Some(value)),
			Some(PortRepr::Text(value)) if value.trim().is_empty() => Ok(None),
			Some(PortRepr::Text(value)) => value
				.trim()
				.parse()
				.map(Some)
				.map_err(|_| D::Error::custom(format!("invalid proxy port `{value}`"))),
			None => Ok(None),
		}
	}

	pub(super) fn proxy_type<'de, D>(deserializer: D) -> Result<Option<ProxyType>, D::Error>
	where
		D: Deserializer<'de>,
	{
		non_empty::<D, String>(deserializer)?
			.map(|value| value.parse().map_err(D::Error::custom))
			.transpose()
	}

	pub(super) fn non_empty<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
	where
		D: Deserializer<'de>,
		T: Deserialize<'de> + AsRef<str>,
	{
		Ok(Option::<T>::deserialize(deserializer)?.filter(|value| !value.as_ref().is_empty()))
	}

	pub(super) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
	where
		D: Deserializer<'de>,
		T: Deserialize<'de> + Default,
	{
		Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
	}
}
