//! Immutable identity-provider settings shared by every token request.
//!
//! The defaults reproduce the constants the add-on ships with: the public Azure AD authority,
//! the Azure Databricks resource scope, the add-on User-Agent, and a 300-second request timeout.

// self
use crate::{_prelude::*, error::ConfigError};

/// Public Azure AD authority.
pub const DEFAULT_AUTHORITY: &str = "https://login.microsoftonline.com";
/// Scope granting access to the Azure Databricks resource.
pub const DATABRICKS_SCOPE: &str = "2ff814a6-3304-4ab8-85cb-cd0e6f879c1d/.default";
/// User-Agent sent with every outbound request.
pub const DEFAULT_USER_AGENT: &str = "Databricks-AddOnFor-Splunk-1.4.1";
/// Per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::seconds(300);

/// Errors raised while validating [`AadSettings`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum AadSettingsError {
	/// Authority is not a valid absolute URL.
	#[error("Authority `{authority}` is not a valid URL.")]
	InvalidAuthority {
		/// Authority that failed to parse.
		authority: String,
	},
	/// Authority must use HTTPS unless it points at a loopback host.
	#[error("Authority must use HTTPS: {authority}.")]
	InsecureAuthority {
		/// Authority that failed validation.
		authority: String,
	},
	/// Scope must not be empty.
	#[error("Scope cannot be empty.")]
	EmptyScope,
	/// Timeout must be positive.
	#[error("Request timeout must be positive.")]
	NonPositiveTimeout,
}

/// Token endpoint and transport settings injected into the broker.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AadSettings {
	/// Authority base URL; the tenant and `oauth2/v2.0/token` path are appended to it.
	pub authority: String,
	/// Scope requested with every client-credentials grant.
	pub scope: String,
	/// User-Agent header value.
	pub user_agent: String,
	/// Per-request timeout enforced by the transport.
	pub timeout: Duration,
	/// Whether TLS certificates are verified.
	pub verify_tls: bool,
}
impl AadSettings {
	/// Creates a builder seeded with the add-on defaults.
	pub fn builder() -> AadSettingsBuilder {
		AadSettingsBuilder::default()
	}

	/// Renders the token endpoint for `tenant`.
	pub fn token_endpoint(&self, tenant: &str) -> Result<Url, ConfigError> {
		let raw = format!("{}/{tenant}/oauth2/v2.0/token", self.authority.trim_end_matches('/'));

		Url::parse(&raw).map_err(|source| ConfigError::InvalidEndpoint { source })
	}

	/// Timeout converted for transports that take [`std::time::Duration`].
	pub fn timeout_std(&self) -> std::time::Duration {
		std::time::Duration::try_from(self.timeout).unwrap_or(std::time::Duration::ZERO)
	}

	fn validate(&self) -> Result<(), AadSettingsError> {
		let authority = Url::parse(&self.authority).map_err(|_| {
			AadSettingsError::InvalidAuthority { authority: self.authority.clone() }
		})?;

		if !is_secure_or_loopback(&authority) {
			return Err(AadSettingsError::InsecureAuthority { authority: self.authority.clone() });
		}
		if self.scope.trim().is_empty() {
			return Err(AadSettingsError::EmptyScope);
		}
		if !self.timeout.is_positive() {
			return Err(AadSettingsError::NonPositiveTimeout);
		}

		Ok(())
	}
}
impl Default for AadSettings {
	fn default() -> Self {
		Self {
			authority: DEFAULT_AUTHORITY.into(),
			scope: DATABRICKS_SCOPE.into(),
			user_agent: DEFAULT_USER_AGENT.into(),
			timeout: DEFAULT_TIMEOUT,
			verify_tls: true,
		}
	}
}

/// Builder for [`AadSettings`] values.
#[derive(Debug, Default)]
pub struct AadSettingsBuilder {
	settings: AadSettings,
}
impl AadSettingsBuilder {
	/// Overrides the authority (sovereign clouds, mock servers).
	pub fn authority(mut self, authority: impl Into<String>) -> Self {
		self.settings.authority = authority.into();

		self
	}

	/// Overrides the requested scope.
	pub fn scope(mut self, scope: impl Into<String>) -> Self {
		self.settings.scope = scope.into();

		self
	}

	/// Overrides the User-Agent header.
	pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
		self.settings.user_agent = user_agent.into();

		self
	}

	/// Overrides the per-request timeout.
	pub fn timeout(mut self, timeout: Duration) -> Self {
		self.settings.timeout = timeout;

		self
	}

	/// Enables or disables TLS certificate verification.
	pub fn verify_tls(mut self, verify: bool) -> Self {
		self.settings.verify_tls = verify;

		self
	}

	/// Consumes the builder and validates the resulting settings.
	pub fn build(self) -> Result<AadSettings, AadSettingsError> {
		self.settings.validate()?;

		Ok(self.settings)
	}
}

fn is_secure_or_loopback(url: &Url) -> bool {
	match url.scheme() {
		"https" => true,
		"http" => match url.host() {
			Some(url::Host::Domain(domain)) => domain.eq_ignore_ascii_case("localhost"),
			Some(url::Host::Ipv4(ip)) => ip.is_loopback(),
			Some(url::Host::Ipv6(ip)) => ip.is_loopback(),
			None => false,
		},
		_ => false,
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn defaults_render_public_cloud_endpoint() {
		let settings = AadSettings::default();
		let endpoint =
			settings.token_endpoint("contoso-tenant").expect("Default endpoint should render.");

		assert_eq!(
			endpoint.as_str(),
			"https://login.microsoftonline.com/contoso-tenant/oauth2/v2.0/token"
		);
		assert_eq!(settings.scope, "2ff814a6-3304-4ab8-85cb-cd0e6f879c1d/.default");
		assert_eq!(settings.user_agent, "Databricks-AddOnFor-Splunk-1.4.1");
		assert_eq!(settings.timeout_std(), std::time::Duration::from_secs(300));
	}

	#[test]
	fn tenant_is_inserted_as_given() {
		let endpoint = AadSettings::default()
			.token_endpoint("a/b")
			.expect("Tenant with a slash should still render.");

		assert_eq!(endpoint.path(), "/a/b/oauth2/v2.0/token");

		let endpoint = AadSettings::default()
			.token_endpoint("contoso.onmicrosoft.com")
			.expect("Domain tenants should render.");

		assert_eq!(
			endpoint.as_str(),
			"https://login.microsoftonline.com/contoso.onmicrosoft.com/oauth2/v2.0/token"
		);
	}

	#[test]
	fn builder_rejects_insecure_and_empty_values() {
		assert_eq!(
			AadSettings::builder().authority("http://login.example.com").build(),
			Err(AadSettingsError::InsecureAuthority {
				authority: "http://login.example.com".into()
			})
		);
		assert_eq!(
			AadSettings::builder().authority("not a url").build(),
			Err(AadSettingsError::InvalidAuthority { authority: "not a url".into() })
		);
		assert_eq!(AadSettings::builder().scope(" ").build(), Err(AadSettingsError::EmptyScope));
		assert_eq!(
			AadSettings::builder().timeout(Duration::ZERO).build(),
			Err(AadSettingsError::NonPositiveTimeout)
		);
	}

	#[test]
	fn builder_allows_loopback_http_for_local_providers() {
		let settings = AadSettings::builder()
			.authority("http://127.0.0.1:8080/")
			.verify_tls(false)
			.build()
			.expect("Loopback authorities should be accepted.");
		let endpoint = settings.token_endpoint("tenant").expect("Endpoint should render.");

		assert_eq!(endpoint.as_str(), "http://127.0.0.1:8080/tenant/oauth2/v2.0/token");
		assert!(!settings.verify_tls);
	}
}
