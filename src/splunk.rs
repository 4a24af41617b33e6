//! Minimal splunkd REST client for the add-on's credential and proxy endpoints.
//!
//! All calls authenticate with the caller's session key (`Authorization: Splunk <key>`) and
//! target the local management port. The client reads:
//!
//! - account configuration through the add-on's `databricks_get_credentials` handler, which is
//!   also where refreshed access tokens are written back;
//! - the global proxy settings stanza and the proxy password kept in `storage/passwords`.

// crates.io
use reqwest::{StatusCode, header::AUTHORIZATION};
// self
use crate::{
	_prelude::*,
	auth::{AccountName, Secret},
	config::{AccountConfig, ProxySettings, ProxyUri},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	provider::{DEFAULT_TIMEOUT, DEFAULT_USER_AGENT},
	store::CredentialUpdate,
};

/// Directory name of the add-on inside `$SPLUNK_HOME/etc/apps`.
pub const DEFAULT_APP: &str = "TA-Databricks";

const CREDENTIALS_PATH: &str = "services/databricks_get_credentials";

/// Errors raised while talking to splunkd.
#[derive(Debug, ThisError)]
pub enum SplunkError {
	/// The reqwest client could not be built.
	#[error("splunkd HTTP client could not be constructed.")]
	ClientBuild {
		/// Underlying builder failure.
		#[source]
		source: ReqwestError,
	},
	/// An endpoint URL could not be derived from the base URL.
	#[error("splunkd endpoint `{path}` is invalid.")]
	InvalidEndpoint {
		/// Relative path that failed to join.
		path: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// No HTTP response was received.
	#[error("Request to splunkd endpoint `{endpoint}` failed.")]
	Transport {
		/// Endpoint label.
		endpoint: String,
		/// Transport failure.
		#[source]
		source: ReqwestError,
	},
	/// splunkd answered with a non-success status.
	#[error("splunkd endpoint `{endpoint}` returned status {status}.")]
	Status {
		/// Endpoint label.
		endpoint: String,
		/// HTTP status code.
		status: u16,
		/// Response body, kept for diagnostics.
		body: String,
	},
	/// The response body did not have the expected shape.
	#[error("splunkd endpoint `{endpoint}` returned an unexpected payload at `{}`.", .source.path())]
	Parse {
		/// Endpoint label.
		endpoint: String,
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
	/// An entity collection came back empty.
	#[error("splunkd endpoint `{endpoint}` returned no entries.")]
	MissingEntry {
		/// Endpoint label.
		endpoint: String,
	},
}

#[derive(Deserialize)]
struct EntryList<T> {
	#[serde(default = "Vec::new")]
	entry: Vec<Entry<T>>,
}

#[derive(Deserialize)]
struct Entry<T> {
	content: T,
}

#[derive(Deserialize)]
struct StoredPassword {
	clear_password: String,
}

#[derive(Deserialize)]
struct ProxyPasswordBlob {
	#[serde(default)]
	proxy_password: Option<String>,
}

/// Session-authenticated splunkd client.
#[derive(Clone)]
pub struct SplunkClient {
	http: ReqwestClient,
	base: Url,
	session_key: Secret,
	app: String,
}
impl SplunkClient {
	/// Creates a client for `base` (for example `https://127.0.0.1:8089`).
	///
	/// Certificate verification is skipped for loopback hosts, where splunkd serves its
	/// self-signed management certificate.
	pub fn new(base: Url, session_key: impl Into<Secret>) -> Result<Self, SplunkError> {
		let http = ReqwestClient::builder()
			.user_agent(DEFAULT_USER_AGENT)
			.timeout(std::time::Duration::try_from(DEFAULT_TIMEOUT).unwrap_or_default())
			.danger_accept_invalid_certs(is_loopback(&base))
			.build()
			.map_err(|source| SplunkError::ClientBuild { source })?;

		Ok(Self::with_http_client(http, base, session_key))
	}

	/// Creates a client that reuses an existing reqwest client.
	pub fn with_http_client(http: ReqwestClient, mut base: Url, session_key: impl Into<Secret>) -> Self {
		if !base.path().ends_with('/') {
			let path = format!("{}/", base.path());

			base.set_path(&path);
		}

		Self { http, base, session_key: session_key.into(), app: DEFAULT_APP.into() }
	}

	/// Overrides the add-on app name used in namespaced endpoints.
	pub fn with_app(mut self, app: impl Into<String>) -> Self {
		self.app = app.into();

		self
	}

	/// App name used in namespaced endpoints.
	pub fn app(&self) -> &str {
		&self.app
	}

	/// Reads the configuration of `account`; `None` when splunkd does not know it.
	pub async fn account_config(
		&self,
		account: &AccountName,
	) -> Result<Option<AccountConfig>, SplunkError> {
		const KIND: FlowKind = FlowKind::CredentialFetch;

		let span = FlowSpan::new(KIND, "account_config");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				trace_event!(info, "Reading configuration for account {}.", account);

				let url = self.endpoint(CREDENTIALS_PATH)?;
				let response = self
					.http
					.post(url)
					.header(AUTHORIZATION, self.authorization())
					.form(&[("name", account.as_str())])
					.send()
					.await
					.map_err(|source| transport(CREDENTIALS_PATH, source))?;

				if response.status() == StatusCode::NOT_FOUND {
					return Ok(None);
				}

				let body = read_success(CREDENTIALS_PATH, response).await?;

				parse(CREDENTIALS_PATH, &body).map(Some)
			})
			.await;

		finish(KIND, &result);

		result
	}

	/// Writes a refreshed access token (and the secret used to obtain it) for `account`.
	pub async fn save_access_token(
		&self,
		account: &AccountName,
		update: &CredentialUpdate,
	) -> Result<(), SplunkError> {
		const KIND: FlowKind = FlowKind::CredentialSave;

		let span = FlowSpan::new(KIND, "save_access_token");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				trace_event!(info, "Saving AAD access token for account {}.", account);

				let url = self.endpoint(CREDENTIALS_PATH)?;
				let update_token = if update.update_token { "True" } else { "False" };
				let response = self
					.http
					.post(url)
					.header(AUTHORIZATION, self.authorization())
					.form(&[
						("name", account.as_str()),
						("aad_client_secret", update.client_secret.expose()),
						("aad_access_token", update.access_token.expose()),
						("update_token", update_token),
					])
					.send()
					.await
					.map_err(|source| transport(CREDENTIALS_PATH, source))?;

				read_success(CREDENTIALS_PATH, response).await?;
				trace_event!(info, "Saved AAD access token successfully.");

				Ok(())
			})
			.await;

		finish(KIND, &result);

		result
	}

	/// Reads the add-on's global proxy settings stanza.
	///
	/// The stored password is masked in this stanza; see [`SplunkClient::proxy_clear_password`].
	pub async fn proxy_settings(&self) -> Result<ProxySettings, SplunkError> {
		let path = format!("servicesNS/nobody/{}/TA_Databricks_settings/proxy", self.app);
		let body = self.get_json(&path).await?.ok_or(SplunkError::MissingEntry {
			endpoint: path.clone(),
		})?;

		first_entry(&path, &body)
	}

	/// Reads the clear-text proxy password from `storage/passwords`.
	///
	/// Returns `None` when no credential is stored.
	pub async fn proxy_clear_password(&self) -> Result<Option<Secret>, SplunkError> {
		let realm = format!("__REST_CREDENTIAL__#{}#configs/conf-ta_databricks_settings", self.app);
		let entity = urlencoding::encode(&format!("{realm}:proxy:")).into_owned();
		let path = format!("servicesNS/nobody/{}/storage/passwords/{entity}", self.app);
		let Some(body) = self.get_json(&path).await? else {
			return Ok(None);
		};
		let stored: StoredPassword = first_entry(&path, &body)?;
		let blob: ProxyPasswordBlob = parse(&path, stored.clear_password.as_bytes())?;

		Ok(blob.proxy_password.filter(|password| !password.is_empty()).map(Secret::from))
	}

	/// Resolves the global proxy URI, combining the settings stanza with the stored password.
	pub async fn proxy_uri(&self) -> Result<Option<ProxyUri>, SplunkError> {
		const KIND: FlowKind = FlowKind::ProxyLookup;

		let span = FlowSpan::new(KIND, "proxy_uri");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				let mut settings = self.proxy_settings().await?;

				if settings.enabled && settings.username.is_some() {
					settings.password = self.proxy_clear_password().await?;
				}

				let uri = settings.uri();

				match &uri {
					Some(uri) => trace_event!(debug, "Resolved proxy {}.", uri),
					None => trace_event!(debug, "No proxy configured."),
				}

				Ok(uri)
			})
			.await;

		finish(KIND, &result);

		result
	}

	async fn get_json(&self, path: &str) -> Result<Option<Vec<u8>>, SplunkError> {
		let url = self.endpoint(path)?;
		let response = self
			.http
			.get(url)
			.header(AUTHORIZATION, self.authorization())
			.query(&[("output_mode", "json")])
			.send()
			.await
			.map_err(|source| transport(path, source))?;

		if response.status() == StatusCode::NOT_FOUND {
			return Ok(None);
		}

		read_success(path, response).await.map(Some)
	}

	fn endpoint(&self, path: &str) -> Result<Url, SplunkError> {
		self.base
			.join(path)
			.map_err(|source| SplunkError::InvalidEndpoint { path: path.to_owned(), source })
	}

	fn authorization(&self) -> String {
		format!("Splunk {}", self.session_key.expose())
	}
}
impl Debug for SplunkClient {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("SplunkClient")
			.field("base", &self.base.as_str())
			.field("app", &self.app)
			.field("session_key", &self.session_key)
			.finish()
	}
}

async fn read_success(endpoint: &str, response: reqwest::Response) -> Result<Vec<u8>, SplunkError> {
	let status = response.status();
	let body = response.bytes().await.map_err(|source| transport(endpoint, source))?;

	if !status.is_success() {
		return Err(SplunkError::Status {
			endpoint: endpoint.to_owned(),
			status: status.as_u16(),
			body: String::from_utf8_lossy(&body).into_owned(),
		});
	}

	Ok(body.to_vec())
}

fn first_entry<T>(endpoint: &str, body: &[u8]) -> Result<T, SplunkError>
where
	T: for<'de> Deserialize<'de>,
{
	let list: EntryList<T> = parse(endpoint, body)?;

	list.entry
		.into_iter()
		.next()
		.map(|entry| entry.content)
		.ok_or_else(|| SplunkError::MissingEntry { endpoint: endpoint.to_owned() })
}

fn parse<T>(endpoint: &str, body: &[u8]) -> Result<T, SplunkError>
where
	T: for<'de> Deserialize<'de>,
{
	let mut deserializer = serde_json::Deserializer::from_slice(body);

	serde_path_to_error::deserialize(&mut deserializer)
		.map_err(|source| SplunkError::Parse { endpoint: endpoint.to_owned(), source })
}

fn transport(endpoint: &str, source: ReqwestError) -> SplunkError {
	SplunkError::Transport { endpoint: endpoint.to_owned(), source }
}

fn finish<T>(kind: FlowKind, result: &Result<T, SplunkError>) {
	match result {
		Ok(_) => obs::record_flow_outcome(kind, FlowOutcome::Success),
		Err(err) => {
			trace_event!(error, "splunkd {} failed: {}", kind, err);
			obs::record_flow_outcome(kind, FlowOutcome::Failure);
		},
	}
}

fn is_loopback(url: &Url) -> bool {
	match url.host() {
		Some(url::Host::Domain(domain)) => domain.eq_ignore_ascii_case("localhost"),
		Some(url::Host::Ipv4(addr)) => addr.is_loopback(),
		Some(url::Host::Ipv6(addr)) => addr.is_loopback(),
		None => false,
	}
}
