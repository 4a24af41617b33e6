//! Transport primitives for token endpoint calls.
//!
//! The module exposes [`TokenHttpClient`] alongside [`ResponseMetadata`] and
//! [`ResponseMetadataSlot`] so callers can plug in custom HTTP clients while the broker still
//! learns the HTTP status of failed exchanges. Implementations call
//! [`ResponseMetadataSlot::take`] before dispatching a request and
//! [`ResponseMetadataSlot::store`] once an HTTP status or retry hint is known; the broker
//! classifies failures from that metadata plus the provider's error body.

// crates.io
use oauth2::{AsyncHttpClient, HttpClientError};
#[cfg(feature = "reqwest")] use oauth2::{HttpRequest, HttpResponse};
#[cfg(feature = "reqwest")] use reqwest::{
	Proxy,
	header::{HeaderMap, RETRY_AFTER},
	redirect::Policy,
};
#[cfg(feature = "reqwest")] use time::format_description::well_known::Rfc2822;
// self
use crate::{_prelude::*, config::ProxyUri, error::ConfigError};
#[cfg(feature = "reqwest")] use crate::provider::AadSettings;

/// Abstraction over HTTP transports capable of executing token exchanges while publishing
/// response metadata to the broker.
///
/// The trait is the broker's only dependency on an HTTP stack. Each acquisition asks for one
/// [`AsyncHttpClient`] handle, optionally routed through a proxy, and reuses it across retries.
/// Handles must be `Send + Sync + 'static` and their request futures `Send` so broker futures
/// can move between executor threads.
pub trait TokenHttpClient
where
	Self: 'static + Send + Sync,
{
	/// Concrete error emitted by the underlying transport.
	type TransportError: 'static + Send + Sync + StdError;

	/// [`AsyncHttpClient`] handle tied to a [`ResponseMetadataSlot`].
	type Handle: for<'c> AsyncHttpClient<
			'c,
			Error = HttpClientError<Self::TransportError>,
			Future: 'c + Send,
		>
		+ 'static
		+ Send
		+ Sync;

	/// Builds a handle that records outcomes in `slot` and routes through `proxy`, if any.
	///
	/// # Metadata Contract
	///
	/// - Call [`ResponseMetadataSlot::take`] before submitting each HTTP request so stale
	///   information never leaks across retries.
	/// - Once an HTTP response (successful or erroneous) provides a status, save it with
	///   [`ResponseMetadataSlot::store`].
	fn with_metadata(
		&self,
		slot: ResponseMetadataSlot,
		proxy: Option<&ProxyUri>,
	) -> Result<Self::Handle, ConfigError>;
}

/// Captures metadata from the most recent HTTP response.
#[derive(Clone, Debug, Default)]
pub struct ResponseMetadata {
	/// HTTP status code returned by the token endpoint, if available.
	pub status: Option<u16>,
	/// Retry-After hint expressed as a relative duration.
	pub retry_after: Option<Duration>,
}

/// Thread-safe slot for sharing [`ResponseMetadata`] between transport and broker.
#[derive(Clone, Debug, Default)]
pub struct ResponseMetadataSlot(Arc<Mutex<Option<ResponseMetadata>>>);
impl ResponseMetadataSlot {
	/// Stores new metadata for the current request.
	pub fn store(&self, meta: ResponseMetadata) {
		*self.0.lock() = Some(meta);
	}

	/// Returns the captured metadata, if any, consuming it from the slot.
	pub fn take(&self) -> Option<ResponseMetadata> {
		self.0.lock().take()
	}
}

/// Transport knobs applied whenever a client has to be (re)built.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug)]
pub struct TransportProfile {
	/// User-Agent header value.
	pub user_agent: String,
	/// Per-request timeout.
	pub timeout: std::time::Duration,
	/// Whether TLS certificates are verified.
	pub verify_tls: bool,
}
#[cfg(feature = "reqwest")]
impl TransportProfile {
	/// Derives the profile from provider settings.
	pub fn from_settings(settings: &AadSettings) -> Self {
		Self {
			user_agent: settings.user_agent.clone(),
			timeout: settings.timeout_std(),
			verify_tls: settings.verify_tls,
		}
	}

	/// Builds a reqwest client for this profile, routed through `proxy` when supplied.
	///
	/// Token endpoints answer directly, so redirects are never followed.
	pub fn build_client(&self, proxy: Option<&ProxyUri>) -> Result<ReqwestClient, ConfigError> {
		let mut builder = ReqwestClient::builder()
			.user_agent(self.user_agent.as_str())
			.timeout(self.timeout)
			.redirect(Policy::none())
			.danger_accept_invalid_certs(!self.verify_tls);

		if let Some(proxy) = proxy {
			builder = builder.proxy(Proxy::all(proxy.expose()).map_err(ConfigError::invalid_proxy)?);
		}

		builder.build().map_err(ConfigError::http_client_build)
	}
}
#[cfg(feature = "reqwest")]
impl Default for TransportProfile {
	fn default() -> Self {
		Self::from_settings(&AadSettings::default())
	}
}

/// reqwest-backed [`TokenHttpClient`].
///
/// The direct client is built once; proxied clients are built per acquisition because the proxy
/// is part of each account's configuration.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug)]
pub struct ReqwestHttpClient {
	client: ReqwestClient,
	profile: TransportProfile,
}
#[cfg(feature = "reqwest")]
impl ReqwestHttpClient {
	/// Builds the transport described by `settings`.
	pub fn from_settings(settings: &AadSettings) -> Result<Self, ConfigError> {
		let profile = TransportProfile::from_settings(settings);

		Ok(Self { client: profile.build_client(None)?, profile })
	}

	/// Wraps an existing reqwest [`ReqwestClient`] for direct requests.
	///
	/// Proxied requests still use a client built from the default [`TransportProfile`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self { client, profile: TransportProfile::default() }
	}

	/// Profile used when building proxied clients.
	pub fn profile(&self) -> &TransportProfile {
		&self.profile
	}
}
#[cfg(feature = "reqwest")]
impl AsRef<ReqwestClient> for ReqwestHttpClient {
	fn as_ref(&self) -> &ReqwestClient {
		&self.client
	}
}
#[cfg(feature = "reqwest")]
impl TokenHttpClient for ReqwestHttpClient {
	type Handle = InstrumentedHandle;
	type TransportError = ReqwestError;

	fn with_metadata(
		&self,
		slot: ResponseMetadataSlot,
		proxy: Option<&ProxyUri>,
	) -> Result<Self::Handle, ConfigError> {
		let client = match proxy {
			Some(proxy) => self.profile.build_client(Some(proxy))?,
			None => self.client.clone(),
		};

		Ok(InstrumentedHandle::new(client, slot))
	}
}

#[cfg(feature = "reqwest")]
/// Instrumented adapter that implements [`AsyncHttpClient`] for reqwest.
pub(crate) struct InstrumentedHttpClient {
	client: ReqwestClient,
	slot: ResponseMetadataSlot,
}

#[cfg(feature = "reqwest")]
/// Handle returned by [`ReqwestHttpClient`] that satisfies [`TokenHttpClient`].
#[derive(Clone)]
pub struct InstrumentedHandle(Arc<InstrumentedHttpClient>);
#[cfg(feature = "reqwest")]
impl InstrumentedHandle {
	fn new(client: ReqwestClient, slot: ResponseMetadataSlot) -> Self {
		Self(Arc::new(InstrumentedHttpClient { client, slot }))
	}
}
#[cfg(feature = "reqwest")]
impl<'c> AsyncHttpClient<'c> for InstrumentedHandle {
	type Error = HttpClientError<ReqwestError>;
	type Future =
		Pin<Box<dyn Future<Output = Result<HttpResponse, Self::Error>> + 'c + Send + Sync>>;

	fn call(&'c self, request: HttpRequest) -> Self::Future {
		let client = Arc::clone(&self.0);

		Box::pin(async move {
			client.slot.take();

			let response = client
				.client
				.execute(request.try_into().map_err(Box::new)?)
				.await
				.map_err(Box::new)?;
			let status = response.status();
			let headers = response.headers().to_owned();
			let retry_after = parse_retry_after(&headers);

			client.slot.store(ResponseMetadata { status: Some(status.as_u16()), retry_after });

			let mut response_new =
				HttpResponse::new(response.bytes().await.map_err(Box::new)?.to_vec());

			*response_new.status_mut() = status;
			*response_new.headers_mut() = headers;

			Ok(response_new)
		})
	}
}

#[cfg(feature = "reqwest")]
fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
	let value = headers.get(RETRY_AFTER)?;
	let raw = value.to_str().ok()?.trim();

	if let Ok(secs) = raw.parse::<u64>() {
		return Some(Duration::seconds(i64::try_from(secs).unwrap_or(i64::MAX)));
	}
	if let Ok(moment) = OffsetDateTime::parse(raw, &Rfc2822) {
		let delta = moment - OffsetDateTime::now_utc();

		if delta.is_positive() {
			return Some(delta);
		}
	}

	None
}

#[cfg(all(test, feature = "reqwest"))]
mod tests {
	// crates.io
	use reqwest::header::HeaderValue;
	// self
	use super::*;

	#[test]
	fn retry_after_accepts_delta_seconds() {
		let mut headers = HeaderMap::new();

		headers.insert(RETRY_AFTER, HeaderValue::from_static("30"));

		assert_eq!(parse_retry_after(&headers), Some(Duration::seconds(30)));
	}

	#[test]
	fn retry_after_ignores_past_dates_and_garbage() {
		let mut headers = HeaderMap::new();

		headers.insert(RETRY_AFTER, HeaderValue::from_static("Wed, 21 Oct 2015 07:28:00 GMT"));

		assert_eq!(parse_retry_after(&headers), None);

		headers.insert(RETRY_AFTER, HeaderValue::from_static("soon"));

		assert_eq!(parse_retry_after(&headers), None);
		assert_eq!(parse_retry_after(&HeaderMap::new()), None);
	}

	#[test]
	fn slot_take_clears_previous_metadata() {
		let slot = ResponseMetadataSlot::default();

		slot.store(ResponseMetadata { status: Some(429), retry_after: None });

		assert_eq!(slot.take().and_then(|meta| meta.status), Some(429));
		assert!(slot.take().is_none());
	}

	#[test]
	fn proxied_handles_build_from_profile() {
		let http = ReqwestHttpClient::from_settings(&AadSettings::default())
			.expect("Default settings should build a client.");
		let proxy = ProxyUri::new("http://u:p@proxy.example.com:8080");

		assert!(http.with_metadata(ResponseMetadataSlot::default(), Some(&proxy)).is_ok());
		assert_eq!(http.profile().user_agent, "Databricks-AddOnFor-Splunk-1.4.1");
	}
}
