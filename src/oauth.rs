//! Internal OAuth client facade for the client-credentials grant.

pub use oauth2;

// crates.io
use oauth2::{
	AsyncHttpClient, AuthType, Client, ClientId, ClientSecret, EndpointNotSet, EndpointSet,
	ErrorResponse, HttpClientError, HttpRequest, HttpResponse, RefreshToken, RequestTokenError,
	Scope, StandardRevocableToken, TokenResponse, TokenUrl,
	basic::{BasicRevocationErrorResponse, BasicTokenIntrospectionResponse, BasicTokenType},
	http::StatusCode,
};
// self
use crate::{
	_prelude::*,
	auth::{AccessToken, Secret},
	http::{ResponseMetadata, ResponseMetadataSlot, TokenHttpClient},
	provider::FailureContext,
};

type AadClient = Client<
	AadErrorResponse,
	AadTokenResponse,
	BasicTokenIntrospectionResponse,
	StandardRevocableToken,
	BasicRevocationErrorResponse,
	EndpointNotSet,
	EndpointNotSet,
	EndpointNotSet,
	EndpointNotSet,
	EndpointSet,
>;
type AadRequestError<E> = RequestTokenError<HttpClientError<E>, AadErrorResponse>;

/// Error body returned by the Azure AD token endpoint.
///
/// Only the fields the broker reads are modeled; everything else in the body is ignored.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AadErrorResponse {
	/// OAuth error identifier such as `invalid_client`.
	pub error: String,
	/// Human-readable description, including the `AADSTS` code.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub error_description: Option<String>,
	/// Numeric AAD error codes; the first one drives classification.
	pub error_codes: Vec<serde_json::Value>,
	/// Request trace identifier.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub trace_id: Option<String>,
	/// Request correlation identifier.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub correlation_id: Option<String>,
}
impl AadErrorResponse {
	/// First entry of `error_codes`, rendered as a table key.
	pub fn first_error_code(&self) -> Option<String> {
		match self.error_codes.first()? {
			serde_json::Value::String(code) => Some(code.clone()),
			serde_json::Value::Number(code) => Some(code.to_string()),
			_ => None,
		}
	}
}
impl Display for AadErrorResponse {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		match (&self.error_description, self.error.is_empty()) {
			(Some(description), _) => f.write_str(description),
			(None, false) => f.write_str(&self.error),
			(None, true) => f.write_str("Token endpoint returned an error without details."),
		}
	}
}
impl ErrorResponse for AadErrorResponse {}

/// Success body returned by the Azure AD token endpoint.
///
/// Only `access_token` is required: a missing `token_type` means `Bearer`, and `expires_in` may
/// arrive as a number or a numeric string.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct AadTokenResponse {
	access_token: oauth2::AccessToken,
	#[serde(default = "bearer", deserialize_with = "de::token_type")]
	token_type: BasicTokenType,
	#[serde(default, deserialize_with = "de::seconds", skip_serializing_if = "Option::is_none")]
	expires_in: Option<u64>,
}
impl TokenResponse for AadTokenResponse {
	type TokenType = BasicTokenType;

	fn access_token(&self) -> &oauth2::AccessToken {
		&self.access_token
	}

	fn token_type(&self) -> &Self::TokenType {
		&self.token_type
	}

	fn expires_in(&self) -> Option<std::time::Duration> {
		self.expires_in.map(std::time::Duration::from_secs)
	}

	fn refresh_token(&self) -> Option<&RefreshToken> {
		None
	}

	fn scopes(&self) -> Option<&Vec<Scope>> {
		None
	}
}

fn bearer() -> BasicTokenType {
	BasicTokenType::Bearer
}

mod de {
	// crates.io
	use serde::{Deserializer, de::Error as _};
	// self
	use super::*;

	#[derive(Deserialize)]
	#[serde(untagged)]
	enum SecondsRepr {
		Number(u64),
		Text(String),
	}

	pub(super) fn token_type<'de, D>(deserializer: D) -> Result<BasicTokenType, D::Error>
	where
		D: Deserializer<'de>,
	{
		let Some(value) = Option::<String>::deserialize(deserializer)? else {
			return Ok(BasicTokenType::Bearer);
		};

		Ok(match value.to_ascii_lowercase().as_str() {
			"" | "bearer" => BasicTokenType::Bearer,
			"mac" => BasicTokenType::Mac,
			_ => BasicTokenType::Extension(value),
		})
	}

	pub(super) fn seconds<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
	where
		D: Deserializer<'de>,
	{
		match Option::<SecondsRepr>::deserialize(deserializer)? {
			Some(SecondsRepr::Number(value)) => Ok(Some(value)),
			Some(SecondsRepr::Text(value)) => value
				.trim()
				.parse()
				.map(Some)
				.map_err(|_| D::Error::custom(format!("invalid expires_in `{value}`"))),
			None => Ok(None),
		}
	}
}

/// Presents every 2xx answer as `200 OK`, the only status oauth2 parses as a token body.
///
/// The metadata slot still records the real status.
struct SuccessAsOk<'h, H>(&'h H);
impl<'c, H> AsyncHttpClient<'c> for SuccessAsOk<'_, H>
where
	H: AsyncHttpClient<'c>,
	H::Future: Send,
{
	type Error = H::Error;
	type Future = Pin<Box<dyn Future<Output = Result<HttpResponse, Self::Error>> + 'c + Send>>;

	fn call(&'c self, request: HttpRequest) -> Self::Future {
		let pending = self.0.call(request);

		success_as_ok(pending)
	}
}

fn success_as_ok<'c, F, E>(
	pending: F,
) -> Pin<Box<dyn Future<Output = Result<HttpResponse, E>> + 'c + Send>>
where
	F: 'c + Send + Future<Output = Result<HttpResponse, E>>,
{
	Box::pin(async move {
		let mut response = pending.await?;

		if response.status().is_success() {
			*response.status_mut() = StatusCode::OK;
		}

		Ok(response)
	})
}

/// Why a single token attempt failed, before classification.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum AttemptFailure {
	/// The endpoint answered, but not with a usable token.
	Response {
		status: Option<u16>,
		error_code: Option<String>,
		retry_after: Option<Duration>,
		detail: String,
	},
	/// No HTTP response was received.
	Transport { detail: String },
}
impl AttemptFailure {
	pub(crate) fn context(&self) -> FailureContext {
		match self {
			Self::Response { status, error_code, .. } => FailureContext {
				http_status: *status,
				error_code: error_code.clone(),
				network_error: false,
			},
			Self::Transport { .. } => FailureContext::network_failure(),
		}
	}

	pub(crate) fn retry_after(&self) -> Option<Duration> {
		match self {
			Self::Response { retry_after, .. } => *retry_after,
			Self::Transport { .. } => None,
		}
	}

	pub(crate) fn detail(&self) -> &str {
		match self {
			Self::Response { detail, .. } | Self::Transport { detail } => detail,
		}
	}
}

pub(crate) struct AadFacade {
	oauth_client: AadClient,
	scope: String,
}
impl AadFacade {
	pub(crate) fn new(
		token_endpoint: Url,
		client_id: &str,
		client_secret: &Secret,
		scope: impl Into<String>,
	) -> Self {
		let oauth_client = Client::new(ClientId::new(client_id.to_owned()))
			.set_client_secret(ClientSecret::new(client_secret.expose().to_owned()))
			.set_token_uri(TokenUrl::from_url(token_endpoint))
			.set_auth_type(AuthType::RequestBody);

		Self { oauth_client, scope: scope.into() }
	}

	/// Performs one client-credentials exchange through `handle`.
	pub(crate) async fn exchange_client_credentials<C>(
		&self,
		handle: &C::Handle,
		slot: &ResponseMetadataSlot,
		extra_params: &BTreeMap<String, String>,
	) -> Result<AccessToken, AttemptFailure>
	where
		C: ?Sized + TokenHttpClient,
	{
		let mut request = self
			.oauth_client
			.exchange_client_credentials()
			.add_scope(Scope::new(self.scope.clone()));

		for (key, value) in extra_params {
			request = request.add_extra_param(key.clone(), value.clone());
		}

		let client = SuccessAsOk(handle);
		let response = request
			.request_async(&client)
			.await
			.map_err(|err| map_request_error(slot.take(), err))?;
		let mut token = AccessToken::new(response.access_token().secret().to_owned());

		if let Some(expires_in) =
			response.expires_in().and_then(|value| Duration::try_from(value).ok())
		{
			token = token.expires_in(expires_in);
		}

		Ok(token)
	}
}

fn map_request_error<E>(meta: Option<ResponseMetadata>, err: AadRequestError<E>) -> AttemptFailure
where
	E: 'static + Send + Sync + StdError,
{
	let status = meta.as_ref().and_then(|value| value.status);
	let retry_after = meta.as_ref().and_then(|value| value.retry_after);

	match err {
		RequestTokenError::ServerResponse(response) => AttemptFailure::Response {
			status,
			error_code: response.first_error_code(),
			retry_after,
			detail: response.to_string(),
		},
		// A status means the response arrived and only reading the body failed.
		RequestTokenError::Request(error) if status.is_none() =>
			AttemptFailure::Transport { detail: error_chain(&error) },
		RequestTokenError::Request(error) => AttemptFailure::Response {
			status,
			error_code: None,
			retry_after,
			detail: error_chain(&error),
		},
		RequestTokenError::Parse(error, _body) => AttemptFailure::Response {
			status,
			error_code: None,
			retry_after,
			detail: format!("Token response could not be parsed: {error}."),
		},
		RequestTokenError::Other(message) => AttemptFailure::Response {
			status,
			error_code: None,
			retry_after,
			detail: format!("Token endpoint returned an unexpected response: {message}."),
		},
	}
}

fn error_chain(error: &dyn StdError) -> String {
	let mut rendered = error.to_string();
	let mut source = error.source();

	while let Some(cause) = source {
		rendered.push_str(": ");
		rendered.push_str(&cause.to_string());

		source = cause.source();
	}

	rendered
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn meta(status: u16) -> Option<ResponseMetadata> {
		Some(ResponseMetadata { status: Some(status), retry_after: Some(Duration::seconds(5)) })
	}

	#[test]
	fn aad_error_body_exposes_first_code() {
		let body = r#"{
			"error": "invalid_client",
			"error_description": "AADSTS7000215: Invalid client secret provided.",
			"error_codes": [7000215, 50012],
			"timestamp": "2024-05-01 10:00:00Z",
			"trace_id": "trace",
			"correlation_id": "correlation"
		}"#;
		let response: AadErrorResponse =
			serde_json::from_str(body).expect("AAD error body should deserialize.");

		assert_eq!(response.first_error_code().as_deref(), Some("7000215"));
		assert_eq!(response.to_string(), "AADSTS7000215: Invalid client secret provided.");
	}

	#[test]
	fn error_body_without_codes_still_parses() {
		let response: AadErrorResponse =
			serde_json::from_str(r#"{"error":"temporarily_unavailable"}"#)
				.expect("Minimal error body should deserialize.");

		assert_eq!(response.first_error_code(), None);
		assert_eq!(response.to_string(), "temporarily_unavailable");
	}

	#[test]
	fn token_bodies_need_only_an_access_token() {
		let response: AadTokenResponse = serde_json::from_str(r#"{"access_token":"tok"}"#)
			.expect("Bodies without a token type should deserialize.");

		assert_eq!(response.access_token().secret(), "tok");
		assert_eq!(response.token_type(), &BasicTokenType::Bearer);
		assert_eq!(response.expires_in(), None);

		let response: AadTokenResponse = serde_json::from_str(
			r#"{"access_token":"tok","token_type":"Bearer","expires_in":"3599","ext_expires_in":3599}"#,
		)
		.expect("String lifetimes should deserialize.");

		assert_eq!(response.token_type(), &BasicTokenType::Bearer);
		assert_eq!(response.expires_in(), Some(std::time::Duration::from_secs(3599)));
		assert!(serde_json::from_str::<AadTokenResponse>(r#"{"token_type":"Bearer"}"#).is_err());
	}

	#[test]
	fn server_responses_carry_status_and_code() {
		let err: AadRequestError<std::io::Error> =
			RequestTokenError::ServerResponse(AadErrorResponse {
				error: "invalid_request".into(),
				error_codes: vec![serde_json::json!(900023)],
				..Default::default()
			});
		let failure = map_request_error(meta(400), err);
		let ctx = failure.context();

		assert_eq!(ctx.http_status, Some(400));
		assert_eq!(ctx.error_code.as_deref(), Some("900023"));
		assert!(!ctx.network_error);
		assert_eq!(failure.retry_after(), Some(Duration::seconds(5)));
	}

	#[test]
	fn request_errors_without_status_are_transport_failures() {
		let err: AadRequestError<std::io::Error> = RequestTokenError::Request(
			HttpClientError::Io(std::io::Error::other("connection refused")),
		);
		let failure = map_request_error(None, err);

		assert!(failure.context().network_error);
		assert!(failure.detail().contains("connection refused"));
	}

	#[test]
	fn unparsable_bodies_keep_the_status() {
		let err: AadRequestError<std::io::Error> =
			RequestTokenError::Other("unexpected content type".into());
		let failure = map_request_error(meta(500), err);

		assert_eq!(failure.context().http_status, Some(500));
		assert!(failure.detail().contains("unexpected content type"));
	}
}
