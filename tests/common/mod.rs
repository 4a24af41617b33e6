//! Shared fixtures for integration tests.

#![allow(dead_code)]

// std
use std::sync::Arc;
// crates.io
use httpmock::MockServer;
// self
use databricks_addon_auth::{
	auth::AccountName,
	flows::ReqwestBroker,
	http::ReqwestHttpClient,
	provider::AadSettings,
	store::{CredentialStore, MemoryStore},
};

pub const TENANT_ID: &str = "tenant-1";
pub const CLIENT_ID: &str = "client-1";
pub const CLIENT_SECRET: &str = "secret-1";
pub const TOKEN_PATH: &str = "/tenant-1/oauth2/v2.0/token";

pub fn account(name: &str) -> AccountName {
	AccountName::new(name).expect("Account fixture should be valid.")
}

/// Settings whose authority points at the mock server.
pub fn mock_settings(server: &MockServer) -> AadSettings {
	AadSettings::builder()
		.authority(server.base_url())
		.verify_tls(false)
		.build()
		.expect("Mock authority should pass settings validation.")
}

/// Broker over the reqwest transport, backed by an in-memory store.
pub fn build_reqwest_test_broker(settings: AadSettings) -> (ReqwestBroker, Arc<MemoryStore>) {
	let store_backend = Arc::new(MemoryStore::default());
	let store: Arc<dyn CredentialStore> = store_backend.clone();
	let http_client = ReqwestHttpClient::from_settings(&settings)
		.expect("Reqwest transport should build for mock settings.");

	(ReqwestBroker::with_http_client(store, settings, http_client), store_backend)
}

pub fn token_body(token: &str) -> String {
	format!(r#"{{"access_token":"{token}","token_type":"Bearer","expires_in":3599}}"#)
}

pub fn aad_error_body(error: &str, code: u64) -> String {
	format!(
		r#"{{"error":"{error}","error_description":"AADSTS{code}: failure.","error_codes":[{code}],"trace_id":"t","correlation_id":"c"}}"#
	)
}
