//! Acquires an AAD access token for an account whose client ID is missing, against a mocked
//! token endpoint, and shows the refreshed token landing back in the in-memory store.

// std
use std::sync::Arc;
// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
// self
use databricks_addon_auth::{
	auth::AccountName,
	config::AccountConfig,
	flows::{ReqwestBroker, TokenOutcome, TokenRequest},
	params::parse_notebook_params,
	provider::AadSettings,
	store::{CredentialStore, MemoryStore},
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;
	let token_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/tenant-acme/oauth2/v2.0/token");
			then.status(200).header("content-type", "application/json").body(
				"{\"access_token\":\"demo-access\",\"token_type\":\"Bearer\",\"expires_in\":3599}",
			);
		})
		.await;
	let account = AccountName::new("databricks-prod")?;
	let store_backend = Arc::new(MemoryStore::default().with_account(
		account.clone(),
		AccountConfig { aad_tenant_id: "tenant-acme".into(), ..Default::default() },
	));
	let store: Arc<dyn CredentialStore> = store_backend.clone();
	let settings = AadSettings::builder().authority(server.base_url()).build()?;
	let broker = ReqwestBroker::new(store, settings)?;
	let request = TokenRequest::new(account.clone(), "tenant-acme", "", "demo-secret").with_retries(3);

	match broker.acquire_token(&request).await? {
		TokenOutcome::Granted(token) => println!("Access token expires at {:?}.", token.expires_at),
		TokenOutcome::Rejected(failure) => println!("Rejected: {}", failure.message),
	}

	let saved = store_backend.snapshot(&account).and_then(|config| config.aad_access_token);

	println!("Stored token present: {}.", saved.is_some());

	let params = parse_notebook_params("run_date=2025-01-01||env=prod")?;

	println!("Notebook parameters: {params:?}.");

	token_mock.assert_async().await;

	Ok(())
}
