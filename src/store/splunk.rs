//! [`CredentialStore`] backed by the add-on's splunkd credential handler.

// self
use crate::{
	_prelude::*,
	auth::AccountName,
	config::AccountConfig,
	splunk::{SplunkClient, SplunkError},
	store::{CredentialStore, CredentialUpdate, StoreError, StoreFuture},
};

/// Reads and writes account configuration through splunkd.
#[derive(Clone, Debug)]
pub struct SplunkStore {
	client: Arc<SplunkClient>,
}
impl SplunkStore {
	/// Wraps a session-authenticated splunkd client.
	pub fn new(client: impl Into<Arc<SplunkClient>>) -> Self {
		Self { client: client.into() }
	}

	/// Underlying splunkd client.
	pub fn client(&self) -> &SplunkClient {
		&self.client
	}
}
impl CredentialStore for SplunkStore {
	fn get<'a>(&'a self, account: &'a AccountName) -> StoreFuture<'a, Option<AccountConfig>> {
		Box::pin(async move { self.client.account_config(account).await.map_err(backend) })
	}

	fn put<'a>(&'a self, account: &'a AccountName, update: CredentialUpdate) -> StoreFuture<'a, ()> {
		Box::pin(async move {
			self.client.save_access_token(account, &update).await.map_err(|err| {
				StoreError::Backend {
					message: format!(
						"Exception while saving AAD access token: {}",
						err.to_string().trim_end_matches('.')
					),
				}
			})
		})
	}
}

fn backend(err: SplunkError) -> StoreError {
	match err {
		SplunkError::Parse { .. } =>
			StoreError::Serialization { message: err.to_string().trim_end_matches('.').into() },
		_ => StoreError::Backend { message: err.to_string().trim_end_matches('.').into() },
	}
}
