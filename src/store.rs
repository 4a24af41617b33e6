//! Storage contracts and built-in credential store implementations.

pub mod file;
pub mod memory;
#[cfg(feature = "reqwest")] pub mod splunk;

pub use file::FileStore;
pub use memory::MemoryStore;
#[cfg(feature = "reqwest")] pub use splunk::SplunkStore;

// self
use crate::{
	_prelude::*,
	auth::{AccountName, Secret},
	config::AccountConfig,
};

/// Boxed future returned by [`CredentialStore`] operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Account configuration backend consulted and updated by the token broker.
pub trait CredentialStore
where
	Self: Send + Sync,
{
	/// Loads the configuration stored under `account`, if present.
	fn get<'a>(&'a self, account: &'a AccountName) -> StoreFuture<'a, Option<AccountConfig>>;

	/// Persists refreshed credentials for `account`.
	fn put<'a>(&'a self, account: &'a AccountName, update: CredentialUpdate) -> StoreFuture<'a, ()>;
}

/// Credentials written back after a successful token acquisition.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CredentialUpdate {
	/// Newly issued access token.
	pub access_token: Secret,
	/// Client secret used to obtain the token.
	pub client_secret: Secret,
	/// Whether the stored access token should be replaced.
	pub update_token: bool,
}
impl CredentialUpdate {
	/// Update that replaces both the client secret and the stored access token.
	pub fn refreshed_token(access_token: impl Into<Secret>, client_secret: impl Into<Secret>) -> Self {
		Self {
			access_token: access_token.into(),
			client_secret: client_secret.into(),
			update_token: true,
		}
	}

	/// Applies the update to a stored configuration.
	pub fn apply_to(self, config: &mut AccountConfig) {
		config.aad_client_secret = self.client_secret;

		if self.update_token {
			config.aad_access_token = Some(self.access_token);
		}
	}
}

/// Error type produced by [`CredentialStore`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// Serialization failures surfaced by the backend.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
	/// A token update targeted an account the store does not know.
	#[error("Account `{account}` is not configured.")]
	MissingAccount {
		/// Account that was not found.
		account: String,
	},
}

// Shared by the in-process stores: token updates only touch existing accounts.
fn apply_update(
	accounts: &mut BTreeMap<AccountName, AccountConfig>,
	account: &AccountName,
	update: CredentialUpdate,
) -> Result<(), StoreError> {
	match accounts.get_mut(account) {
		Some(config) => update.apply_to(config),
		None if update.update_token =>
			return Err(StoreError::MissingAccount { account: account.to_string() }),
		None => {
			let mut config = AccountConfig::default();

			update.apply_to(&mut config);
			accounts.insert(account.clone(), config);
		},
	}

	Ok(())
}
