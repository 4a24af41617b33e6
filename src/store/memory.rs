//! Thread-safe in-memory [`CredentialStore`] implementation for local development and tests.

// self
use crate::{
	_prelude::*,
	auth::AccountName,
	config::AccountConfig,
	store::{CredentialStore, CredentialUpdate, StoreFuture},
};

type AccountMap = Arc<RwLock<BTreeMap<AccountName, AccountConfig>>>;

/// Thread-safe storage backend that keeps account configurations in-process for tests and demos.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore(AccountMap);
impl MemoryStore {
	/// Inserts or replaces the configuration for `account`.
	pub fn insert(&self, account: AccountName, config: AccountConfig) {
		self.0.write().insert(account, config);
	}

	/// Builder-style variant of [`MemoryStore::insert`].
	pub fn with_account(self, account: AccountName, config: AccountConfig) -> Self {
		self.insert(account, config);

		self
	}

	/// Returns a copy of the stored configuration without going through the async trait.
	pub fn snapshot(&self, account: &AccountName) -> Option<AccountConfig> {
		self.0.read().get(account).cloned()
	}
}
impl CredentialStore for MemoryStore {
	fn get<'a>(&'a self, account: &'a AccountName) -> StoreFuture<'a, Option<AccountConfig>> {
		let map = self.0.clone();

		Box::pin(async move { Ok(map.read().get(account).cloned()) })
	}

	fn put<'a>(&'a self, account: &'a AccountName, update: CredentialUpdate) -> StoreFuture<'a, ()> {
		let map = self.0.clone();

		Box::pin(async move { super::apply_update(&mut map.write(), account, update) })
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::store::StoreError;

	#[tokio::test]
	async fn put_updates_existing_accounts() {
		let account = AccountName::new("prod").expect("Account fixture should be valid.");
		let store = MemoryStore::default().with_account(
			account.clone(),
			AccountConfig { aad_tenant_id: "tenant".into(), ..Default::default() },
		);

		store
			.put(&account, CredentialUpdate::refreshed_token("token", "secret"))
			.await
			.expect("Existing accounts should accept token updates.");

		let stored = store
			.get(&account)
			.await
			.expect("Memory store reads should not fail.")
			.expect("Account should still be present.");

		assert_eq!(stored.aad_tenant_id, "tenant");
		assert_eq!(stored.aad_access_token.map(|token| token.expose().to_owned()), Some("token".into()));
	}

	#[tokio::test]
	async fn missing_accounts_reject_token_updates() {
		let account = AccountName::new("ghost").expect("Account fixture should be valid.");
		let store = MemoryStore::default();

		assert_eq!(store.get(&account).await, Ok(None));
		assert!(matches!(
			store.put(&account, CredentialUpdate::refreshed_token("t", "s")).await,
			Err(StoreError::MissingAccount { .. })
		));
	}
}
