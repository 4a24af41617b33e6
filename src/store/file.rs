//! Simple file-backed [`CredentialStore`] for lightweight deployments and local tooling.

// std
use std::{
	fs::{self, File},
	io::Write,
	path::{Path, PathBuf},
};
// self
use crate::{
	_prelude::*,
	auth::AccountName,
	config::AccountConfig,
	store::{CredentialStore, CredentialUpdate, StoreError, StoreFuture},
};

type AccountMap = BTreeMap<AccountName, AccountConfig>;

/// Persists account configurations to a JSON object keyed by account name after each mutation.
#[derive(Clone, Debug)]
pub struct FileStore {
	path: PathBuf,
	inner: Arc<RwLock<AccountMap>>,
}
impl FileStore {
	/// Opens (or creates) a store at the provided path, eagerly loading existing data.
	pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
		let path = path.into();

		Self::ensure_parent_exists(&path)?;

		let snapshot = Self::load_snapshot(&path)?;

		Ok(Self { path, inner: Arc::new(RwLock::new(snapshot)) })
	}

	/// Inserts or replaces the configuration for `account` and rewrites the file.
	pub fn insert(&self, account: AccountName, config: AccountConfig) -> Result<(), StoreError> {
		let mut guard = self.inner.write();

		guard.insert(account, config);

		self.persist_locked(&guard)
	}

	/// Location of the backing file.
	pub fn path(&self) -> &Path {
		&self.path
	}

	fn load_snapshot(path: &Path) -> Result<AccountMap, StoreError> {
		if !path.exists() {
			return Ok(AccountMap::new());
		}

		let bytes = fs::read(path).map_err(|e| StoreError::Backend {
			message: format!("Failed to read {}: {e}", path.display()),
		})?;

		if bytes.iter().all(u8::is_ascii_whitespace) {
			return Ok(AccountMap::new());
		}

		let mut deserializer = serde_json::Deserializer::from_slice(&bytes);

		serde_path_to_error::deserialize(&mut deserializer).map_err(|e| StoreError::Serialization {
			message: format!("Failed to parse {} at `{}`: {}", path.display(), e.path(), e.inner()),
		})
	}

	fn ensure_parent_exists(path: &Path) -> Result<(), StoreError> {
		if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
			fs::create_dir_all(parent).map_err(|e| StoreError::Backend {
				message: format!("Failed to create store directory {}: {e}", parent.display()),
			})?;
		}

		Ok(())
	}

	fn persist_locked(&self, contents: &AccountMap) -> Result<(), StoreError> {
		Self::ensure_parent_exists(&self.path)?;

		let serialized =
			serde_json::to_vec_pretty(contents).map_err(|e| StoreError::Serialization {
				message: format!("Failed to serialize store snapshot: {e}"),
			})?;
		let mut tmp_path = self.path.clone();

		tmp_path.set_extension("tmp");

		{
			let mut file = File::create(&tmp_path).map_err(|e| StoreError::Backend {
				message: format!("Failed to create {}: {e}", tmp_path.display()),
			})?;

			file.write_all(&serialized).map_err(|e| StoreError::Backend {
				message: format!("Failed to write {}: {e}", tmp_path.display()),
			})?;
			file.sync_all().map_err(|e| StoreError::Backend {
				message: format!("Failed to sync {}: {e}", tmp_path.display()),
			})?;
		}

		fs::rename(&tmp_path, &self.path).map_err(|e| StoreError::Backend {
			message: format!("Failed to replace {}: {e}", self.path.display()),
		})
	}
}
impl CredentialStore for FileStore {
	fn get<'a>(&'a self, account: &'a AccountName) -> StoreFuture<'a, Option<AccountConfig>> {
		Box::pin(async move { Ok(self.inner.read().get(account).cloned()) })
	}

	fn put<'a>(&'a self, account: &'a AccountName, update: CredentialUpdate) -> StoreFuture<'a, ()> {
		Box::pin(async move {
			let mut guard = self.inner.write();

			super::apply_update(&mut guard, account, update)?;
			self.persist_locked(&guard)
		})
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::{env, process};
	// crates.io
	use tokio::runtime::Runtime;
	// self
	use super::*;

	fn temp_path() -> PathBuf {
		let unique = format!(
			"databricks_addon_file_store_{}_{}.json",
			process::id(),
			OffsetDateTime::now_utc().unix_timestamp_nanos(),
		);

		env::temp_dir().join(unique)
	}

	#[test]
	fn token_updates_survive_reopen() {
		let path = temp_path();
		let store = FileStore::open(&path).expect("Failed to open file store snapshot.");
		let account = AccountName::new("prod").expect("Account fixture should be valid.");
		let rt = Runtime::new().expect("Failed to build Tokio runtime for file store test.");

		store
			.insert(
				account.clone(),
				AccountConfig {
					aad_tenant_id: "tenant".into(),
					aad_client_id: "client".into(),
					..Default::default()
				},
			)
			.expect("Failed to seed file store.");
		rt.block_on(store.put(&account, CredentialUpdate::refreshed_token("token", "secret")))
			.expect("Failed to save token update to file store.");
		drop(store);

		let reopened = FileStore::open(&path).expect("Failed to reopen file store snapshot.");
		let fetched = rt
			.block_on(reopened.get(&account))
			.expect("Failed to read account from file store.")
			.expect("File store lost account after reopen.");

		assert_eq!(fetched.aad_client_id, "client");
		assert_eq!(fetched.aad_client_secret.expose(), "secret");
		assert_eq!(fetched.aad_access_token.as_ref().map(|token| token.expose()), Some("token"));

		fs::remove_file(&path).unwrap_or_else(|e| {
			panic!("Failed to remove temporary file store snapshot {}: {e}", path.display())
		});
	}

	#[test]
	fn malformed_snapshots_report_the_path() {
		let path = temp_path();

		fs::write(&path, br#"{"prod": {"proxy_port": "eighty"}}"#)
			.expect("Failed to write malformed snapshot.");

		let err = FileStore::open(&path).expect_err("Malformed snapshots should be rejected.");

		assert!(matches!(&err, StoreError::Serialization { message } if message.contains("invalid proxy port")));

		fs::remove_file(&path).unwrap_or_else(|e| {
			panic!("Failed to remove temporary file store snapshot {}: {e}", path.display())
		});
	}
}
