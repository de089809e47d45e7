use base64::{
	Engine as _,
	engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD},
};
use parking_lot::Mutex;
use rand::TryRngCore as _;
use std::{collections::HashMap, io, path::PathBuf, sync::Arc};

use super::Error;

/// Namespace prefix for persisted salt entries, shared by every [`SaltStore`] implementation.
pub const SALT_KEY_PREFIX: &str = "phi_encryption_salt_";

/// The per-user key-derivation salt.
///
/// Salts are random but *not* secret; they exist so that the (low-entropy) user-and-fingerprint
/// material doesn't map onto a precomputable key.  A salt is created once, on a user's first
/// encrypt or decrypt, persisted through a [`SaltStore`], and only ever deleted by
/// [`OfflineVault::remove_user_data`](super::OfflineVault::remove_user_data) -- at which point
/// everything encrypted under it is gone for good.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Salt([u8; 16]);

impl Salt {
	/// Generate a fresh random salt.
	///
	/// # Errors
	///
	/// Returns [`Error::Unavailable`] if the OS entropy source fails.
	pub(crate) fn generate() -> Result<Self, Error> {
		let mut s = [0u8; 16];

		rand::rngs::OsRng
			.try_fill_bytes(&mut s)
			.map_err(|_| Error::Unavailable)?;

		Ok(Self(s))
	}

	/// Reconstruct a salt from previously persisted bytes.
	pub fn from_bytes(s: [u8; 16]) -> Self {
		Self(s)
	}

	/// The raw bytes, for [`SaltStore`] implementations that need to persist them.
	pub fn as_bytes(&self) -> &[u8; 16] {
		&self.0
	}

	fn to_base64(&self) -> String {
		STANDARD.encode(self.0)
	}

	fn from_base64(s: &str) -> Result<Self, io::Error> {
		let bytes = STANDARD
			.decode(s.trim())
			.map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

		let salt: [u8; 16] = bytes
			.try_into()
			.map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "salt is not 16 bytes"))?;

		Ok(Self(salt))
	}
}

/// Where per-user salts live between sessions.
///
/// The vault is deliberately agnostic about its persistence layer; whatever the host application
/// uses for local storage, wrap it in this trait.  Implementations must be last-writer-safe:
/// two concurrent `store` calls for the same user must leave one complete salt, never an
/// interleaving of both.  (The vault itself serializes first-use salt *creation*, so in practice
/// concurrent stores for one user only happen if the host application races
/// [`remove_user_data`](super::OfflineVault::remove_user_data) against live traffic.)
pub trait SaltStore {
	/// Fetch the persisted salt for a user, if one exists.
	fn load(&self, user_id: &str) -> Result<Option<Salt>, Error>;

	/// Persist a user's salt, replacing any previous one.
	fn store(&self, user_id: &str, salt: &Salt) -> Result<(), Error>;

	/// Delete a user's salt.  Must be idempotent.
	fn remove(&self, user_id: &str) -> Result<(), Error>;
}

fn salt_key(user_id: &str) -> String {
	format!("{SALT_KEY_PREFIX}{user_id}")
}

/// A [`SaltStore`] that lives entirely in memory.
///
/// Clones share the same map, so a vault and a test (or two vault handles) can see each other's
/// salts.  Nothing survives the process, which makes this suitable for tests and for hosts that
/// treat the offline cache as session-scoped anyway.
#[derive(Clone, Debug, Default)]
pub struct MemorySaltStore(Arc<Mutex<HashMap<String, Salt>>>);

impl MemorySaltStore {
	pub fn new() -> Self {
		Self::default()
	}
}

impl SaltStore for MemorySaltStore {
	fn load(&self, user_id: &str) -> Result<Option<Salt>, Error> {
		Ok(self.0.lock().get(&salt_key(user_id)).cloned())
	}

	fn store(&self, user_id: &str, salt: &Salt) -> Result<(), Error> {
		self.0.lock().insert(salt_key(user_id), salt.clone());
		Ok(())
	}

	fn remove(&self, user_id: &str) -> Result<(), Error> {
		self.0.lock().remove(&salt_key(user_id));
		Ok(())
	}
}

/// A [`SaltStore`] backed by one small file per user in a caller-chosen directory.
///
/// File names are the usual namespace prefix plus a URL-safe base64 encoding of the user id
/// (user ids are not guaranteed to be filesystem-safe), and the content is the base64 salt.
/// Writes go through a temporary file and an atomic rename, so a concurrently-read salt file is
/// always a complete salt.
#[derive(Clone, Debug)]
pub struct FileSaltStore {
	dir: PathBuf,
}

impl FileSaltStore {
	/// Create a store rooted at `dir`, creating the directory if needed.
	///
	/// # Errors
	///
	/// Returns [`Error::SaltStore`] if the directory can't be created.
	pub fn new(dir: impl Into<PathBuf>) -> Result<Self, Error> {
		let dir = dir.into();

		std::fs::create_dir_all(&dir).map_err(|e| Error::salt_store("create_dir", e))?;

		Ok(Self { dir })
	}

	fn salt_path(&self, user_id: &str) -> PathBuf {
		self.dir
			.join(salt_key(&URL_SAFE_NO_PAD.encode(user_id.as_bytes())))
	}
}

impl SaltStore for FileSaltStore {
	#[tracing::instrument(level = "trace", skip(self))]
	fn load(&self, user_id: &str) -> Result<Option<Salt>, Error> {
		match std::fs::read_to_string(self.salt_path(user_id)) {
			Ok(content) => Ok(Some(
				Salt::from_base64(&content).map_err(|e| Error::salt_store("decode", e))?,
			)),
			Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
			Err(e) => Err(Error::salt_store("read", e)),
		}
	}

	#[tracing::instrument(level = "trace", skip(self, salt))]
	fn store(&self, user_id: &str, salt: &Salt) -> Result<(), Error> {
		let path = self.salt_path(user_id);
		let tmp = path.with_extension(format!("{:016x}.tmp", rand::random::<u64>()));

		std::fs::write(&tmp, salt.to_base64()).map_err(|e| Error::salt_store("write", e))?;
		std::fs::rename(&tmp, &path).map_err(|e| Error::salt_store("rename", e))?;

		Ok(())
	}

	#[tracing::instrument(level = "trace", skip(self))]
	fn remove(&self, user_id: &str) -> Result<(), Error> {
		match std::fs::remove_file(self.salt_path(user_id)) {
			Ok(()) => Ok(()),
			Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
			Err(e) => Err(Error::salt_store("remove", e)),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn memory_store_round_trip() {
		let store = MemorySaltStore::new();
		let salt = Salt::generate().unwrap();

		assert_eq!(None, store.load("user-42").unwrap());

		store.store("user-42", &salt).unwrap();
		assert_eq!(Some(salt.clone()), store.load("user-42").unwrap());
		assert_eq!(None, store.load("user-99").unwrap());

		store.remove("user-42").unwrap();
		assert_eq!(None, store.load("user-42").unwrap());

		// Removing an absent salt is fine
		store.remove("user-42").unwrap();
	}

	#[test]
	fn memory_store_clones_share_state() {
		let store = MemorySaltStore::new();
		let salt = Salt::generate().unwrap();

		store.store("user-42", &salt).unwrap();

		assert_eq!(Some(salt), store.clone().load("user-42").unwrap());
	}

	#[test]
	fn file_store_survives_reopen() {
		let dir = tempfile::tempdir().unwrap();
		let salt = Salt::generate().unwrap();

		let store = FileSaltStore::new(dir.path()).unwrap();
		store.store("user-42", &salt).unwrap();

		let reopened = FileSaltStore::new(dir.path()).unwrap();
		assert_eq!(Some(salt), reopened.load("user-42").unwrap());
	}

	#[test]
	fn file_store_remove_is_idempotent() {
		let dir = tempfile::tempdir().unwrap();
		let store = FileSaltStore::new(dir.path()).unwrap();

		store.remove("never-stored").unwrap();

		store.store("user-42", &Salt::generate().unwrap()).unwrap();
		store.remove("user-42").unwrap();
		store.remove("user-42").unwrap();

		assert_eq!(None, store.load("user-42").unwrap());
	}

	#[test]
	fn file_store_handles_awkward_user_ids() {
		let dir = tempfile::tempdir().unwrap();
		let store = FileSaltStore::new(dir.path()).unwrap();
		let salt = Salt::generate().unwrap();

		// Slashes and dots must not escape the store directory
		store.store("../../etc/passwd", &salt).unwrap();

		assert_eq!(Some(salt), store.load("../../etc/passwd").unwrap());
		assert_eq!(None, store.load("etc/passwd").unwrap());
	}

	#[test]
	fn file_store_rejects_corrupted_salt() {
		let dir = tempfile::tempdir().unwrap();
		let store = FileSaltStore::new(dir.path()).unwrap();

		store.store("user-42", &Salt::generate().unwrap()).unwrap();

		let path = store.salt_path("user-42");
		std::fs::write(&path, "definitely not base64!").unwrap();

		let result = store.load("user-42");
		assert!(matches!(result, Err(Error::SaltStore { .. })));
	}
}
