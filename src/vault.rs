use aes_gcm::{Aes256Gcm, KeyInit as _, aead::Aead as _};
use parking_lot::Mutex;
use rand::TryRngCore as _;
use serde::{Serialize, de::DeserializeOwned};
use std::sync::Arc;

use super::{
	DeviceFingerprint, Error, Measurement, envelope, kdf,
	key::Key,
	key_cache::KeyCache,
	salt_store::{Salt, SaltStore},
};

/// Authenticated encryption for records cached on-device.
///
/// An [`OfflineVault`] turns JSON-serializable records into opaque base64 envelopes that are
/// safe to hand to whatever local key-value store the host application uses, and turns them
/// back again later -- same user, same device, and nobody has touched the bytes in between, or
/// the decrypt fails.  The key that does the work is derived from the user id, the
/// [`DeviceFingerprint`], and a persisted per-user [`Salt`]; the key itself is never written
/// anywhere.
///
/// Envelopes are `base64(IV ‖ ciphertext)`, with a fresh random 96-bit IV for every call.  Two
/// encryptions of the same record therefore produce different envelopes -- that's load-bearing,
/// not a bug, since reusing an IV under one AES-GCM key destroys its confidentiality.
///
/// Vault handles are cheap to clone, and clones share one key cache.  Call
/// [`clear_key_cache`](Self::clear_key_cache) on logout, and
/// [`remove_user_data`](Self::remove_user_data) when wiping a user's local footprint entirely.
///
/// # Example
///
/// ```rust
/// use phi_vault::{DeviceFingerprint, MemorySaltStore, Measurement, OfflineVault};
/// # fn main() -> Result<(), phi_vault::Error> {
///
/// let fingerprint =
///     DeviceFingerprint::new("Mozilla/5.0 (X11; Linux x86_64)", "en-AU", -600, 1920, 1080);
/// let vault = OfflineVault::new(fingerprint, MemorySaltStore::new());
///
/// let reading = Measurement { heart_rate: 72, spo2: 98, timestamp: 1_700_000_000 };
/// let envelope = vault.encrypt_measurement("user-42", &reading)?;
///
/// // The envelope is an opaque base64 string, ready for any local store
/// assert_eq!(reading, vault.decrypt_measurement("user-42", &envelope)?);
///
/// // A different user derives a different key, so the tag check fails
/// assert!(vault.decrypt_measurement("user-99", &envelope).is_err());
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct OfflineVault<S> {
	fingerprint: DeviceFingerprint,
	salt_store: S,
	key_cache: Arc<Mutex<KeyCache>>,
}

impl<S: SaltStore> OfflineVault<S> {
	/// Create a vault bound to this device's fingerprint, persisting salts through `salt_store`.
	pub fn new(fingerprint: DeviceFingerprint, salt_store: S) -> Self {
		Self {
			fingerprint,
			salt_store,
			key_cache: Arc::new(Mutex::new(KeyCache::default())),
		}
	}

	/// Encrypt a record for offline storage, returning the envelope to persist.
	///
	/// # Errors
	///
	/// * [`Error::InvalidUserId`] if `user_id` is empty.
	/// * [`Error::Serialization`] if the record isn't JSON-representable.
	/// * [`Error::Unavailable`] if the OS entropy source fails; callers should have checked
	///   [`is_encryption_available`] up front and refused to cache locally at all.
	/// * [`Error::SaltStore`] if the salt store's backing storage fails.
	#[tracing::instrument(level = "debug", skip(self, record))]
	pub fn encrypt<T: Serialize + ?Sized>(
		&self,
		user_id: &str,
		record: &T,
	) -> Result<String, Error> {
		let user_id = valid_user_id(user_id)?;
		let plaintext = serde_json::to_vec(record).map_err(Error::serialization)?;
		let key = self.user_key(user_id)?;

		let mut iv = [0u8; envelope::IV_LEN];
		rand::rngs::OsRng
			.try_fill_bytes(&mut iv)
			.map_err(|_| Error::Unavailable)?;

		let cipher = Aes256Gcm::new(key.expose_secret().into());
		let ciphertext = cipher
			.encrypt((&iv).into(), plaintext.as_slice())
			.map_err(|_| Error::Encryption)?;

		Ok(envelope::encode(&iv, &ciphertext))
	}

	/// Decrypt an envelope previously produced by [`encrypt`](Self::encrypt) for the same user
	/// on the same device.
	///
	/// # Errors
	///
	/// * [`Error::MalformedEnvelope`] if the envelope isn't base64 or is too short -- detected
	///   before any cryptography runs.
	/// * [`Error::Decryption`] if the AEAD tag check fails: the bytes were tampered with, or
	///   they were encrypted under a different key (wrong user, wrong device, or the salt has
	///   been rotated by a wipe).  Treat the cached record as lost and re-fetch from the source
	///   of truth.
	/// * [`Error::Parse`] if the plaintext isn't valid JSON for `T`.
	#[tracing::instrument(level = "debug", skip(self, envelope))]
	pub fn decrypt<T: DeserializeOwned>(&self, user_id: &str, envelope: &str) -> Result<T, Error> {
		let user_id = valid_user_id(user_id)?;
		let (iv, ciphertext) = envelope::decode(envelope)?;
		let key = self.user_key(user_id)?;

		let cipher = Aes256Gcm::new(key.expose_secret().into());
		let plaintext = cipher
			.decrypt((&iv).into(), ciphertext.as_slice())
			.map_err(|_| Error::Decryption)?;

		serde_json::from_slice(&plaintext).map_err(Error::parse)
	}

	/// [`encrypt`](Self::encrypt), narrowed to the [`Measurement`] record shape.
	pub fn encrypt_measurement(
		&self,
		user_id: &str,
		measurement: &Measurement,
	) -> Result<String, Error> {
		self.encrypt(user_id, measurement)
	}

	/// [`decrypt`](Self::decrypt), narrowed to the [`Measurement`] record shape.
	pub fn decrypt_measurement(&self, user_id: &str, envelope: &str) -> Result<Measurement, Error> {
		self.decrypt(user_id, envelope)
	}

	/// Drop the cached key.  Call this on logout.  Idempotent.
	#[tracing::instrument(level = "debug", skip(self))]
	pub fn clear_key_cache(&self) {
		self.key_cache.lock().clear();
	}

	/// Wipe a user's local encryption footprint: delete their persisted salt, and drop the
	/// cached key if it's theirs.  Idempotent.
	///
	/// Any envelope encrypted under the old salt is unrecoverable after this -- which is the
	/// point, for account deletion and device unenrolment.
	///
	/// # Errors
	///
	/// Returns [`Error::SaltStore`] if the salt store's backing storage fails.
	#[tracing::instrument(level = "debug", skip(self))]
	pub fn remove_user_data(&self, user_id: &str) -> Result<(), Error> {
		// Hold the cache lock across the removal so an in-flight derivation can't re-cache a
		// key from the salt we're deleting
		let mut cache = self.key_cache.lock();

		self.salt_store.remove(user_id)?;
		cache.evict(user_id);

		tracing::debug!(user_id, "Removed local encryption data");

		Ok(())
	}

	/// Get the user's key, deriving and caching it if it isn't the one in the cache.
	fn user_key(&self, user_id: &str) -> Result<Key, Error> {
		let mut cache = self.key_cache.lock();

		if let Some(key) = cache.get(user_id) {
			return Ok(key);
		}

		// The read-salt-or-create sequence runs under the cache lock, so two concurrent first
		// calls for a brand-new user can't persist two different salts
		let salt = match self.salt_store.load(user_id)? {
			Some(salt) => salt,
			None => {
				let salt = Salt::generate()?;
				self.salt_store.store(user_id, &salt)?;
				tracing::debug!(user_id, "Created salt for first-time user");
				salt
			}
		};

		let key = kdf::derive_key(user_id, &self.fingerprint, &salt);
		cache.put(user_id, key.clone());

		Ok(key)
	}
}

fn valid_user_id(user_id: &str) -> Result<&str, Error> {
	if user_id.is_empty() {
		Err(Error::invalid_user_id("user id must not be empty"))
	} else {
		Ok(user_id)
	}
}

/// Whether the primitives this crate needs are actually usable right now.
///
/// Concretely, this probes the OS entropy source, which is the only piece of the machinery that
/// can fail at runtime.  Callers must check this before caching PHI locally, and must refuse to
/// cache at all when it returns `false` -- encrypt calls in that state fail with
/// [`Error::Unavailable`] rather than writing anything.
#[tracing::instrument(level = "debug")]
pub fn is_encryption_available() -> bool {
	let mut probe = [0u8; 1];

	rand::rngs::OsRng.try_fill_bytes(&mut probe).is_ok()
}
