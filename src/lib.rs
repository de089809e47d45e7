//! Device-bound, authenticated encryption for offline-cached patient records.
//!
//! Clinical web and mobile clients like to keep a local cache of recent patient data so the app
//! stays useful when the network isn't.  That cache is PHI sitting on somebody's disk, so it
//! must never be written in the clear -- but it's also a *cache*, recoverable from the server,
//! so the protection can be pragmatic: bind the data to the user and the device it was cached
//! on, and treat anything that no longer decrypts as lost.
//!
//! That's what an [`OfflineVault`] does.  Give it a JSON-serializable record and a user id, and
//! it hands back an opaque base64 envelope to drop into whatever local key-value store you
//! already have.  Give the envelope back later -- same user, same device -- and the record comes
//! out again.  Tamper with the envelope, move it to another device, or hand it to another user,
//! and decryption fails with a typed error instead of quietly producing garbage, courtesy of
//! AES-256-GCM's authentication tag.
//!
//! The key never exists outside memory.  It is derived on first use from the user id, a
//! [`DeviceFingerprint`], and a random per-user [`Salt`], using PBKDF2-HMAC-SHA256 with a
//! deliberately high iteration count -- the fingerprint is guessable, so the derivation being
//! slow is what makes offline key recovery tedious rather than trivial.  Only the salt is
//! persisted (it isn't secret), through whatever [`SaltStore`] implementation suits the host:
//! [`MemorySaltStore`] for tests and session-scoped caches, [`FileSaltStore`] for anything that
//! should survive a restart, or your own impl over the host application's storage.
//!
//! Two lifecycle calls matter: [`OfflineVault::clear_key_cache`] on logout (drops the in-memory
//! key), and [`OfflineVault::remove_user_data`] when wiping a user's local footprint (deletes
//! their salt, making every old envelope permanently undecryptable -- deliberately).
//!
//! Before relying on any of this, check [`is_encryption_available`]; if the OS can't supply
//! entropy, the only safe policy is to not cache PHI locally at all.
mod envelope;
mod error;
mod fingerprint;
mod kdf;
mod key;
mod key_cache;
mod measurement;
mod salt_store;
mod vault;

pub use error::Error;
pub use fingerprint::DeviceFingerprint;
pub use measurement::Measurement;
pub use salt_store::{FileSaltStore, MemorySaltStore, SALT_KEY_PREFIX, Salt, SaltStore};
pub use vault::{OfflineVault, is_encryption_available};

use key::Key;
