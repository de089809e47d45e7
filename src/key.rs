use secrecy::ExposeSecret as _;

/// A derived AES-256-GCM key for one user's offline cache.
///
/// Keys are only ever *derived* (see [`kdf`](super::kdf)), never persisted; the only place one
/// lives is the in-memory [`KeyCache`](super::key_cache::KeyCache), which is dropped on logout.
#[derive(Debug)]
pub(crate) struct Key(secrecy::SecretBox<[u8; 32]>);

impl Key {
	pub(crate) fn new(k: [u8; 32]) -> Self {
		Self(secrecy::SecretBox::new(Box::new(k)))
	}

	pub(crate) fn expose_secret(&self) -> &[u8; 32] {
		self.0.expose_secret()
	}
}

impl Clone for Key {
	fn clone(&self) -> Self {
		Self::new(*self.expose_secret())
	}
}
