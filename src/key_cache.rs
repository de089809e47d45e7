use super::Key;

/// The in-memory cache of the one live derived key.
///
/// Derivation costs ~100k PBKDF2 rounds, so every encrypt/decrypt re-deriving would be painful;
/// but the key must never touch persistent storage.  So: exactly one key, in memory, tagged with
/// the user it belongs to.  Switching users overwrites it, logout clears it.
#[derive(Debug, Default)]
pub(crate) struct KeyCache {
	owner: Option<(String, Key)>,
}

impl KeyCache {
	pub(crate) fn get(&self, user_id: &str) -> Option<Key> {
		match &self.owner {
			Some((owner, key)) if owner == user_id => Some(key.clone()),
			_ => None,
		}
	}

	pub(crate) fn put(&mut self, user_id: &str, key: Key) {
		if let Some((previous, _)) = &self.owner {
			if previous != user_id {
				tracing::debug!(previous, user_id, "Evicting cached key for previous user");
			}
		}

		self.owner = Some((user_id.to_string(), key));
	}

	/// Drop the cached key unconditionally.  Idempotent.
	pub(crate) fn clear(&mut self) {
		if self.owner.take().is_some() {
			tracing::debug!("Cleared cached key");
		}
	}

	/// Drop the cached key only if `user_id` owns it.  Idempotent.
	pub(crate) fn evict(&mut self, user_id: &str) {
		if matches!(&self.owner, Some((owner, _)) if owner == user_id) {
			tracing::debug!(user_id, "Evicting cached key");
			self.owner = None;
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn key(b: u8) -> Key {
		Key::new([b; 32])
	}

	#[test]
	fn single_occupancy() {
		let mut cache = KeyCache::default();

		cache.put("alice", key(1));
		assert!(cache.get("alice").is_some());
		assert!(cache.get("bob").is_none());

		cache.put("bob", key(2));
		assert!(cache.get("alice").is_none());
		assert_eq!([2u8; 32], *cache.get("bob").unwrap().expose_secret());
	}

	#[test]
	fn clear_is_idempotent() {
		let mut cache = KeyCache::default();

		cache.put("alice", key(1));
		cache.clear();
		cache.clear();

		assert!(cache.get("alice").is_none());
	}

	#[test]
	fn evict_only_hits_the_owner() {
		let mut cache = KeyCache::default();

		cache.put("alice", key(1));

		cache.evict("bob");
		assert!(cache.get("alice").is_some());

		cache.evict("alice");
		assert!(cache.get("alice").is_none());

		// And again, for idempotence
		cache.evict("alice");
	}
}
