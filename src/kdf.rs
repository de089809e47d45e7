use pbkdf2::pbkdf2_hmac;
use sha2::Sha256;

use super::{DeviceFingerprint, Key, salt_store::Salt};

/// The fingerprint string has limited entropy, so the derivation had better be slow.
const PBKDF2_ROUNDS: u32 = 100_000;

/// Derive the offline-cache key for a user on this device.
///
/// The same (user, fingerprint, salt) triple must always produce the same key, bit for bit;
/// everything a previous session encrypted depends on it.
#[tracing::instrument(level = "trace", skip(fingerprint, salt))]
pub(crate) fn derive_key(user_id: &str, fingerprint: &DeviceFingerprint, salt: &Salt) -> Key {
	let material = format!("{user_id}:{}", fingerprint.composite());

	let mut output = [0u8; 32];

	pbkdf2_hmac::<Sha256>(
		material.as_bytes(),
		salt.as_bytes(),
		PBKDF2_ROUNDS,
		&mut output,
	);

	Key::new(output)
}

#[cfg(test)]
mod tests {
	use super::*;

	fn fingerprint() -> DeviceFingerprint {
		DeviceFingerprint::new("Mozilla/5.0 (X11; Linux x86_64)", "en-AU", -600, 1920, 1080)
	}

	#[test]
	fn derivation_is_deterministic() {
		let salt = Salt::from_bytes([7u8; 16]);

		let k1 = derive_key("user-42", &fingerprint(), &salt);
		let k2 = derive_key("user-42", &fingerprint(), &salt);

		assert_eq!(k1.expose_secret(), k2.expose_secret());
	}

	#[test]
	fn different_user_different_key() {
		let salt = Salt::from_bytes([7u8; 16]);

		let k1 = derive_key("user-42", &fingerprint(), &salt);
		let k2 = derive_key("user-99", &fingerprint(), &salt);

		assert_ne!(k1.expose_secret(), k2.expose_secret());
	}

	#[test]
	fn different_salt_different_key() {
		let k1 = derive_key("user-42", &fingerprint(), &Salt::from_bytes([7u8; 16]));
		let k2 = derive_key("user-42", &fingerprint(), &Salt::from_bytes([8u8; 16]));

		assert_ne!(k1.expose_secret(), k2.expose_secret());
	}
}
