/// A coarse description of the device a vault is running on.
///
/// The fingerprint is folded into key derivation so that ciphertexts only decrypt on the device
/// that produced them.  It is *not* a security boundary -- every attribute here is guessable --
/// just a binding that makes off-device decryption fail cleanly at the AEAD tag check instead of
/// producing someone else's readable cache.
///
/// The flipside: if *any* attribute changes (the browser updates its user agent string, the user
/// switches locale), every previously cached record becomes undecryptable.  That's accepted --
/// the offline cache is disposable, and callers re-fetch from the source of truth on a
/// [`Error::Decryption`](super::Error::Decryption).
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DeviceFingerprint {
	user_agent: String,
	language: String,
	timezone_offset_minutes: i32,
	screen_width: u32,
	screen_height: u32,
}

impl DeviceFingerprint {
	pub fn new(
		user_agent: impl Into<String>,
		language: impl Into<String>,
		timezone_offset_minutes: i32,
		screen_width: u32,
		screen_height: u32,
	) -> Self {
		Self {
			user_agent: user_agent.into(),
			language: language.into(),
			timezone_offset_minutes,
			screen_width,
			screen_height,
		}
	}

	/// The stable string form that gets mixed into key derivation.
	pub(crate) fn composite(&self) -> String {
		format!(
			"{}|{}|{}|{}x{}",
			self.user_agent,
			self.language,
			self.timezone_offset_minutes,
			self.screen_width,
			self.screen_height
		)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn composite_is_stable() {
		let fp = DeviceFingerprint::new("UA", "en-AU", -600, 1920, 1080);

		assert_eq!("UA|en-AU|-600|1920x1080", fp.composite());
	}

	#[test]
	fn attribute_change_changes_composite() {
		let fp = DeviceFingerprint::new("UA", "en-AU", -600, 1920, 1080);
		let resized = DeviceFingerprint::new("UA", "en-AU", -600, 2560, 1440);

		assert_ne!(fp.composite(), resized.composite());
	}
}
