use base64::{Engine as _, engine::general_purpose::STANDARD};

use super::Error;

pub(crate) const IV_LEN: usize = 12;

// AES-GCM appends its 16-byte tag to the ciphertext, so nothing shorter can be genuine
const TAG_LEN: usize = 16;

/// Pack a fresh IV and an AEAD ciphertext into the storable envelope form, base64(IV ‖ ct).
pub(crate) fn encode(iv: &[u8; IV_LEN], ciphertext: &[u8]) -> String {
	let mut blob = Vec::with_capacity(IV_LEN + ciphertext.len());

	blob.extend_from_slice(iv);
	blob.extend_from_slice(ciphertext);

	STANDARD.encode(blob)
}

/// Split an envelope back into its IV and ciphertext.
///
/// Structural problems (bad base64, too short to hold an IV and a tag) surface as
/// [`Error::MalformedEnvelope`] *before* any cryptography happens; tag failures are the
/// decrypt path's business.
pub(crate) fn decode(envelope: &str) -> Result<([u8; IV_LEN], Vec<u8>), Error> {
	let blob = STANDARD
		.decode(envelope)
		.map_err(|_| Error::malformed_envelope("not valid base64"))?;

	if blob.len() < IV_LEN + TAG_LEN {
		return Err(Error::malformed_envelope("too short"));
	}

	let (iv, ciphertext) = blob.split_at(IV_LEN);

	let iv: [u8; IV_LEN] = iv
		.try_into()
		.map_err(|_| Error::malformed_envelope("short IV"))?;

	Ok((iv, ciphertext.to_vec()))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn round_trip() {
		let iv = [3u8; IV_LEN];
		let ciphertext = vec![9u8; 40];

		let (iv_out, ct_out) = decode(&encode(&iv, &ciphertext)).unwrap();

		assert_eq!(iv, iv_out);
		assert_eq!(ciphertext, ct_out);
	}

	#[test]
	fn rejects_non_base64() {
		let result = decode("this is not base64 at all!");
		assert!(matches!(result, Err(Error::MalformedEnvelope(_))));
	}

	#[test]
	fn rejects_truncated_envelope() {
		// Valid base64, but only 12 bytes of payload: room for an IV, not for a tag
		let result = decode(&STANDARD.encode([0u8; 12]));
		assert!(matches!(result, Err(Error::MalformedEnvelope(_))));
	}

	#[test]
	fn rejects_empty_envelope() {
		let result = decode("");
		assert!(matches!(result, Err(Error::MalformedEnvelope(_))));
	}
}
