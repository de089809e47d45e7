use serde::{Deserialize, Serialize};

/// A vital-signs reading, the record shape the offline cache was built for.
///
/// Serialized with camelCase field names so that envelopes interoperate with records cached by
/// the web client.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Measurement {
	/// Beats per minute.
	pub heart_rate: u16,

	/// Peripheral oxygen saturation, percent.
	pub spo2: u8,

	/// Unix timestamp (seconds) of the reading.
	pub timestamp: u64,
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn wire_format_is_camel_case() {
		let m = Measurement {
			heart_rate: 72,
			spo2: 98,
			timestamp: 1_700_000_000,
		};

		assert_eq!(
			r#"{"heartRate":72,"spo2":98,"timestamp":1700000000}"#,
			serde_json::to_string(&m).unwrap()
		);
	}
}
