#[derive(Debug, thiserror::Error, thiserror_ext::Construct)]
#[non_exhaustive]
pub enum Error {
	#[error("encryption primitives unavailable: the OS entropy source failed")]
	Unavailable,

	#[error("failed to encrypt record")]
	Encryption,

	#[error("failed to decrypt envelope")]
	Decryption,

	#[error("record is not JSON-serializable: {cause}")]
	Serialization { cause: serde_json::Error },

	#[error("decrypted payload is not valid JSON: {cause}")]
	Parse { cause: serde_json::Error },

	#[error("malformed envelope: {0}")]
	MalformedEnvelope(String),

	#[error("invalid user id: {0}")]
	InvalidUserId(String),

	#[error("salt store failure on {element}: {cause}")]
	SaltStore {
		element: String,
		cause: std::io::Error,
	},
}
