//! Hashing and encoding helpers

/// Content digest of a block: blake3, lowercase hex
pub fn hash(buf: &[u8]) -> String {
	hex::encode(blake3::hash(buf).as_bytes())
}

/// Serde adapter carrying raw bytes as a base64 string
pub mod base64_bytes {
	use base64::{engine::general_purpose::STANDARD, Engine};
	use serde::{Deserialize, Deserializer, Serializer};

	pub fn serialize<S>(data: &[u8], serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		serializer.serialize_str(&STANDARD.encode(data))
	}

	pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
	where
		D: Deserializer<'de>,
	{
		let encoded = String::deserialize(deserializer)?;
		STANDARD.decode(encoded.as_bytes()).map_err(serde::de::Error::custom)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_hash_deterministic() {
		assert_eq!(hash(b"hello"), hash(b"hello"));
		assert_ne!(hash(b"hello"), hash(b"hellp"));
	}

	#[test]
	fn test_hash_is_hex_encoded() {
		let h = hash(b"");
		assert_eq!(h.len(), 64);
		assert!(h.chars().all(|c| c.is_ascii_hexdigit()));
	}
}

// vim: ts=4
