//! Core data types shared by the stores, the wire protocol and the sync engine

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::util;

/// Reserved block hash list entry marking a deleted file
pub const TOMBSTONE_HASH: &str = "0";

/// A content-addressed chunk of file bytes
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct Block {
	pub hash: String,
	#[serde(with = "util::base64_bytes")]
	pub data: Vec<u8>,
	pub size: u32,
}

impl Block {
	/// Build a block from raw bytes, hashing them
	pub fn new(data: Vec<u8>) -> Self {
		Block { hash: util::hash(&data), size: data.len() as u32, data }
	}
}

/// Per-file record held by the metadata registry and the Local Index
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileMetaData {
	pub filename: String,
	pub version: u32,
	pub block_hash_list: Vec<String>,
}

impl FileMetaData {
	pub fn new(filename: impl Into<String>, version: u32, block_hash_list: Vec<String>) -> Self {
		FileMetaData { filename: filename.into(), version, block_hash_list }
	}

	/// Deletion record for `filename` at `version`
	pub fn tombstone(filename: impl Into<String>, version: u32) -> Self {
		FileMetaData::new(filename, version, vec![TOMBSTONE_HASH.to_string()])
	}

	pub fn is_tombstone(&self) -> bool {
		self.block_hash_list.len() == 1 && self.block_hash_list[0] == TOMBSTONE_HASH
	}
}

/// Snapshot of the registry, ordered by filename
pub type FileInfoMap = BTreeMap<String, FileMetaData>;

/// Result of a compare-and-set `UpdateFile`
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum UpdateOutcome {
	/// Write accepted; the registry now holds `version`
	Applied { version: u32 },

	/// Write rejected; the registry still holds `current_version`
	Conflict { current_version: u32 },
}

impl UpdateOutcome {
	pub fn is_applied(&self) -> bool {
		matches!(self, UpdateOutcome::Applied { .. })
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_tombstone_detection() {
		assert!(FileMetaData::tombstone("a.txt", 3).is_tombstone());
		assert!(!FileMetaData::new("a.txt", 1, vec![]).is_tombstone());
		assert!(!FileMetaData::new("a.txt", 1, vec!["0".into(), "0".into()]).is_tombstone());
	}

	#[test]
	fn test_block_new_sets_hash_and_size() {
		let block = Block::new(b"hell".to_vec());
		assert_eq!(block.size, 4);
		assert_eq!(block.hash, util::hash(b"hell"));
	}

	#[test]
	fn test_metadata_serializes_camel_case() {
		let meta = FileMetaData::new("a.txt", 2, vec!["abc".into()]);
		let json = serde_json::to_string(&meta).unwrap();
		assert!(json.contains("\"blockHashList\""));
	}
}

// vim: ts=4
