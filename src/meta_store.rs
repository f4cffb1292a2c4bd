//! Versioned file metadata registry
//!
//! Holds the authoritative filename -> FileMetaData map. Updates use
//! optimistic concurrency control: a write for an existing file must carry
//! exactly the stored version plus one.

use tokio::sync::Mutex;

use crate::logging::*;
use crate::types::{FileInfoMap, FileMetaData, UpdateOutcome};

#[derive(Debug)]
pub struct MetaStore {
	files: Mutex<FileInfoMap>,
	block_store_addr: String,
}

impl MetaStore {
	/// Create an empty registry advertising `block_store_addr` to clients
	pub fn new(block_store_addr: impl Into<String>) -> Self {
		MetaStore { files: Mutex::new(FileInfoMap::new()), block_store_addr: block_store_addr.into() }
	}

	/// Independent copy of the current map
	pub async fn get_file_info_map(&self) -> FileInfoMap {
		self.files.lock().await.clone()
	}

	/// Compare-and-set update.
	///
	/// Unknown filenames are accepted at whatever version is supplied.
	/// Known filenames at version `v` only accept `v + 1`.
	pub async fn update_file(&self, meta: &FileMetaData) -> UpdateOutcome {
		let mut files = self.files.lock().await;

		if let Some(current) = files.get(&meta.filename) {
			if current.version.checked_add(1) != Some(meta.version) {
				debug!(
					"[meta_store] Rejecting {} v{}: registry holds v{}",
					meta.filename, meta.version, current.version
				);
				return UpdateOutcome::Conflict { current_version: current.version };
			}
		}

		debug!(
			"[meta_store] Accepting {} v{} ({} blocks{})",
			meta.filename,
			meta.version,
			meta.block_hash_list.len(),
			if meta.is_tombstone() { ", tombstone" } else { "" }
		);
		files.insert(meta.filename.clone(), meta.clone());
		UpdateOutcome::Applied { version: meta.version }
	}

	pub fn get_block_store_addr(&self) -> String {
		self.block_store_addr.clone()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn meta(name: &str, version: u32, hashes: &[&str]) -> FileMetaData {
		FileMetaData::new(name, version, hashes.iter().map(|h| h.to_string()).collect())
	}

	#[tokio::test]
	async fn test_first_write_accepted() {
		let store = MetaStore::new("localhost:8081");
		let outcome = store.update_file(&meta("a.txt", 1, &["h1"])).await;
		assert_eq!(outcome, UpdateOutcome::Applied { version: 1 });
	}

	#[tokio::test]
	async fn test_first_write_accepts_any_version() {
		let store = MetaStore::new("localhost:8081");
		let outcome = store.update_file(&meta("a.txt", 7, &["h1"])).await;
		assert_eq!(outcome, UpdateOutcome::Applied { version: 7 });
	}

	#[tokio::test]
	async fn test_next_version_accepted() {
		let store = MetaStore::new("localhost:8081");
		store.update_file(&meta("a.txt", 1, &["h1"])).await;
		let outcome = store.update_file(&meta("a.txt", 2, &["h2"])).await;
		assert_eq!(outcome, UpdateOutcome::Applied { version: 2 });

		let map = store.get_file_info_map().await;
		assert_eq!(map["a.txt"].block_hash_list, vec!["h2".to_string()]);
	}

	#[tokio::test]
	async fn test_cas_rejects_other_versions() {
		let store = MetaStore::new("localhost:8081");
		store.update_file(&meta("a.txt", 1, &["h1"])).await;
		store.update_file(&meta("a.txt", 2, &["h2"])).await;

		for version in [0, 1, 2, 4, 10].iter() {
			let outcome = store.update_file(&meta("a.txt", *version, &["x"])).await;
			assert_eq!(outcome, UpdateOutcome::Conflict { current_version: 2 });
		}

		let map = store.get_file_info_map().await;
		assert_eq!(map["a.txt"].version, 2);
		assert_eq!(map["a.txt"].block_hash_list, vec!["h2".to_string()]);
	}

	#[tokio::test]
	async fn test_tombstone_is_ordinary_update() {
		let store = MetaStore::new("localhost:8081");
		store.update_file(&meta("a.txt", 1, &["h1"])).await;
		let outcome = store.update_file(&FileMetaData::tombstone("a.txt", 2)).await;
		assert!(outcome.is_applied());
		assert!(store.get_file_info_map().await["a.txt"].is_tombstone());
	}

	#[tokio::test]
	async fn test_snapshot_is_detached() {
		let store = MetaStore::new("localhost:8081");
		store.update_file(&meta("a.txt", 1, &["h1"])).await;
		let snapshot = store.get_file_info_map().await;

		store.update_file(&meta("a.txt", 2, &["h2"])).await;
		store.update_file(&meta("b.txt", 1, &["h3"])).await;

		assert_eq!(snapshot.len(), 1);
		assert_eq!(snapshot["a.txt"].version, 1);
	}

	#[test]
	fn test_block_store_addr() {
		let store = MetaStore::new("10.0.0.1:9000");
		assert_eq!(store.get_block_store_addr(), "10.0.0.1:9000");
	}
}

// vim: ts=4
