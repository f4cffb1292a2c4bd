//! Local Index persistence
//!
//! The Local Index is the client's record of the metadata it last
//! synchronized with the registry. It lives in the sync root, is read once
//! at the start of a cycle and written once at the end.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::StateError;
use crate::types::{FileInfoMap, FileMetaData};

/// Index file name inside the sync root; never scanned as user data
pub const INDEX_FILENAME: &str = "index.json";

/// Temp file used while the index is being replaced
pub const INDEX_TMP_FILENAME: &str = "index.json.tmp";

/// Last-synced snapshot of the registry, keyed by filename
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LocalIndex {
	pub files: FileInfoMap,
}

impl LocalIndex {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn get(&self, filename: &str) -> Option<&FileMetaData> {
		self.files.get(filename)
	}

	pub fn contains(&self, filename: &str) -> bool {
		self.files.contains_key(filename)
	}

	/// Record `meta` as synchronized, replacing any earlier entry
	pub fn record(&mut self, meta: FileMetaData) {
		self.files.insert(meta.filename.clone(), meta);
	}

	pub fn len(&self) -> usize {
		self.files.len()
	}

	pub fn is_empty(&self) -> bool {
		self.files.is_empty()
	}
}

/// Loads and saves the Local Index of one sync root
#[derive(Debug, Clone)]
pub struct IndexManager {
	base_dir: PathBuf,
}

impl IndexManager {
	pub fn new(base_dir: impl Into<PathBuf>) -> Self {
		IndexManager { base_dir: base_dir.into() }
	}

	pub fn index_path(&self) -> PathBuf {
		self.base_dir.join(INDEX_FILENAME)
	}

	/// Load the index; a missing file is an empty index
	pub async fn load(&self) -> Result<LocalIndex, StateError> {
		let path = self.index_path();

		if !path.exists() {
			return Ok(LocalIndex::new());
		}

		let contents = tokio::fs::read_to_string(&path)
			.await
			.map_err(|e| StateError::LoadFailed { source: Box::new(e) })?;

		serde_json::from_str(&contents).map_err(|e| StateError::Corrupted {
			message: format!("Failed to parse {}: {}", path.display(), e),
		})
	}

	/// Replace the index on disk (write temp file, then rename)
	pub async fn save(&self, index: &LocalIndex) -> Result<(), StateError> {
		let json = serde_json::to_string_pretty(index)
			.map_err(|e| StateError::SaveFailed { source: Box::new(e) })?;

		let tmp_path = self.base_dir.join(INDEX_TMP_FILENAME);
		tokio::fs::write(&tmp_path, json)
			.await
			.map_err(|e| StateError::SaveFailed { source: Box::new(e) })?;

		tokio::fs::rename(&tmp_path, self.index_path())
			.await
			.map_err(|e| StateError::SaveFailed { source: Box::new(e) })
	}

	pub fn base_dir(&self) -> &Path {
		&self.base_dir
	}
}

/// True for names the index machinery owns inside the sync root
pub fn is_index_file(name: &str) -> bool {
	name == INDEX_FILENAME || name == INDEX_TMP_FILENAME
}

#[cfg(test)]
mod tests {
	use super::*;
	use tempfile::TempDir;

	#[tokio::test]
	async fn test_missing_index_is_empty() {
		let dir = TempDir::new().unwrap();
		let index = IndexManager::new(dir.path()).load().await.unwrap();
		assert!(index.is_empty());
	}

	#[tokio::test]
	async fn test_save_then_load() {
		let dir = TempDir::new().unwrap();
		let manager = IndexManager::new(dir.path());

		let mut index = LocalIndex::new();
		index.record(FileMetaData::new("a.txt", 3, vec!["h1".into(), "h2".into()]));
		index.record(FileMetaData::tombstone("b.txt", 2));
		manager.save(&index).await.unwrap();

		let loaded = manager.load().await.unwrap();
		assert_eq!(loaded, index);
		assert!(loaded.get("b.txt").unwrap().is_tombstone());
		assert!(!dir.path().join(INDEX_TMP_FILENAME).exists());
	}

	#[tokio::test]
	async fn test_corrupted_index_is_error() {
		let dir = TempDir::new().unwrap();
		std::fs::write(dir.path().join(INDEX_FILENAME), b"{ invalid json").unwrap();

		let result = IndexManager::new(dir.path()).load().await;
		assert!(matches!(result, Err(StateError::Corrupted { .. })));
	}

	#[test]
	fn test_index_path() {
		let manager = IndexManager::new("/tmp/root");
		assert!(manager.index_path().ends_with(INDEX_FILENAME));
		assert!(is_index_file(INDEX_FILENAME));
		assert!(!is_index_file("a.txt"));
	}
}

// vim: ts=4
