//! Upload protocol shared by the new-file and modified-file phases
//!
//! Blocks for the whole batch are written before any metadata update, so
//! the registry never references a block the store does not hold. Each
//! file's update stands alone: a version conflict drops only that file.

use std::collections::{BTreeMap, HashSet};

use crate::chunking::ChunkedFile;
use crate::logging::*;
use crate::protocol::{BlockStoreApi, MetaStoreApi, ProtocolError, ProtocolResult};
use crate::types::{Block, FileMetaData, UpdateOutcome};

/// One file to push at a given version
#[derive(Debug, Clone)]
pub struct UploadTask {
	pub filename: String,
	pub version: u32,
	pub chunked: ChunkedFile,
}

impl UploadTask {
	pub fn metadata(&self) -> FileMetaData {
		FileMetaData::new(self.filename.clone(), self.version, self.chunked.hashes.clone())
	}
}

/// Outcome of one upload batch
#[derive(Debug, Default)]
pub struct UploadResult {
	/// Metadata the registry accepted, at the version it returned
	pub applied: Vec<FileMetaData>,

	/// Rejected files with the registry's current version
	pub conflicts: Vec<(String, u32)>,

	/// Blocks the store was missing and received
	pub blocks_uploaded: usize,
}

pub async fn upload_batch(
	blocks: &dyn BlockStoreApi,
	meta: &dyn MetaStoreApi,
	tasks: &[UploadTask],
) -> ProtocolResult<UploadResult> {
	let mut result = UploadResult::default();
	if tasks.is_empty() {
		return Ok(result);
	}

	let mut union: BTreeMap<&str, &Vec<u8>> = BTreeMap::new();
	for task in tasks {
		for (hash, data) in &task.chunked.blocks {
			union.entry(hash.as_str()).or_insert(data);
		}
	}

	let hashes: Vec<String> = union.keys().map(|h| h.to_string()).collect();
	let present: HashSet<String> = blocks.has_blocks(&hashes).await?.into_iter().collect();
	debug!("[upload] {} distinct blocks, {} already stored", hashes.len(), present.len());

	for (hash, data) in &union {
		if present.contains(*hash) {
			continue;
		}
		let block = Block { hash: hash.to_string(), data: data.to_vec(), size: data.len() as u32 };
		if !blocks.put_block(&block).await? {
			// No metadata may reference a block the store did not keep
			return Err(ProtocolError::Server(format!("block store refused block {}", hash)));
		}
		result.blocks_uploaded += 1;
	}

	for task in tasks {
		let metadata = task.metadata();
		match meta.update_file(&metadata).await? {
			UpdateOutcome::Applied { version } => {
				info!("Uploaded {} (v{})", task.filename, version);
				result.applied.push(FileMetaData { version, ..metadata });
			}
			UpdateOutcome::Conflict { current_version } => {
				info!(
					"Version conflict on {}: sent v{}, registry holds v{}",
					task.filename, task.version, current_version
				);
				result.conflicts.push((task.filename.clone(), current_version));
			}
		}
	}

	Ok(result)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::block_store::BlockStore;
	use crate::chunking::chunk;
	use crate::meta_store::MetaStore;
	use async_trait::async_trait;

	/// Store that answers every write with `false`
	struct RefusingStore;

	#[async_trait]
	impl BlockStoreApi for RefusingStore {
		async fn get_block(&self, _hash: &str) -> ProtocolResult<Option<Block>> {
			Ok(None)
		}

		async fn put_block(&self, _block: &Block) -> ProtocolResult<bool> {
			Ok(false)
		}

		async fn has_blocks(&self, _hashes: &[String]) -> ProtocolResult<Vec<String>> {
			Ok(Vec::new())
		}
	}

	fn task(name: &str, version: u32, content: &[u8]) -> UploadTask {
		UploadTask { filename: name.to_string(), version, chunked: chunk(content, 4).unwrap() }
	}

	#[tokio::test]
	async fn test_empty_batch_touches_nothing() {
		let blocks = BlockStore::new();
		let meta = MetaStore::new("blocks");
		let result = upload_batch(&blocks, &meta, &[]).await.unwrap();
		assert!(result.applied.is_empty());
		assert!(blocks.is_empty().await);
	}

	#[tokio::test]
	async fn test_shared_blocks_uploaded_once() {
		let blocks = BlockStore::new();
		let meta = MetaStore::new("blocks");
		let tasks = vec![task("a.txt", 1, b"samesame"), task("b.txt", 1, b"same")];

		let result = upload_batch(&blocks, &meta, &tasks).await.unwrap();
		assert_eq!(result.applied.len(), 2);
		// "same" and the empty tail block
		assert_eq!(result.blocks_uploaded, 2);
		assert_eq!(blocks.len().await, 2);
	}

	#[tokio::test]
	async fn test_conflict_isolated_to_one_file() {
		let blocks = BlockStore::new();
		let meta = MetaStore::new("blocks");
		meta.update_file(&FileMetaData::new("a.txt", 3, vec!["x".into()])).await;

		let tasks = vec![task("a.txt", 1, b"local a"), task("b.txt", 1, b"local b")];
		let result = upload_batch(&blocks, &meta, &tasks).await.unwrap();

		assert_eq!(result.conflicts, vec![("a.txt".to_string(), 3)]);
		assert_eq!(result.applied.len(), 1);
		assert_eq!(result.applied[0].filename, "b.txt");
		assert_eq!(meta.get_file_info_map().await["a.txt"].version, 3);
	}

	#[tokio::test]
	async fn test_refused_block_stops_metadata_update() {
		let meta = MetaStore::new("blocks");
		let result = upload_batch(&RefusingStore, &meta, &[task("a.txt", 1, b"abcd")]).await;

		assert!(matches!(result, Err(ProtocolError::Server(_))));
		assert!(meta.get_file_info_map().await.is_empty());
	}

	#[tokio::test]
	async fn test_existing_blocks_not_reuploaded() {
		let blocks = BlockStore::new();
		let meta = MetaStore::new("blocks");
		upload_batch(&blocks, &meta, &[task("a.txt", 1, b"abcd")]).await.unwrap();

		let result = upload_batch(&blocks, &meta, &[task("b.txt", 1, b"abcd")]).await.unwrap();
		assert_eq!(result.blocks_uploaded, 0);
		assert_eq!(result.applied.len(), 1);
	}
}

// vim: ts=4
