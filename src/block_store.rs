//! Content-addressable block store
//!
//! Blocks are keyed by the hash of their bytes, so the same content is only
//! ever stored once. Every operation runs under a single store-wide lock.

use std::collections::BTreeMap;
use tokio::sync::Mutex;

use crate::logging::*;
use crate::types::Block;
use crate::util;

/// Hash-keyed blob repository shared by all connections of a server
#[derive(Debug, Default)]
pub struct BlockStore {
	blocks: Mutex<BTreeMap<String, Block>>,
}

impl BlockStore {
	pub fn new() -> Self {
		Self::default()
	}

	/// Stored block for `hash`, or `None` when absent.
	///
	/// A stored empty block is returned as `Some` with `size == 0`.
	pub async fn get_block(&self, hash: &str) -> Option<Block> {
		self.blocks.lock().await.get(hash).cloned()
	}

	/// Store `block` under the hash of its data.
	///
	/// The caller-supplied hash and size are ignored. An existing entry is
	/// overwritten; differing bytes under the same hash are logged as a
	/// collision. Always succeeds.
	pub async fn put_block(&self, block: &Block) -> bool {
		let hash = util::hash(&block.data);
		let stored = Block { hash: hash.clone(), data: block.data.clone(), size: block.data.len() as u32 };

		let mut blocks = self.blocks.lock().await;
		if let Some(existing) = blocks.get(&hash) {
			if existing.data == stored.data {
				debug!("[block_store] Block {} already present", hash);
			} else {
				warn!("[block_store] Hash collision on {}, overwriting", hash);
			}
		}
		blocks.insert(hash, stored);
		true
	}

	/// The subset of `hashes` currently stored, in input order
	pub async fn has_blocks(&self, hashes: &[String]) -> Vec<String> {
		let blocks = self.blocks.lock().await;
		hashes.iter().filter(|h| blocks.contains_key(h.as_str())).cloned().collect()
	}

	pub async fn len(&self) -> usize {
		self.blocks.lock().await.len()
	}

	pub async fn is_empty(&self) -> bool {
		self.blocks.lock().await.is_empty()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn test_put_then_get_round_trip() {
		let store = BlockStore::new();
		let block = Block::new(b"hello".to_vec());
		assert!(store.put_block(&block).await);

		let fetched = store.get_block(&util::hash(b"hello")).await.unwrap();
		assert_eq!(fetched.data, b"hello".to_vec());
		assert_eq!(fetched.size, 5);
	}

	#[tokio::test]
	async fn test_absent_block_is_none() {
		let store = BlockStore::new();
		assert!(store.get_block("deadbeef").await.is_none());
	}

	#[tokio::test]
	async fn test_empty_block_is_present() {
		let store = BlockStore::new();
		store.put_block(&Block::new(Vec::new())).await;
		let fetched = store.get_block(&util::hash(b"")).await.unwrap();
		assert_eq!(fetched.size, 0);
	}

	#[tokio::test]
	async fn test_put_ignores_claimed_hash() {
		let store = BlockStore::new();
		let block = Block { hash: "bogus".to_string(), data: b"abc".to_vec(), size: 99 };
		store.put_block(&block).await;

		assert!(store.get_block("bogus").await.is_none());
		let fetched = store.get_block(&util::hash(b"abc")).await.unwrap();
		assert_eq!(fetched.hash, util::hash(b"abc"));
		assert_eq!(fetched.size, 3);
	}

	#[tokio::test]
	async fn test_duplicate_put_stores_once() {
		let store = BlockStore::new();
		let block = Block::new(b"same".to_vec());
		assert!(store.put_block(&block).await);
		assert!(store.put_block(&block).await);
		assert_eq!(store.len().await, 1);
	}

	#[tokio::test]
	async fn test_has_blocks_returns_stored_subset() {
		let store = BlockStore::new();
		store.put_block(&Block::new(b"a".to_vec())).await;
		store.put_block(&Block::new(b"c".to_vec())).await;

		let query = vec![util::hash(b"a"), util::hash(b"b"), util::hash(b"c")];
		let present = store.has_blocks(&query).await;
		assert_eq!(present, vec![util::hash(b"a"), util::hash(b"c")]);
	}

	#[tokio::test]
	async fn test_has_blocks_empty_store() {
		let store = BlockStore::new();
		assert!(store.is_empty().await);
		assert!(store.has_blocks(&[util::hash(b"a")]).await.is_empty());
	}
}

// vim: ts=4
