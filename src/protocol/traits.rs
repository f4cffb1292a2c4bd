//! Service traits the sync engine calls
//!
//! The engine depends only on these traits. They are implemented by the
//! in-process stores (calls never fail) and by the TCP clients in
//! `protocol::client`.

use async_trait::async_trait;

use super::error::ProtocolError;
use crate::block_store::BlockStore;
use crate::meta_store::MetaStore;
use crate::types::{Block, FileInfoMap, FileMetaData, UpdateOutcome};

/// Result type for remote operations
pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Block store operations
#[async_trait]
pub trait BlockStoreApi: Send + Sync {
	/// Fetch a block; `None` when it is not stored
	async fn get_block(&self, hash: &str) -> ProtocolResult<Option<Block>>;

	/// Store a block under the hash of its data
	async fn put_block(&self, block: &Block) -> ProtocolResult<bool>;

	/// Subset of `hashes` that are stored
	async fn has_blocks(&self, hashes: &[String]) -> ProtocolResult<Vec<String>>;
}

/// Metadata registry operations
#[async_trait]
pub trait MetaStoreApi: Send + Sync {
	async fn get_file_info_map(&self) -> ProtocolResult<FileInfoMap>;

	/// Compare-and-set update; a version conflict is an `Ok` outcome
	async fn update_file(&self, meta: &FileMetaData) -> ProtocolResult<UpdateOutcome>;

	async fn get_block_store_addr(&self) -> ProtocolResult<String>;
}

#[async_trait]
impl BlockStoreApi for BlockStore {
	async fn get_block(&self, hash: &str) -> ProtocolResult<Option<Block>> {
		Ok(BlockStore::get_block(self, hash).await)
	}

	async fn put_block(&self, block: &Block) -> ProtocolResult<bool> {
		Ok(BlockStore::put_block(self, block).await)
	}

	async fn has_blocks(&self, hashes: &[String]) -> ProtocolResult<Vec<String>> {
		Ok(BlockStore::has_blocks(self, hashes).await)
	}
}

#[async_trait]
impl MetaStoreApi for MetaStore {
	async fn get_file_info_map(&self) -> ProtocolResult<FileInfoMap> {
		Ok(MetaStore::get_file_info_map(self).await)
	}

	async fn update_file(&self, meta: &FileMetaData) -> ProtocolResult<UpdateOutcome> {
		Ok(MetaStore::update_file(self, meta).await)
	}

	async fn get_block_store_addr(&self) -> ProtocolResult<String> {
		Ok(MetaStore::get_block_store_addr(self))
	}
}

// vim: ts=4
