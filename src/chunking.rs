//! Fixed-size content-addressed chunking

use std::collections::BTreeMap;
use std::path::Path;

use crate::error::ChunkError;
use crate::types::Block;
use crate::util;

/// Default block size in bytes
pub const DEFAULT_BLOCK_SIZE: usize = 4096;

/// A file split into blocks
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChunkedFile {
	/// Block hashes in file order; repeated content repeats its hash
	pub hashes: Vec<String>,

	/// Distinct block contents keyed by hash
	pub blocks: BTreeMap<String, Vec<u8>>,
}

impl ChunkedFile {
	/// Wire block for `hash`, if this file contains it
	pub fn block(&self, hash: &str) -> Option<Block> {
		self.blocks.get(hash).map(|data| Block {
			hash: hash.to_string(),
			data: data.clone(),
			size: data.len() as u32,
		})
	}
}

/// Split `data` into consecutive `block_size` segments.
///
/// The last segment is the remainder and may be empty: an empty input
/// yields one empty block, and an input of exactly `k * block_size` bytes
/// yields `k + 1` blocks.
pub fn chunk(data: &[u8], block_size: usize) -> Result<ChunkedFile, ChunkError> {
	validate_block_size(block_size)?;

	let mut chunked = ChunkedFile::default();
	let mut start = 0;
	while start + block_size <= data.len() {
		push_segment(&mut chunked, &data[start..start + block_size]);
		start += block_size;
	}
	push_segment(&mut chunked, &data[start..]);

	Ok(chunked)
}

/// Read `path` and chunk its contents
pub async fn chunk_file(path: &Path, block_size: usize) -> Result<ChunkedFile, ChunkError> {
	validate_block_size(block_size)?;
	let data = tokio::fs::read(path).await?;
	chunk(&data, block_size)
}

pub fn validate_block_size(block_size: usize) -> Result<(), ChunkError> {
	if block_size == 0 {
		return Err(ChunkError::InvalidConfig { message: "block size must be > 0".to_string() });
	}
	if block_size > u32::MAX as usize {
		return Err(ChunkError::InvalidConfig {
			message: format!("block size {} exceeds {}", block_size, u32::MAX),
		});
	}
	Ok(())
}

fn push_segment(chunked: &mut ChunkedFile, segment: &[u8]) {
	let hash = util::hash(segment);
	chunked.blocks.entry(hash.clone()).or_insert_with(|| segment.to_vec());
	chunked.hashes.push(hash);
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_hello_world_blocks() {
		let chunked = chunk(b"hello world", 4).unwrap();
		assert_eq!(
			chunked.hashes,
			vec![util::hash(b"hell"), util::hash(b"o wo"), util::hash(b"rld")]
		);
		assert_eq!(chunked.blocks[&util::hash(b"rld")], b"rld".to_vec());
	}

	#[test]
	fn test_exact_multiple_adds_empty_block() {
		let chunked = chunk(b"abcdefgh", 4).unwrap();
		assert_eq!(chunked.hashes.len(), 3);
		assert_eq!(chunked.hashes[2], util::hash(b""));
		assert!(chunked.blocks[&chunked.hashes[2]].is_empty());
	}

	#[test]
	fn test_empty_input_single_block() {
		let chunked = chunk(b"", 4).unwrap();
		assert_eq!(chunked.hashes, vec![util::hash(b"")]);
		assert_eq!(chunked.blocks.len(), 1);
	}

	#[test]
	fn test_short_input_single_block() {
		let chunked = chunk(b"abc", 4096).unwrap();
		assert_eq!(chunked.hashes.len(), 1);
	}

	#[test]
	fn test_repeated_segments_deduplicated() {
		let chunked = chunk(b"abababab!", 2).unwrap();
		assert_eq!(chunked.hashes.len(), 5);
		// "ab" and "!"
		assert_eq!(chunked.blocks.len(), 2);
	}

	#[test]
	fn test_chunking_deterministic() {
		let content = b"This is test content that will be chunked. ".repeat(100);
		assert_eq!(chunk(&content, 64).unwrap(), chunk(&content, 64).unwrap());
	}

	#[test]
	fn test_zero_block_size_rejected() {
		assert!(matches!(chunk(b"abc", 0), Err(ChunkError::InvalidConfig { .. })));
	}

	#[test]
	fn test_block_lookup() {
		let chunked = chunk(b"hello world", 4).unwrap();
		let block = chunked.block(&util::hash(b"o wo")).unwrap();
		assert_eq!(block.data, b"o wo".to_vec());
		assert_eq!(block.size, 4);
		assert!(chunked.block("missing").is_none());
	}

	#[tokio::test]
	async fn test_chunk_file_reads_contents() {
		let dir = tempfile::TempDir::new().unwrap();
		let path = dir.path().join("a.txt");
		std::fs::write(&path, b"hello world").unwrap();
		let chunked = chunk_file(&path, 4).await.unwrap();
		assert_eq!(chunked.hashes.len(), 3);
	}
}

// vim: ts=4
