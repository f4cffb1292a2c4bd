//! Applying remote state to the sync root

use std::collections::HashMap;
use std::io;
use std::path::Path;

use super::scan;
use crate::error::SyncError;
use crate::logging::*;
use crate::protocol::BlockStoreApi;
use crate::types::FileMetaData;

/// What happened to a file fetched from the block store
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
	/// Content written to the sync root
	Written { bytes: u64 },

	/// The store does not hold a referenced block; nothing was written
	MissingBlock { hash: String },
}

/// Fetch every block of `meta` and write the file into `base_dir`.
///
/// Each distinct hash is fetched once. The content goes to a sibling temp
/// file first and is renamed over the target.
pub async fn download_file(
	blocks: &dyn BlockStoreApi,
	base_dir: &Path,
	meta: &FileMetaData,
) -> Result<DownloadOutcome, SyncError> {
	let mut fetched: HashMap<&str, Vec<u8>> = HashMap::new();
	for hash in &meta.block_hash_list {
		if fetched.contains_key(hash.as_str()) {
			continue;
		}
		match blocks.get_block(hash).await? {
			Some(block) => {
				fetched.insert(hash.as_str(), block.data);
			}
			None => return Ok(DownloadOutcome::MissingBlock { hash: hash.clone() }),
		}
	}

	let mut content = Vec::new();
	for hash in &meta.block_hash_list {
		if let Some(data) = fetched.get(hash.as_str()) {
			content.extend_from_slice(data);
		}
	}

	let tmp_path = scan::temp_path(base_dir, &meta.filename);
	tokio::fs::write(&tmp_path, &content).await?;
	if let Err(e) = tokio::fs::rename(&tmp_path, base_dir.join(&meta.filename)).await {
		let _ = tokio::fs::remove_file(&tmp_path).await;
		return Err(e.into());
	}

	debug!("[download] Wrote {} ({} bytes)", meta.filename, content.len());
	Ok(DownloadOutcome::Written { bytes: content.len() as u64 })
}

/// Remove `name` from the sync root; `Ok(false)` when there was nothing to remove
pub async fn remove_local(base_dir: &Path, name: &str) -> Result<bool, SyncError> {
	let path = base_dir.join(name);
	match tokio::fs::symlink_metadata(&path).await {
		Ok(meta) if meta.is_dir() => {
			warn!("Not removing {}: it is a directory", path.display());
			Ok(false)
		}
		Ok(_) => match tokio::fs::remove_file(&path).await {
			Ok(()) => Ok(true),
			Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
			Err(e) => Err(e.into()),
		},
		Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
		Err(e) => Err(e.into()),
	}
}


// vim: ts=4
