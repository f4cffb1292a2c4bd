//! Directory scan and sync-root naming rules
//!
//! The namespace is flat: only regular files directly inside the sync root
//! take part. Subdirectories, the Local Index and in-flight download temp
//! files are skipped.

use std::collections::BTreeSet;
use std::io;
use std::path::{Path, PathBuf};

use crate::chunking;
use crate::error::{ChunkError, SyncError};
use crate::index;
use crate::logging::*;
use crate::types::{FileInfoMap, FileMetaData};

/// Suffix of temp files written while materializing downloads
pub const TMP_SUFFIX: &str = ".blocksync-tmp";

/// What a scan found in the sync root
#[derive(Debug, Default)]
pub struct ScanResult {
	/// Readable regular files, each provisionally at version 1
	pub files: FileInfoMap,

	/// Entries present on disk whose content could not be read.
	/// They are neither uploaded nor treated as deleted.
	pub unreadable: BTreeSet<String>,
}

/// Chunk every regular file in `base_dir`
pub async fn scan_directory(base_dir: &Path, block_size: usize) -> Result<ScanResult, SyncError> {
	let mut result = ScanResult::default();
	let mut entries = tokio::fs::read_dir(base_dir).await?;

	while let Some(entry) = entries.next_entry().await? {
		let name = match entry.file_name().into_string() {
			Ok(name) => name,
			Err(raw) => {
				warn!("Skipping non-UTF-8 file name {:?}", raw);
				continue;
			}
		};
		if index::is_index_file(&name) || is_temp_file(&name) {
			continue;
		}

		let path = entry.path();
		// Follows symlinks
		let meta = match tokio::fs::metadata(&path).await {
			Ok(m) => m,
			Err(e) if e.kind() == io::ErrorKind::NotFound => {
				debug!("[scan] {} vanished or dangles, skipping", name);
				continue;
			}
			Err(e) => {
				warn!("Cannot access {}: {}", path.display(), e);
				result.unreadable.insert(name);
				continue;
			}
		};
		if !meta.is_file() {
			debug!("[scan] Skipping {}: not a regular file", name);
			continue;
		}

		match chunking::chunk_file(&path, block_size).await {
			Ok(chunked) => {
				debug!("[scan] {}: {} blocks", name, chunked.hashes.len());
				result.files.insert(name.clone(), FileMetaData::new(name, 1, chunked.hashes));
			}
			Err(ChunkError::ReadFailed { source }) if source.kind() == io::ErrorKind::NotFound => {
				debug!("[scan] {} vanished while reading, skipping", name);
			}
			Err(ChunkError::ReadFailed { source }) => {
				warn!("Cannot read {}: {}", path.display(), source);
				result.unreadable.insert(name);
			}
			Err(e) => return Err(e.into()),
		}
	}

	Ok(result)
}

/// Whether a registry filename can be materialized inside the sync root
pub fn is_valid_filename(name: &str) -> bool {
	!name.is_empty()
		&& name != "."
		&& name != ".."
		&& !name.contains('/')
		&& !name.contains('\\')
		&& !name.contains('\0')
		&& !index::is_index_file(name)
		&& !is_temp_file(name)
}

pub fn is_temp_file(name: &str) -> bool {
	name.ends_with(TMP_SUFFIX)
}

/// Sibling temp path used while writing `name`
pub fn temp_path(base_dir: &Path, name: &str) -> PathBuf {
	base_dir.join(format!(".{}{}", name, TMP_SUFFIX))
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::index::INDEX_FILENAME;
	use crate::util;
	use tempfile::TempDir;

	#[tokio::test]
	async fn test_scan_is_flat_and_skips_index() {
		let dir = TempDir::new().unwrap();
		std::fs::write(dir.path().join("a.txt"), b"hello world").unwrap();
		std::fs::write(dir.path().join(INDEX_FILENAME), b"{}").unwrap();
		std::fs::write(temp_path(dir.path(), "b.txt"), b"partial").unwrap();
		std::fs::create_dir(dir.path().join("sub")).unwrap();
		std::fs::write(dir.path().join("sub").join("c.txt"), b"nested").unwrap();

		let scan = scan_directory(dir.path(), 4).await.unwrap();
		assert_eq!(scan.files.keys().collect::<Vec<_>>(), vec!["a.txt"]);
		assert!(scan.unreadable.is_empty());

		let meta = &scan.files["a.txt"];
		assert_eq!(meta.version, 1);
		assert_eq!(
			meta.block_hash_list,
			vec![util::hash(b"hell"), util::hash(b"o wo"), util::hash(b"rld")]
		);
	}

	#[cfg(unix)]
	#[tokio::test]
	async fn test_scan_reports_unreadable_entries() {
		let dir = TempDir::new().unwrap();
		std::fs::write(dir.path().join("a.txt"), b"fine").unwrap();
		// Resolving a self-referencing link fails even for root
		std::os::unix::fs::symlink("loop.txt", dir.path().join("loop.txt")).unwrap();
		std::os::unix::fs::symlink("nowhere.txt", dir.path().join("dangling.txt")).unwrap();

		let scan = scan_directory(dir.path(), 4).await.unwrap();
		assert_eq!(scan.files.keys().collect::<Vec<_>>(), vec!["a.txt"]);
		assert_eq!(scan.unreadable.iter().collect::<Vec<_>>(), vec!["loop.txt"]);
	}

	#[tokio::test]
	async fn test_scan_missing_dir_is_error() {
		let dir = TempDir::new().unwrap();
		let result = scan_directory(&dir.path().join("nope"), 4).await;
		assert!(matches!(result, Err(SyncError::Io(_))));
	}

	#[test]
	fn test_filename_validation() {
		assert!(is_valid_filename("a.txt"));
		assert!(is_valid_filename(".hidden"));
		assert!(!is_valid_filename(""));
		assert!(!is_valid_filename(".."));
		assert!(!is_valid_filename("../etc/passwd"));
		assert!(!is_valid_filename("dir/file"));
		assert!(!is_valid_filename(INDEX_FILENAME));
		assert!(!is_valid_filename("x.blocksync-tmp"));
	}
}

// vim: ts=4
