//! Client-side reconciliation
//!
//! A sync cycle compares three views of the sync root: a fresh scan of the
//! directory, the Local Index written by the previous cycle, and the
//! registry's snapshot. It runs four phases strictly in order:
//!
//! 1. push tombstones for files deleted locally,
//! 2. upload files the index has never seen,
//! 3. upload files modified since the last cycle, unless the registry moved
//!    on in the meantime (the remote copy then wins in phase 4),
//! 4. refetch the registry and apply every newer remote record locally.
//!
//! The Local Index is written once, after phase 4. Version conflicts are
//! absorbed here; transport failures abort the cycle without touching the
//! index.
//!
//! ```rust,ignore
//! let report = blocksync::sync::sync(&config).await?;
//! println!("{}", report);
//! ```

pub mod download;
pub mod scan;
pub mod upload;

use std::collections::BTreeSet;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use self::download::DownloadOutcome;
use self::scan::ScanResult;
use self::upload::{UploadResult, UploadTask};
use crate::chunking;
use crate::config::Config;
use crate::error::{ChunkError, SyncError};
use crate::index::{IndexManager, LocalIndex};
use crate::logging::*;
use crate::protocol::{BlockStoreApi, MetaStoreApi, RemoteBlockStore, RemoteMetaStore};
use crate::types::{FileInfoMap, FileMetaData, UpdateOutcome};

/// Counters describing one sync cycle
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
	/// Files whose new content the registry accepted
	pub uploaded: usize,
	/// Tombstones the registry accepted for local deletions
	pub remote_deleted: usize,
	/// Files written from the block store
	pub downloaded: usize,
	/// Files removed because the registry holds a tombstone
	pub local_deleted: usize,
	/// Registry updates rejected with a version conflict
	pub conflicts: usize,
	/// Local edits not pushed because the registry had moved on
	pub deferred: usize,
	/// Files skipped (unreadable, invalid name, missing block)
	pub failed: usize,
	/// Blocks sent to the block store
	pub blocks_uploaded: usize,
}

impl SyncReport {
	/// True when the cycle observed no change in any phase
	pub fn is_noop(&self) -> bool {
		*self == SyncReport::default()
	}

	fn absorb_upload(&mut self, result: &UploadResult, index: &mut LocalIndex) {
		self.uploaded += result.applied.len();
		self.conflicts += result.conflicts.len();
		self.blocks_uploaded += result.blocks_uploaded;
		for meta in &result.applied {
			index.record(meta.clone());
		}
	}
}

impl fmt::Display for SyncReport {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(
			f,
			"{} uploaded, {} deleted remotely, {} downloaded, {} deleted locally, \
			 {} conflicts, {} deferred, {} failed ({} blocks sent)",
			self.uploaded,
			self.remote_deleted,
			self.downloaded,
			self.local_deleted,
			self.conflicts,
			self.deferred,
			self.failed,
			self.blocks_uploaded
		)
	}
}

/// Synchronizes one directory against a registry and block store
pub struct SyncClient {
	base_dir: PathBuf,
	block_size: usize,
	meta: Arc<dyn MetaStoreApi>,
	blocks: Arc<dyn BlockStoreApi>,
	index: IndexManager,
}

impl SyncClient {
	pub fn new(
		base_dir: impl Into<PathBuf>,
		block_size: usize,
		meta: Arc<dyn MetaStoreApi>,
		blocks: Arc<dyn BlockStoreApi>,
	) -> Self {
		let base_dir = base_dir.into();
		SyncClient { index: IndexManager::new(base_dir.clone()), base_dir, block_size, meta, blocks }
	}

	/// Connect to the configured registry and the block store it advertises
	pub async fn connect(config: &Config) -> Result<Self, SyncError> {
		config.validate()?;

		let meta = RemoteMetaStore::new(config.meta_store_addr.clone(), config.rpc_timeout());
		let block_addr = meta.get_block_store_addr().await?;
		info!("Registry {} uses block store {}", config.meta_store_addr, block_addr);
		let blocks = RemoteBlockStore::new(block_addr, config.rpc_timeout());

		Ok(SyncClient::new(config.base_dir.clone(), config.block_size, Arc::new(meta), Arc::new(blocks)))
	}

	pub fn base_dir(&self) -> &Path {
		&self.base_dir
	}

	/// Run one full cycle
	pub async fn sync(&self) -> Result<SyncReport, SyncError> {
		chunking::validate_block_size(self.block_size)?;

		info!("Scanning {}...", self.base_dir.display());
		let scanned = scan::scan_directory(&self.base_dir, self.block_size).await?;
		let mut index = self.index.load().await?;
		let remote = self.meta.get_file_info_map().await?;
		info!(
			"{} files on disk, {} in local index, {} in registry",
			scanned.files.len(),
			index.len(),
			remote.len()
		);

		let mut report = SyncReport::default();
		if !scanned.unreadable.is_empty() {
			warn!("{} unreadable files left untouched this cycle", scanned.unreadable.len());
			report.failed += scanned.unreadable.len();
		}
		let previously_known: BTreeSet<String> = index.files.keys().cloned().collect();

		self.push_local_deletions(&scanned, &mut index, &mut report).await?;
		self.upload_new_files(&scanned.files, &mut index, &mut report).await?;
		self.upload_modified_files(&scanned.files, &previously_known, &remote, &mut index, &mut report)
			.await?;
		self.apply_remote_changes(&mut index, &mut report).await?;

		self.index.save(&index).await?;
		info!("Sync complete: {}", report);
		Ok(report)
	}

	/// Phase 1: tombstone every indexed file that vanished from disk.
	/// Files that exist but could not be read are not deletions.
	async fn push_local_deletions(
		&self,
		scanned: &ScanResult,
		index: &mut LocalIndex,
		report: &mut SyncReport,
	) -> Result<(), SyncError> {
		let mut deletions = Vec::new();
		for local in index.files.values() {
			if local.is_tombstone()
				|| scanned.files.contains_key(&local.filename)
				|| scanned.unreadable.contains(&local.filename)
			{
				continue;
			}
			match next_version(local) {
				Some(version) => deletions.push(FileMetaData::tombstone(local.filename.clone(), version)),
				None => report.failed += 1,
			}
		}
		if deletions.is_empty() {
			return Ok(());
		}

		info!("Phase 1: {} local deletions", deletions.len());
		for tombstone in deletions {
			match self.meta.update_file(&tombstone).await? {
				UpdateOutcome::Applied { version } => {
					info!("Deleted {} remotely (v{})", tombstone.filename, version);
					report.remote_deleted += 1;
					index.record(FileMetaData { version, ..tombstone });
				}
				UpdateOutcome::Conflict { current_version } => {
					info!(
						"Deletion of {} lost to remote v{}, restoring",
						tombstone.filename, current_version
					);
					report.conflicts += 1;
				}
			}
		}
		Ok(())
	}

	/// Phase 2: files on disk the index has never seen, at version 1
	async fn upload_new_files(
		&self,
		scanned: &FileInfoMap,
		index: &mut LocalIndex,
		report: &mut SyncReport,
	) -> Result<(), SyncError> {
		let mut tasks = Vec::new();
		for name in scanned.keys().filter(|name| !index.contains(name.as_str())) {
			if let Some(task) = self.prepare_upload(name, 1, report).await? {
				tasks.push(task);
			}
		}
		if tasks.is_empty() {
			return Ok(());
		}

		info!("Phase 2: {} new files", tasks.len());
		let result = upload::upload_batch(self.blocks.as_ref(), self.meta.as_ref(), &tasks).await?;
		report.absorb_upload(&result, index);
		Ok(())
	}

	/// Phase 3: indexed files whose content changed on disk
	async fn upload_modified_files(
		&self,
		scanned: &FileInfoMap,
		previously_known: &BTreeSet<String>,
		remote: &FileInfoMap,
		index: &mut LocalIndex,
		report: &mut SyncReport,
	) -> Result<(), SyncError> {
		let mut tasks = Vec::new();
		for name in previously_known {
			let (current, local) = match (scanned.get(name), index.get(name)) {
				(Some(current), Some(local)) => (current, local),
				_ => continue,
			};
			if current.block_hash_list == local.block_hash_list {
				continue;
			}

			if let Some(remote_meta) = remote.get(name) {
				if remote_meta.version != local.version {
					info!(
						"{} changed locally but registry is at v{} (local v{}), remote copy wins",
						name, remote_meta.version, local.version
					);
					report.deferred += 1;
					continue;
				}
			}

			let version = match next_version(local) {
				Some(version) => version,
				None => {
					report.failed += 1;
					continue;
				}
			};
			if let Some(task) = self.prepare_upload(name, version, report).await? {
				tasks.push(task);
			}
		}
		if tasks.is_empty() {
			return Ok(());
		}

		info!("Phase 3: {} modified files", tasks.len());
		let result = upload::upload_batch(self.blocks.as_ref(), self.meta.as_ref(), &tasks).await?;
		report.absorb_upload(&result, index);
		Ok(())
	}

	/// Phase 4: materialize every registry record newer than the index
	async fn apply_remote_changes(
		&self,
		index: &mut LocalIndex,
		report: &mut SyncReport,
	) -> Result<(), SyncError> {
		let remote = self.meta.get_file_info_map().await?;

		for (name, remote_meta) in &remote {
			if let Some(local) = index.get(name) {
				if local.version >= remote_meta.version {
					continue;
				}
			}
			if !scan::is_valid_filename(name) {
				warn!("Refusing to materialize registry entry {:?}: invalid file name", name);
				report.failed += 1;
				continue;
			}

			if remote_meta.is_tombstone() {
				match download::remove_local(&self.base_dir, name).await {
					Ok(removed) => {
						if removed {
							info!("Deleted {} locally (remote v{})", name, remote_meta.version);
							report.local_deleted += 1;
						}
						index.record(remote_meta.clone());
					}
					Err(e) => {
						warn!("Cannot delete {}: {}", name, e);
						report.failed += 1;
					}
				}
				continue;
			}

			let outcome =
				match download::download_file(self.blocks.as_ref(), &self.base_dir, remote_meta).await {
					Ok(outcome) => outcome,
					Err(e) if e.is_transport() => return Err(e),
					Err(e) => {
						warn!("Cannot write {}: {}", name, e);
						report.failed += 1;
						continue;
					}
				};
			match outcome {
				DownloadOutcome::Written { bytes } => {
					info!("Downloaded {} (v{}, {} bytes)", name, remote_meta.version, bytes);
					report.downloaded += 1;
					index.record(remote_meta.clone());
				}
				DownloadOutcome::MissingBlock { hash } => {
					warn!("Block {} of {} is not in the block store, skipping", hash, name);
					report.failed += 1;
				}
			}
		}
		Ok(())
	}

	/// Chunk `name` for upload; unreadable files are skipped and counted
	async fn prepare_upload(
		&self,
		name: &str,
		version: u32,
		report: &mut SyncReport,
	) -> Result<Option<UploadTask>, SyncError> {
		match chunking::chunk_file(&self.base_dir.join(name), self.block_size).await {
			Ok(chunked) => {
				Ok(Some(UploadTask { filename: name.to_string(), version, chunked }))
			}
			Err(ChunkError::ReadFailed { source }) if source.kind() == io::ErrorKind::NotFound => {
				warn!("{} disappeared before upload, skipping", name);
				report.failed += 1;
				Ok(None)
			}
			Err(ChunkError::ReadFailed { source }) => {
				warn!("Cannot read {}: {}", name, source);
				report.failed += 1;
				Ok(None)
			}
			Err(e) => Err(e.into()),
		}
	}
}

/// Version for the next local change to `local`; `None` once the counter is exhausted
fn next_version(local: &FileMetaData) -> Option<u32> {
	let next = local.version.checked_add(1);
	if next.is_none() {
		warn!(
			"{} is at the highest version (v{}), not pushing local change",
			local.filename, local.version
		);
	}
	next
}

/// Connect using `config` and run one cycle
pub async fn sync(config: &Config) -> Result<SyncReport, SyncError> {
	SyncClient::connect(config).await?.sync().await
}

// vim: ts=4
