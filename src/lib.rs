//! # blocksync - Content-Addressed File Synchronization
//!
//! blocksync keeps a flat directory in step with a versioned registry of
//! file metadata. File content is split into fixed-size blocks stored by
//! hash, so identical content is transferred and stored once.
//!
//! The pieces:
//!
//! - [`block_store::BlockStore`]: hash-keyed blob repository
//! - [`meta_store::MetaStore`]: filename -> version + block list, updated by
//!   compare-and-set on the version
//! - [`sync::SyncClient`]: the four-phase reconciliation between disk, the
//!   Local Index and the registry
//! - [`serve`] and [`protocol`]: line-delimited JSON over TCP
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use blocksync::config::Config;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut config = Config::default();
//!     config.base_dir = "./shared".into();
//!     let report = blocksync::sync::sync(&config).await?;
//!     println!("{}", report);
//!     Ok(())
//! }
//! ```
//!
//! ## In-process stores
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use blocksync::{BlockStore, MetaStore, SyncClient};
//!
//! let blocks = Arc::new(BlockStore::new());
//! let meta = Arc::new(MetaStore::new("in-process"));
//! let client = SyncClient::new("./shared", 4096, meta, blocks);
//! let report = client.sync().await?;
//! ```

pub mod block_store;
pub mod chunking;
pub mod config;
pub mod error;
pub mod index;
pub mod logging;
pub mod meta_store;
pub mod protocol;
pub mod serve;
pub mod sync;
pub mod types;
pub mod util;

// Re-export commonly used types and functions
pub use block_store::BlockStore;
pub use config::Config;
pub use error::{ChunkError, StateError, SyncError};
pub use meta_store::MetaStore;
pub use protocol::ProtocolError;
pub use sync::{SyncClient, SyncReport};
pub use types::{Block, FileInfoMap, FileMetaData, UpdateOutcome, TOMBSTONE_HASH};

// vim: ts=4
