//! RPC surface between the sync client and the stores
//!
//! The sync engine depends only on the [`BlockStoreApi`] and
//! [`MetaStoreApi`] traits. The stores implement them directly for
//! in-process use; [`RemoteBlockStore`] and [`RemoteMetaStore`] implement
//! them over a line-delimited JSON protocol on TCP.
//!
//! # Example Usage
//!
//! ```ignore
//! use blocksync::protocol::{MetaStoreApi, RemoteMetaStore};
//!
//! let meta = RemoteMetaStore::new("127.0.0.1:8080", std::time::Duration::from_secs(1));
//! let files = meta.get_file_info_map().await?;
//! ```

pub mod client;
pub mod error;
pub mod messages;
pub mod traits;

pub use client::{RemoteBlockStore, RemoteMetaStore, RpcClient};
pub use error::ProtocolError;
pub use messages::{Request, Response};
pub use traits::{BlockStoreApi, MetaStoreApi, ProtocolResult};

// vim: ts=4
