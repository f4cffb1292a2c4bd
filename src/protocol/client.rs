//! TCP client shim for the block store and metadata registry
//!
//! Each call opens a connection, writes one request line, reads one
//! response line and closes. The whole exchange is bounded by a single
//! timeout.

use async_trait::async_trait;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

use super::error::ProtocolError;
use super::messages::{Request, Response};
use super::traits::*;
use crate::logging::*;
use crate::types::{Block, FileInfoMap, FileMetaData, UpdateOutcome};

/// Default bound on a single remote call
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(1);

/// Request/response connection to one server address
#[derive(Debug, Clone)]
pub struct RpcClient {
	addr: String,
	timeout: Duration,
}

impl RpcClient {
	pub fn new(addr: impl Into<String>, timeout: Duration) -> Self {
		RpcClient { addr: addr.into(), timeout }
	}

	pub fn addr(&self) -> &str {
		&self.addr
	}

	/// Perform one call; error responses become `ProtocolError::Server`
	pub async fn call(&self, request: &Request) -> ProtocolResult<Response> {
		let operation = request.name();
		debug!("[rpc] {} -> {}", operation, self.addr);

		let response = tokio::time::timeout(self.timeout, self.exchange(request))
			.await
			.map_err(|_| ProtocolError::Timeout { operation: operation.to_string() })??;

		match response {
			Response::Error { message } => Err(ProtocolError::Server(message)),
			other => Ok(other),
		}
	}

	async fn exchange(&self, request: &Request) -> ProtocolResult<Response> {
		let stream = TcpStream::connect(&self.addr)
			.await
			.map_err(|e| ProtocolError::Connect { addr: self.addr.clone(), source: e })?;
		let (read_half, mut write_half) = stream.into_split();

		let mut line = serde_json::to_string(request)?;
		line.push('\n');
		write_half.write_all(line.as_bytes()).await?;
		write_half.flush().await?;

		let mut recv = BufReader::new(read_half);
		let mut buf = String::new();
		if recv.read_line(&mut buf).await? == 0 {
			return Err(ProtocolError::Disconnected);
		}
		Ok(serde_json::from_str(buf.trim_end())?)
	}
}

fn unexpected(operation: &str, response: &Response) -> ProtocolError {
	ProtocolError::UnexpectedResponse {
		operation: operation.to_string(),
		got: response.kind().to_string(),
	}
}

/// Block store reached over TCP
#[derive(Debug, Clone)]
pub struct RemoteBlockStore {
	client: RpcClient,
}

impl RemoteBlockStore {
	pub fn new(addr: impl Into<String>, timeout: Duration) -> Self {
		RemoteBlockStore { client: RpcClient::new(addr, timeout) }
	}
}

#[async_trait]
impl BlockStoreApi for RemoteBlockStore {
	async fn get_block(&self, hash: &str) -> ProtocolResult<Option<Block>> {
		match self.client.call(&Request::GetBlock { hash: hash.to_string() }).await? {
			Response::Block { block } => Ok(block),
			other => Err(unexpected("getBlock", &other)),
		}
	}

	async fn put_block(&self, block: &Block) -> ProtocolResult<bool> {
		match self.client.call(&Request::PutBlock { block: block.clone() }).await? {
			Response::Success { flag } => Ok(flag),
			other => Err(unexpected("putBlock", &other)),
		}
	}

	async fn has_blocks(&self, hashes: &[String]) -> ProtocolResult<Vec<String>> {
		match self.client.call(&Request::HasBlocks { hashes: hashes.to_vec() }).await? {
			Response::Hashes { hashes } => Ok(hashes),
			other => Err(unexpected("hasBlocks", &other)),
		}
	}
}

/// Metadata registry reached over TCP
#[derive(Debug, Clone)]
pub struct RemoteMetaStore {
	client: RpcClient,
}

impl RemoteMetaStore {
	pub fn new(addr: impl Into<String>, timeout: Duration) -> Self {
		RemoteMetaStore { client: RpcClient::new(addr, timeout) }
	}
}

#[async_trait]
impl MetaStoreApi for RemoteMetaStore {
	async fn get_file_info_map(&self) -> ProtocolResult<FileInfoMap> {
		match self.client.call(&Request::GetFileInfoMap).await? {
			Response::FileInfoMap { files } => Ok(files),
			other => Err(unexpected("getFileInfoMap", &other)),
		}
	}

	async fn update_file(&self, meta: &FileMetaData) -> ProtocolResult<UpdateOutcome> {
		match self.client.call(&Request::UpdateFile { meta: meta.clone() }).await? {
			Response::Version { version } => Ok(UpdateOutcome::Applied { version }),
			Response::Conflict { current_version } => {
				Ok(UpdateOutcome::Conflict { current_version })
			}
			other => Err(unexpected("updateFile", &other)),
		}
	}

	async fn get_block_store_addr(&self) -> ProtocolResult<String> {
		match self.client.call(&Request::GetBlockStoreAddr).await? {
			Response::Addr { addr } => Ok(addr),
			other => Err(unexpected("getBlockStoreAddr", &other)),
		}
	}
}

// vim: ts=4
