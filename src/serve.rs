//! TCP server hosting the block store, the metadata registry, or both
//!
//! Every accepted connection gets its own task. A connection carries any
//! number of newline-delimited requests, answered in order.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};

use crate::block_store::BlockStore;
use crate::logging::*;
use crate::meta_store::MetaStore;
use crate::protocol::{Request, Response};

/// Routes requests to whichever stores this server hosts
#[derive(Debug, Clone, Default)]
pub struct ServiceHandler {
	blocks: Option<Arc<BlockStore>>,
	meta: Option<Arc<MetaStore>>,
}

impl ServiceHandler {
	pub fn new(blocks: Option<Arc<BlockStore>>, meta: Option<Arc<MetaStore>>) -> Self {
		ServiceHandler { blocks, meta }
	}

	pub fn block_store(blocks: Arc<BlockStore>) -> Self {
		ServiceHandler { blocks: Some(blocks), meta: None }
	}

	pub fn meta_store(meta: Arc<MetaStore>) -> Self {
		ServiceHandler { blocks: None, meta: Some(meta) }
	}

	pub async fn handle(&self, request: Request) -> Response {
		match request {
			Request::GetBlock { hash } => match &self.blocks {
				Some(blocks) => Response::Block { block: blocks.get_block(&hash).await },
				None => not_hosted("block store"),
			},
			Request::PutBlock { block } => match &self.blocks {
				Some(blocks) => Response::Success { flag: blocks.put_block(&block).await },
				None => not_hosted("block store"),
			},
			Request::HasBlocks { hashes } => match &self.blocks {
				Some(blocks) => Response::Hashes { hashes: blocks.has_blocks(&hashes).await },
				None => not_hosted("block store"),
			},
			Request::GetFileInfoMap => match &self.meta {
				Some(meta) => Response::FileInfoMap { files: meta.get_file_info_map().await },
				None => not_hosted("metadata store"),
			},
			Request::UpdateFile { meta: file } => match &self.meta {
				Some(meta) => meta.update_file(&file).await.into(),
				None => not_hosted("metadata store"),
			},
			Request::GetBlockStoreAddr => match &self.meta {
				Some(meta) => Response::Addr { addr: meta.get_block_store_addr() },
				None => not_hosted("metadata store"),
			},
		}
	}
}

fn not_hosted(what: &str) -> Response {
	Response::Error { message: format!("this server does not host a {}", what) }
}

/// Accept connections until `shutdown` resolves
pub async fn serve<F>(listener: TcpListener, handler: ServiceHandler, shutdown: F) -> std::io::Result<()>
where
	F: Future<Output = ()>,
{
	let local_addr = listener.local_addr()?;
	info!("Listening on {}", local_addr);
	tokio::pin!(shutdown);

	loop {
		tokio::select! {
			_ = &mut shutdown => {
				info!("Shutting down server on {}", local_addr);
				return Ok(());
			}
			accepted = listener.accept() => {
				let (stream, peer) = match accepted {
					Ok(conn) => conn,
					Err(e) => {
						warn!("Accept failed on {}: {}", local_addr, e);
						continue;
					}
				};
				let handler = handler.clone();
				tokio::spawn(async move {
					if let Err(e) = handle_connection(stream, peer, handler).await {
						debug!("[serve] Connection from {} ended: {}", peer, e);
					}
				});
			}
		}
	}
}

/// Bind `addr` and serve until `shutdown` resolves
pub async fn bind_and_serve<F>(addr: &str, handler: ServiceHandler, shutdown: F) -> std::io::Result<()>
where
	F: Future<Output = ()>,
{
	let listener = TcpListener::bind(addr).await?;
	serve(listener, handler, shutdown).await
}

async fn handle_connection(
	stream: TcpStream,
	peer: SocketAddr,
	handler: ServiceHandler,
) -> std::io::Result<()> {
	let (read_half, mut write_half) = stream.into_split();
	let mut recv = BufReader::new(read_half);
	let mut buf = String::new();

	loop {
		buf.clear();
		if recv.read_line(&mut buf).await? == 0 {
			return Ok(());
		}
		let trimmed = buf.trim();
		if trimmed.is_empty() {
			continue;
		}

		let response = match serde_json::from_str::<Request>(trimmed) {
			Ok(request) => {
				debug!("[serve] {} from {}", request.name(), peer);
				handler.handle(request).await
			}
			Err(e) => {
				warn!("[serve] Malformed request from {}: {}", peer, e);
				Response::Error { message: format!("malformed request: {}", e) }
			}
		};

		let mut line = serde_json::to_string(&response)
			.map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
		line.push('\n');
		write_half.write_all(line.as_bytes()).await?;
		write_half.flush().await?;
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::types::{Block, FileMetaData};
	use crate::util;

	#[tokio::test]
	async fn test_handler_routes_block_ops() {
		let handler = ServiceHandler::block_store(Arc::new(BlockStore::new()));
		let resp = handler.handle(Request::PutBlock { block: Block::new(b"abc".to_vec()) }).await;
		assert_eq!(resp, Response::Success { flag: true });

		let resp = handler.handle(Request::HasBlocks { hashes: vec![util::hash(b"abc")] }).await;
		assert_eq!(resp, Response::Hashes { hashes: vec![util::hash(b"abc")] });
	}

	#[tokio::test]
	async fn test_handler_reports_conflict() {
		let handler = ServiceHandler::meta_store(Arc::new(MetaStore::new("blocks:1")));
		let meta = FileMetaData::new("a.txt", 1, vec!["h".into()]);
		assert_eq!(
			handler.handle(Request::UpdateFile { meta: meta.clone() }).await,
			Response::Version { version: 1 }
		);
		assert_eq!(
			handler.handle(Request::UpdateFile { meta }).await,
			Response::Conflict { current_version: 1 }
		);
	}

	#[tokio::test]
	async fn test_handler_rejects_unhosted_store() {
		let handler = ServiceHandler::meta_store(Arc::new(MetaStore::new("blocks:1")));
		let resp = handler.handle(Request::GetBlock { hash: "x".into() }).await;
		assert!(matches!(resp, Response::Error { .. }));

		let handler = ServiceHandler::block_store(Arc::new(BlockStore::new()));
		let resp = handler.handle(Request::GetBlockStoreAddr).await;
		assert!(matches!(resp, Response::Error { .. }));
	}
}

// vim: ts=4
