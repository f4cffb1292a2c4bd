//! Wire message types
//!
//! One JSON object per line in each direction. Requests are tagged by
//! `op`, responses by `type`.

use serde::{Deserialize, Serialize};

use crate::types::{Block, FileInfoMap, FileMetaData, UpdateOutcome};

/// Requests sent from client to server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum Request {
	GetBlock { hash: String },
	PutBlock { block: Block },
	HasBlocks { hashes: Vec<String> },
	GetFileInfoMap,
	UpdateFile { meta: FileMetaData },
	GetBlockStoreAddr,
}

impl Request {
	/// Operation name, used in logs and errors
	pub fn name(&self) -> &'static str {
		match self {
			Request::GetBlock { .. } => "getBlock",
			Request::PutBlock { .. } => "putBlock",
			Request::HasBlocks { .. } => "hasBlocks",
			Request::GetFileInfoMap => "getFileInfoMap",
			Request::UpdateFile { .. } => "updateFile",
			Request::GetBlockStoreAddr => "getBlockStoreAddr",
		}
	}
}

/// Responses sent from server to client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Response {
	/// `None` when the block is not stored
	Block { block: Option<Block> },
	Success { flag: bool },
	Hashes { hashes: Vec<String> },
	FileInfoMap { files: FileInfoMap },
	Version { version: u32 },
	#[serde(rename_all = "camelCase")]
	Conflict { current_version: u32 },
	Addr { addr: String },
	Error { message: String },
}

impl Response {
	pub fn kind(&self) -> &'static str {
		match self {
			Response::Block { .. } => "block",
			Response::Success { .. } => "success",
			Response::Hashes { .. } => "hashes",
			Response::FileInfoMap { .. } => "fileInfoMap",
			Response::Version { .. } => "version",
			Response::Conflict { .. } => "conflict",
			Response::Addr { .. } => "addr",
			Response::Error { .. } => "error",
		}
	}
}

impl From<UpdateOutcome> for Response {
	fn from(outcome: UpdateOutcome) -> Self {
		match outcome {
			UpdateOutcome::Applied { version } => Response::Version { version },
			UpdateOutcome::Conflict { current_version } => Response::Conflict { current_version },
		}
	}
}


// vim: ts=4
