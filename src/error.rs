//! Error types for blocksync operations

use std::error::Error;
use std::fmt;
use std::io;

use crate::protocol::ProtocolError;

/// Main error type for sync operations
#[derive(Debug)]
pub enum SyncError {
	/// A remote call failed (unreachable, timed out, malformed reply).
	/// Fatal to the current cycle; the Local Index is not written.
	Transport(ProtocolError),

	/// I/O error in the sync root
	Io(io::Error),

	/// Chunking error (nested)
	Chunk(ChunkError),

	/// Local Index error (nested)
	State(StateError),

	/// Invalid configuration
	InvalidConfig { message: String },
}

impl fmt::Display for SyncError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			SyncError::Transport(e) => write!(f, "Transport error: {}", e),
			SyncError::Io(e) => write!(f, "I/O error: {}", e),
			SyncError::Chunk(e) => write!(f, "Chunk error: {}", e),
			SyncError::State(e) => write!(f, "State error: {}", e),
			SyncError::InvalidConfig { message } => {
				write!(f, "Invalid configuration: {}", message)
			}
		}
	}
}

impl Error for SyncError {
	fn source(&self) -> Option<&(dyn Error + 'static)> {
		match self {
			SyncError::Transport(e) => Some(e),
			SyncError::Io(e) => Some(e),
			SyncError::Chunk(e) => Some(e),
			SyncError::State(e) => Some(e),
			_ => None,
		}
	}
}

impl SyncError {
	/// True when the failure came from the RPC layer rather than local state
	pub fn is_transport(&self) -> bool {
		matches!(self, SyncError::Transport(_))
	}
}

impl From<io::Error> for SyncError {
	fn from(e: io::Error) -> Self {
		SyncError::Io(e)
	}
}

impl From<ProtocolError> for SyncError {
	fn from(e: ProtocolError) -> Self {
		SyncError::Transport(e)
	}
}

impl From<ChunkError> for SyncError {
	fn from(e: ChunkError) -> Self {
		SyncError::Chunk(e)
	}
}

impl From<StateError> for SyncError {
	fn from(e: StateError) -> Self {
		SyncError::State(e)
	}
}

/// Chunking-specific errors
#[derive(Debug)]
pub enum ChunkError {
	/// Failed to read the file being chunked
	ReadFailed { source: io::Error },

	/// Invalid chunk configuration
	InvalidConfig { message: String },
}

impl fmt::Display for ChunkError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			ChunkError::ReadFailed { source } => write!(f, "Failed to read chunk: {}", source),
			ChunkError::InvalidConfig { message } => write!(f, "Invalid chunk config: {}", message),
		}
	}
}

impl Error for ChunkError {}

impl From<io::Error> for ChunkError {
	fn from(e: io::Error) -> Self {
		ChunkError::ReadFailed { source: e }
	}
}

/// Local Index errors
#[derive(Debug)]
pub enum StateError {
	/// Failed to load the index
	LoadFailed { source: Box<dyn Error + Send + Sync> },

	/// Failed to save the index
	SaveFailed { source: Box<dyn Error + Send + Sync> },

	/// Index file exists but cannot be parsed
	Corrupted { message: String },
}

impl fmt::Display for StateError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			StateError::LoadFailed { source } => write!(f, "Failed to load index: {}", source),
			StateError::SaveFailed { source } => write!(f, "Failed to save index: {}", source),
			StateError::Corrupted { message } => write!(f, "Index corrupted: {}", message),
		}
	}
}

impl Error for StateError {}


// vim: ts=4
