//! Transport error type
//!
//! Every failure of a remote call lands here. None of these are retried by
//! the sync engine; the caller decides what to do with a failed cycle.

use std::fmt;
use std::io;

#[derive(Debug)]
pub enum ProtocolError {
	/// Could not open a connection to the service
	Connect { addr: String, source: io::Error },
	/// The call did not complete within the configured timeout
	Timeout { operation: String },
	/// I/O error on an established connection
	Io(io::Error),
	/// Message could not be encoded or decoded
	Decode(String),
	/// The server answered with an error response
	Server(String),
	/// The server answered with the wrong kind of response
	UnexpectedResponse { operation: String, got: String },
	/// Connection closed before a response arrived
	Disconnected,
}

impl fmt::Display for ProtocolError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			ProtocolError::Connect { addr, source } => {
				write!(f, "Cannot connect to {}: {}", addr, source)
			}
			ProtocolError::Timeout { operation } => write!(f, "{} timed out", operation),
			ProtocolError::Io(e) => write!(f, "I/O error: {}", e),
			ProtocolError::Decode(msg) => write!(f, "Decode error: {}", msg),
			ProtocolError::Server(msg) => write!(f, "Server error: {}", msg),
			ProtocolError::UnexpectedResponse { operation, got } => {
				write!(f, "Unexpected response to {}: {}", operation, got)
			}
			ProtocolError::Disconnected => write!(f, "Connection closed by peer"),
		}
	}
}

impl std::error::Error for ProtocolError {}

impl From<io::Error> for ProtocolError {
	fn from(e: io::Error) -> Self {
		ProtocolError::Io(e)
	}
}

impl From<serde_json::Error> for ProtocolError {
	fn from(e: serde_json::Error) -> Self {
		ProtocolError::Decode(e.to_string())
	}
}

// vim: ts=4
