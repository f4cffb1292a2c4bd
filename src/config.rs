//! Configuration for blocksync clients and servers
//!
//! The configuration follows a priority chain:
//! 1. Built-in defaults (Config::default())
//! 2. Config file (TOML, or JSON/JSON5)
//! 3. Environment variables (BLOCKSYNC_* prefix)
//! 4. CLI flags (highest priority, applied by the binary)

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::chunking::{self, DEFAULT_BLOCK_SIZE};
use crate::error::SyncError;

/// Environment variable prefix
pub const ENV_PREFIX: &str = "BLOCKSYNC_";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
	// ========================================================================
	// CLIENT
	// ========================================================================
	/// Directory being synchronized
	pub base_dir: PathBuf,

	/// Metadata registry address the client talks to
	pub meta_store_addr: String,

	/// Block size used when chunking files
	pub block_size: usize,

	/// Bound on every remote call, in milliseconds
	pub rpc_timeout_ms: u64,

	// ========================================================================
	// SERVER
	// ========================================================================
	/// Address servers bind to
	pub listen_addr: String,

	/// Block store address the registry advertises (defaults to its own
	/// bound address when both stores run in one process)
	pub block_store_addr: Option<String>,

	// ========================================================================
	// OUTPUT & LOGGING
	// ========================================================================
	/// Default log filter when RUST_LOG is unset
	pub log_level: String,
}

impl Default for Config {
	fn default() -> Self {
		Config {
			base_dir: PathBuf::from("."),
			meta_store_addr: "127.0.0.1:8080".to_string(),
			block_size: DEFAULT_BLOCK_SIZE,
			rpc_timeout_ms: 1000,
			listen_addr: "127.0.0.1:8080".to_string(),
			block_store_addr: None,
			log_level: "info".to_string(),
		}
	}
}

impl Config {
	/// Defaults, overlaid with `path` when given, then the environment
	pub fn load(path: Option<&Path>) -> Result<Config, SyncError> {
		let mut config = match path {
			Some(path) => Config::from_file(path)?,
			None => Config::default(),
		};
		config.apply_env();
		Ok(config)
	}

	/// Parse a config file; `.toml` is TOML, anything else JSON5
	pub fn from_file(path: &Path) -> Result<Config, SyncError> {
		let contents = std::fs::read_to_string(path).map_err(|e| SyncError::InvalidConfig {
			message: format!("Cannot read {}: {}", path.display(), e),
		})?;

		let is_toml = path.extension().map(|ext| ext == "toml").unwrap_or(false);
		if is_toml {
			Config::from_toml(&contents)
		} else {
			Config::from_json5(&contents)
		}
	}

	pub fn from_toml(contents: &str) -> Result<Config, SyncError> {
		toml::from_str(contents)
			.map_err(|e| SyncError::InvalidConfig { message: format!("TOML: {}", e) })
	}

	pub fn from_json5(contents: &str) -> Result<Config, SyncError> {
		json5::from_str(contents)
			.map_err(|e| SyncError::InvalidConfig { message: format!("JSON5: {}", e) })
	}

	/// Apply BLOCKSYNC_* variables from the process environment
	pub fn apply_env(&mut self) {
		self.apply_env_with(|key| std::env::var(key).ok());
	}

	/// Apply BLOCKSYNC_* variables from `lookup`; unparsable numbers are ignored
	pub fn apply_env_with<F>(&mut self, lookup: F)
	where
		F: Fn(&str) -> Option<String>,
	{
		let var = |name: &str| lookup(&format!("{}{}", ENV_PREFIX, name));

		if let Some(dir) = var("BASE_DIR") {
			self.base_dir = PathBuf::from(dir);
		}
		if let Some(addr) = var("META_ADDR") {
			self.meta_store_addr = addr;
		}
		if let Some(size) = var("BLOCK_SIZE").and_then(|v| v.parse().ok()) {
			self.block_size = size;
		}
		if let Some(ms) = var("TIMEOUT_MS").and_then(|v| v.parse().ok()) {
			self.rpc_timeout_ms = ms;
		}
		if let Some(addr) = var("LISTEN") {
			self.listen_addr = addr;
		}
		if let Some(addr) = var("BLOCKSTORE_ADDR") {
			self.block_store_addr = Some(addr);
		}
		if let Some(level) = var("LOG_LEVEL") {
			self.log_level = level;
		}
	}

	pub fn validate(&self) -> Result<(), SyncError> {
		chunking::validate_block_size(self.block_size)
			.map_err(|e| SyncError::InvalidConfig { message: e.to_string() })?;

		if self.rpc_timeout_ms == 0 {
			return Err(SyncError::InvalidConfig {
				message: "rpcTimeoutMs must be greater than 0".to_string(),
			});
		}
		if self.rpc_timeout_ms > 3_600_000 {
			return Err(SyncError::InvalidConfig {
				message: format!("rpcTimeoutMs too large: {} (max 3600000)", self.rpc_timeout_ms),
			});
		}
		if self.meta_store_addr.is_empty() {
			return Err(SyncError::InvalidConfig {
				message: "metaStoreAddr must not be empty".to_string(),
			});
		}
		Ok(())
	}

	pub fn rpc_timeout(&self) -> Duration {
		Duration::from_millis(self.rpc_timeout_ms)
	}
}


// vim: ts=4
