use clap::{Arg, ArgMatches, Command};
use std::error::Error;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::net::TcpListener;

use blocksync::config::Config;
use blocksync::index::IndexManager;
use blocksync::logging::*;
use blocksync::serve::{self, ServiceHandler};
use blocksync::{BlockStore, MetaStore, SyncClient};

async fn shutdown_signal() {
	if let Err(e) = tokio::signal::ctrl_c().await {
		error!("Cannot listen for Ctrl-C: {}", e);
		std::future::pending::<()>().await;
	}
}

fn listen_arg() -> Arg {
	Arg::new("listen").short('l').long("listen").value_name("ADDR").help("Address to bind")
}

fn apply_listen(config: &mut Config, matches: &ArgMatches) {
	if let Some(addr) = matches.get_one::<String>("listen") {
		config.listen_addr = addr.clone();
	}
}

async fn run_serve(mut config: Config, matches: &ArgMatches) -> Result<(), Box<dyn Error>> {
	apply_listen(&mut config, matches);
	if let Some(addr) = matches.get_one::<String>("advertise") {
		config.block_store_addr = Some(addr.clone());
	}

	let listener = TcpListener::bind(&config.listen_addr).await?;
	let advertised = match &config.block_store_addr {
		Some(addr) => addr.clone(),
		None => listener.local_addr()?.to_string(),
	};
	info!("Serving block store and registry, advertising block store at {}", advertised);

	let handler = ServiceHandler::new(
		Some(Arc::new(BlockStore::new())),
		Some(Arc::new(MetaStore::new(advertised))),
	);
	serve::serve(listener, handler, shutdown_signal()).await?;
	Ok(())
}

async fn run_blockstore(mut config: Config, matches: &ArgMatches) -> Result<(), Box<dyn Error>> {
	apply_listen(&mut config, matches);
	let handler = ServiceHandler::block_store(Arc::new(BlockStore::new()));
	serve::bind_and_serve(&config.listen_addr, handler, shutdown_signal()).await?;
	Ok(())
}

async fn run_metastore(mut config: Config, matches: &ArgMatches) -> Result<(), Box<dyn Error>> {
	apply_listen(&mut config, matches);
	if let Some(addr) = matches.get_one::<String>("blockstore") {
		config.block_store_addr = Some(addr.clone());
	}
	let block_addr = config
		.block_store_addr
		.clone()
		.ok_or("metastore: --blockstore (or blockStoreAddr) is required")?;

	let handler = ServiceHandler::meta_store(Arc::new(MetaStore::new(block_addr)));
	serve::bind_and_serve(&config.listen_addr, handler, shutdown_signal()).await?;
	Ok(())
}

async fn run_sync(mut config: Config, matches: &ArgMatches) -> Result<(), Box<dyn Error>> {
	let dir = matches.get_one::<String>("dir").ok_or("sync: directory argument required")?;
	config.base_dir = PathBuf::from(dir);
	if let Some(addr) = matches.get_one::<String>("meta") {
		config.meta_store_addr = addr.clone();
	}
	if let Some(size) = matches.get_one::<usize>("block-size") {
		config.block_size = *size;
	}
	if let Some(ms) = matches.get_one::<u64>("timeout-ms") {
		config.rpc_timeout_ms = *ms;
	}

	let client = SyncClient::connect(&config).await?;
	let report = client.sync().await?;
	println!("{}", report);
	Ok(())
}

async fn run_index(dir: &Path) -> Result<(), Box<dyn Error>> {
	let index = IndexManager::new(dir).load().await?;
	for meta in index.files.values() {
		let state = if meta.is_tombstone() {
			"deleted".to_string()
		} else {
			format!("{} blocks", meta.block_hash_list.len())
		};
		println!("{}\tv{}\t{}", meta.filename, meta.version, state);
	}
	Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
	let matches = Command::new("blocksync")
		.version(env!("CARGO_PKG_VERSION"))
		.about("Content-addressed directory sync")
		.subcommand_required(true)
		.arg(
			Arg::new("config")
				.short('c')
				.long("config")
				.value_name("FILE")
				.global(true)
				.help("Config file (.toml or .json5)"),
		)
		.subcommand(
			Command::new("serve")
				.about("Run block store and metadata registry in one process")
				.arg(listen_arg())
				.arg(
					Arg::new("advertise")
						.long("advertise")
						.value_name("ADDR")
						.help("Block store address handed to clients"),
				),
		)
		.subcommand(Command::new("blockstore").about("Run a block store").arg(listen_arg()))
		.subcommand(
			Command::new("metastore")
				.about("Run a metadata registry")
				.arg(listen_arg())
				.arg(
					Arg::new("blockstore")
						.short('b')
						.long("blockstore")
						.value_name("ADDR")
						.help("Block store address handed to clients"),
				),
		)
		.subcommand(
			Command::new("sync")
				.about("Synchronize a directory")
				.arg(Arg::new("dir").required(true))
				.arg(
					Arg::new("meta")
						.short('m')
						.long("meta")
						.value_name("ADDR")
						.help("Metadata registry address"),
				)
				.arg(
					Arg::new("block-size")
						.short('s')
						.long("block-size")
						.value_name("BYTES")
						.value_parser(clap::value_parser!(usize)),
				)
				.arg(
					Arg::new("timeout-ms")
						.long("timeout-ms")
						.value_name("MS")
						.value_parser(clap::value_parser!(u64)),
				),
		)
		.subcommand(
			Command::new("index")
				.about("Print the Local Index of a directory")
				.arg(Arg::new("dir").required(true)),
		)
		.get_matches();

	let config_path = matches.get_one::<String>("config").map(PathBuf::from);
	let config = Config::load(config_path.as_deref())?;
	init_tracing(&config.log_level);

	match matches.subcommand() {
		Some(("serve", sub)) => run_serve(config, sub).await,
		Some(("blockstore", sub)) => run_blockstore(config, sub).await,
		Some(("metastore", sub)) => run_metastore(config, sub).await,
		Some(("sync", sub)) => run_sync(config, sub).await,
		Some(("index", sub)) => {
			let dir = sub.get_one::<String>("dir").ok_or("index: directory argument required")?;
			run_index(Path::new(dir)).await
		}
		_ => Ok(()),
	}
}

// vim: ts=4
