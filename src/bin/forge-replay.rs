#![forbid(unsafe_code)]
//! Feeds raw block files through the chain engine and reports the resulting head

use clap::{Parser, Subcommand};
use crossbeam_channel::unbounded;
use forgechain::blockchain::{short_id, Block, ChainEngine};
use forgechain::codec::{decode_block, encode_block};
use forgechain::config::{load_config, Config};
use forgechain::consensus::DifficultyOracle;
use forgechain::genesis::genesis_from_config;
use forgechain::inventory::Inventory;
use forgechain::miner::{MiningController, RestartDispatcher};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Writes the configured genesis block to a file
    Genesis {
        /// Where to write the encoded block
        out: PathBuf,
    },
    /// Processes encoded blocks in the given order
    Replay {
        /// Files holding one encoded block each
        blocks: Vec<PathBuf>,
    },
}

/// Stands in for a miner: logs every restart request.
struct LoggingController;

impl MiningController for LoggingController {
    fn restart(&self) {
        info!("miner restart requested");
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = load_config(&cli.config)?;
    tracing_subscriber::fmt()
        .with_max_level(config.logging.level()?)
        .init();

    let genesis = genesis_from_config(&config)?;
    match cli.command {
        Commands::Genesis { out } => {
            fs::write(&out, encode_block(&genesis)?)?;
            println!("genesis {} written to {}", hex::encode(genesis.id()), out.display());
        }
        Commands::Replay { blocks } => replay(&config, genesis, &blocks)?,
    }
    Ok(())
}

fn replay(
    config: &Config,
    genesis: Block,
    blocks: &[PathBuf],
) -> Result<(), Box<dyn std::error::Error>> {
    let (sender, receiver) = unbounded();
    let dispatcher = RestartDispatcher::spawn(receiver, Arc::new(LoggingController));
    let engine = ChainEngine::new(
        genesis,
        DifficultyOracle::new(&config.consensus),
        Arc::new(Inventory::new()),
        sender,
    )?;

    for path in blocks {
        let data = fs::read(path)?;
        let parent = match decode_block(&data) {
            Ok(block) => block.previous_hash(),
            Err(e) => {
                warn!(file = %path.display(), error = %e, "skipping undecodable block");
                continue;
            }
        };
        match engine.process_block(&data, &parent) {
            Ok(outcome) => println!("{}: {:?}", path.display(), outcome),
            Err(e) => println!("{}: error: {}", path.display(), e),
        }
    }

    let head = engine.latest_block();
    println!(
        "head {} at height {} ({} blocks known, {} floating)",
        short_id(&head.id()),
        engine.height(),
        engine.known_block_ids().len(),
        engine.floating_block_ids().len()
    );

    drop(engine);
    let restarts = dispatcher.join();
    info!(restarts, "replay finished");
    Ok(())
}
