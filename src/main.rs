//! Replay block store commands from a script or stdin.

use blockheap::command::Command;
use blockheap::config::Config;
use blockheap::{Block, BlockStore, HasherKind, logging};
use clap::Parser;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "blockheap")]
#[command(about = "Replay commands against a fixed-capacity block store")]
struct Args {
    /// Command script to replay (stdin when omitted)
    script: Option<PathBuf>,

    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Store capacity, overriding the configuration
    #[arg(long)]
    capacity: Option<usize>,

    /// Index hasher ("ahash" or "polynomial"), overriding the configuration
    #[arg(long)]
    hasher: Option<HasherKind>,

    /// Stop at the first line that fails to parse
    #[arg(long)]
    strict: bool,
}

fn main() {
    let args = Args::parse();

    let config = match load_config(&args) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = logging::init(&config.logging) {
        eprintln!("Failed to initialize logging: {e}");
    }

    if let Err(e) = run(&args, config) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn load_config(args: &Args) -> Result<Config, Box<dyn std::error::Error>> {
    let mut config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };

    if let Some(capacity) = args.capacity {
        config.store.capacity = capacity;
    }
    if let Some(hasher) = args.hasher {
        config.store.hasher = hasher;
    }
    config.validate()?;

    Ok(config)
}

fn run(args: &Args, config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let mut store = BlockStore::from_config(&config.store)?;

    tracing::info!(
        capacity = store.capacity(),
        table_size = store.table_size(),
        hasher = %config.store.hasher,
        "block store ready"
    );

    for block in &config.blocks {
        if !store.add_block(Block::from(block))? {
            tracing::warn!(key = %block.key, timestamp = block.timestamp, "initial block rejected");
        }
    }

    let reader: Box<dyn BufRead> = match &args.script {
        Some(path) => Box::new(BufReader::new(File::open(path)?)),
        None => Box::new(BufReader::new(io::stdin())),
    };

    let stdout = io::stdout();
    let mut out = stdout.lock();

    for (number, line) in reader.lines().enumerate() {
        let line = line?;
        let command = match Command::parse(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(e) => {
                if args.strict {
                    return Err(format!("line {}: {}", number + 1, e).into());
                }
                eprintln!("line {}: {}", number + 1, e);
                continue;
            }
        };

        let response = command.execute(&mut store)?;
        writeln!(out, "{}", response)?;
    }

    out.flush()?;
    tracing::info!(len = store.len(), max_timestamp = store.max_timestamp(), "replay complete");

    Ok(())
}
