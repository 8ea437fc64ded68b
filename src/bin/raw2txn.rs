// src/bin/raw2txn.rs

//! Companion binary: flattens a pipeline artifact of raw BTC blocks into
//! transaction-graph lines plus an address-group footer.

use anyhow::Result;
use clap::Parser;
use std::path::Path;
use tracing::info;
use tracing_subscriber::filter::EnvFilter;
use warcpipe::core::txn::{AddressGroup, RawBlockReader, TxnWriter};

#[derive(Parser, Debug)]
#[command(version, about = "Flatten raw BTC blocks into transaction lines")]
struct Cli {
    /// Input path (e.g. file://<path>) containing a compressed, b64 encoded
    /// BTC block per line
    #[arg(short = 'i', long)]
    input: String,

    /// Output path for the transaction lines
    #[arg(short = 'o', long)]
    output: String,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        ))
        .compact()
        .init();

    let mut reader = RawBlockReader::open(&cli.input)?;
    let mut writer = TxnWriter::create(Path::new(&cli.output))?;
    let mut groups = AddressGroup::new();

    let lines = warcpipe::core::txn::flatten(&mut reader, &mut writer, &mut groups)?;
    writer.footer(&groups)?;
    writer.close()?;

    info!("Wrote {lines} transaction lines to {}", cli.output);
    Ok(())
}
