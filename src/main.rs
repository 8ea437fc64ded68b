// src/main.rs

//! The main entry point for the warcpipe ingestion pipeline.

use anyhow::{Context, Result};
use clap::Parser;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::filter::EnvFilter;
use warcpipe::config::Config;
use warcpipe::core::index;
use warcpipe::core::ingest::cache::{PrefetchCache, PrefetchConfig};
use warcpipe::core::ingest::{BtcIngestor, CsvIngestor, Ingestor, IngestorKind, WarcIngestor};
use warcpipe::core::processors::Processor;
use warcpipe::core::sink::OutputSink;
use warcpipe::core::storage::{self, StorageDescriptor};
use warcpipe::pipeline::PipelineDriver;

#[derive(Parser, Debug)]
#[command(version, about = "Batch web-archive and blockchain ingestion pipeline")]
struct Cli {
    /// Input file containing ingest-specific configuration
    #[arg(short = 'i', long)]
    input: String,

    /// Output path (e.g. s3://<region>.<bucket>/<path> or file://<path>)
    #[arg(short = 'o', long)]
    output: Option<String>,

    /// Processor to use (e.g. news)
    #[arg(short = 'p', long)]
    processor: String,

    /// Ingestor to use (e.g. warc-index)
    #[arg(short = 'I', long)]
    ingestor: String,

    /// Number of worker threads
    #[arg(short = 't', long)]
    threads: Option<usize>,

    /// Path to an optional TOML configuration file
    #[arg(long, default_value = "warcpipe.toml")]
    config: String,

    /// Keep consumed local archive copies instead of deleting them
    #[arg(long)]
    keep_local_files: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match Config::from_file(&cli.config) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Failed to load configuration from \"{}\": {e}", cli.config);
            std::process::exit(1);
        }
    };
    if let Some(threads) = cli.threads {
        config.threads = threads;
    }
    config.keep_local_files |= cli.keep_local_files;

    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| config.log_level.clone());
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(log_level))
        .compact()
        .with_ansi(true)
        .init();

    if let Err(e) = run_pipeline(cli, config).await {
        error!("Pipeline runtime error: {e}");
        return Err(e);
    }
    Ok(())
}

/// Resolves the configuration-level pieces (all of which fail fast, before
/// any ingestion) and drives the pipeline to completion.
async fn run_pipeline(cli: Cli, config: Config) -> Result<()> {
    let processor = Processor::from_str(&cli.processor)?;

    let descriptor = cli
        .output
        .as_deref()
        .map(StorageDescriptor::parse)
        .transpose()?;
    let sink = Arc::new(OutputSink::open(descriptor)?);

    let ingestor = build_ingestor(&cli, &config).await?;

    info!(
        "Starting pipeline: ingestor={}, processor={}, threads={}",
        cli.ingestor, cli.processor, config.threads
    );
    let driver = PipelineDriver::new(processor, sink, config.threads);
    driver.run(ingestor).await?;
    info!("Pipeline finished");
    Ok(())
}

async fn build_ingestor(cli: &Cli, config: &Config) -> Result<Box<dyn Ingestor>> {
    match IngestorKind::from_str(&cli.ingestor)? {
        IngestorKind::WarcIndex => {
            let contents = std::fs::read_to_string(&cli.input)
                .with_context(|| format!("failed to read index file {}", cli.input))?;
            let locators = index::parse_index(&contents)?;
            let source = StorageDescriptor::parse(&config.archive_source)?;
            let store = storage::connect(&source).await?;
            let cache = PrefetchCache::spawn(
                locators,
                store,
                PrefetchConfig {
                    max_cache_len: config.max_cache_len,
                    scratch_dir: config.scratch_dir.clone(),
                    fetch_retries: config.fetch_retries,
                    ..Default::default()
                },
            );
            Ok(Box::new(WarcIngestor::new(cache, config.keep_local_files)))
        }
        IngestorKind::CsvFile => Ok(Box::new(CsvIngestor::new(std::path::Path::new(
            &cli.input,
        ))?)),
        IngestorKind::Btc => {
            let contents = std::fs::read_to_string(&cli.input)
                .with_context(|| format!("failed to read BTC spec file {}", cli.input))?;
            let spec = contents.lines().next().unwrap_or_default();
            Ok(Box::new(BtcIngestor::from_spec(spec)?))
        }
    }
}
