use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

use gentime::data::record::write_jsonl;
use gentime::data::synthetic::{generate_fake_data, SyntheticConfig};

/// Writes synthetic time series records as JSON lines.
#[derive(Parser, Debug)]
#[command(name = "gentime-synth", version)]
struct Args {
    /// Destination .jsonl file
    #[arg(short, long)]
    output: PathBuf,

    #[arg(short = 'n', long, default_value_t = 100)]
    n_series: usize,

    /// Time steps per series
    #[arg(long, default_value_t = 10)]
    min_length: usize,

    #[arg(long, default_value_t = 5)]
    n_features: usize,

    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Include a random doc_id per record
    #[arg(long)]
    with_ids: bool,

    /// Comma separated sector labels, replaces the default list
    #[arg(long, value_delimiter = ',')]
    sectors: Vec<String>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("gentime=info")),
        )
        .init();

    let args = Args::parse();

    let mut config = SyntheticConfig::new(args.n_series)
        .with_min_length(args.min_length)
        .with_n_temporal_features(args.n_features)
        .with_include_ids(args.with_ids);
    if !args.sectors.is_empty() {
        config = config.with_policy_sectors(args.sectors);
    }

    let records = generate_fake_data(&config, args.seed);
    write_jsonl(&args.output, &records)
        .with_context(|| format!("cannot write {}", args.output.display()))?;

    Ok(())
}
