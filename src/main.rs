use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::process::ExitCode;
use std::thread;
use std::time::Instant;

use anyhow::Context;
use brc::{Config, MalformedPolicy, ReadMode, aggregate, format_duration};
use clap::{ArgAction, Parser};
use tracing::debug;

#[derive(Parser)]
#[command(
    name = "brc",
    version,
    about = "Read measurements from a `station;reading` file and print min/mean/max per station."
)]
struct Cli {
    /// Measurements file, one `station;reading` per line
    source: PathBuf,

    /// Number of workers the file is split across
    #[arg(long, default_value_t = default_pool_size())]
    pool_size: NonZeroUsize,

    #[arg(long, value_enum, default_value_t)]
    read_mode: ReadMode,

    /// What to do with a line that is not `station;reading`
    #[arg(long, value_enum, default_value_t)]
    on_malformed: MalformedPolicy,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn default_pool_size() -> NonZeroUsize {
    thread::available_parallelism().unwrap_or(NonZeroUsize::MIN)
}

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(log_level)
        .with_target(cli.verbose >= 2)
        .with_thread_names(cli.verbose >= 2)
        .with_writer(std::io::stderr)
        .init();

    if !cli.source.is_file() {
        println!("File does not exist: {}", cli.source.display());
        return Ok(ExitCode::FAILURE);
    }

    let config = Config::new(cli.pool_size)
        .with_read_mode(cli.read_mode)
        .with_malformed_policy(cli.on_malformed);
    debug!(?config, "starting");

    let start_point = Instant::now();
    let output = aggregate(&cli.source, &config)
        .with_context(|| format!("failed to process {}", cli.source.display()))?;
    println!("{output}");
    println!(
        "The file was processed in {}",
        format_duration(start_point.elapsed())
    );

    Ok(ExitCode::SUCCESS)
}
