use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use median_degree::ingest::{process_stream, StreamSummary};
use median_degree::{TrackerConfig, WindowedDegreeTracker, DEFAULT_WINDOW};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "median-degree", about = "Rolling median degree of a transaction graph")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the median degree after every transaction.
    Medians {
        /// Transactions, one JSON object per line (default: stdin).
        input: Option<PathBuf>,
        /// Output file (default: stdout).
        output: Option<PathBuf>,
        /// Window length in seconds.
        #[arg(long, default_value_t = DEFAULT_WINDOW)]
        window: i64,
        /// Seed for treap priorities.
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Process the stream and print the final degree of every active actor.
    Degrees {
        /// Transactions, one JSON object per line (default: stdin).
        input: Option<PathBuf>,
        /// Window length in seconds.
        #[arg(long, default_value_t = DEFAULT_WINDOW)]
        window: i64,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Medians {
            input,
            output,
            window,
            seed,
        } => run_medians(input, output, window, seed)?,
        Commands::Degrees { input, window } => run_degrees(input, window)?,
    }

    Ok(())
}

fn run_medians(
    input: Option<PathBuf>,
    output: Option<PathBuf>,
    window: i64,
    seed: Option<u64>,
) -> Result<()> {
    let config = TrackerConfig { window, seed };
    let mut tracker = WindowedDegreeTracker::new(config).context("invalid tracker configuration")?;
    let reader = open_input(input.as_ref())?;

    let mut writer: Box<dyn Write> = match &output {
        Some(path) => Box::new(BufWriter::new(File::create(path).with_context(|| {
            format!("failed to create output file {}", path.display())
        })?)),
        None => Box::new(BufWriter::new(io::stdout().lock())),
    };

    let summary = process_stream(reader, &mut writer, &mut tracker)
        .context("failed to process transaction stream")?;
    log_summary(&summary);
    Ok(())
}

fn run_degrees(input: Option<PathBuf>, window: i64) -> Result<()> {
    let config = TrackerConfig::default().with_window(window);
    let mut tracker = WindowedDegreeTracker::new(config).context("invalid tracker configuration")?;
    let reader = open_input(input.as_ref())?;

    let summary = process_stream(reader, &mut io::sink(), &mut tracker)
        .context("failed to process transaction stream")?;
    log_summary(&summary);

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    for (degree, actor) in tracker.iter_degrees() {
        writeln!(out, "{actor}\t{degree}")?;
    }
    writeln!(out, "median\t{:.2}", tracker.median_degree()?)?;
    out.flush()?;
    Ok(())
}

fn open_input(path: Option<&PathBuf>) -> Result<Box<dyn BufRead>> {
    Ok(match path {
        Some(path) => Box::new(BufReader::new(File::open(path).with_context(|| {
            format!("failed to open input file {}", path.display())
        })?)),
        None => Box::new(BufReader::new(io::stdin())),
    })
}

fn log_summary(summary: &StreamSummary) {
    info!(
        lines = summary.lines,
        emitted = summary.emitted,
        parse_errors = summary.parse_errors,
        invalid_events = summary.invalid_events,
        rejected = summary.rejected,
        evicted = summary.evicted,
        "stream complete"
    );
}
