use std::io::{Write, stdout};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tracing::info;
use tracing_subscriber::EnvFilter;

use csim::cache::{CacheModel, Geometry};
use csim::lru::LruCache;
use csim::ordered::OrderedLruCache;
use csim::simulation::{Outcome, Simulator, Tally, UnknownOps};
use csim::trace::{self, Trace};

/// Replays a Valgrind memory trace against a simulated LRU cache
#[derive(Debug, Parser)]
#[command(name = "csim", version)]
struct Cli {
    /// Number of set index bits (S = 2^s sets)
    #[arg(short = 's', value_name = "s")]
    set_bits: u32,
    /// Number of lines per set (associativity)
    #[arg(short = 'E', value_name = "E")]
    lines: usize,
    /// Number of block offset bits (B = 2^b bytes per block)
    #[arg(short = 'b', value_name = "b")]
    block_bits: u32,
    /// Valgrind trace to replay
    #[arg(short = 't', value_name = "tracefile")]
    trace: PathBuf,
    /// Print the result of every access
    #[arg(short = 'v')]
    verbose: bool,
    /// Count instruction fetches and unknown operations as malformed records
    #[arg(long)]
    strict_ops: bool,
    /// LRU bookkeeping used by the simulated cache
    #[arg(long, value_enum, default_value_t = Policy::Counter)]
    policy: Policy,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
enum Policy {
    /// per-line recency counters, O(lines per set) per access
    Counter,
    /// recency-ordered list with a tag index, O(1) per access
    Ordered,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let geometry = Geometry::from_bits(cli.set_bits, cli.lines, cli.block_bits)
        .context("invalid cache geometry")?;
    info!("\n{}", geometry.format_info());

    let input = trace::load(&cli.trace)?;
    let unknown_ops = if cli.strict_ops {
        UnknownOps::Reject
    } else {
        UnknownOps::Ignore
    };

    let tally = match cli.policy {
        Policy::Counter => run(LruCache::new(geometry), unknown_ops, &input, cli.verbose),
        Policy::Ordered => run(OrderedLruCache::new(geometry), unknown_ops, &input, cli.verbose),
    }?;

    println!("{tally}");
    Ok(())
}

fn run<C: CacheModel>(
    cache: C,
    unknown_ops: UnknownOps,
    input: &str,
    verbose: bool,
) -> Result<Tally> {
    let mut simulator = Simulator::new(cache, unknown_ops);
    let mut stdout = stdout().lock();
    let mut written = Ok(());

    let tally = simulator.replay(Trace::new(input), |record, outcome| {
        if !verbose || outcome == Outcome::Ignored || written.is_err() {
            return;
        }
        written = writeln!(stdout, "{record} {outcome}");
    });

    written.context("failed to write verbose output")?;
    Ok(tally)
}
