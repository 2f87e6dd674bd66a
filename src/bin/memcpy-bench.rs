//! `memcpy-bench`: throughput driver for the tunedcopy kernels and router.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tunedcopy::bench::{self, BenchOptions, Distribution, Variant};
use tunedcopy::{Router, TuningConfig};

/// Copies a buffer back and forth in randomly sized chunks and reports throughput.
#[derive(Parser, Debug)]
#[command(name = "memcpy-bench")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Buffer size in bytes
    #[arg(long, default_value_t = 1_000_000)]
    size: usize,

    /// Passes over the buffer [default: 1e10 / size, a tenth of that for distribution 1]
    #[arg(long)]
    iterations: Option<usize>,

    /// Worker threads, each owning a contiguous slice
    #[arg(long, default_value_t = 1)]
    threads: usize,

    /// Chunk sizes: 1..=5 for uniform in [0, 16 / 256 / 4096 / 65536 / 1048576)
    #[arg(long, default_value_t = 4)]
    distribution: u8,

    /// Kernel tag, or 30 for the self-tuned router
    #[arg(long, default_value_t = tunedcopy::kernels::SELFTUNED_TAG)]
    variant: u32,

    /// Print one tab-separated line instead of the human summary
    #[arg(long)]
    tsv: bool,

    /// Also print the dispatcher state as JSON
    #[arg(long)]
    report: bool,

    /// Tuning config file
    #[arg(long, env = "TUNEDCOPY_CONFIG")]
    config: Option<PathBuf>,

    /// List the kernels available on this host and exit
    #[arg(long)]
    list: bool,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "warn".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();

    if args.list {
        for kernel in tunedcopy::kernels::host_kernels() {
            println!("{}\t{}", kernel.tag(), kernel.name());
        }
        println!("{}\tselftuned", tunedcopy::kernels::SELFTUNED_TAG);
        return Ok(());
    }

    let config = TuningConfig::load(args.config.as_deref()).context("loading tuning config")?;
    let router = Router::host(config)?;
    let variant = Variant::resolve(args.variant, &router)?;
    let distribution = Distribution::from_id(args.distribution)?;

    let options = BenchOptions {
        size: args.size,
        iterations: args
            .iterations
            .unwrap_or_else(|| bench::default_iterations(args.size, distribution)),
        threads: args.threads,
        distribution,
    };
    tracing::debug!(?options, variant = variant.name(), "starting run");

    let report = bench::run(&variant, &options)?;
    if args.tsv {
        println!("{}", report.to_tsv());
    } else {
        println!("{report}");
    }

    if args.report {
        let json = serde_json::json!({
            "run": report,
            "dispatcher": router.dispatcher().report(),
        });
        println!("{}", serde_json::to_string_pretty(&json)?);
    }

    Ok(())
}
