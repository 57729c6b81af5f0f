//! CLI tool for generating and inspecting partition data files

use affinitymap::loader::{generate_records, write_records, DEFAULT_PARTITIONS};
use affinitymap::{AffinityKey, PartitionId, PartitionMap};
use clap::{ArgAction, Parser, Subcommand};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use tracing_subscriber::{
    filter::{EnvFilter, LevelFilter},
    prelude::*,
    registry::Registry,
};

macro_rules! die {
    ($fmt:literal, $($arg:tt)*) => {{
        eprintln!($fmt, $($arg)*);
        std::process::exit(1);
    }};

    ($msg:literal) => {{
        eprintln!($msg);
        std::process::exit(1);
    }};
}

#[allow(unused_imports)]
use tracing::{debug, error, info, trace, warn};

fn init_tracing(quiet: bool, verbose: u8) {
    let level_filter = if quiet {
        LevelFilter::ERROR
    } else {
        match verbose {
            0 => LevelFilter::WARN,
            1 => LevelFilter::INFO,
            2 => LevelFilter::DEBUG,
            _ => LevelFilter::TRACE,
        }
    };

    // Bridge log crate macros to tracing (the library logs through `log`)
    if tracing_log::LogTracer::init().is_err() {
        die!("INTERNAL ERROR: setting log tracer failed");
    }

    let env_filter = EnvFilter::builder()
        .with_default_directive(level_filter.into())
        .with_env_var("AFFINITY_LOG")
        .from_env_lossy();

    let subscriber = Registry::default().with(env_filter).with(
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .compact(),
    );

    if tracing::subscriber::set_global_default(subscriber).is_err() {
        die!("INTERNAL ERROR: setting default tracing::subscriber failed");
    }
}

/// CLI tool for generating and inspecting partition data files
#[derive(Parser, Debug)]
#[command(name = "affinity")]
#[command(about = "CLI tool for generating and inspecting partition data files")]
struct ToolArgs {
    /// Suppress all output except for errors. This overrides the -v flag.
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Turn on verbose output. Supply -v multiple times to increase verbosity.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: ToolCommand,
}

#[derive(Subcommand, Debug)]
enum ToolCommand {
    /// Write a shuffled synthetic data file
    Generate {
        /// Number of keys (1..=count)
        #[arg(short, long, default_value_t = 10_000)]
        count: u64,

        /// Partitions are drawn from 0..partitions
        #[arg(short, long, default_value_t = DEFAULT_PARTITIONS)]
        partitions: PartitionId,

        /// Seed for a reproducible file
        #[arg(long)]
        seed: Option<u64>,

        /// Output file
        output: PathBuf,
    },

    /// Load a data file and report its table diagnostics
    Load {
        /// Data file with one `<key>\t<partition>` record per line
        file: PathBuf,

        /// Keys to look up after loading
        #[arg(long = "query", allow_hyphen_values = true)]
        queries: Vec<AffinityKey>,
    },
}

fn generate(count: u64, partitions: PartitionId, seed: Option<u64>, output: PathBuf) {
    if partitions == 0 {
        die!("--partitions must be greater than 0");
    }

    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };
    let records = generate_records(count, partitions, &mut rng);

    let file = match File::create(&output) {
        Ok(file) => file,
        Err(e) => die!("failed to create {}: {}", output.display(), e),
    };
    match write_records(BufWriter::new(file), records) {
        Ok(written) => info!("wrote {written} records to {}", output.display()),
        Err(e) => die!("failed to write {}: {}", output.display(), e),
    }
}

fn load(file: PathBuf, queries: Vec<AffinityKey>) {
    let mut map = PartitionMap::new();
    let summary = match map.init_from_path(&file) {
        Ok(summary) => summary,
        Err(e) => die!("failed to load {}: {}", file.display(), e),
    };

    println!(
        "loaded {} records ({} distinct keys) from {}",
        summary.records,
        summary.distinct_keys,
        file.display()
    );
    if let Some(table) = map.table() {
        println!("{}", table.diagnostics());
    }

    for key in queries {
        match map.query(key) {
            Some(partition) => println!("{key}\t{partition}"),
            None => println!("{key}\tnot found"),
        }
    }
}

fn main() {
    let args = ToolArgs::parse();
    init_tracing(args.quiet, args.verbose);

    match args.command {
        ToolCommand::Generate {
            count,
            partitions,
            seed,
            output,
        } => generate(count, partitions, seed, output),
        ToolCommand::Load { file, queries } => load(file, queries),
    }
}
