#![forbid(unsafe_code)]

mod cmd;
mod output;

use apl_core::timing;
use clap::{Parser, Subcommand};
use output::OutputMode;
use std::env;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "apl: average path length over cyclic directed graphs",
    long_about = None
)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit stage timing report to stderr.
    #[arg(long, global = true)]
    timing: bool,

    /// Output format.
    #[arg(long, global = true, value_enum)]
    format: Option<OutputMode>,

    /// Shorthand for `--format json`.
    #[arg(long, global = true, hide = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        about = "Count paths and their average length",
        long_about = "Count the simple paths from SOURCE to TARGET and report their average length.",
        after_help = "EXAMPLES:\n    # Exact answer\n    apl compute graph.txt A C\n\n    # Ask an external estimator for every component interior\n    apl compute graph.txt A C --policy estimated --trials 1000\n\n    # Emit machine-readable output\n    apl compute graph.txt A C --json"
    )]
    Compute(cmd::compute::ComputeArgs),

    #[command(
        about = "List cyclic components",
        long_about = "List every strongly connected component with more than one node, with its entry and exit nodes.",
        after_help = "EXAMPLES:\n    # Show components\n    apl sccs graph.txt\n\n    # Emit machine-readable output\n    apl sccs graph.txt --json"
    )]
    Sccs(cmd::sccs::SccsArgs),
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_env("APL_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if env::var("DEBUG").is_ok() {
            "apl=debug,apl_core=debug,info"
        } else if verbose {
            "apl=info,apl_core=info,warn"
        } else {
            "warn"
        })
    });

    let format = env::var("APL_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .init();
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let timing_enabled = cli.timing || timing::timing_enabled_from_env();
    timing::set_timing_enabled(timing_enabled);
    timing::clear_timings();

    if cli.verbose {
        info!("Verbose mode enabled");
    }

    let cwd = env::current_dir()?;
    let output = output::resolve_output_mode(cli.format, cli.json);

    let command_result = match &cli.command {
        Commands::Compute(args) => cmd::compute::run_compute(args, output, &cwd),
        Commands::Sccs(args) => cmd::sccs::run_sccs(args, output),
    };

    if timing_enabled {
        let report = timing::collect_report();
        if report.is_empty() {
            eprintln!("timing report: no samples recorded");
        } else {
            eprintln!("timing report:");
            eprintln!("{}", report.display_table());
            eprintln!("timing report (json):");
            eprintln!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    command_result
}
