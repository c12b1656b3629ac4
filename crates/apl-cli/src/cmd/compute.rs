//! `apl compute`: average path length between two nodes.

use std::io::Write;
use std::path::{Path, PathBuf};

use apl_core::config::{ResolutionPolicy, resolve_config};
use apl_core::decompose::DecomposeStats;
use apl_core::Query;
use clap::Args;
use serde::Serialize;
use tracing::debug;

use crate::output::{OutputMode, format_number, pretty_kv, pretty_section, render_mode};

/// Arguments for `apl compute`.
#[derive(Args, Debug)]
pub struct ComputeArgs {
    /// Adjacency file: one `<node> <successor> ...` line per node.
    pub graph: PathBuf,

    pub source: String,

    pub target: String,

    /// Forwarded to the estimator.
    #[arg(long, default_value_t = 0)]
    pub presuffix: u32,

    /// Forwarded to the estimator.
    #[arg(long, default_value_t = 0)]
    pub trials: u32,

    /// How component interiors are resolved (overrides config).
    #[arg(long, value_name = "exact|estimated|alternating")]
    pub policy: Option<ResolutionPolicy>,

    /// Write the input graph in adjacency form to PATH (overrides config).
    #[arg(long, value_name = "PATH")]
    pub dump: Option<PathBuf>,

    /// Config file to use instead of `apl.toml` discovery.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
struct ComputeOutput {
    source: String,
    target: String,
    policy: ResolutionPolicy,
    count: f64,
    /// `None` when there is no path.
    average_length: Option<f64>,
    stats: DecomposeStats,
}

/// Execute `apl compute`.
pub fn run_compute(args: &ComputeArgs, output: OutputMode, cwd: &Path) -> anyhow::Result<()> {
    let mut config = resolve_config(args.config.as_deref(), cwd)?;
    if let Some(policy) = args.policy {
        config.decompose.policy = policy;
    }
    if let Some(dump) = &args.dump {
        config.dump.path = Some(dump.clone());
    }
    debug!(?config, "resolved configuration");

    let graph = super::load_graph(&args.graph, output)?;
    let policy = config.decompose.policy;
    let report = Query::new(&graph)
        .config(config)
        .estimator_params(args.presuffix, args.trials)
        .run(&args.source, &args.target)
        .map_err(|err| super::report(output, &err))?;

    let payload = ComputeOutput {
        source: args.source.clone(),
        target: args.target.clone(),
        policy,
        count: report.result.count,
        average_length: Some(report.result.average_length).filter(|avg| avg.is_finite()),
        stats: report.stats,
    };

    render_mode(output, &payload, render_text, render_pretty)
}

fn render_text(payload: &ComputeOutput, w: &mut dyn Write) -> std::io::Result<()> {
    writeln!(
        w,
        "{} {}",
        format_number(payload.count),
        format_number(payload.average_length.unwrap_or(f64::NAN))
    )
}

fn render_pretty(payload: &ComputeOutput, w: &mut dyn Write) -> std::io::Result<()> {
    pretty_section(w, &format!("{} → {}", payload.source, payload.target))?;
    pretty_kv(w, "paths", format_number(payload.count))?;
    pretty_kv(
        w,
        "average length",
        format_number(payload.average_length.unwrap_or(f64::NAN)),
    )?;
    pretty_kv(w, "policy", payload.policy.as_str())?;
    pretty_kv(w, "supergraphs", payload.stats.supergraphs.to_string())?;
    pretty_kv(w, "resolutions", payload.stats.resolutions.to_string())?;
    pretty_kv(w, "max depth", payload.stats.max_depth.to_string())
}
