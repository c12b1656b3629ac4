//! `apl sccs`: list cyclic components and their boundaries.

use std::io::Write;
use std::path::PathBuf;

use apl_core::scc::{BoundaryNode, Endpoints, Scc, partition};
use apl_core::Graph;
use clap::Args;
use serde::Serialize;

use crate::output::{OutputMode, pretty_kv, pretty_rule, render_mode};

/// Arguments for `apl sccs`.
#[derive(Args, Debug)]
pub struct SccsArgs {
    /// Adjacency file: one `<node> <successor> ...` line per node.
    pub graph: PathBuf,
}

#[derive(Debug, Serialize)]
struct SccsOutput {
    components: Vec<ComponentOutput>,
}

#[derive(Debug, Serialize)]
struct ComponentOutput {
    members: Vec<String>,
    entries: Vec<String>,
    exits: Vec<String>,
}

impl ComponentOutput {
    fn from_scc(scc: &Scc<'_, String>) -> Self {
        let graph = scc.graph();
        let values = |slots: &[BoundaryNode]| -> Vec<String> {
            slots.iter().map(|slot| graph.value(slot.node).clone()).collect()
        };
        Self {
            members: scc.members().iter().map(|&n| graph.value(n).clone()).collect(),
            entries: values(scc.entries()),
            exits: values(scc.exits()),
        }
    }
}

fn collect(graph: &Graph<String>) -> SccsOutput {
    let components = partition(graph, Endpoints::none())
        .iter()
        .filter(|scc| !scc.is_trivial())
        .map(ComponentOutput::from_scc)
        .collect();
    SccsOutput { components }
}

/// Execute `apl sccs`.
pub fn run_sccs(args: &SccsArgs, output: OutputMode) -> anyhow::Result<()> {
    let graph = super::load_graph(&args.graph, output)?;
    let payload = collect(&graph);
    render_mode(output, &payload, render_text, render_pretty)
}

fn render_text(payload: &SccsOutput, w: &mut dyn Write) -> std::io::Result<()> {
    for component in &payload.components {
        writeln!(w, "{}", component.members.join(" "))?;
    }
    Ok(())
}

fn render_pretty(payload: &SccsOutput, w: &mut dyn Write) -> std::io::Result<()> {
    if payload.components.is_empty() {
        writeln!(w, "No cycles found.")?;
        return Ok(());
    }

    writeln!(w, "Cyclic components ({})", payload.components.len())?;
    for (idx, component) in payload.components.iter().enumerate() {
        writeln!(w, "\nComponent {}:", idx + 1)?;
        pretty_rule(w)?;
        pretty_kv(w, "members", component.members.join(" "))?;
        pretty_kv(w, "entries", component.entries.join(" "))?;
        pretty_kv(w, "exits", component.exits.join(" "))?;
    }
    Ok(())
}
