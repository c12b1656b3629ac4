pub mod compute;
pub mod sccs;

use std::fs;
use std::path::Path;

use anyhow::Context;
use apl_core::{AplError, Graph, parse_adjacency};

use crate::output::{CliError, OutputMode, render_error};

/// Read and parse an adjacency file.
pub fn load_graph(path: &Path, output: OutputMode) -> anyhow::Result<Graph<String>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read graph file {}", path.display()))?;
    parse_adjacency(&text).map_err(|err| report(output, &err))
}

/// Render a library error in the active output mode and hand it back for exit.
pub fn report(output: OutputMode, err: &AplError) -> anyhow::Error {
    if let Err(render_err) = render_error(output, &CliError::from(err)) {
        tracing::warn!(error = %render_err, "failed to render error");
    }
    anyhow::anyhow!("{}", err.code().message())
}
