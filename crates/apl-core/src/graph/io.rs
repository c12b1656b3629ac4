//! Text formats for graphs.
//!
//! Both the diagnostic dump and the estimator request share one line format:
//!
//! ```text
//! <value> <successor> <successor> ...
//! ```
//!
//! One line per node, successors in edge insertion order, parallel edges
//! repeated. The same format is accepted as input by [`parse_adjacency`], with
//! blank lines and `#` comments ignored.

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use tracing::{debug, warn};

use crate::error::{AplError, Result};
use crate::graph::model::{Graph, NodeValue};

/// Parse adjacency-format text into a graph of plain edges.
///
/// A line holding a single token declares an isolated node.
///
/// # Errors
///
/// Returns [`AplError::Parse`] if the text declares no node at all.
pub fn parse_adjacency(text: &str) -> Result<Graph<String>> {
    let mut graph = Graph::new();

    for line in text.lines() {
        let content = line.split_once('#').map_or(line, |(before, _)| before);
        let mut tokens = content.split_whitespace();
        let Some(head) = tokens.next() else {
            continue;
        };
        let from = graph.add_node(head.to_string());
        for token in tokens {
            let to = graph.add_node(token.to_string());
            graph.connect(from, to, crate::graph::Edge::plain());
        }
    }

    if graph.node_count() == 0 {
        return Err(AplError::Parse {
            line: text.lines().count(),
            detail: "graph declares no nodes".to_string(),
        });
    }

    debug!(
        nodes = graph.node_count(),
        edges = graph.edge_count(),
        "parsed adjacency text"
    );
    Ok(graph)
}

/// Render every node as one adjacency line, in node insertion order.
#[must_use]
pub fn render_adjacency<V: NodeValue>(graph: &Graph<V>) -> String {
    let mut out = String::new();
    for idx in graph.node_indices() {
        let _ = write!(out, "{}", graph.value(idx));
        for succ in graph.successors(idx) {
            let _ = write!(out, " {}", graph.value(succ));
        }
        out.push('\n');
    }
    out
}

/// Render an estimator request: the `<entry> <exit>` header followed by the
/// adjacency lines of the interior subgraph.
#[must_use]
pub fn render_request<V: NodeValue>(graph: &Graph<V>, entry: &V, exit: &V) -> String {
    let mut out = format!("{entry} {exit}\n");
    out.push_str(&render_adjacency(graph));
    out
}

/// Write the diagnostic dump of `graph` to `path`.
///
/// The dump is side information only; failures are logged and swallowed.
pub fn write_dump<V: NodeValue>(graph: &Graph<V>, path: &Path) {
    match fs::write(path, render_adjacency(graph)) {
        Ok(()) => debug!(path = %path.display(), "wrote diagnostic dump"),
        Err(err) => warn!(path = %path.display(), error = %err, "diagnostic dump failed"),
    }
}
