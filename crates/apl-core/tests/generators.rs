//! Shared proptest strategies for graph inputs.

use apl_core::graph::Graph;
use proptest::prelude::*;

/// Upper bound on node count; brute-force enumeration is exponential.
pub const MAX_NODES: u8 = 7;

/// A random multigraph on `0..n` together with a query `(source, target)`.
#[derive(Debug, Clone)]
pub struct GraphCase {
    pub nodes: u8,
    pub edges: Vec<(u8, u8)>,
    pub source: u8,
    pub target: u8,
}

impl GraphCase {
    /// Build the graph with every node present, even isolated ones.
    pub fn graph(&self) -> Graph<u8> {
        let mut graph = Graph::new();
        for n in 0..self.nodes {
            graph.add_node(n);
        }
        for &(from, to) in &self.edges {
            graph.add_edge(from, to);
        }
        graph
    }
}

pub fn arb_case() -> impl Strategy<Value = GraphCase> {
    (2..=MAX_NODES).prop_flat_map(|nodes| {
        let edge = (0..nodes, 0..nodes);
        (
            Just(nodes),
            prop::collection::vec(edge, 0..=usize::from(nodes) * 3),
            0..nodes,
            0..nodes,
        )
            .prop_filter("source must differ from target", |(_, _, s, t)| s != t)
            .prop_map(|(nodes, edges, source, target)| GraphCase {
                nodes,
                edges,
                source,
                target,
            })
    })
}

/// Count simple paths and their summed length by exhaustive DFS.
///
/// Parallel arcs are distinct paths; self loops never appear on a simple path.
pub fn brute_force(case: &GraphCase) -> (f64, f64) {
    fn walk(case: &GraphCase, at: u8, depth: usize, visited: &mut Vec<bool>, acc: &mut (f64, f64)) {
        if at == case.target {
            acc.0 += 1.0;
            acc.1 += depth as f64;
            return;
        }
        for &(from, to) in &case.edges {
            if from != at || visited[usize::from(to)] {
                continue;
            }
            visited[usize::from(to)] = true;
            walk(case, to, depth + 1, visited, acc);
            visited[usize::from(to)] = false;
        }
    }

    let mut visited = vec![false; usize::from(case.nodes)];
    visited[usize::from(case.source)] = true;
    let mut acc = (0.0, 0.0);
    walk(case, case.source, 0, &mut visited, &mut acc);
    acc
}
