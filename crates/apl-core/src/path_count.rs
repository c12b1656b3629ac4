//! Exact path counting on an acyclic graph.
//!
//! # Algorithm
//!
//! 1. Depth-first search from the source records nodes in finish order
//!    ([`DfsPostOrder`]). Reversed, that is a topological order of everything
//!    reachable from the source, source first.
//! 2. A dynamic program walks the finish order (sinks first), so each node is
//!    resolved exactly once and every successor is resolved before the node
//!    that points at it. For an arc `n → a` with weight `(m, l)`:
//!
//!    ```text
//!    count(n)  += count(a) · m
//!    length(n) += count(a) · l + m · length(a)
//!    ```
//!
//!    The target is seeded with one complete path of length zero and is never
//!    expanded further.
//!
//! Only arcs pointing *later* in the topological order are followed. On an
//! acyclic input that is every arc; on a cyclic input back edges and self
//! loops are skipped rather than looping forever.

use petgraph::graph::NodeIndex;
use petgraph::visit::{DfsPostOrder, EdgeRef};
use tracing::{instrument, trace};

use crate::graph::{Graph, NodeValue, PathStats};

/// Topological order of the nodes reachable from `source`, source first.
#[must_use]
pub fn topological_order<V: NodeValue>(graph: &Graph<V>, source: NodeIndex) -> Vec<NodeIndex> {
    let mut finished = finish_order(graph, source);
    finished.reverse();
    finished
}

fn finish_order<V: NodeValue>(graph: &Graph<V>, source: NodeIndex) -> Vec<NodeIndex> {
    let arena = graph.arena();
    let mut dfs = DfsPostOrder::new(arena, source);
    let mut finished = Vec::new();
    while let Some(node) = dfs.next(arena) {
        finished.push(node);
    }
    finished
}

/// Count the paths from `source` to `target` and their summed length.
///
/// Returns [`PathStats::ZERO`] when the target is unreachable or equal to the
/// source.
#[must_use]
#[instrument(level = "debug", skip(graph), fields(nodes = graph.node_count(), edges = graph.edge_count()))]
pub fn count_paths<V: NodeValue>(graph: &Graph<V>, source: NodeIndex, target: NodeIndex) -> PathStats {
    if source == target {
        return PathStats::ZERO;
    }

    let finished = finish_order(graph, source);

    // rank[i] = position in finish order; a successor in topological order
    // finishes first, so it has a strictly smaller rank.
    let mut rank: Vec<Option<usize>> = vec![None; graph.node_count()];
    for (pos, node) in finished.iter().enumerate() {
        rank[node.index()] = Some(pos);
    }

    let mut acc: Vec<PathStats> = vec![PathStats::ZERO; graph.node_count()];

    for (pos, &node) in finished.iter().enumerate() {
        if node == target {
            acc[node.index()] = PathStats::new(1.0, 0.0);
            continue;
        }

        let mut stats = PathStats::ZERO;
        for edge in graph.outgoing(node) {
            let adj = edge.target();
            if !rank[adj.index()].is_some_and(|r| r < pos) {
                trace!(?node, ?adj, "skipping arc that does not point forward");
                continue;
            }
            let weight = edge.weight();
            let next = acc[adj.index()];
            stats.count += next.count * weight.multiplicity;
            stats.total_length += next.count * weight.length + weight.multiplicity * next.total_length;
        }
        acc[node.index()] = stats;
    }

    acc[source.index()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Edge, PathStats};

    fn idx(g: &Graph<&'static str>, v: &'static str) -> NodeIndex {
        g.find(&v).unwrap()
    }

    #[test]
    fn diamond_has_two_paths_of_length_two() {
        let g = Graph::from_edges([("A", "B"), ("A", "C"), ("B", "D"), ("C", "D")]);
        let stats = count_paths(&g, idx(&g, "A"), idx(&g, "D"));
        assert_eq!(stats, PathStats::new(2.0, 4.0));
        assert_eq!(stats.average_length(), 2.0);
    }

    #[test]
    fn topological_order_starts_at_source() {
        let g = Graph::from_edges([("A", "B"), ("B", "C"), ("A", "C")]);
        let order = topological_order(&g, idx(&g, "A"));
        let names: Vec<&str> = order.iter().map(|&i| *g.value(i)).collect();
        assert_eq!(names, ["A", "B", "C"]);
    }

    #[test]
    fn dead_ends_do_not_count_as_paths() {
        // A → C is a dead end; only A → B → D reaches the target.
        let g = Graph::from_edges([("A", "B"), ("A", "C"), ("B", "D")]);
        let stats = count_paths(&g, idx(&g, "A"), idx(&g, "D"));
        assert_eq!(stats, PathStats::new(1.0, 2.0));
    }

    #[test]
    fn target_is_not_expanded() {
        let g = Graph::from_edges([("A", "B"), ("B", "C")]);
        let stats = count_paths(&g, idx(&g, "A"), idx(&g, "B"));
        assert_eq!(stats, PathStats::new(1.0, 1.0));
    }

    #[test]
    fn unreachable_target_yields_zero() {
        let g = Graph::from_edges([("A", "B"), ("C", "D")]);
        let stats = count_paths(&g, idx(&g, "A"), idx(&g, "D"));
        assert!(stats.is_empty());
        assert!(stats.average_length().is_nan());
    }

    #[test]
    fn source_equal_to_target_yields_zero() {
        let g = Graph::from_edges([("A", "B")]);
        assert!(count_paths(&g, idx(&g, "A"), idx(&g, "A")).is_empty());
    }

    #[test]
    fn parallel_edges_multiply() {
        let g = Graph::from_edges([("A", "B"), ("A", "B"), ("B", "C")]);
        let stats = count_paths(&g, idx(&g, "A"), idx(&g, "C"));
        assert_eq!(stats, PathStats::new(2.0, 4.0));
    }

    #[test]
    fn aggregate_edges_combine_counts_and_lengths() {
        // A =(3 paths, 12 hops)=> B -> C
        let mut g: Graph<&str> = Graph::new();
        let a = g.add_node("A");
        let b = g.add_node("B");
        let c = g.add_node("C");
        g.connect(a, b, Edge::aggregate(PathStats::new(3.0, 12.0)));
        g.connect(b, c, Edge::plain());

        // Three paths of average length 4 then one more hop each.
        assert_eq!(count_paths(&g, a, c), PathStats::new(3.0, 15.0));
    }

    #[test]
    fn bridge_contributes_one_path_of_length_zero() {
        let mut g: Graph<&str> = Graph::new();
        let x = g.add_node("X");
        let copy = g.split(x);
        g.connect(x, copy, Edge::bridge());
        assert_eq!(count_paths(&g, x, copy), PathStats::new(1.0, 0.0));
    }

    #[test]
    fn zero_aggregate_blocks_the_route() {
        let mut g: Graph<&str> = Graph::new();
        let a = g.add_node("A");
        let b = g.add_node("B");
        let c = g.add_node("C");
        g.connect(a, b, Edge::aggregate(PathStats::ZERO));
        g.connect(b, c, Edge::plain());
        assert!(count_paths(&g, a, c).is_empty());
    }

    #[test]
    fn back_edges_are_ignored() {
        let g = Graph::from_edges([("A", "B"), ("B", "A"), ("B", "C"), ("C", "C")]);
        let stats = count_paths(&g, idx(&g, "A"), idx(&g, "C"));
        assert_eq!(stats, PathStats::new(1.0, 2.0));
    }
}
