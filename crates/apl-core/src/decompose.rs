//! Supergraph construction and recursive interior resolution.
//!
//! # Overview
//!
//! [`solve`] answers "how many paths from `source` to `target`, and how long
//! are they in total" for a graph that may contain cycles:
//!
//! - **acyclic** (every SCC is a single node): the path counter runs on the
//!   graph directly.
//! - **cyclic**: each SCC is replaced by its boundary in a fresh supergraph:
//!   1. entry and exit nodes of every component (dual-role nodes split);
//!   2. cross arcs from each exit to the entry it reaches in another
//!      component, with the original arc weight;
//!   3. a bridge `(1, 0)` from every dual-role node to its split copy;
//!   4. for every entry/exit pair of a nontrivial component (a node and its
//!      own split copy excluded) an aggregate arc carrying the paths through
//!      the component's interior.
//!
//!   The supergraph is acyclic, so the path counter finishes the job.
//!
//! # Interior Subgraph
//!
//! For a pair `(entry, exit)` the interior keeps every arc `n → a` of the
//! component with `a ≠ entry`, `n ≠ exit` and `n ≠ a`. With the entry's
//! incoming arcs and the exit's outgoing arcs gone, every `entry → exit` path
//! in the interior is a simple path inside the component, and the entry
//! becomes its own SCC, so each nested level works on strictly smaller
//! components. Nesting depth is therefore bounded by the largest component
//! size, and capped by `max_depth` regardless.

use petgraph::graph::NodeIndex;
use petgraph::visit::EdgeRef;
use serde::Serialize;
use tracing::{debug, instrument, trace};

use crate::config::{DecomposeConfig, ResolutionPolicy};
use crate::error::{AplError, Result};
use crate::estimator::{EstimateRequest, Estimator};
use crate::graph::{Edge, Graph, NodeValue, PathStats, render_request};
use crate::path_count::count_paths;
use crate::scc::{self, Endpoints, Scc};
use crate::timing::timed;

/// Counters describing the work one query performed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DecomposeStats {
    /// Supergraphs built, one per cyclic (sub)graph.
    pub supergraphs: u64,
    /// Entry/exit pairs resolved; also the final value of the pair counter.
    pub resolutions: u64,
    /// Pairs resolved by recursing into the interior.
    pub recursions: u64,
    /// Requests sent to the estimator.
    pub estimator_calls: u64,
    /// Pairs installed as zero aggregate arcs.
    pub zero_arcs: u64,
    /// Deepest nesting level reached (the input graph is level 0).
    pub max_depth: usize,
}

/// State threaded through one query's recursion.
///
/// The pair counter increases monotonically across every level and drives
/// the [`ResolutionPolicy::Alternating`] selection.
pub struct DecomposeContext<'e> {
    estimator: &'e dyn Estimator,
    policy: ResolutionPolicy,
    max_depth: usize,
    presuffix: u32,
    trials: u32,
    depth: usize,
    stats: DecomposeStats,
}

impl<'e> DecomposeContext<'e> {
    #[must_use]
    pub fn new(estimator: &'e dyn Estimator, config: &DecomposeConfig) -> Self {
        Self {
            estimator,
            policy: config.policy,
            max_depth: config.max_depth,
            presuffix: 0,
            trials: 0,
            depth: 0,
            stats: DecomposeStats::default(),
        }
    }

    /// Parameters forwarded untouched to every estimator request.
    #[must_use]
    pub const fn with_estimator_params(mut self, presuffix: u32, trials: u32) -> Self {
        self.presuffix = presuffix;
        self.trials = trials;
        self
    }

    #[must_use]
    pub const fn stats(&self) -> DecomposeStats {
        self.stats
    }

    const fn tick(&mut self) -> u64 {
        self.stats.resolutions += 1;
        self.stats.resolutions
    }

    fn recurse<V: NodeValue>(
        &mut self,
        graph: &Graph<V>,
        source: NodeIndex,
        target: NodeIndex,
    ) -> Result<PathStats> {
        let depth = self.depth + 1;
        if depth > self.max_depth {
            return Err(AplError::DepthExceeded {
                depth,
                limit: self.max_depth,
            });
        }
        self.stats.recursions += 1;
        self.stats.max_depth = self.stats.max_depth.max(depth);

        self.depth = depth;
        let result = solve(graph, source, target, self);
        self.depth -= 1;
        result
    }

    fn consult<V: NodeValue>(&mut self, interior: &Graph<V>, entry: &V, exit: &V) -> Result<PathStats> {
        self.stats.estimator_calls += 1;
        let request = EstimateRequest {
            entry: entry.to_string(),
            exit: exit.to_string(),
            artifact: render_request(interior, entry, exit),
            presuffix: self.presuffix,
            trials: self.trials,
        };
        Ok(self.estimator.estimate(&request)?)
    }
}

/// Count paths from `source` to `target` in a possibly cyclic graph.
///
/// # Errors
///
/// - [`AplError::InvalidStructure`] if a boundary node is missing from a
///   graph built here (an internal bug, not bad input).
/// - [`AplError::DepthExceeded`] if nesting goes past `max_depth`.
/// - [`AplError::Estimator`] if the estimator channel fails.
#[instrument(level = "debug", skip(graph, ctx), fields(nodes = graph.node_count(), depth = ctx.depth))]
pub fn solve<V: NodeValue>(
    graph: &Graph<V>,
    source: NodeIndex,
    target: NodeIndex,
    ctx: &mut DecomposeContext<'_>,
) -> Result<PathStats> {
    if source == target {
        return Ok(PathStats::ZERO);
    }

    let endpoints = Endpoints { source, target };
    let sccs = timed("apl.partition", || scc::partition(graph, endpoints));

    if sccs.iter().all(Scc::is_trivial) {
        trace!("acyclic graph, counting directly");
        return Ok(timed("apl.count", || count_paths(graph, source, target)));
    }

    let skeleton = timed("apl.decompose", || build_skeleton(graph, &sccs, endpoints))?;
    let Skeleton {
        graph: mut supergraph,
        source: super_source,
        target: super_target,
    } = skeleton;
    ctx.stats.supergraphs += 1;

    for component in sccs.iter().filter(|c| !c.is_trivial()) {
        resolve_component(graph, component, &mut supergraph, ctx)?;
    }

    debug!(
        components = sccs.len(),
        supergraph_nodes = supergraph.node_count(),
        supergraph_edges = supergraph.edge_count(),
        "supergraph complete"
    );
    Ok(timed("apl.count", || {
        count_paths(&supergraph, super_source, super_target)
    }))
}

/// A supergraph before interior resolution, with the query endpoints located.
struct Skeleton<V> {
    graph: Graph<V>,
    source: NodeIndex,
    target: NodeIndex,
}

fn missing(role: &str, value: &impl std::fmt::Display) -> AplError {
    AplError::invalid_structure(format!("no {role} node for `{value}` in supergraph"))
}

fn build_skeleton<V: NodeValue>(
    graph: &Graph<V>,
    sccs: &[Scc<'_, V>],
    endpoints: Endpoints,
) -> Result<Skeleton<V>> {
    let mut sg = Graph::new();

    // Boundary nodes. Entries first so a dual node's original exists before
    // its exit slot splits it.
    for component in sccs {
        for slot in component.entries() {
            let idx = sg.add_node(graph.value(slot.node).clone());
            sg.set_roles(idx, true, false);
        }
        for slot in component.exits() {
            let idx = sg.add_node(graph.value(slot.node).clone());
            if slot.split {
                sg.split(idx);
            } else {
                sg.set_roles(idx, false, true);
            }
        }
    }

    // Cross arcs, exit role → entry role, original weight.
    for component in sccs {
        for &edge_id in component.crossing_out() {
            let (from, to) = graph
                .arena()
                .edge_endpoints(edge_id)
                .ok_or_else(|| AplError::invalid_structure("crossing arc vanished from graph"))?;
            let weight = graph.arena()[edge_id];
            let from_value = graph.value(from);
            let to_value = graph.value(to);
            let a = sg.find_exit(from_value).ok_or_else(|| missing("exit", from_value))?;
            let b = sg.find_entry(to_value).ok_or_else(|| missing("entry", to_value))?;
            sg.connect(a, b, weight);
        }
    }

    // Bridges.
    for component in sccs {
        for node in component.boundary().bridges() {
            let value = graph.value(node);
            let original = sg.find_entry(value).ok_or_else(|| missing("entry", value))?;
            let copy = sg.find_exit(value).ok_or_else(|| missing("exit", value))?;
            sg.connect(original, copy, Edge::bridge());
        }
    }

    let source_value = graph.value(endpoints.source);
    let target_value = graph.value(endpoints.target);
    let source = sg
        .find_entry(source_value)
        .ok_or_else(|| missing("entry", source_value))?;
    let target = sg
        .find_exit(target_value)
        .ok_or_else(|| missing("exit", target_value))?;

    Ok(Skeleton {
        graph: sg,
        source,
        target,
    })
}

fn resolve_component<V: NodeValue>(
    graph: &Graph<V>,
    component: &Scc<'_, V>,
    supergraph: &mut Graph<V>,
    ctx: &mut DecomposeContext<'_>,
) -> Result<()> {
    for entry in component.entries() {
        for exit in component.exits() {
            if entry.node == exit.node {
                // A node and its own split copy: the bridge carries that path.
                continue;
            }
            let stats = resolve_pair(graph, component, entry.node, exit.node, ctx)?;

            let entry_value = graph.value(entry.node);
            let exit_value = graph.value(exit.node);
            let from = supergraph
                .find_entry(entry_value)
                .ok_or_else(|| missing("entry", entry_value))?;
            let to = supergraph
                .find_exit(exit_value)
                .ok_or_else(|| missing("exit", exit_value))?;
            supergraph.connect(from, to, Edge::aggregate(stats));
        }
    }
    Ok(())
}

fn resolve_pair<V: NodeValue>(
    graph: &Graph<V>,
    component: &Scc<'_, V>,
    entry: NodeIndex,
    exit: NodeIndex,
    ctx: &mut DecomposeContext<'_>,
) -> Result<PathStats> {
    let tick = ctx.tick();
    let entry_value = graph.value(entry);
    let exit_value = graph.value(exit);

    let stats = match ctx.policy {
        ResolutionPolicy::Exact => {
            let interior = extract_interior(graph, component, entry, exit)?;
            ctx.recurse(&interior.graph, interior.source, interior.target)?
        }
        ResolutionPolicy::Estimated => {
            let interior = extract_interior(graph, component, entry, exit)?;
            ctx.consult(&interior.graph, entry_value, exit_value)?
        }
        ResolutionPolicy::Alternating if tick % 2 == 1 => PathStats::ZERO,
        ResolutionPolicy::Alternating => {
            let interior = extract_interior(graph, component, entry, exit)?;
            let estimate = ctx.consult(&interior.graph, entry_value, exit_value)?;
            if estimate.is_empty() {
                estimate
            } else {
                ctx.recurse(&interior.graph, interior.source, interior.target)?
            }
        }
    };

    if stats.is_empty() {
        ctx.stats.zero_arcs += 1;
    }
    trace!(
        tick,
        entry = %entry_value,
        exit = %exit_value,
        count = stats.count,
        length = stats.total_length,
        "resolved interior pair"
    );
    Ok(stats)
}

/// Copy the arcs of `component` usable by an `entry → exit` path.
///
/// # Errors
///
/// Returns [`AplError::InvalidStructure`] if the entry or exit ends up with
/// no arc in the interior, which a strongly connected component rules out.
fn extract_interior<V: NodeValue>(
    graph: &Graph<V>,
    component: &Scc<'_, V>,
    entry: NodeIndex,
    exit: NodeIndex,
) -> Result<Skeleton<V>> {
    let mut interior = Graph::new();

    for &node in component.members() {
        if node == exit {
            continue;
        }
        // Oldest arc first so the interior lists successors in input order.
        let mut arcs: Vec<_> = graph.outgoing(node).collect();
        arcs.reverse();
        for arc in arcs {
            let adj = arc.target();
            if adj == entry || adj == node || !component.contains(adj) {
                continue;
            }
            let a = interior.add_node(graph.value(node).clone());
            let b = interior.add_node(graph.value(adj).clone());
            interior.connect(a, b, *arc.weight());
        }
    }

    let entry_value = graph.value(entry);
    let exit_value = graph.value(exit);
    let source = interior.find(entry_value).ok_or_else(|| {
        AplError::invalid_structure(format!("entry `{entry_value}` missing from interior subgraph"))
    })?;
    let target = interior.find(exit_value).ok_or_else(|| {
        AplError::invalid_structure(format!("exit `{exit_value}` missing from interior subgraph"))
    })?;

    Ok(Skeleton {
        graph: interior,
        source,
        target,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::estimator::{FixedEstimator, NullEstimator};
    use crate::graph::render_adjacency;

    fn config(policy: ResolutionPolicy) -> DecomposeConfig {
        DecomposeConfig {
            policy,
            ..DecomposeConfig::default()
        }
    }

    fn run(
        edges: &[(&'static str, &'static str)],
        source: &'static str,
        target: &'static str,
        estimator: &dyn Estimator,
        policy: ResolutionPolicy,
    ) -> (PathStats, DecomposeStats) {
        let g = Graph::from_edges(edges.iter().copied());
        let mut ctx = DecomposeContext::new(estimator, &config(policy));
        let stats = solve(&g, g.find(&source).unwrap(), g.find(&target).unwrap(), &mut ctx).unwrap();
        (stats, ctx.stats())
    }

    #[test]
    fn acyclic_graph_skips_supergraph() {
        let (stats, work) = run(
            &[("A", "B"), ("A", "C"), ("B", "D"), ("C", "D")],
            "A",
            "D",
            &NullEstimator,
            ResolutionPolicy::Exact,
        );
        assert_eq!(stats, PathStats::new(2.0, 4.0));
        assert_eq!(work.supergraphs, 0);
        assert_eq!(work.resolutions, 0);
    }

    #[test]
    fn two_cycle_then_exit() {
        // A ⇄ B, B → C: the single simple path is A → B → C.
        let (stats, work) = run(
            &[("A", "B"), ("B", "A"), ("B", "C")],
            "A",
            "C",
            &NullEstimator,
            ResolutionPolicy::Exact,
        );
        assert_eq!(stats, PathStats::new(1.0, 2.0));
        assert_eq!(work.supergraphs, 1);
        assert_eq!(work.resolutions, 1, "one pair: entry A, exit B");
        assert_eq!(work.max_depth, 1);
    }

    #[test]
    fn skeleton_splits_dual_role_nodes() {
        // X → A ⇄ B, A → Y: A is entry and exit.
        let g = Graph::from_edges([("X", "A"), ("A", "B"), ("B", "A"), ("A", "Y")]);
        let endpoints = Endpoints {
            source: g.find(&"X").unwrap(),
            target: g.find(&"Y").unwrap(),
        };
        let sccs = scc::partition(&g, endpoints);
        let skeleton = build_skeleton(&g, &sccs, endpoints).unwrap();
        let sg = &skeleton.graph;

        let a = sg.find_entry(&"A").unwrap();
        let a_exit = sg.find_exit(&"A").unwrap();
        assert_ne!(a, a_exit);
        assert!(sg.node(a).is_entry() && !sg.node(a).is_exit());
        assert!(sg.node(a_exit).is_exit() && !sg.node(a_exit).is_entry());
        assert!(sg.find(&"B").is_none(), "interior-only node stays out");

        let bridge: Vec<_> = sg.outgoing(a).filter(|e| e.target() == a_exit).collect();
        assert_eq!(bridge.len(), 1);
        assert_eq!(*bridge[0].weight(), Edge::bridge());

        // X → A → Y through the bridge only.
        assert_eq!(
            count_paths(sg, skeleton.source, skeleton.target),
            PathStats::new(1.0, 2.0)
        );
    }

    #[test]
    fn dual_role_node_bridge_is_only_route() {
        let (stats, work) = run(
            &[("X", "A"), ("A", "B"), ("B", "A"), ("A", "Y")],
            "X",
            "Y",
            &NullEstimator,
            ResolutionPolicy::Exact,
        );
        assert_eq!(stats, PathStats::new(1.0, 2.0));
        assert_eq!(work.resolutions, 0, "A and its split copy are never paired");
    }

    #[test]
    fn interior_drops_entry_inbound_and_exit_outbound() {
        // Triangle A → B → C → A plus chord B → A.
        let g = Graph::from_edges([("A", "B"), ("B", "C"), ("C", "A"), ("B", "A")]);
        let endpoints = Endpoints {
            source: g.find(&"A").unwrap(),
            target: g.find(&"C").unwrap(),
        };
        let sccs = scc::partition(&g, endpoints);
        let component = sccs.iter().find(|c| !c.is_trivial()).unwrap();
        let interior = extract_interior(&g, component, endpoints.source, endpoints.target).unwrap();

        assert_eq!(render_adjacency(&interior.graph), "A B\nB C\nC\n");
    }

    #[test]
    fn parallel_routes_through_component() {
        // S → A, A → B → D, A → C → D, D → A (closes the cycle), D → T.
        let (stats, _) = run(
            &[
                ("S", "A"),
                ("A", "B"),
                ("A", "C"),
                ("B", "D"),
                ("C", "D"),
                ("D", "A"),
                ("D", "T"),
            ],
            "S",
            "T",
            &NullEstimator,
            ResolutionPolicy::Exact,
        );
        // S-A-B-D-T and S-A-C-D-T, four hops each.
        assert_eq!(stats, PathStats::new(2.0, 8.0));
    }

    #[test]
    fn source_and_target_in_same_component() {
        // A ⇄ B ⇄ C chain: A → B → C is the only simple path.
        let (stats, _) = run(
            &[("A", "B"), ("B", "A"), ("B", "C"), ("C", "B")],
            "A",
            "C",
            &NullEstimator,
            ResolutionPolicy::Exact,
        );
        assert_eq!(stats, PathStats::new(1.0, 2.0));
    }

    #[test]
    fn estimated_policy_installs_estimator_answer() {
        let est = FixedEstimator::new(vec![PathStats::new(5.0, 20.0)]);
        let (stats, work) = run(
            &[("A", "B"), ("B", "A"), ("B", "C")],
            "A",
            "C",
            &est,
            ResolutionPolicy::Estimated,
        );
        // Five interior paths of length 4, then one hop B → C each.
        assert_eq!(stats, PathStats::new(5.0, 25.0));
        assert_eq!(work.estimator_calls, 1);
        assert_eq!(work.recursions, 0);

        let requests = est.requests();
        assert_eq!(requests[0].entry, "A");
        assert_eq!(requests[0].exit, "B");
        assert_eq!(requests[0].artifact, "A B\nA B\nB\n");
    }

    #[test]
    fn estimated_zero_short_circuits() {
        let est = FixedEstimator::new(vec![PathStats::ZERO]);
        let (stats, work) = run(
            &[("A", "B"), ("B", "A"), ("B", "C")],
            "A",
            "C",
            &est,
            ResolutionPolicy::Estimated,
        );
        assert!(stats.is_empty());
        assert_eq!(work.zero_arcs, 1);
        assert_eq!(work.recursions, 0);
    }

    #[test]
    fn alternating_policy_zeroes_odd_requests() {
        // The first resolution request is odd, so it resolves to zero without
        // consulting the estimator, which loses the only path.
        let est = FixedEstimator::new(vec![PathStats::new(1.0, 1.0)]);
        let (stats, work) = run(
            &[("A", "B"), ("B", "A"), ("B", "C")],
            "A",
            "C",
            &est,
            ResolutionPolicy::Alternating,
        );
        assert!(stats.is_empty());
        assert_eq!(work.resolutions, 1);
        assert_eq!(work.estimator_calls, 0);
        assert_eq!(work.zero_arcs, 1);
    }

    #[test]
    fn alternating_policy_recurses_on_even_nonzero_estimate() {
        // Two components in sequence: A ⇄ B then C ⇄ D.
        // Pair 1 (A, B) is zeroed; pair 2 (C, D) consults the estimator,
        // which reports paths, so the interior is solved exactly.
        let est = FixedEstimator::new(vec![PathStats::new(42.0, 42.0)]);
        let edges = [("A", "B"), ("B", "A"), ("B", "C"), ("C", "D"), ("D", "C")];
        let g = Graph::from_edges(edges);
        let mut ctx = DecomposeContext::new(&est, &config(ResolutionPolicy::Alternating));
        let stats = solve(&g, g.find(&"C").unwrap(), g.find(&"D").unwrap(), &mut ctx).unwrap();

        // Query C → D only involves component {C, D}: request 1 is odd.
        assert!(stats.is_empty());
        let work = ctx.stats();
        assert_eq!(work.estimator_calls, 0);

        let mut ctx = DecomposeContext::new(&est, &config(ResolutionPolicy::Alternating));
        let stats = solve(&g, g.find(&"A").unwrap(), g.find(&"D").unwrap(), &mut ctx).unwrap();
        let work = ctx.stats();
        assert_eq!(work.resolutions, 2);
        assert_eq!(work.estimator_calls, 1);
        assert_eq!(work.recursions, 1, "nonzero estimate triggers exact recursion");
        // Pair (A, B) was zeroed, so no path survives.
        assert!(stats.is_empty());
    }

    #[test]
    fn depth_limit_is_enforced() {
        let g = Graph::from_edges([("A", "B"), ("B", "A"), ("B", "C")]);
        let mut ctx = DecomposeContext::new(
            &NullEstimator,
            &DecomposeConfig {
                policy: ResolutionPolicy::Exact,
                max_depth: 0,
            },
        );
        let err = solve(&g, g.find(&"A").unwrap(), g.find(&"C").unwrap(), &mut ctx).unwrap_err();
        assert!(matches!(err, AplError::DepthExceeded { depth: 1, limit: 0 }));
    }

    #[test]
    fn estimator_params_are_forwarded() {
        let est = FixedEstimator::new(vec![PathStats::new(1.0, 1.0)]);
        let g = Graph::from_edges([("A", "B"), ("B", "A"), ("B", "C")]);
        let mut ctx = DecomposeContext::new(&est, &config(ResolutionPolicy::Estimated))
            .with_estimator_params(3, 500);
        solve(&g, g.find(&"A").unwrap(), g.find(&"C").unwrap(), &mut ctx).unwrap();
        let requests = est.requests();
        let request = &requests[0];
        assert_eq!((request.presuffix, request.trials), (3, 500));
    }
}
