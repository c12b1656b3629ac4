//! Strongly connected components and their entry/exit boundaries.
//!
//! # Overview
//!
//! [`partition`] runs petgraph's Tarjan SCC over a [`Graph`] and wraps each
//! component in an [`Scc`]: a non-owning view of node indices plus a lazily
//! computed [`Boundary`].
//!
//! # Boundary Roles
//!
//! | Role  | Condition                                                        |
//! |-------|------------------------------------------------------------------|
//! | entry | an incoming arc from outside the component, or the query source  |
//! | exit  | an outgoing arc to outside the component, or the query target    |
//!
//! A node holding both roles is *dual*. It is listed as an entry under its own
//! index and as an exit with `split = true`; the decomposer materializes that
//! exit as a separate split copy joined to the original by a bridge arc. No
//! node is ever both entry and exit in the resulting skeleton.

use std::cell::OnceCell;
use std::collections::HashSet;

use petgraph::algo::tarjan_scc;
use petgraph::graph::{EdgeIndex, NodeIndex};
use petgraph::visit::EdgeRef;
use tracing::{debug, instrument};

use crate::graph::{Graph, NodeValue};

/// The query endpoints, which force roles on the components holding them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Endpoints {
    pub source: NodeIndex,
    pub target: NodeIndex,
}

impl Endpoints {
    /// No forced roles; boundaries come from crossing arcs alone.
    #[must_use]
    pub fn none() -> Self {
        Self {
            source: NodeIndex::end(),
            target: NodeIndex::end(),
        }
    }
}

/// One boundary slot of a component.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundaryNode {
    /// The member node this slot belongs to.
    pub node: NodeIndex,
    /// `true` for the exit slot of a dual-role node, which becomes a split
    /// copy in the supergraph.
    pub split: bool,
}

/// Entry/exit classification of one component.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Boundary {
    /// Entry-role members (dual ones included) in index order.
    pub entries: Vec<BoundaryNode>,
    /// Exit-only members, then the split slots of dual members.
    pub exits: Vec<BoundaryNode>,
    /// Arcs arriving from outside the component.
    pub crossing_in: Vec<EdgeIndex>,
    /// Arcs leaving the component.
    pub crossing_out: Vec<EdgeIndex>,
}

impl Boundary {
    /// Dual-role members, each needing a bridge to its split copy.
    pub fn bridges(&self) -> impl Iterator<Item = NodeIndex> + '_ {
        self.exits.iter().filter(|slot| slot.split).map(|slot| slot.node)
    }
}

/// A strongly connected component of a graph.
///
/// Ownership of the nodes stays with the graph; the boundary is computed on
/// first request and memoized.
#[derive(Debug)]
pub struct Scc<'g, V> {
    graph: &'g Graph<V>,
    members: Vec<NodeIndex>,
    member_set: HashSet<NodeIndex>,
    endpoints: Endpoints,
    boundary: OnceCell<Boundary>,
}

impl<'g, V: NodeValue> Scc<'g, V> {
    /// Wrap a member set known to be strongly connected.
    #[must_use]
    pub fn new(graph: &'g Graph<V>, mut members: Vec<NodeIndex>, endpoints: Endpoints) -> Self {
        members.sort_unstable();
        let member_set = members.iter().copied().collect();
        Self {
            graph,
            members,
            member_set,
            endpoints,
            boundary: OnceCell::new(),
        }
    }

    /// Member indices in ascending order.
    #[must_use]
    pub fn members(&self) -> &[NodeIndex] {
        &self.members
    }

    #[must_use]
    pub fn contains(&self, idx: NodeIndex) -> bool {
        self.member_set.contains(&idx)
    }

    /// Return `true` for a single-node component.
    ///
    /// Self loops do not make a component nontrivial: no simple path uses one.
    #[must_use]
    pub fn is_trivial(&self) -> bool {
        self.members.len() == 1
    }

    /// The graph this component belongs to.
    #[must_use]
    pub const fn graph(&self) -> &'g Graph<V> {
        self.graph
    }

    /// Entry/exit classification, computed once.
    pub fn boundary(&self) -> &Boundary {
        self.boundary.get_or_init(|| self.classify())
    }

    pub fn entries(&self) -> &[BoundaryNode] {
        &self.boundary().entries
    }

    pub fn exits(&self) -> &[BoundaryNode] {
        &self.boundary().exits
    }

    /// Arcs arriving from outside the component.
    pub fn crossing_in(&self) -> &[EdgeIndex] {
        &self.boundary().crossing_in
    }

    /// Arcs leaving the component.
    pub fn crossing_out(&self) -> &[EdgeIndex] {
        &self.boundary().crossing_out
    }

    fn classify(&self) -> Boundary {
        let mut boundary = Boundary::default();
        let mut dual = Vec::new();

        for &node in &self.members {
            let mut is_entry = node == self.endpoints.source;
            let mut is_exit = node == self.endpoints.target;

            for edge in self.graph.incoming(node) {
                if !self.contains(edge.source()) {
                    is_entry = true;
                    boundary.crossing_in.push(edge.id());
                }
            }
            for edge in self.graph.outgoing(node) {
                if !self.contains(edge.target()) {
                    is_exit = true;
                    boundary.crossing_out.push(edge.id());
                }
            }

            match (is_entry, is_exit) {
                (true, true) => {
                    boundary.entries.push(BoundaryNode { node, split: false });
                    dual.push(node);
                }
                (true, false) => boundary.entries.push(BoundaryNode { node, split: false }),
                (false, true) => boundary.exits.push(BoundaryNode { node, split: false }),
                (false, false) => {}
            }
        }

        boundary
            .exits
            .extend(dual.into_iter().map(|node| BoundaryNode { node, split: true }));

        debug!(
            members = self.members.len(),
            entries = boundary.entries.len(),
            exits = boundary.exits.len(),
            "classified component boundary"
        );
        boundary
    }
}

/// Partition `graph` into strongly connected components.
///
/// Components come in topological order of the condensation (upstream
/// first), members in ascending index order, so the result is deterministic
/// for a given graph.
#[instrument(level = "debug", skip(graph), fields(nodes = graph.node_count()))]
pub fn partition<V: NodeValue>(graph: &Graph<V>, endpoints: Endpoints) -> Vec<Scc<'_, V>> {
    // tarjan_scc yields components in reverse topological order.
    let mut components = tarjan_scc(graph.arena());
    components.reverse();
    components
        .into_iter()
        .map(|members| Scc::new(graph, members, endpoints))
        .collect()
}
