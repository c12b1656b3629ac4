//! Arena-backed directed multigraph with weighted edges.
//!
//! # Overview
//!
//! Nodes live in a [`petgraph`] arena and are addressed by [`NodeIndex`].
//! Edges are `(source, target, multiplicity, length)` records, so a node
//! never holds a reference to another node; adjacency is answered by the
//! arena in O(1) per edge.
//!
//! ## Edge Weights
//!
//! | Kind      | multiplicity | length | Meaning                                   |
//! |-----------|--------------|--------|-------------------------------------------|
//! | plain     | 1            | 1      | one hop                                   |
//! | bridge    | 1            | 0      | joins a dual-role node to its split copy  |
//! | aggregate | count        | total  | every path through a collapsed interior   |
//!
//! ## Value Index
//!
//! Each graph keeps a `value → index` map pointing at the *original* node for
//! a value. A split copy shares its original's value but is reachable only
//! through [`Node::split`], so at most two nodes ever carry the same value:
//! the entry-role original and its exit-role copy.

#![allow(clippy::module_name_repetitions)]

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;

use petgraph::{
    Direction,
    graph::{DiGraph, EdgeIndex, EdgeReference, NodeIndex},
};

/// Bounds every node value must satisfy.
///
/// Values are the identity of a node: two nodes of one graph never share a
/// value unless one is the split copy of the other.
pub trait NodeValue: Clone + Eq + Hash + fmt::Display + fmt::Debug {}

impl<T: Clone + Eq + Hash + fmt::Display + fmt::Debug> NodeValue for T {}

// ---------------------------------------------------------------------------
// PathStats
// ---------------------------------------------------------------------------

/// A `(count, total length)` pair describing a bundle of paths.
///
/// Counts are `f64` because estimator answers are real-valued.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PathStats {
    /// Number of distinct paths.
    pub count: f64,
    /// Sum of the lengths of those paths, in hops.
    pub total_length: f64,
}

impl PathStats {
    /// No paths at all.
    pub const ZERO: Self = Self::new(0.0, 0.0);

    #[must_use]
    pub const fn new(count: f64, total_length: f64) -> Self {
        Self {
            count,
            total_length,
        }
    }

    /// Mean path length. Non-finite when `count` is zero.
    #[must_use]
    pub fn average_length(&self) -> f64 {
        self.total_length / self.count
    }

    /// Return `true` if no path is represented.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.count == 0.0
    }
}

// ---------------------------------------------------------------------------
// Edge
// ---------------------------------------------------------------------------

/// Weight of a directed arc.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Edge {
    /// How many distinct paths this arc stands for.
    pub multiplicity: f64,
    /// Summed hop length over those paths.
    pub length: f64,
}

impl Edge {
    /// A single unit hop.
    #[must_use]
    pub const fn plain() -> Self {
        Self {
            multiplicity: 1.0,
            length: 1.0,
        }
    }

    /// Zero-length arc joining a dual-role node to its split copy.
    #[must_use]
    pub const fn bridge() -> Self {
        Self {
            multiplicity: 1.0,
            length: 0.0,
        }
    }

    /// Arc standing in for every path through a resolved interior.
    #[must_use]
    pub const fn aggregate(stats: PathStats) -> Self {
        Self {
            multiplicity: stats.count,
            length: stats.total_length,
        }
    }
}

impl Default for Edge {
    fn default() -> Self {
        Self::plain()
    }
}

// ---------------------------------------------------------------------------
// Node
// ---------------------------------------------------------------------------

/// A value-keyed vertex.
///
/// Role flags are only meaningful inside a supergraph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node<V> {
    value: V,
    is_entry: bool,
    is_exit: bool,
    split: Option<NodeIndex>,
}

impl<V> Node<V> {
    const fn new(value: V) -> Self {
        Self {
            value,
            is_entry: false,
            is_exit: false,
            split: None,
        }
    }

    #[must_use]
    pub const fn value(&self) -> &V {
        &self.value
    }

    #[must_use]
    pub const fn is_entry(&self) -> bool {
        self.is_entry
    }

    #[must_use]
    pub const fn is_exit(&self) -> bool {
        self.is_exit
    }

    /// The exit-role copy created when this node was split, if any.
    #[must_use]
    pub const fn split(&self) -> Option<NodeIndex> {
        self.split
    }
}

// ---------------------------------------------------------------------------
// Graph
// ---------------------------------------------------------------------------

/// Directed multigraph owning its nodes and a value index.
///
/// Mutation is append-only: nodes and edges are never removed.
#[derive(Debug, Clone)]
pub struct Graph<V> {
    arena: DiGraph<Node<V>, Edge>,
    index: HashMap<V, NodeIndex>,
}

impl<V: NodeValue> Default for Graph<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: NodeValue> Graph<V> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            arena: DiGraph::new(),
            index: HashMap::new(),
        }
    }

    /// Build a graph of plain edges from `(from, to)` value pairs.
    #[must_use]
    pub fn from_edges<I>(edges: I) -> Self
    where
        I: IntoIterator<Item = (V, V)>,
    {
        let mut graph = Self::new();
        for (from, to) in edges {
            graph.add_edge(from, to);
        }
        graph
    }

    /// Find the node for `value`, creating it if absent.
    pub fn add_node(&mut self, value: V) -> NodeIndex {
        if let Some(&idx) = self.index.get(&value) {
            return idx;
        }
        let idx = self.arena.add_node(Node::new(value.clone()));
        self.index.insert(value, idx);
        idx
    }

    /// Add a plain unit edge between two values, creating nodes as needed.
    ///
    /// Parallel edges are kept; each one is a distinct path.
    pub fn add_edge(&mut self, from: V, to: V) -> EdgeIndex {
        let a = self.add_node(from);
        let b = self.add_node(to);
        self.arena.add_edge(a, b, Edge::plain())
    }

    /// Add an arc with an explicit weight between existing nodes.
    pub fn connect(&mut self, from: NodeIndex, to: NodeIndex, edge: Edge) -> EdgeIndex {
        self.arena.add_edge(from, to, edge)
    }

    /// Mark the role flags of a node.
    pub fn set_roles(&mut self, idx: NodeIndex, is_entry: bool, is_exit: bool) {
        let node = &mut self.arena[idx];
        node.is_entry = is_entry;
        node.is_exit = is_exit;
    }

    /// Return the exit-role split copy of `original`, creating it on first use.
    ///
    /// The original keeps the entry role; the copy takes the exit role. The
    /// copy is not entered in the value index.
    pub fn split(&mut self, original: NodeIndex) -> NodeIndex {
        if let Some(existing) = self.arena[original].split {
            return existing;
        }
        let mut copy = Node::new(self.arena[original].value.clone());
        copy.is_exit = true;
        let copy_idx = self.arena.add_node(copy);

        let node = &mut self.arena[original];
        node.split = Some(copy_idx);
        node.is_entry = true;
        node.is_exit = false;
        copy_idx
    }

    /// Look up the original node for a value.
    #[must_use]
    pub fn find(&self, value: &V) -> Option<NodeIndex> {
        self.index.get(value).copied()
    }

    /// Look up the entry-role node for a value.
    #[must_use]
    pub fn find_entry(&self, value: &V) -> Option<NodeIndex> {
        self.find(value).filter(|&idx| self.arena[idx].is_entry)
    }

    /// Look up the exit-role node for a value: the split copy when the node
    /// was split, otherwise the original if it carries the exit role.
    #[must_use]
    pub fn find_exit(&self, value: &V) -> Option<NodeIndex> {
        let idx = self.find(value)?;
        let node = &self.arena[idx];
        match node.split {
            Some(copy) => Some(copy),
            None if node.is_exit => Some(idx),
            None => None,
        }
    }

    #[must_use]
    pub fn node(&self, idx: NodeIndex) -> &Node<V> {
        &self.arena[idx]
    }

    #[must_use]
    pub fn value(&self, idx: NodeIndex) -> &V {
        &self.arena[idx].value
    }

    /// Outgoing arcs of `idx`.
    pub fn outgoing(&self, idx: NodeIndex) -> impl Iterator<Item = EdgeReference<'_, Edge>> {
        self.arena.edges_directed(idx, Direction::Outgoing)
    }

    /// Incoming arcs of `idx`.
    pub fn incoming(&self, idx: NodeIndex) -> impl Iterator<Item = EdgeReference<'_, Edge>> {
        self.arena.edges_directed(idx, Direction::Incoming)
    }

    /// Successor indices of `idx` in insertion order, parallel edges repeated.
    #[must_use]
    pub fn successors(&self, idx: NodeIndex) -> Vec<NodeIndex> {
        // petgraph walks the adjacency list newest-first.
        let mut out: Vec<NodeIndex> = self.arena.neighbors(idx).collect();
        out.reverse();
        out
    }

    /// Node indices in insertion order.
    pub fn node_indices(&self) -> impl Iterator<Item = NodeIndex> {
        self.arena.node_indices()
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.arena.node_count()
    }

    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.arena.edge_count()
    }

    /// The underlying arena, for petgraph algorithms.
    #[must_use]
    pub const fn arena(&self) -> &DiGraph<Node<V>, Edge> {
        &self.arena
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
