//! Graph model and text formats.
//!
//! # Overview
//!
//! [`Graph`] is the single graph type used at every level of a query: the
//! caller's input graph, each interior subgraph extracted from an SCC, and
//! every supergraph built by the decomposer are all `Graph` values owned by
//! the call that created them.
//!
//! ## Pipeline
//!
//! ```text
//! adjacency text
//!        ↓  io::parse_adjacency()
//! Graph<String> (may contain cycles)
//!        ↓  scc::partition()          (petgraph tarjan_scc)
//! Vec<Scc> with memoized boundaries
//!        ↓  decompose::solve()
//! supergraph Graph (acyclic)
//!        ↓  path_count::count_paths()
//! PathStats { count, total_length }
//! ```

pub mod io;
pub mod model;

pub use io::{parse_adjacency, render_adjacency, render_request, write_dump};
pub use model::{Edge, Graph, Node, NodeValue, PathStats};
