#![forbid(unsafe_code)]
//! apl-core library.
//!
//! Average path length between two nodes of a directed graph that may contain
//! cycles. Cycles are collapsed one strongly connected component at a time
//! into an acyclic supergraph whose arcs carry `(count, total_length)` pairs,
//! and paths are counted on that supergraph.
//!
//! # Conventions
//!
//! - **Errors**: [`error::AplError`] for query failures, `anyhow::Result` for
//!   configuration loading.
//! - **Logging**: `tracing` macros and `#[instrument]` spans; the binary
//!   installs the subscriber.
//! - **Timing**: wrap stages in [`timing::timed`] under an `apl.*` name.

pub mod config;
pub mod decompose;
pub mod error;
pub mod estimator;
pub mod graph;
pub mod path_count;
pub mod query;
pub mod scc;
pub mod timing;

pub use error::{AplError, ErrorCode};
pub use graph::{Graph, PathStats, parse_adjacency};
pub use query::{AplResult, Query, QueryReport, compute};
