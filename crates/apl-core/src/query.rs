//! Public entry points for average path length queries.

use serde::Serialize;
use tracing::{info, instrument};

use crate::config::AplConfig;
use crate::decompose::{DecomposeContext, DecomposeStats, solve};
use crate::error::{AplError, Result};
use crate::estimator::{Estimator, FileEstimator};
use crate::graph::{Graph, NodeValue, PathStats, write_dump};

/// Number of paths and their mean length.
///
/// `average_length` is NaN when no path exists; callers decide how to show
/// that.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AplResult {
    pub count: f64,
    pub average_length: f64,
}

impl From<PathStats> for AplResult {
    fn from(stats: PathStats) -> Self {
        Self {
            count: stats.count,
            average_length: stats.average_length(),
        }
    }
}

/// Result plus the work it took.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct QueryReport {
    pub result: AplResult,
    pub stats: DecomposeStats,
}

/// Average path length from `source` to `target` under default settings.
///
/// `presuffix` and `trials` are handed to the estimator untouched; the exact
/// policy never consults it.
///
/// # Errors
///
/// Returns [`AplError::UnknownNode`] if either endpoint is missing, or any
/// error raised during decomposition.
pub fn compute<V: NodeValue>(
    graph: &Graph<V>,
    source: &V,
    target: &V,
    presuffix: u32,
    trials: u32,
) -> Result<AplResult> {
    Query::new(graph)
        .estimator_params(presuffix, trials)
        .run(source, target)
        .map(|report| report.result)
}

/// Configurable query over one graph.
///
/// ```
/// use apl_core::graph::Graph;
/// use apl_core::query::Query;
///
/// let graph = Graph::from_edges([("A", "B"), ("B", "A"), ("B", "C")]);
/// let report = Query::new(&graph).run(&"A", &"C").unwrap();
/// assert_eq!(report.result.count, 1.0);
/// assert_eq!(report.result.average_length, 2.0);
/// ```
pub struct Query<'a, V> {
    graph: &'a Graph<V>,
    config: AplConfig,
    estimator: Option<&'a dyn Estimator>,
    presuffix: u32,
    trials: u32,
}

impl<'a, V: NodeValue> Query<'a, V> {
    #[must_use]
    pub fn new(graph: &'a Graph<V>) -> Self {
        Self {
            graph,
            config: AplConfig::default(),
            estimator: None,
            presuffix: 0,
            trials: 0,
        }
    }

    #[must_use]
    pub fn config(mut self, config: AplConfig) -> Self {
        self.config = config;
        self
    }

    /// Use `estimator` instead of the file exchange described by the config.
    #[must_use]
    pub fn estimator(mut self, estimator: &'a dyn Estimator) -> Self {
        self.estimator = Some(estimator);
        self
    }

    #[must_use]
    pub const fn estimator_params(mut self, presuffix: u32, trials: u32) -> Self {
        self.presuffix = presuffix;
        self.trials = trials;
        self
    }

    /// Run the query.
    ///
    /// # Errors
    ///
    /// Returns [`AplError::UnknownNode`] before any work if either endpoint
    /// is missing; otherwise propagates decomposition errors.
    #[instrument(level = "info", skip_all, fields(source = %source, target = %target, policy = %self.config.decompose.policy))]
    pub fn run(&self, source: &V, target: &V) -> Result<QueryReport> {
        let source_idx = self
            .graph
            .find(source)
            .ok_or_else(|| AplError::unknown_node(source))?;
        let target_idx = self
            .graph
            .find(target)
            .ok_or_else(|| AplError::unknown_node(target))?;

        if let Some(path) = &self.config.dump.path {
            write_dump(self.graph, path);
        }

        let file_estimator;
        let estimator: &dyn Estimator = match self.estimator {
            Some(estimator) => estimator,
            None => {
                file_estimator = FileEstimator::from_config(&self.config.estimator);
                &file_estimator
            }
        };

        let mut ctx = DecomposeContext::new(estimator, &self.config.decompose)
            .with_estimator_params(self.presuffix, self.trials);
        let stats = solve(self.graph, source_idx, target_idx, &mut ctx)?;

        let report = QueryReport {
            result: AplResult::from(stats),
            stats: ctx.stats(),
        };
        info!(
            count = report.result.count,
            average_length = report.result.average_length,
            resolutions = report.stats.resolutions,
            max_depth = report.stats.max_depth,
            "query complete"
        );
        Ok(report)
    }
}
