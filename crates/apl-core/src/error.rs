use std::fmt;

use thiserror::Error;

use crate::estimator::EstimatorError;

/// Machine-readable error codes for scripted callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    ConfigParseError,
    GraphParseError,
    UnknownNode,
    InvalidStructure,
    DepthExceeded,
    EstimatorIo,
    EstimatorTimeout,
    EstimatorCancelled,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::ConfigParseError => "E1001",
            Self::GraphParseError => "E1002",
            Self::UnknownNode => "E2001",
            Self::InvalidStructure => "E3001",
            Self::DepthExceeded => "E3002",
            Self::EstimatorIo => "E5001",
            Self::EstimatorTimeout => "E5002",
            Self::EstimatorCancelled => "E5003",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::ConfigParseError => "Config file parse error",
            Self::GraphParseError => "Graph file parse error",
            Self::UnknownNode => "Node not found in graph",
            Self::InvalidStructure => "Decomposition produced an invalid structure",
            Self::DepthExceeded => "Decomposition recursion limit exceeded",
            Self::EstimatorIo => "Estimator exchange failed",
            Self::EstimatorTimeout => "Estimator did not answer in time",
            Self::EstimatorCancelled => "Estimator request cancelled",
        }
    }

    /// Optional remediation hint that can be surfaced to operators.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::ConfigParseError => Some("Fix syntax in apl.toml and retry."),
            Self::GraphParseError => {
                Some("Each line must be `<node> <successor> <successor> ...`.")
            }
            Self::UnknownNode => Some("Check the source/target spelling against the graph file."),
            Self::InvalidStructure => Some("This is a bug. Report it with the graph that triggered it."),
            Self::DepthExceeded => Some("Raise `decompose.max_depth` or use the estimated policy."),
            Self::EstimatorIo => Some("Check write permissions for the estimator artifact paths."),
            Self::EstimatorTimeout => {
                Some("Make sure the estimator process is running, or raise `estimator.timeout_ms`.")
            }
            Self::EstimatorCancelled => None,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Errors raised while answering an average path length query.
#[derive(Debug, Error)]
pub enum AplError {
    /// The caller asked about a node the graph does not contain.
    #[error("{}: node `{value}` is not in the graph", ErrorCode::UnknownNode.code())]
    UnknownNode { value: String },

    /// A node that construction should have produced is missing.
    #[error("{}: {detail}", ErrorCode::InvalidStructure.code())]
    InvalidStructure { detail: String },

    #[error("{}: nesting depth {depth} exceeds limit {limit}", ErrorCode::DepthExceeded.code())]
    DepthExceeded { depth: usize, limit: usize },

    #[error("{}: line {line}: {detail}", ErrorCode::GraphParseError.code())]
    Parse { line: usize, detail: String },

    #[error(transparent)]
    Estimator(#[from] EstimatorError),
}

impl AplError {
    pub(crate) fn unknown_node(value: impl fmt::Display) -> Self {
        Self::UnknownNode {
            value: value.to_string(),
        }
    }

    pub(crate) fn invalid_structure(detail: impl Into<String>) -> Self {
        Self::InvalidStructure {
            detail: detail.into(),
        }
    }

    /// Machine-readable code associated with this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::UnknownNode { .. } => ErrorCode::UnknownNode,
            Self::InvalidStructure { .. } => ErrorCode::InvalidStructure,
            Self::DepthExceeded { .. } => ErrorCode::DepthExceeded,
            Self::Parse { .. } => ErrorCode::GraphParseError,
            Self::Estimator(err) => err.code(),
        }
    }

    /// Optional remediation hint for operators.
    #[must_use]
    pub const fn hint(&self) -> Option<&'static str> {
        self.code().hint()
    }
}

pub type Result<T, E = AplError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::{AplError, ErrorCode};
    use std::collections::HashSet;

    #[test]
    fn all_codes_are_unique() {
        let all = [
            ErrorCode::ConfigParseError,
            ErrorCode::GraphParseError,
            ErrorCode::UnknownNode,
            ErrorCode::InvalidStructure,
            ErrorCode::DepthExceeded,
            ErrorCode::EstimatorIo,
            ErrorCode::EstimatorTimeout,
            ErrorCode::EstimatorCancelled,
        ];

        let mut seen = HashSet::new();
        for code in all {
            assert!(seen.insert(code.code()), "duplicate code {}", code.code());
        }
    }

    #[test]
    fn code_format_is_machine_friendly() {
        let code = ErrorCode::InvalidStructure.code();
        assert_eq!(code.len(), 5);
        assert!(code.starts_with('E'));
        assert!(code.chars().skip(1).all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn unknown_node_message_names_the_value() {
        let err = AplError::unknown_node("Z");
        assert_eq!(err.code(), ErrorCode::UnknownNode);
        assert_eq!(err.to_string(), "E2001: node `Z` is not in the graph");
        assert!(err.hint().is_some());
    }
}
