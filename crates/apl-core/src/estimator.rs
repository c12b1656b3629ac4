//! Approximate interior resolution through an external estimator.
//!
//! # Protocol
//!
//! The file estimator exchanges two artifacts with an external sampling
//! process:
//!
//! ```text
//! request  (written by us)   <entry> <exit>
//!                            <value> <successor> ...
//!                            ...
//! response (written by them) <count> <length>
//! ```
//!
//! The response is read exactly once and then deleted. At most one request
//! is outstanding at a time. Any response left over from an earlier run is
//! discarded before a new request is written, so presence of the response
//! artifact always refers to the current request.
//!
//! Waiting is a poll loop with a fixed interval. Each wait is cancellable
//! through a [`CancelToken`], and an optional timeout bounds it.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{debug, instrument, warn};

use crate::config::EstimatorConfig;
use crate::error::ErrorCode;
use crate::graph::PathStats;

/// Failures of the estimator channel.
#[derive(Debug, Error)]
pub enum EstimatorError {
    #[error("{}: {} {}: {source}", ErrorCode::EstimatorIo.code(), .action, .path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{}: no response at {} after {waited:?}", ErrorCode::EstimatorTimeout.code(), .path.display())]
    Timeout { path: PathBuf, waited: Duration },

    #[error("{}: request for {} cancelled", ErrorCode::EstimatorCancelled.code(), .path.display())]
    Cancelled { path: PathBuf },
}

impl EstimatorError {
    /// Machine-readable code associated with this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Io { .. } => ErrorCode::EstimatorIo,
            Self::Timeout { .. } => ErrorCode::EstimatorTimeout,
            Self::Cancelled { .. } => ErrorCode::EstimatorCancelled,
        }
    }

    fn io(action: &'static str, path: &Path, source: io::Error) -> Self {
        Self::Io {
            action,
            path: path.to_path_buf(),
            source,
        }
    }
}

/// One interior-resolution request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EstimateRequest {
    /// Display form of the entry node.
    pub entry: String,
    /// Display form of the exit node.
    pub exit: String,
    /// Full request artifact: header line plus adjacency lines.
    pub artifact: String,
    /// Caller's presuffix parameter, passed through untouched.
    pub presuffix: u32,
    /// Caller's trial count, passed through untouched.
    pub trials: u32,
}

/// Anything that can approximate `(count, total length)` for an interior.
pub trait Estimator {
    /// Answer one request.
    ///
    /// # Errors
    ///
    /// Returns an [`EstimatorError`] when the answer cannot be obtained.
    fn estimate(&self, request: &EstimateRequest) -> Result<PathStats, EstimatorError>;
}

/// Parse a response artifact.
///
/// No parsable count yields [`PathStats::ZERO`]; a count without a parsable
/// length yields a zero length.
#[must_use]
pub fn parse_response(text: &str) -> PathStats {
    let mut tokens = text.split_whitespace().map(str::parse::<f64>);
    match (tokens.next(), tokens.next()) {
        (Some(Ok(count)), Some(Ok(length))) => PathStats::new(count, length),
        (Some(Ok(count)), _) => PathStats::new(count, 0.0),
        _ => PathStats::ZERO,
    }
}

// ---------------------------------------------------------------------------
// In-process estimators
// ---------------------------------------------------------------------------

/// Answers every request with zero paths.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullEstimator;

impl Estimator for NullEstimator {
    fn estimate(&self, _request: &EstimateRequest) -> Result<PathStats, EstimatorError> {
        Ok(PathStats::ZERO)
    }
}

/// Replays a fixed list of answers in order, cycling when exhausted, and
/// remembers every request it saw.
#[derive(Debug, Default)]
pub struct FixedEstimator {
    responses: Vec<PathStats>,
    next: AtomicUsize,
    seen: Mutex<Vec<EstimateRequest>>,
}

impl FixedEstimator {
    #[must_use]
    pub fn new(responses: Vec<PathStats>) -> Self {
        Self {
            responses,
            next: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        }
    }

    /// Requests received so far, oldest first.
    #[must_use]
    pub fn requests(&self) -> Vec<EstimateRequest> {
        self.seen
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Estimator for FixedEstimator {
    fn estimate(&self, request: &EstimateRequest) -> Result<PathStats, EstimatorError> {
        self.seen
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request.clone());
        if self.responses.is_empty() {
            return Ok(PathStats::ZERO);
        }
        let i = self.next.fetch_add(1, Ordering::Relaxed) % self.responses.len();
        Ok(self.responses[i])
    }
}

// ---------------------------------------------------------------------------
// Cancellation
// ---------------------------------------------------------------------------

/// Shared flag that wakes a waiting estimator request early.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    inner: Arc<(Mutex<bool>, Condvar)>,
}

impl CancelToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel every current and future wait on this token.
    pub fn cancel(&self) {
        let (flag, cvar) = &*self.inner;
        *flag.lock().unwrap_or_else(PoisonError::into_inner) = true;
        cvar.notify_all();
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        *self.inner.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Sleep for up to `interval`; returns `true` if cancelled.
    fn wait(&self, interval: Duration) -> bool {
        let (flag, cvar) = &*self.inner;
        let guard = flag.lock().unwrap_or_else(PoisonError::into_inner);
        let (guard, _) = cvar
            .wait_timeout_while(guard, interval, |cancelled| !*cancelled)
            .unwrap_or_else(PoisonError::into_inner);
        *guard
    }
}

// ---------------------------------------------------------------------------
// File estimator
// ---------------------------------------------------------------------------

/// Blocking file-based request/response client.
#[derive(Debug, Clone)]
pub struct FileEstimator {
    request_path: PathBuf,
    response_path: PathBuf,
    poll_interval: Duration,
    timeout: Option<Duration>,
    cancel: CancelToken,
}

impl FileEstimator {
    #[must_use]
    pub fn new(request_path: impl Into<PathBuf>, response_path: impl Into<PathBuf>) -> Self {
        Self::from_config(&EstimatorConfig {
            request_path: request_path.into(),
            response_path: response_path.into(),
            ..EstimatorConfig::default()
        })
    }

    #[must_use]
    pub fn from_config(config: &EstimatorConfig) -> Self {
        Self {
            request_path: config.request_path.clone(),
            response_path: config.response_path.clone(),
            poll_interval: config.poll_interval(),
            timeout: config.timeout(),
            cancel: CancelToken::new(),
        }
    }

    #[must_use]
    pub const fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    #[must_use]
    pub const fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = token;
        self
    }

    /// Token that cancels this estimator's waits.
    #[must_use]
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    fn discard_stale_response(&self) -> Result<(), EstimatorError> {
        match fs::remove_file(&self.response_path) {
            Ok(()) => {
                warn!(path = %self.response_path.display(), "discarded stale estimator response");
                Ok(())
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(EstimatorError::io("remove", &self.response_path, err)),
        }
    }

    fn wait_for_response(&self) -> Result<(), EstimatorError> {
        let path = &self.response_path;
        let start = Instant::now();
        loop {
            let ready = path
                .try_exists()
                .map_err(|err| EstimatorError::io("probe", path, err))?;
            if ready {
                return Ok(());
            }

            let mut interval = self.poll_interval;
            if let Some(timeout) = self.timeout {
                let waited = start.elapsed();
                if waited >= timeout {
                    return Err(EstimatorError::Timeout {
                        path: path.clone(),
                        waited,
                    });
                }
                interval = interval.min(timeout - waited);
            }

            debug!(path = %path.display(), "waiting for estimator response");
            if self.cancel.wait(interval) {
                return Err(EstimatorError::Cancelled { path: path.clone() });
            }
        }
    }
}

impl Estimator for FileEstimator {
    #[instrument(level = "debug", skip_all, fields(entry = %request.entry, exit = %request.exit))]
    fn estimate(&self, request: &EstimateRequest) -> Result<PathStats, EstimatorError> {
        if self.cancel.is_cancelled() {
            return Err(EstimatorError::Cancelled {
                path: self.response_path.clone(),
            });
        }

        self.discard_stale_response()?;
        fs::write(&self.request_path, &request.artifact)
            .map_err(|err| EstimatorError::io("write", &self.request_path, err))?;

        self.wait_for_response()?;

        let text = fs::read_to_string(&self.response_path)
            .map_err(|err| EstimatorError::io("read", &self.response_path, err))?;
        fs::remove_file(&self.response_path)
            .map_err(|err| EstimatorError::io("remove", &self.response_path, err))?;

        let stats = parse_response(&text);
        debug!(count = stats.count, length = stats.total_length, "estimator answered");
        Ok(stats)
    }
}
