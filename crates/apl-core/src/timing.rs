//! Per-stage timing for queries.
//!
//! Stages are recorded under stable names (`apl.partition`, `apl.decompose`,
//! `apl.count`). Recursive decomposition records one sample per level, so a
//! stage's count is also the number of graphs it ran on.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use serde::Serialize;

/// Aggregated timing across instrumented stages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimingReport {
    pub stages: Vec<StageTiming>,
}

/// Timing statistics for one named stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageTiming {
    pub name: String,
    pub count: usize,
    pub total: Duration,
    pub max: Duration,
}

thread_local! {
    static SAMPLES: RefCell<Vec<(&'static str, Duration)>> = const { RefCell::new(Vec::new()) };
}

static TIMING_ENABLED: AtomicBool = AtomicBool::new(false);

/// Returns true when `APL_TIMING` enables timing collection.
///
/// Supported truthy values: `1`, `true`, `yes`, `on` (case-insensitive).
#[must_use]
pub fn timing_enabled_from_env() -> bool {
    std::env::var("APL_TIMING")
        .ok()
        .is_some_and(|value| is_truthy(value.as_str()))
}

pub fn set_timing_enabled(enabled: bool) {
    TIMING_ENABLED.store(enabled, Ordering::Relaxed);
    if !enabled {
        clear_timings();
    }
}

#[must_use]
pub fn is_timing_enabled() -> bool {
    TIMING_ENABLED.load(Ordering::Relaxed)
}

/// Clears all recorded timings for the current thread.
pub fn clear_timings() {
    SAMPLES.with(|samples| samples.borrow_mut().clear());
}

/// Execute a closure while recording its duration under `name`.
pub fn timed<R>(name: &'static str, f: impl FnOnce() -> R) -> R {
    if !is_timing_enabled() {
        return f();
    }

    let started = Instant::now();
    let result = f();
    record_sample(name, started.elapsed());
    result
}

/// Drain the current thread's samples into a report.
#[must_use]
pub fn collect_report() -> TimingReport {
    let samples = SAMPLES.with(|samples| std::mem::take(&mut *samples.borrow_mut()));

    let mut grouped: BTreeMap<&'static str, Vec<Duration>> = BTreeMap::new();
    for (name, elapsed) in samples {
        grouped.entry(name).or_default().push(elapsed);
    }

    let stages = grouped
        .into_iter()
        .map(|(name, values)| StageTiming {
            name: name.to_string(),
            count: values.len(),
            total: values.iter().sum(),
            max: values.iter().copied().max().unwrap_or_default(),
        })
        .collect();

    TimingReport { stages }
}

impl TimingReport {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Render the report as a table for terminal output.
    #[must_use]
    pub fn display_table(&self) -> String {
        if self.stages.is_empty() {
            return "No timing samples recorded.".to_string();
        }

        let mut out = String::new();
        out.push_str("stage                count      total        max\n");
        out.push_str("-------------------------------------------------\n");
        for stage in &self.stages {
            let _ = writeln!(
                out,
                "{:<18} {:>7} {:>10} {:>10}",
                stage.name,
                stage.count,
                format_duration(stage.total),
                format_duration(stage.max)
            );
        }
        out
    }
}

fn record_sample(name: &'static str, elapsed: Duration) {
    SAMPLES.with(|samples| samples.borrow_mut().push((name, elapsed)));
}

fn format_duration(duration: Duration) -> String {
    let micros = duration.as_micros();

    if micros >= 1_000_000 {
        let secs = micros / 1_000_000;
        let millis = (micros % 1_000_000) / 1_000;
        format!("{secs}.{millis:03}s")
    } else if micros >= 1_000 {
        let millis = micros / 1_000;
        let rem = micros % 1_000;
        format!("{millis}.{rem:03}ms")
    } else {
        format!("{micros}µs")
    }
}

fn is_truthy(value: &str) -> bool {
    ["1", "true", "yes", "on"]
        .iter()
        .any(|t| value.eq_ignore_ascii_case(t))
}
