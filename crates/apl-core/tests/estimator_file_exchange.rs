//! File-based estimator exchange against a simulated external process.

use std::fs;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use apl_core::config::{AplConfig, ResolutionPolicy};
use apl_core::estimator::{EstimatorError, FileEstimator};
use apl_core::graph::Graph;
use apl_core::{AplError, ErrorCode, Query};

fn config_in(dir: &Path, timeout_ms: Option<u64>) -> AplConfig {
    let mut config = AplConfig::default();
    config.decompose.policy = ResolutionPolicy::Estimated;
    config.estimator.request_path = dir.join("subgraph.txt");
    config.estimator.response_path = dir.join("results.txt");
    config.estimator.poll_interval_ms = 10;
    config.estimator.timeout_ms = timeout_ms;
    config
}

/// Answer one request with `answer`, returning the request text.
fn respond_once(request: PathBuf, response: PathBuf, answer: &'static str) -> thread::JoinHandle<String> {
    thread::spawn(move || {
        let deadline = Instant::now() + Duration::from_secs(10);
        while !request.exists() {
            assert!(Instant::now() < deadline, "no request arrived");
            thread::sleep(Duration::from_millis(5));
        }
        let text = fs::read_to_string(&request).expect("read request");
        let staging = response.with_extension("tmp");
        fs::write(&staging, answer).expect("write response");
        fs::rename(&staging, &response).expect("publish response");
        text
    })
}

#[test]
fn estimated_policy_round_trip() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = config_in(dir.path(), Some(10_000));
    let responder = respond_once(
        config.estimator.request_path.clone(),
        config.estimator.response_path.clone(),
        "3 9\n",
    );

    let g = Graph::from_edges([("A", "B"), ("B", "A"), ("B", "C")]);
    let report = Query::new(&g)
        .config(config.clone())
        .run(&"A", &"C")
        .expect("query");

    let request = responder.join().expect("responder");
    assert_eq!(request, "A B\nA B\nB\n");
    assert_eq!(report.result.count, 3.0);
    assert_eq!(report.result.average_length, 4.0);
    assert!(!config.estimator.response_path.exists(), "response is consumed");
}

#[test]
fn stale_response_is_not_mistaken_for_answer() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = config_in(dir.path(), Some(200));
    fs::write(&config.estimator.response_path, "1000 1000\n").expect("seed stale");

    let g = Graph::from_edges([("A", "B"), ("B", "A"), ("B", "C")]);
    let err = Query::new(&g)
        .config(config)
        .run(&"A", &"C")
        .expect_err("stale file must be ignored");
    assert_eq!(err.code(), ErrorCode::EstimatorTimeout);
}

#[test]
fn silent_estimator_times_out() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = config_in(dir.path(), Some(50));

    let g = Graph::from_edges([("A", "B"), ("B", "A"), ("B", "C")]);
    let err = Query::new(&g)
        .config(config.clone())
        .run(&"A", &"C")
        .expect_err("timeout");
    assert!(matches!(
        err,
        AplError::Estimator(EstimatorError::Timeout { .. })
    ));
    assert!(config.estimator.request_path.exists(), "request was written");
}

#[test]
fn cancelled_token_aborts_waiting_query() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = config_in(dir.path(), None);
    let estimator = FileEstimator::from_config(&config.estimator);
    let token = estimator.cancel_token();

    let canceller = thread::spawn(move || {
        thread::sleep(Duration::from_millis(50));
        token.cancel();
    });

    let g = Graph::from_edges([("A", "B"), ("B", "A"), ("B", "C")]);
    let err = Query::new(&g)
        .config(config)
        .estimator(&estimator)
        .run(&"A", &"C")
        .expect_err("cancelled");
    canceller.join().expect("canceller");
    assert_eq!(err.code(), ErrorCode::EstimatorCancelled);
}
