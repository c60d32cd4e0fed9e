//! Tests for metrics integration.
//!
//! Uses `metrics_util::debugging::DebuggingRecorder` to capture and assert
//! on emitted metrics without needing a real exporter.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use metrics_util::MetricKind;
use metrics_util::debugging::{DebugValue, DebuggingRecorder};

use stancelab::providers::ChatProvider;
use stancelab::telemetry;
use stancelab::{
    BinScheme, ChatResponse, Document, Evaluator, GenerateOptions, Message, Prediction,
    PredictionSet, PromptingPredictor, Result, RetryConfig, RetryingChatProvider, StanceError,
    Strategy,
};

// ============================================================================
// Mock providers
// ============================================================================

/// Fails the first call with a transient error, then answers in turn.
struct Flaky {
    calls: AtomicU32,
}

#[async_trait]
impl ChatProvider for Flaky {
    fn name(&self) -> &str {
        "flaky"
    }

    async fn chat(&self, _messages: &[Message], _options: &GenerateOptions) -> Result<ChatResponse> {
        match self.calls.fetch_add(1, Ordering::Relaxed) {
            0 => Err(StanceError::Http("connection reset".into())),
            1 => Ok(ChatResponse::text("0.5")),
            _ => Ok(ChatResponse::text("no number here")),
        }
    }
}

// ============================================================================
// Snapshot type alias for readability
// ============================================================================

type SnapshotVec = Vec<(
    metrics_util::CompositeKey,
    Option<metrics::Unit>,
    Option<metrics::SharedString>,
    DebugValue,
)>;

// ============================================================================
// Helpers
// ============================================================================

/// Sum all counter values matching a given metric name.
fn counter_total(snapshot: &SnapshotVec, name: &str) -> u64 {
    snapshot
        .iter()
        .filter(|(key, _, _, _)| key.kind() == MetricKind::Counter && key.key().name() == name)
        .map(|(_, _, _, value)| match value {
            DebugValue::Counter(v) => *v,
            _ => 0,
        })
        .sum()
}

/// Sum counter values for a name whose labels include `label = value`.
fn counter_with_label(snapshot: &SnapshotVec, name: &str, label: &str, value: &str) -> u64 {
    snapshot
        .iter()
        .filter(|(key, _, _, _)| {
            key.kind() == MetricKind::Counter
                && key.key().name() == name
                && key
                    .key()
                    .labels()
                    .any(|l| l.key() == label && l.value() == value)
        })
        .map(|(_, _, _, v)| match v {
            DebugValue::Counter(v) => *v,
            _ => 0,
        })
        .sum()
}

/// Check if any histogram entries exist for a given metric name.
fn has_histogram(snapshot: &SnapshotVec, name: &str) -> bool {
    snapshot
        .iter()
        .any(|(key, _, _, _)| key.kind() == MetricKind::Histogram && key.key().name() == name)
}

// ============================================================================
// Tests
// ============================================================================

/// Runs async code within a local recorder scope on the multi-thread runtime.
///
/// `block_in_place` ensures the sync `with_local_recorder` closure stays
/// on the current thread while `block_on` drives the inner async work.
#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn prompting_run_records_request_retry_and_prediction_metrics() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();

    let run = metrics::with_local_recorder(&recorder, || {
        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async {
                let provider = RetryingChatProvider::new(
                    Arc::new(Flaky {
                        calls: AtomicU32::new(0),
                    }),
                    RetryConfig::new()
                        .max_attempts(3)
                        .initial_delay(Duration::from_millis(1))
                        .jitter(false),
                );
                let docs = vec![
                    Document::new("1", "a", "b", 0.0),
                    Document::new("2", "c", "d", 0.0),
                ];
                PromptingPredictor::new(
                    Arc::new(provider),
                    Strategy::ZeroShot,
                    GenerateOptions::new("test"),
                )
                .predict_all(&docs)
                .await
            })
        })
    });
    let run = run.unwrap();
    assert_eq!(run.predictions.len(), 1);

    let snapshot = snapshotter.snapshot().into_vec();

    assert_eq!(counter_total(&snapshot, telemetry::REQUESTS_TOTAL), 3);
    assert_eq!(
        counter_with_label(&snapshot, telemetry::REQUESTS_TOTAL, "status", "error"),
        1
    );
    assert_eq!(counter_total(&snapshot, telemetry::RETRIES_TOTAL), 1);
    assert!(
        has_histogram(&snapshot, telemetry::REQUEST_DURATION_SECONDS),
        "expected a duration histogram entry"
    );
    assert_eq!(
        counter_with_label(&snapshot, telemetry::PREDICTIONS_TOTAL, "status", "ok"),
        1
    );
    assert_eq!(
        counter_with_label(&snapshot, telemetry::PREDICTIONS_TOTAL, "status", "parse_error"),
        1
    );
}

#[test]
fn evaluation_records_excluded_documents() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();

    let gold = vec![
        Document::new("1", "a", "b", 0.5),
        Document::new("2", "c", "d", -0.5),
        Document::new("3", "e", "f", 0.0),
    ];
    let sets = vec![PredictionSet::new(
        "zero-shot",
        vec![Prediction::new("1", "zero-shot", 0.4)],
    )];

    let report = metrics::with_local_recorder(&recorder, || {
        Evaluator::new(BinScheme::three_way()).evaluate(&gold, &sets)
    })
    .unwrap();
    assert_eq!(report.strategies[0].excluded, 2);

    let snapshot = snapshotter.snapshot().into_vec();
    assert_eq!(counter_total(&snapshot, telemetry::EXCLUDED_TOTAL), 2);
}
