//! Telemetry metric name constants.
//!
//! Consumers install their own `metrics` recorder; without one, all metric
//! calls are no-ops.
//!
//! # Metric naming conventions
//!
//! All metrics are prefixed with `stancelab_`. Counters end in `_total`,
//! histograms use meaningful units (e.g. `_seconds`).
//!
//! # Common labels
//!
//! - `provider`: provider name (e.g. "ollama")
//! - `operation`: call invoked (e.g. "chat")
//! - `status`: outcome: "ok" or "error"
//! - `strategy`: prediction strategy (e.g. "zero-shot", "regression")

/// Total requests sent to the generative service.
///
/// Labels: `provider`, `operation`, `status` ("ok" | "error").
pub const REQUESTS_TOTAL: &str = "stancelab_requests_total";

/// Request duration in seconds.
///
/// Labels: `provider`, `operation`.
pub const REQUEST_DURATION_SECONDS: &str = "stancelab_request_duration_seconds";

/// Total retry attempts (not counting the initial request).
///
/// Labels: `provider`, `operation`.
pub const RETRIES_TOTAL: &str = "stancelab_retries_total";

/// Total documents processed by a predictor.
///
/// Labels: `strategy`, `status` ("ok" | "call_error" | "parse_error").
pub const PREDICTIONS_TOTAL: &str = "stancelab_predictions_total";

/// Documents excluded from a strategy's metrics for lack of a prediction.
///
/// Labels: `strategy`.
pub const EXCLUDED_TOTAL: &str = "stancelab_excluded_total";

/// Demonstrations that fit into each few-shot prompt.
///
/// Labels: `strategy`.
pub const EXEMPLARS_USED: &str = "stancelab_exemplars_used";
