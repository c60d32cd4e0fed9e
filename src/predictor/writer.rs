//! Prediction files.
//!
//! A prediction file is a JSON array of [`Prediction`] records. Failures of
//! the same run go to a sidecar next to it, `<stem>.failures.json`, so the
//! prediction file only ever holds real scores.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::info;

use crate::types::{Prediction, PredictionFailure, PredictionRun};
use crate::{Result, StanceError};

/// Suffix of failure sidecar files.
pub const FAILURES_SUFFIX: &str = ".failures.json";

/// Serialize `value` as pretty JSON (atomic write via tmp + rename).
pub fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| {
            StanceError::Configuration(format!(
                "failed to create output dir {}: {e}",
                parent.display()
            ))
        })?;
    }

    let tmp_path = path.with_extension("json.tmp");
    let mut json = serde_json::to_string_pretty(value)?;
    json.push('\n');
    fs::write(&tmp_path, &json)?;
    fs::rename(&tmp_path, path)?;
    Ok(())
}

/// Sidecar path for the failures of the run written to `output`.
pub fn failures_path(output: &Path) -> PathBuf {
    let stem = output
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    output.with_file_name(format!("{stem}{FAILURES_SUFFIX}"))
}

/// Whether `path` names a failure sidecar rather than a prediction file.
pub fn is_failures_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.ends_with(FAILURES_SUFFIX))
}

pub fn write_predictions(path: &Path, predictions: &[Prediction]) -> Result<()> {
    write_json_atomic(path, predictions)
}

pub fn write_failures(path: &Path, failures: &[PredictionFailure]) -> Result<()> {
    write_json_atomic(path, failures)
}

/// Write a run's predictions to `output` and its failures to the sidecar.
///
/// The sidecar is always written, empty when nothing failed, so a stale
/// one from an earlier run never survives.
pub fn write_run(output: &Path, run: &PredictionRun) -> Result<()> {
    write_predictions(output, &run.predictions)?;
    let sidecar = failures_path(output);
    write_failures(&sidecar, &run.failures)?;
    info!(
        strategy = %run.strategy,
        predictions = run.predictions.len(),
        failures = run.failures.len(),
        output = %output.display(),
        "wrote predictions"
    );
    Ok(())
}

/// Read a prediction file.
pub fn read_predictions(path: &Path) -> Result<Vec<Prediction>> {
    let content = fs::read_to_string(path).map_err(|e| {
        StanceError::Configuration(format!("failed to read predictions {path:?}: {e}"))
    })?;
    serde_json::from_str(&content).map_err(|e| {
        StanceError::Configuration(format!("invalid prediction file {path:?}: {e}"))
    })
}

/// Read a failure sidecar.
pub fn read_failures(path: &Path) -> Result<Vec<PredictionFailure>> {
    let content = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}
