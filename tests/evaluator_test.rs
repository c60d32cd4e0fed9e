use std::fs;

use stancelab::eval::{MERGED_JSON, RESULTS_TEXT, SUMMARY_JSON};
use stancelab::predictor::writer::{failures_path, write_predictions, write_run};
use stancelab::{
    BinScheme, Document, Evaluator, Prediction, PredictionFailure, PredictionRun, PredictionSet,
    StanceError,
};

fn gold() -> Vec<Document> {
    vec![
        Document::new("1", "Wind farms", "Clean power.", 1.0),
        Document::new("2", "Oil sands", "More extraction.", -1.0),
    ]
}

fn set(strategy: &str, scores: &[(&str, f64)]) -> PredictionSet {
    PredictionSet::new(
        strategy,
        scores
            .iter()
            .map(|(id, s)| Prediction::new(*id, strategy, *s))
            .collect(),
    )
}

#[test]
fn two_document_scenario() {
    let report = Evaluator::new(BinScheme::three_way())
        .evaluate(&gold(), &[set("zero-shot", &[("1", 0.9), ("2", -0.8)])])
        .unwrap();

    let summary = report.strategy("zero-shot").unwrap();
    assert_eq!(summary.evaluated, 2);
    assert_eq!(summary.excluded, 0);
    let classification = summary.classification.as_ref().unwrap();
    assert!((classification.accuracy - 1.0).abs() < 1e-12);
    let regression = summary.regression.as_ref().unwrap();
    assert!((regression.mae - 0.15).abs() < 1e-9);
}

#[test]
fn missing_prediction_is_excluded_and_merged_as_null() {
    let report = Evaluator::new(BinScheme::three_way())
        .evaluate(&gold(), &[set("zero-shot", &[("1", 0.9)])])
        .unwrap();

    let summary = report.strategy("zero-shot").unwrap();
    assert_eq!(summary.evaluated, 1);
    assert_eq!(summary.excluded, 1);
    // A single pair has no defined correlation.
    assert_eq!(summary.regression.as_ref().unwrap().pearson, None);

    assert_eq!(report.merged[1].id, "2");
    assert_eq!(report.merged[1].predictions["zero-shot"], None);
    assert_eq!(report.merged[0].predictions["zero-shot"], Some(0.9));
}

#[test]
fn strategy_without_predictions_has_no_metrics() {
    let report = Evaluator::new(BinScheme::three_way())
        .evaluate(&gold(), &[set("zero-shot", &[])])
        .unwrap();
    let summary = report.strategy("zero-shot").unwrap();
    assert_eq!(summary.excluded, 2);
    assert!(summary.classification.is_none());
    assert!(summary.regression.is_none());
    assert!(report.to_text().contains("No predictions to evaluate."));
}

#[test]
fn unknown_id_is_data_integrity_error() {
    let err = Evaluator::default()
        .evaluate(&gold(), &[set("zero-shot", &[("1", 0.9), ("99", 0.1)])])
        .unwrap_err();
    assert!(matches!(err, StanceError::DataIntegrity(_)));
}

#[test]
fn duplicate_prediction_is_data_integrity_error() {
    let err = Evaluator::default()
        .evaluate(&gold(), &[set("zero-shot", &[("1", 0.9), ("1", 0.8)])])
        .unwrap_err();
    assert!(matches!(err, StanceError::DataIntegrity(_)));
}

#[test]
fn duplicate_gold_id_is_data_integrity_error() {
    let mut gold = gold();
    gold.push(Document::new("1", "Again", "Same id.", 0.0));
    let err = Evaluator::default().evaluate(&gold, &[]).unwrap_err();
    assert!(matches!(err, StanceError::DataIntegrity(_)));
}

#[test]
fn five_way_scheme_bins_both_sides() {
    let report = Evaluator::new(BinScheme::five_way())
        .evaluate(&gold(), &[set("few-shot-10", &[("1", 0.5), ("2", -0.9)])])
        .unwrap();
    let classification = report.strategy("few-shot-10").unwrap().classification.clone().unwrap();
    // Gold 1.0 is strongly supporting; 0.5 is only supporting.
    assert!((classification.accuracy - 0.5).abs() < 1e-12);
    assert_eq!(classification.confusion_matrix.labels.len(), 6);
}

#[test]
fn load_dir_skips_failure_sidecars_and_sorts() {
    let dir = tempfile::tempdir().unwrap();
    let mut run = PredictionRun::new("zero-shot");
    run.predictions.push(Prediction::new("1", "zero-shot", 0.9));
    run.failures.push(PredictionFailure::from_error(
        "2",
        "zero-shot",
        &StanceError::Parse("?".into()),
    ));
    write_run(&dir.path().join("zero-shot.json"), &run).unwrap();
    write_predictions(
        &dir.path().join("chain-of-stance.json"),
        &[Prediction::new("2", "chain-of-stance", -0.5)],
    )
    .unwrap();
    assert!(failures_path(&dir.path().join("zero-shot.json")).exists());

    let sets = PredictionSet::load_dir(dir.path()).unwrap();
    let names: Vec<&str> = sets.iter().map(|s| s.strategy.as_str()).collect();
    assert_eq!(names, vec!["chain-of-stance", "zero-shot"]);
}

#[test]
fn empty_predictions_dir_is_configuration_error() {
    let dir = tempfile::tempdir().unwrap();
    assert!(matches!(
        PredictionSet::load_dir(dir.path()),
        Err(StanceError::Configuration(_))
    ));
}

#[test]
fn outputs_are_written_and_reproducible() {
    let sets = [
        set("zero-shot", &[("1", 0.9), ("2", -0.8)]),
        set("regression", &[("1", 0.2)]),
    ];
    let evaluator = Evaluator::new(BinScheme::three_way());

    let first = tempfile::tempdir().unwrap();
    let second = tempfile::tempdir().unwrap();
    evaluator.evaluate(&gold(), &sets).unwrap().write(first.path()).unwrap();
    evaluator.evaluate(&gold(), &sets).unwrap().write(second.path()).unwrap();

    for name in [RESULTS_TEXT, SUMMARY_JSON, MERGED_JSON] {
        let a = fs::read(first.path().join(name)).unwrap();
        let b = fs::read(second.path().join(name)).unwrap();
        assert_eq!(a, b, "{name} differs between runs");
    }

    let summary: serde_json::Value =
        serde_json::from_slice(&fs::read(first.path().join(SUMMARY_JSON)).unwrap()).unwrap();
    assert_eq!(summary["gold_documents"], 2);
    assert_eq!(summary["strategies"][1]["strategy"], "regression");
    assert_eq!(summary["strategies"][1]["excluded"], 1);

    let merged: serde_json::Value =
        serde_json::from_slice(&fs::read(first.path().join(MERGED_JSON)).unwrap()).unwrap();
    assert!(merged[1]["predictions"]["regression"].is_null());
    assert_eq!(merged[0]["gold_bin"], "supporting");

    let text = fs::read_to_string(first.path().join(RESULTS_TEXT)).unwrap();
    assert!(text.contains("== zero-shot =="));
    assert!(text.contains("MAE: 0.1500"));
}

#[test]
fn rerun_into_predictions_dir_ignores_previous_report() {
    let dir = tempfile::tempdir().unwrap();
    write_predictions(
        &dir.path().join("zero-shot.json"),
        &[
            Prediction::new("1", "zero-shot", 0.9),
            Prediction::new("2", "zero-shot", -0.8),
        ],
    )
    .unwrap();
    let evaluator = Evaluator::new(BinScheme::three_way());

    let sets = PredictionSet::load_dir(dir.path()).unwrap();
    evaluator.evaluate(&gold(), &sets).unwrap().write(dir.path()).unwrap();
    let first = fs::read(dir.path().join(SUMMARY_JSON)).unwrap();

    let sets = PredictionSet::load_dir(dir.path()).unwrap();
    assert_eq!(sets.len(), 1);
    evaluator.evaluate(&gold(), &sets).unwrap().write(dir.path()).unwrap();
    assert_eq!(fs::read(dir.path().join(SUMMARY_JSON)).unwrap(), first);
}
