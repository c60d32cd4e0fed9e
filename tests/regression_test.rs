use stancelab::predictor::regression::{STRATEGY_NAME, TrainingConfig};
use stancelab::{Document, StanceError, StanceRegressor};

/// Small separable corpus: "renewable" abstracts support, "coal" abstracts oppose.
fn corpus() -> Vec<Document> {
    let mut docs = Vec::new();
    for i in 0..30 {
        docs.push(Document::new(
            format!("p{i}"),
            format!("Renewable solar storage study {i}"),
            "We show renewable energy reduces emissions and improves sustainability.",
            0.8,
        ));
        docs.push(Document::new(
            format!("n{i}"),
            format!("Coal combustion plant {i}"),
            "Burning coal increases pollution and harms the climate.",
            -0.8,
        ));
    }
    docs
}

fn config() -> TrainingConfig {
    TrainingConfig {
        epochs: 40,
        batch_size: 8,
        learning_rate: 0.1,
        ..TrainingConfig::default()
    }
}

#[test]
fn learns_separable_stances() {
    let (model, report) = StanceRegressor::train(&corpus(), &config()).unwrap();

    assert_eq!(report.validation_size, 12);
    assert_eq!(report.train_size, 48);
    assert!(report.validation_mae.unwrap() < 0.3, "{report:?}");

    let pro = Document::new("x", "Renewable solar", "renewable energy sustainability", 0.0);
    let con = Document::new("y", "Coal plant", "coal pollution", 0.0);
    assert!(model.predict(&pro) > 0.3);
    assert!(model.predict(&con) < -0.3);
}

#[test]
fn predictions_stay_in_range() {
    let (model, _) = StanceRegressor::train(&corpus(), &config()).unwrap();
    for doc in corpus() {
        let score = model.predict(&doc);
        assert!((-1.0..=1.0).contains(&score));
    }
}

#[test]
fn training_is_reproducible() {
    let (a, ra) = StanceRegressor::train(&corpus(), &config()).unwrap();
    let (b, rb) = StanceRegressor::train(&corpus(), &config()).unwrap();
    assert_eq!(ra, rb);
    let doc = &corpus()[3];
    assert_eq!(a.predict(doc), b.predict(doc));
}

#[test]
fn blank_document_scores_zero() {
    let (model, _) = StanceRegressor::train(&corpus(), &config()).unwrap();
    assert_eq!(model.predict(&Document::new("b", "  ", "", 0.5)), 0.0);
}

#[test]
fn empty_training_set_is_configuration_error() {
    let err = StanceRegressor::train(&[], &TrainingConfig::default()).unwrap_err();
    assert!(matches!(err, StanceError::Configuration(_)));
}

#[test]
fn save_and_load_keep_predictions() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("model.json");
    let (model, _) = StanceRegressor::train(&corpus(), &config()).unwrap();
    model.save(&path).unwrap();

    let loaded = StanceRegressor::load(&path).unwrap();
    assert_eq!(loaded.vocabulary_size(), model.vocabulary_size());
    for doc in corpus().iter().take(5) {
        assert_eq!(loaded.predict(doc), model.predict(doc));
    }
}

#[test]
fn predict_all_labels_strategy() {
    let (model, _) = StanceRegressor::train(&corpus(), &config()).unwrap();
    let docs = corpus();
    let predictions = model.predict_all(&docs);
    assert_eq!(predictions.len(), docs.len());
    assert!(predictions.iter().all(|p| p.strategy == STRATEGY_NAME));
    assert_eq!(predictions[0].id, "p0");
}

#[test]
fn no_validation_split() {
    let config = TrainingConfig {
        validation_split: 0.0,
        ..config()
    };
    let (_, report) = StanceRegressor::train(&corpus(), &config).unwrap();
    assert_eq!(report.validation_size, 0);
    assert_eq!(report.validation_mae, None);
}
