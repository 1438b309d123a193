//! End-to-end tests for the ML module

use super::*;
use crate::error::ErrorKind;
use crate::types::RawRow;
use serde_json::{json, Value};
use std::sync::Arc;

const PITCH_TYPES: [&str; 4] = ["FF", "SL", "CH", "CU"];

/// 60 balls in play followed by 40 whiffs, plus a few unmodeled pitches
fn pitcher_rows() -> Vec<RawRow> {
    let mut rows: Vec<RawRow> = (0..100)
        .map(|i| {
            let whiff = i >= 60;
            let outcome = if whiff { "swinging_strike" } else { "hit_into_play" };
            pitch_row(i, PITCH_TYPES[i % 4], outcome)
        })
        .collect();
    rows.insert(10, pitch_row(3, "FF", "ball"));
    rows.insert(50, pitch_row(7, "SL", "foul"));
    rows
}

fn pitch_row(i: usize, pitch_type: &str, description: &str) -> RawRow {
    let whiff = description == "swinging_strike";
    let break_x = if whiff { 4.0 } else { -2.0 };
    let v = json!({
        "pitch_type": pitch_type,
        "release_speed": 86.0 + (i % 13) as f64 * 0.7,
        "release_pos_x": -1.5 - (i % 5) as f64 * 0.1,
        "release_pos_y": 54.0 + (i % 3) as f64 * 0.2,
        "release_spin_rate": 2100 + (i % 17) * 25,
        "spin_axis": 180 + (i % 9) * 10,
        "p_throws": if i % 3 == 0 { "L" } else { "R" },
        "plate_x": (i % 11) as f64 / 10.0 - 0.5 + if whiff { 0.6 } else { 0.0 },
        "plate_z": 2.0 + (i % 7) as f64 / 10.0,
        "vx0": 4.0 + (i % 4) as f64,
        "vy0": -130.0 - (i % 6) as f64,
        "vz0": -5.0 + (i % 8) as f64 * 0.3,
        "ax": -8.0 + break_x,
        "ay": 28.0 + (i % 5) as f64,
        "az": -15.0 + (i % 10) as f64 * 0.4,
        "description": description,
        "game_date": "2017-06-01",
        "player_name": "Sale, Chris"
    });
    match v {
        Value::Object(map) => map,
        _ => unreachable!(),
    }
}

#[test]
fn test_logistic_regression_end_to_end() {
    let table = FeatureSelector::default().select(&pitcher_rows()).unwrap();
    assert_eq!(table.len(), 100);

    let trainer = ModelTrainerEvaluator::default();
    let (pipeline, report) = trainer.train(&table, ModelType::LogisticRegression).unwrap();
    assert!((0.0..=1.0).contains(&report.accuracy));
    assert_eq!(report.train_rows, 90);
    assert_eq!(report.test_rows, 10);

    let registry = Arc::new(ModelRegistry::new());
    let id = registry.register(pipeline);
    let service = PredictionService::new(registry);

    let split = trainer.splitter().split(&table, LABEL_COLUMN).unwrap();
    let held_out = split.test_features.to_records();
    assert_eq!(held_out.len(), 10);

    let response = service.predict(&id.to_string(), &held_out).unwrap();
    assert_eq!(response.prediction.len(), 10);
    assert_eq!(response.prediction_probas.len(), 10);
    for (label, probas) in response.prediction.iter().zip(&response.prediction_probas) {
        assert_eq!(probas.len(), 2);
        assert!((probas.iter().sum::<f64>() - 1.0).abs() < 1e-6);
        assert!(MODELED_OUTCOMES.contains(&label.as_str()));
    }
}

#[test]
fn test_every_model_type_trains() {
    let table = FeatureSelector::default().select(&pitcher_rows()).unwrap();
    let trainer = ModelTrainerEvaluator::default();

    for model_type in ModelType::ALL {
        let (pipeline, report) = trainer.train(&table, model_type).unwrap();
        assert_eq!(pipeline.model_name(), model_type.as_str());
        assert!((0.0..=1.0).contains(&report.accuracy), "{}", model_type);
        assert_eq!(report.classes, vec!["hit_into_play", "swinging_strike"]);
    }
}

#[test]
fn test_unsupported_model_type_is_invalid_input() {
    let table = FeatureSelector::default().select(&pitcher_rows()).unwrap();
    let err = ModelTrainerEvaluator::default()
        .train_named(&table, "unsupported_model")
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::InvalidInput);
    assert!(err.to_string().contains("invalid model type"));
}

#[test]
fn test_unregistered_uuid_is_not_found() {
    let service = PredictionService::new(Arc::new(ModelRegistry::new()));
    let rows = vec![pitch_row(0, "FF", "hit_into_play")];

    let err = service
        .predict("00000000-0000-4000-8000-000000000000", &rows)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn test_unknown_category_still_predicts() {
    let table = FeatureSelector::default().select(&pitcher_rows()).unwrap();
    let (pipeline, _) = ModelTrainerEvaluator::default()
        .train(&table, ModelType::RandomForest)
        .unwrap();

    let mut row = pitch_row(5, "EP", "hit_into_play");
    row.remove(LABEL_COLUMN);
    let response = predict_with(&pipeline, &[row]).unwrap();

    assert_eq!(response.prediction.len(), 1);
    let probas = &response.prediction_probas[0];
    assert!(probas.iter().all(|p| (0.0..=1.0).contains(p)));
    assert!((probas.iter().sum::<f64>() - 1.0).abs() < 1e-6);
}

#[test]
fn test_missing_feature_is_invalid_input() {
    let table = FeatureSelector::default().select(&pitcher_rows()).unwrap();
    let (pipeline, _) = ModelTrainerEvaluator::default()
        .train(&table, ModelType::LogisticRegression)
        .unwrap();

    let mut no_column = pitch_row(1, "FF", "hit_into_play");
    no_column.remove("vz0");
    let err = predict_with(&pipeline, &[no_column]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);

    let mut null_value = pitch_row(1, "FF", "hit_into_play");
    null_value.insert("plate_x".to_string(), Value::Null);
    let err = predict_with(&pipeline, &[null_value]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);
}

#[test]
fn test_selection_without_modeled_rows_cannot_train() {
    let rows: Vec<RawRow> = (0..5).map(|i| pitch_row(i, "FF", "called_strike")).collect();
    let table = FeatureSelector::default().select(&rows).unwrap();
    assert!(table.is_empty());

    let err = ModelTrainerEvaluator::default()
        .train(&table, ModelType::GradientBoosting)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DataQuality);
}

#[test]
fn test_training_is_reproducible() {
    let table = FeatureSelector::default().select(&pitcher_rows()).unwrap();
    let trainer = ModelTrainerEvaluator::default();

    let (a, report_a) = trainer.train(&table, ModelType::RandomForest).unwrap();
    let (b, report_b) = trainer.train(&table, ModelType::RandomForest).unwrap();
    assert_eq!(report_a.accuracy, report_b.accuracy);

    let records = table.to_records();
    assert_eq!(
        predict_with(&a, &records).unwrap(),
        predict_with(&b, &records).unwrap()
    );
}

#[test]
fn test_overflowing_training_values_are_invalid_input() {
    let rows: Vec<RawRow> = pitcher_rows()
        .into_iter()
        .enumerate()
        .map(|(i, mut row)| {
            if i % 2 == 0 {
                row.insert("release_speed".to_string(), json!(1e308));
            }
            row
        })
        .collect();
    let table = FeatureSelector::default().select(&rows).unwrap();

    let err = ModelTrainerEvaluator::default()
        .train(&table, ModelType::LogisticRegression)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);
    assert!(err.to_string().contains("release_speed"));
}

#[test]
fn test_out_of_range_prediction_values_are_invalid_input() {
    let table = FeatureSelector::default().select(&pitcher_rows()).unwrap();
    let (pipeline, _) = ModelTrainerEvaluator::default()
        .train(&table, ModelType::LogisticRegression)
        .unwrap();

    let mut row = pitch_row(2, "FF", "hit_into_play");
    row.insert("release_pos_x".to_string(), json!(1e308));
    let err = predict_with(&pipeline, &[row]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);
    assert!(err.to_string().contains("release_pos_x"));
}
