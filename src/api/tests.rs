use super::*;
use crate::client::MockStatsProvider;
use crate::metrics::FixedClock;
use crate::types::{MetricType, PlayerGeneralMetrics, RawRow, TimelineType};
use chrono::NaiveDate;
use mockall::predicate::eq;
use serde_json::{json, Value};

async fn spawn_app(provider: MockStatsProvider) -> (String, Arc<AppState>) {
    let clock = FixedClock(NaiveDate::from_ymd_opt(2024, 7, 4).unwrap());
    let state = Arc::new(
        AppState::new(Arc::new(provider), Arc::new(ModelRegistry::new()))
            .with_clock(Arc::new(clock)),
    );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = create_router(state.clone());
    tokio::spawn(async move { axum::serve(listener, app).await });

    (format!("http://{}/api/v1", addr), state)
}

async fn get(url: &str) -> (u16, Value) {
    let resp = reqwest::get(url).await.unwrap();
    let status = resp.status().as_u16();
    (status, resp.json().await.unwrap())
}

async fn post(url: &str, body: &Value) -> (u16, Value) {
    let resp = reqwest::Client::new().post(url).json(body).send().await.unwrap();
    let status = resp.status().as_u16();
    (status, resp.json().await.unwrap())
}

fn row(value: Value) -> RawRow {
    match value {
        Value::Object(map) => map,
        _ => panic!("not an object"),
    }
}

fn pitch(i: usize, description: &str) -> Value {
    let whiff = description == "swinging_strike";
    json!({
        "pitch_type": (["FF", "SL", "CH"][i % 3]),
        "release_speed": 88.0 + (i % 9) as f64,
        "release_pos_x": -1.7,
        "release_pos_y": 54.1 + (i % 4) as f64 * 0.1,
        "release_spin_rate": 2200 + (i % 11) * 20,
        "spin_axis": 200 + (i % 5) * 15,
        "p_throws": "L",
        "plate_x": if whiff { 0.9 } else { -0.2 } + (i % 6) as f64 * 0.05,
        "plate_z": 2.2 + (i % 5) as f64 * 0.1,
        "vx0": 5.0,
        "vy0": -131.0 - (i % 3) as f64,
        "vz0": -4.0,
        "ax": if whiff { -3.0 } else { -9.0 },
        "ay": 29.0,
        "az": -14.0 + (i % 7) as f64 * 0.3,
        "description": description,
        "game_date": "2017-06-01"
    })
}

fn training_rows() -> Vec<Value> {
    (0..60)
        .map(|i| pitch(i, if i % 5 < 3 { "hit_into_play" } else { "swinging_strike" }))
        .collect()
}

#[tokio::test]
async fn test_health() {
    let (base, _) = spawn_app(MockStatsProvider::new()).await;
    let health = base.trim_end_matches("/api/v1").to_string() + "/health";

    let resp = reqwest::get(&health).await.unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    assert_eq!(resp.text().await.unwrap(), "OK");
}

#[tokio::test]
async fn test_player_id_lookup() {
    let mut provider = MockStatsProvider::new();
    provider
        .expect_player_id()
        .times(1)
        .returning(|last, first, num| {
            if last == "Sale" && first == "Chris" && num == 0 {
                Ok(519242)
            } else {
                Err(MetricsError::NotFound("no match".to_string()))
            }
        });
    let (base, _) = spawn_app(provider).await;

    let (status, body) = get(&format!("{}/player-id?last_name=Sale&first_name=Chris", base)).await;
    assert_eq!(status, 200);
    assert_eq!(body, json!({ "player_id": 519242 }));
}

#[tokio::test]
async fn test_player_id_missing_name() {
    let (base, _) = spawn_app(MockStatsProvider::new()).await;

    let (status, body) = get(&format!("{}/player-id?last_name=Sale", base)).await;
    assert_eq!(status, 400);
    assert_eq!(body["error"], "Missing last name or first name");
}

#[tokio::test]
async fn test_player_id_not_found() {
    let mut provider = MockStatsProvider::new();
    provider.expect_player_id().returning(|_, _, _| {
        Err(MetricsError::NotFound(
            "Player ID lookup failed. No player found with the given name.".to_string(),
        ))
    });
    let (base, _) = spawn_app(provider).await;

    let (status, body) =
        get(&format!("{}/player-id?last_name=Nobody&first_name=Nope&player_num=2", base)).await;
    assert_eq!(status, 404);
    assert!(body["error"].as_str().unwrap().contains("No player found"));
}

#[tokio::test]
async fn test_general_metrics_rejects_bad_timeline() {
    let (base, _) = spawn_app(MockStatsProvider::new()).await;

    let (status, _) = get(&format!("{}/player-general-metrics", base)).await;
    assert_eq!(status, 400);

    let (status, _) =
        get(&format!("{}/player-general-metrics?player_id=1&timeline_type=decade", base)).await;
    assert_eq!(status, 400);

    let (status, body) = get(&format!("{}/player-general-metrics?player_id=abc", base)).await;
    assert_eq!(status, 400);
    assert!(body["error"].as_str().unwrap().contains("player_id"));
}

#[tokio::test]
async fn test_career_timeline_active_player_uses_today() {
    let mut provider = MockStatsProvider::new();
    provider
        .expect_player_general_metrics()
        .with(eq(519242), eq(TimelineType::Career))
        .returning(|id, _| {
            Ok(PlayerGeneralMetrics {
                id,
                first_name: "Chris".to_string(),
                last_name: "Sale".to_string(),
                active: true,
                mlb_debut: Some("2010-08-06".to_string()),
                last_played: None,
                ..Default::default()
            })
        });
    let (base, _) = spawn_app(provider).await;

    let (status, body) = get(&format!("{}/player-career-timeline?player_id=519242", base)).await;
    assert_eq!(status, 200);
    assert_eq!(
        body,
        json!({ "mlb_debut": "2010-08-06", "last_played": "2024-07-04" })
    );
}

#[tokio::test]
async fn test_career_timeline_from_posted_metrics() {
    let (base, _) = spawn_app(MockStatsProvider::new()).await;

    let retired = json!({
        "id": 112526,
        "first_name": "Bartolo",
        "last_name": "Colon",
        "mlb_debut": "1997-04-04",
        "last_played": "2018-09-30"
    });
    let (status, body) = post(&format!("{}/player-career-timeline", base), &retired).await;
    assert_eq!(status, 200);
    assert_eq!(body["last_played"], "2018-09-30");

    let (status, _) = post(&format!("{}/player-career-timeline", base), &json!({ "id": 1 })).await;
    assert_eq!(status, 400);
}

#[tokio::test]
async fn test_specific_metrics_validation() {
    let (base, _) = spawn_app(MockStatsProvider::new()).await;

    let (status, body) = get(&format!("{}/player-specific-metrics?player_id=1", base)).await;
    assert_eq!(status, 400);
    assert_eq!(body["error"], "Missing required parameters");

    let (status, body) = get(&format!(
        "{}/player-specific-metrics?player_id=1&metric_type=fielding&start_dt=2017-06-01&end_dt=2017-06-02",
        base
    ))
    .await;
    assert_eq!(status, 400);
    assert!(body["error"].as_str().unwrap().contains("metric_type"));

    let (status, _) = get(&format!(
        "{}/player-specific-metrics?player_id=1&metric_type=batting&start_dt=06/01/2017&end_dt=2017-06-02",
        base
    ))
    .await;
    assert_eq!(status, 400);
}

#[tokio::test]
async fn test_plate_crossing_defaults_to_pitching() {
    let mut provider = MockStatsProvider::new();
    provider
        .expect_player_specific_metrics()
        .withf(|id, metric_type, start, end| {
            *id == 519242
                && *metric_type == MetricType::Pitching
                && start.to_string() == "2017-06-01"
                && end.to_string() == "2017-06-30"
        })
        .returning(|_, _, _, _| {
            Ok(vec![
                row(json!({ "pitch_type": "FF", "plate_x": 0.1, "plate_z": 2.5 })),
                row(json!({ "pitch_type": "SL", "plate_x": null, "plate_z": 1.9 })),
                row(json!({ "pitch_type": "CH", "plate_z": 2.0 })),
            ])
        });
    let (base, _) = spawn_app(provider).await;

    let (status, body) = get(&format!(
        "{}/plate-crossing-metrics?player_id=519242&start_dt=2017-06-01&end_dt=2017-06-30",
        base
    ))
    .await;
    assert_eq!(status, 200);
    let rows = body.as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["pitch_type"], "FF");
}

#[tokio::test]
async fn test_pitcher_model_data_selects_modeled_rows() {
    let (base, _) = spawn_app(MockStatsProvider::new()).await;
    let rows = json!([pitch(0, "ball"), pitch(1, "hit_into_play"), pitch(2, "swinging_strike")]);

    let (status, body) = post(&format!("{}/pitcher-model-data", base), &rows).await;
    assert_eq!(status, 200);
    let selected = body.as_array().unwrap();
    assert_eq!(selected.len(), 2);
    assert_eq!(selected[0].as_object().unwrap().len(), 16);
    assert!(selected[0].get("game_date").is_none());

    let mut incomplete = pitch(3, "hit_into_play");
    incomplete.as_object_mut().unwrap().remove("az");
    let (status, body) = post(&format!("{}/pitcher-model-data", base), &json!([incomplete])).await;
    assert_eq!(status, 400);
    assert!(body["error"].as_str().unwrap().contains("az"));
}

#[tokio::test]
async fn test_train_then_predict() {
    let (base, state) = spawn_app(MockStatsProvider::new()).await;

    let request = json!({ "model_type": "logistic_regression", "data": training_rows() });
    let (status, body) = post(&format!("{}/train-model", base), &request).await;
    assert_eq!(status, 200);
    let accuracy = body["accuracy"].as_f64().unwrap();
    assert!((0.0..=1.0).contains(&accuracy));
    assert_eq!(state.registry().len(), 1);

    let model_uuid = body["model_uuid"].as_str().unwrap().to_string();
    let data = json!([pitch(100, "hit_into_play"), pitch(101, "swinging_strike")]);
    let (status, body) = post(
        &format!("{}/predict", base),
        &json!({ "model_uuid": model_uuid, "data": data }),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(body["prediction"].as_array().unwrap().len(), 2);
    for probas in body["prediction_probas"].as_array().unwrap() {
        let sum: f64 = probas.as_array().unwrap().iter().filter_map(Value::as_f64).sum();
        assert!((sum - 1.0).abs() < 1e-6);
    }
}

#[tokio::test]
async fn test_train_rejects_unknown_model() {
    let (base, state) = spawn_app(MockStatsProvider::new()).await;

    let request = json!({ "model_type": "unsupported_model", "data": training_rows() });
    let (status, body) = post(&format!("{}/train-model", base), &request).await;
    assert_eq!(status, 400);
    assert!(body["error"].as_str().unwrap().contains("invalid model type"));
    assert!(state.registry().is_empty());
}

#[tokio::test]
async fn test_train_without_modeled_rows() {
    let (base, _) = spawn_app(MockStatsProvider::new()).await;

    let data: Vec<Value> = (0..10).map(|i| pitch(i, "ball")).collect();
    let request = json!({ "model_type": "random_forest", "data": data });
    let (status, _) = post(&format!("{}/train-model", base), &request).await;
    assert_eq!(status, 400);
}

#[tokio::test]
async fn test_predict_unknown_model() {
    let (base, _) = spawn_app(MockStatsProvider::new()).await;

    let request = json!({
        "model_uuid": "9f1c1f3e-52b4-4a8e-9a55-2b7f0c1d9e10",
        "data": [pitch(0, "hit_into_play")]
    });
    let (status, body) = post(&format!("{}/predict", base), &request).await;
    assert_eq!(status, 404);
    assert!(body["error"].as_str().unwrap().contains("Model not found"));
}

#[tokio::test]
async fn test_malformed_body_is_json_error() {
    let (base, _) = spawn_app(MockStatsProvider::new()).await;

    let resp = reqwest::Client::new()
        .post(format!("{}/predict", base))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 400);
    let body: Value = resp.json().await.unwrap();
    assert!(body.get("error").is_some());
}
