//! PostgREST remote store against a mock server

use fitlog_engine::config::RemoteConfig;
use fitlog_engine::remote::{NaturalKey, PostgrestRemoteStore, RemoteStore};
use fitlog_engine::{Domain, RemoteError};
use secrecy::SecretString;
use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn store(server: &MockServer) -> PostgrestRemoteStore {
    PostgrestRemoteStore::new(&RemoteConfig {
        url: server.uri(),
        anon_key: "test_anon_key".to_string(),
    })
}

#[tokio::test]
async fn test_query_by_user_filters_and_orders() {
    let server = MockServer::start().await;
    let user = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/workout_sessions"))
        .and(query_param("select", "*"))
        .and(query_param("user_id", format!("eq.{}", user).as_str()))
        .and(query_param("order", "session_date.desc"))
        .and(header("apikey", "test_anon_key"))
        .and(header("authorization", "Bearer test_anon_key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": Uuid::new_v4(), "exercise_name": "Row", "session_date": "2025-03-10T08:00:00Z"},
            {"id": Uuid::new_v4(), "exercise_name": "Squat", "session_date": "2025-03-09T08:00:00Z"}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let rows = store(&server)
        .query_by_user(Domain::WorkoutSessions, user)
        .await
        .unwrap();

    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["exercise_name"], json!("Row"));
}

#[tokio::test]
async fn test_goals_query_is_limited_to_one_row() {
    let server = MockServer::start().await;
    let user = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/nutrition_goals"))
        .and(query_param("order", "updated_at.desc"))
        .and(query_param("limit", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let rows = store(&server).query_by_user(Domain::Goals, user).await.unwrap();
    assert!(rows.is_empty());
}

#[tokio::test]
async fn test_insert_returns_assigned_id() {
    let server = MockServer::start().await;
    let id = Uuid::new_v4();

    Mock::given(method("POST"))
        .and(path("/rest/v1/nutrition_water_logs"))
        .and(header("prefer", "return=representation"))
        .and(body_partial_json(json!({"amount": 250})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            {"id": id, "amount": 250, "logged_at": "2025-03-10T08:00:00Z"}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let row = json!({"user_id": Uuid::new_v4(), "amount": 250, "logged_at": "2025-03-10T08:00:00Z"})
        .as_object()
        .cloned()
        .unwrap();
    let inserted = store(&server).insert(Domain::WaterLogs, row).await.unwrap();
    assert_eq!(inserted, id);
}

#[tokio::test]
async fn test_natural_key_lookup_sends_eq_filters() {
    let server = MockServer::start().await;
    let user = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/nutrition_water_logs"))
        .and(query_param("select", "id"))
        .and(query_param("amount", "eq.250"))
        .and(query_param("logged_at", "eq.2025-03-10T08:00:00.000Z"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(2)
        .mount(&server)
        .await;

    let key = NaturalKey::new()
        .with("logged_at", "2025-03-10T08:00:00.000Z")
        .with("amount", 250);
    let remote = store(&server);

    assert_eq!(
        remote
            .find_by_natural_key(Domain::WaterLogs, user, &key)
            .await
            .unwrap(),
        None
    );
    assert!(!remote
        .exists_by_natural_key(Domain::WaterLogs, user, &key)
        .await
        .unwrap());
}

#[tokio::test]
async fn test_error_status_is_reported() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/body_stats"))
        .respond_with(ResponseTemplate::new(401).set_body_string("JWT expired"))
        .mount(&server)
        .await;

    let result = store(&server)
        .query_by_user(Domain::BodyStats, Uuid::new_v4())
        .await;

    match result {
        Err(RemoteError::Status { status, message }) => {
            assert_eq!(status, 401);
            assert_eq!(message, "JWT expired");
        }
        other => panic!("expected status error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_access_token_replaces_anon_bearer() {
    let server = MockServer::start().await;
    let user = Uuid::new_v4();
    let id = Uuid::new_v4();

    Mock::given(method("DELETE"))
        .and(path("/rest/v1/custom_workout_plans"))
        .and(query_param("id", format!("eq.{}", id).as_str()))
        .and(header("apikey", "test_anon_key"))
        .and(header("authorization", "Bearer user_token"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let remote = store(&server);
    remote
        .set_access_token(Some(SecretString::new("user_token".to_string())))
        .await;
    remote.delete(Domain::CustomPlans, user, id).await.unwrap();
}

#[tokio::test]
async fn test_singleton_upsert_deletes_then_inserts() {
    let server = MockServer::start().await;
    let user = Uuid::new_v4();
    let id = Uuid::new_v4();

    Mock::given(method("DELETE"))
        .and(path("/rest/v1/nutrition_goals"))
        .and(query_param("user_id", format!("eq.{}", user).as_str()))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/nutrition_goals"))
        .and(body_partial_json(json!({"daily_calories": 1800})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([{"id": id}])))
        .expect(1)
        .mount(&server)
        .await;

    let row = json!({"user_id": user, "daily_calories": 1800})
        .as_object()
        .cloned()
        .unwrap();
    let upserted = store(&server)
        .upsert_singleton(Domain::Goals, user, row)
        .await
        .unwrap();
    assert_eq!(upserted, id);
}
