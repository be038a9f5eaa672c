//! End-to-end tests driving the HTTP router.
//!
//! Run with: cargo test --test integration

use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::response::Response;
use axum::{routing::get, Router};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tower::ServiceExt;
use url::Url;

use sensor_stats::api::{create_router, AppState};
use sensor_stats::probe::HealthProbe;
use sensor_stats::store::StatsScope;

const T1: &str = "2022-01-10T10:00:00+00:00";
const T2: &str = "2022-01-10T11:00:00+00:00";

fn app_with_probe(url: Url, scope: StatsScope) -> (Router, AppState) {
    let probe = HealthProbe::new(url, Duration::from_millis(300)).unwrap();
    let state = AppState::new(probe, scope);
    (create_router(state.clone()), state)
}

fn app(scope: StatsScope) -> (Router, AppState) {
    app_with_probe(Url::parse("http://127.0.0.1:9/healthz").unwrap(), scope)
}

async fn send(app: &Router, request: Request<Body>) -> Response {
    app.clone().oneshot(request).await.unwrap()
}

async fn post_data(app: &Router, body: Value) -> Response {
    send(
        app,
        Request::builder()
            .method("POST")
            .uri("/data")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
    )
    .await
}

async fn get_stats(app: &Router, sensor: &str) -> Value {
    let response = send(
        app,
        Request::builder()
            .uri(format!("/statistics/{sensor}"))
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    body_json(response).await
}

async fn delete_sensor(app: &Router, sensor: &str) -> StatusCode {
    send(
        app,
        Request::builder()
            .method("DELETE")
            .uri(format!("/statistics/{sensor}"))
            .body(Body::empty())
            .unwrap(),
    )
    .await
    .status()
}

async fn body_json(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn two_sensor_batch() -> Value {
    json!([
        {"sensor": "A", "timestamp": T1, "value": 2.0},
        {"sensor": "B", "timestamp": T2, "value": 4.0}
    ])
}

#[tokio::test]
async fn ingest_grows_store_in_submitted_order() {
    let (app, state) = app(StatsScope::Store);

    let response = post_data(&app, two_sensor_batch()).await;
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert!(bytes.is_empty());

    let store = state.store.read().await;
    let names: Vec<_> = store.records().iter().map(|m| m.sensor_name.as_str()).collect();
    assert_eq!(names, vec!["A", "B"]);
}

#[tokio::test]
async fn invalid_item_rejects_whole_batch() {
    let (app, state) = app(StatsScope::Store);

    let response = post_data(
        &app,
        json!([
            {"sensor": "A", "timestamp": T1, "value": 2.0},
            {"sensor": "B", "timestamp": T2}
        ]),
    )
    .await;

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body_json(response).await["detail"].is_string());
    assert!(state.store.read().await.is_empty());
}

#[tokio::test]
async fn bad_timestamp_is_rejected() {
    let (app, state) = app(StatsScope::Store);

    let response = post_data(
        &app,
        json!([{"sensor": "A", "timestamp": "not a date", "value": 1.0}]),
    )
    .await;

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert!(state.store.read().await.is_empty());
}

#[tokio::test]
async fn empty_store_statistics() {
    let (app, _) = app(StatsScope::Store);
    assert_eq!(
        get_stats(&app, "A").await,
        json!({"last_measurement": null, "count": 0, "avg": 0.0})
    );
}

#[tokio::test]
async fn statistics_are_store_wide_for_any_sensor() {
    let (app, _) = app(StatsScope::Store);
    post_data(&app, two_sensor_batch()).await;

    let expected = json!({"last_measurement": T2, "count": 2, "avg": 3.0});
    assert_eq!(get_stats(&app, "A").await, expected);
    assert_eq!(get_stats(&app, "never-seen").await, expected);
}

#[tokio::test]
async fn delete_removes_only_that_sensor() {
    let (app, _) = app(StatsScope::Store);
    post_data(&app, two_sensor_batch()).await;

    assert_eq!(delete_sensor(&app, "A").await, StatusCode::OK);
    assert_eq!(
        get_stats(&app, "B").await,
        json!({"last_measurement": T2, "count": 1, "avg": 4.0})
    );
}

#[tokio::test]
async fn delete_unknown_sensor_is_noop() {
    let (app, _) = app(StatsScope::Store);
    post_data(&app, two_sensor_batch()).await;
    let before = get_stats(&app, "A").await;

    assert_eq!(delete_sensor(&app, "C").await, StatusCode::OK);
    assert_eq!(delete_sensor(&app, "C").await, StatusCode::OK);
    assert_eq!(get_stats(&app, "A").await, before);
}

#[tokio::test]
async fn sensor_scope_filters_statistics() {
    let (app, _) = app(StatsScope::Sensor);
    post_data(&app, two_sensor_batch()).await;

    assert_eq!(
        get_stats(&app, "A").await,
        json!({"last_measurement": T1, "count": 1, "avg": 2.0})
    );
    assert_eq!(
        get_stats(&app, "C").await,
        json!({"last_measurement": null, "count": 0, "avg": 0.0})
    );
}

async fn spawn_downstream(router: Router) -> Url {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    Url::parse(&format!("http://{addr}/healthz")).unwrap()
}

async fn healthz_status(url: Url) -> (StatusCode, Vec<u8>) {
    let (app, _) = app_with_probe(url, StatsScope::Store);
    let response = send(
        &app,
        Request::builder().uri("/healthz").body(Body::empty()).unwrap(),
    )
    .await;
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, bytes.to_vec())
}

#[tokio::test]
async fn healthz_passes_through_ready_signal() {
    let url = spawn_downstream(
        Router::new().route("/healthz", get(|| async { StatusCode::NO_CONTENT })),
    )
    .await;

    let (status, body) = healthz_status(url).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(body.is_empty());
}

#[tokio::test]
async fn healthz_fails_on_wrong_status() {
    let url = spawn_downstream(
        Router::new().route("/healthz", get(|| async { StatusCode::OK })),
    )
    .await;

    let (status, body) = healthz_status(url).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body, json!({"detail": "Server is not ready to receive data"}));
}

#[tokio::test]
async fn healthz_fails_on_timeout() {
    let url = spawn_downstream(Router::new().route(
        "/healthz",
        get(|| async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            StatusCode::NO_CONTENT
        }),
    ))
    .await;

    let (status, _) = healthz_status(url).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
