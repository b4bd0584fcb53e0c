use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use sqlx::sqlite::SqlitePoolOptions;
use tower::ServiceExt;

use kiosk_client::ReqwestFetcher;
use kiosk_core::{Scheduler, ScriptSandbox, SnapshotCell, StatusPublisher, UpdateCycle};
use kiosk_db::Database;
use kiosk_server::routes;
use kiosk_server::state::AppState;

const TEST_API_KEY: &str = "test-secret-key";

struct TestApp {
    router: Router,
    db: Database,
}

/// In-memory database, migrated and seeded, wired into the full router.
async fn setup_test_app(api_key: Option<&str>) -> TestApp {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("in-memory sqlite");
    let db = Database::from_pool(pool);
    db.migrate().await.expect("migrations");

    let cycle = UpdateCycle::new(
        db.source_repo(),
        ReqwestFetcher::new().expect("fetcher"),
        ScriptSandbox::new(),
        SnapshotCell::new(),
        StatusPublisher::new(),
    );
    let scheduler = Arc::new(Scheduler::new(cycle, db.settings_repo()));

    let state = Arc::new(AppState {
        db: db.clone(),
        scheduler,
        api_key: api_key.map(str::to_string),
    });

    TestApp {
        router: routes::router(state),
        db,
    }
}

async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let body = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn health_returns_200() {
    let app = setup_test_app(None).await;

    let response = app
        .router
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["database"], "ok");
}

#[tokio::test]
async fn unauthenticated_request_returns_401() {
    let app = setup_test_app(Some(TEST_API_KEY)).await;

    let response = app
        .router
        .oneshot(Request::get("/v1/sources").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn wrong_api_key_returns_401() {
    let app = setup_test_app(Some(TEST_API_KEY)).await;

    let response = app
        .router
        .oneshot(
            Request::get("/v1/sources")
                .header("authorization", "Bearer wrong-key")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn correct_api_key_passes() {
    let app = setup_test_app(Some(TEST_API_KEY)).await;

    let response = app
        .router
        .oneshot(
            Request::get("/v1/sources")
                .header("authorization", format!("Bearer {TEST_API_KEY}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn snapshot_starts_empty_and_status_idle() {
    let app = setup_test_app(None).await;

    let response = app
        .router
        .clone()
        .oneshot(Request::get("/v1/snapshot").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["results"], serde_json::json!([]));

    let response = app
        .router
        .oneshot(Request::get("/v1/status").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let json = json_body(response).await;
    assert_eq!(json["state"], "idle");
    assert_eq!(json["indicator"]["text"], "");
}

#[tokio::test]
async fn source_crud_roundtrip() {
    let app = setup_test_app(None).await;

    // Seeded sources are listed first.
    let response = app
        .router
        .clone()
        .oneshot(Request::get("/v1/sources").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let json = json_body(response).await;
    assert_eq!(json["total"], 2);

    // Create
    let create_body = serde_json::json!({
        "name": "Tech",
        "url": "https://example.com/feed",
        "processing": "parse_feed(data)"
    });
    let response = app
        .router
        .clone()
        .oneshot(
            Request::post("/v1/sources")
                .header("content-type", "application/json")
                .body(Body::from(serde_json::to_vec(&create_body).unwrap()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let id = json_body(response).await["id"].as_str().unwrap().to_string();

    // Read
    let response = app
        .router
        .clone()
        .oneshot(
            Request::get(format!("/v1/sources/{id}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["name"], "Tech");
    assert_eq!(json["is_active"], true);
    assert_eq!(json["processing"], "parse_feed(data)");

    // Replace
    let update_body = serde_json::json!({
        "name": "Tech",
        "url": "https://example.com/feed",
        "processing": "[]",
        "is_active": false
    });
    let response = app
        .router
        .clone()
        .oneshot(
            Request::put(format!("/v1/sources/{id}"))
                .header("content-type", "application/json")
                .body(Body::from(serde_json::to_vec(&update_body).unwrap()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .router
        .clone()
        .oneshot(
            Request::get(format!("/v1/sources/{id}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let json = json_body(response).await;
    assert_eq!(json["is_active"], false);
    assert_eq!(json["processing"], "[]");

    // Delete
    let response = app
        .router
        .clone()
        .oneshot(
            Request::delete(format!("/v1/sources/{id}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .router
        .oneshot(
            Request::get(format!("/v1/sources/{id}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = json_body(response).await;
    assert_eq!(json["error"], "not_found");
}

#[tokio::test]
async fn delete_missing_source_returns_404() {
    let app = setup_test_app(None).await;

    let response = app
        .router
        .oneshot(
            Request::delete(format!("/v1/sources/{}", uuid::Uuid::new_v4()))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn settings_put_then_get() {
    let app = setup_test_app(None).await;

    let response = app
        .router
        .clone()
        .oneshot(
            Request::get("/v1/settings/refresh_minutes")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .router
        .clone()
        .oneshot(
            Request::put("/v1/settings/refresh_minutes")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"value": 1.5}"#))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .router
        .oneshot(
            Request::get("/v1/settings/refresh_minutes")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["key"], "refresh_minutes");
    assert_eq!(json["value"], serde_json::json!(1.5));
}

#[tokio::test]
async fn refresh_with_no_active_sources_publishes_empty_snapshot() {
    let app = setup_test_app(None).await;

    // Remove the seeded sources so the cycle has nothing to fetch.
    let repo = app.db.source_repo();
    for summary in repo.list_summaries().await.unwrap() {
        repo.delete(summary.id).await.unwrap();
    }

    let response = app
        .router
        .clone()
        .oneshot(Request::post("/v1/refresh").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["results"], serde_json::json!([]));

    let response = app
        .router
        .oneshot(Request::get("/v1/status").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let json = json_body(response).await;
    assert_eq!(json["state"], "succeeded");
    assert_eq!(json["indicator"]["text"], "OK");
    assert_eq!(json["indicator"]["color"], "#252");
}
