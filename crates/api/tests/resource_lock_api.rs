//! Integration tests for `/v2/resource/lock`.

mod common;

use axum::http::StatusCode;
use common::{body_json, delete_json, get, post_json};
use serde_json::json;

// ---------------------------------------------------------------------------
// Test: write lock lifecycle
// ---------------------------------------------------------------------------

#[tokio::test]
async fn write_lock_is_exclusive_until_released() {
    let app = common::build_test_app();
    let body = json!({ "resource_key": "project1/raw/a.txt", "operation": "write" });

    let response = post_json(&app, "/v2/resource/lock/", body.clone()).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json, json!({ "key": "project1/raw/a.txt", "status": true }));

    let response = post_json(&app, "/v2/resource/lock/", body.clone()).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(response).await["error"]["code"], "ALREADY_EXISTS");

    let response = get(&app, "/v2/resource/lock/?resource_key=project1/raw/a.txt").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "0,1");

    let response = delete_json(&app, "/v2/resource/lock/", body.clone()).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = delete_json(&app, "/v2/resource/lock/", body).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ---------------------------------------------------------------------------
// Test: idle key reports null state
// ---------------------------------------------------------------------------

#[tokio::test]
async fn check_of_idle_key_returns_null_status() {
    let app = common::build_test_app();

    let response = get(&app, "/v2/resource/lock/?resource_key=nothing-here").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await,
        json!({ "key": "nothing-here", "status": null })
    );
}

// ---------------------------------------------------------------------------
// Test: read locks share
// ---------------------------------------------------------------------------

#[tokio::test]
async fn read_locks_share_and_block_writers() {
    let app = common::build_test_app();
    let read = json!({ "resource_key": "shared", "operation": "read" });
    let write = json!({ "resource_key": "shared", "operation": "write" });

    for _ in 0..2 {
        let response = post_json(&app, "/v2/resource/lock/", read.clone()).await;
        assert_eq!(response.status(), StatusCode::OK);
    }
    let response = post_json(&app, "/v2/resource/lock/", write).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = get(&app, "/v2/resource/lock/?resource_key=shared").await;
    assert_eq!(body_json(response).await["status"], "2,0");
}

// ---------------------------------------------------------------------------
// Test: bulk lock and unlock
// ---------------------------------------------------------------------------

#[tokio::test]
async fn bulk_lock_reports_keys_in_sorted_order() {
    let app = common::build_test_app();
    let body = json!({ "resource_keys": ["b", "a"], "operation": "read" });

    let response = post_json(&app, "/v2/resource/lock/bulk", body.clone()).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await,
        json!({ "keys_status": [["a", true], ["b", true]] })
    );

    let response = delete_json(&app, "/v2/resource/lock/bulk", body).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await,
        json!({ "keys_status": [["a", true], ["b", true]] })
    );
}

#[tokio::test]
async fn bulk_lock_conflict_returns_409() {
    let app = common::build_test_app();
    post_json(
        &app,
        "/v2/resource/lock/",
        json!({ "resource_key": "b", "operation": "write" }),
    )
    .await;

    let response = post_json(
        &app,
        "/v2/resource/lock/bulk",
        json!({ "resource_keys": ["a", "b", "c"], "operation": "write" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    // "a" was granted before the conflict and stays held.
    let response = get(&app, "/v2/resource/lock/?resource_key=a").await;
    assert_eq!(body_json(response).await["status"], "0,1");
    let response = get(&app, "/v2/resource/lock/?resource_key=c").await;
    assert_eq!(body_json(response).await["status"], serde_json::Value::Null);
}

#[tokio::test]
async fn bulk_unlock_of_unheld_key_returns_400() {
    let app = common::build_test_app();

    let response = delete_json(
        &app,
        "/v2/resource/lock/bulk",
        json!({ "resource_keys": ["never-locked"], "operation": "read" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ---------------------------------------------------------------------------
// Test: unknown operation is rejected by the body extractor
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unknown_operation_is_rejected() {
    let app = common::build_test_app();

    let response = post_json(
        &app,
        "/v2/resource/lock/",
        json!({ "resource_key": "k", "operation": "append" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}
