//! Integration tests for feedback-intake API endpoints
//!
//! Tests cover:
//! - Submission with successful and failing providers
//! - Geolocation all-or-nothing behavior
//! - Listing round-trip and filters
//! - Closing existing and unknown records
//! - Concurrent submissions

mod helpers;

use axum::http::StatusCode;
use feedback_intake::db::feedback;
use feedback_intake::providers::ProviderSet;
use helpers::*;
use serde_json::{json, Value};
use std::collections::HashSet;
use std::sync::Arc;
use tower::ServiceExt; // for `oneshot`

const GEO_FIELDS: [&str; 5] = ["country", "region", "city", "latitude", "longitude"];

// =============================================================================
// Submission
// =============================================================================

#[tokio::test]
async fn test_submit_feedback_success() {
    let app = test_app(echo_providers()).await;

    let response = app
        .router
        .oneshot(submit_request(&json!({"text": "Nice service"}), Some("203.0.113.20")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert!(body["id"].is_i64());
    assert_eq!(body["status"], "open");
    assert_eq!(body["sentiment"], "sentiment:Nice service");
    assert_eq!(body["category"], "category:Nice service");
    assert_eq!(body["ip"], "203.0.113.20");
    assert_eq!(body["country"], "Testland");
    assert_eq!(body["region"], "Fixture Region");
    assert_eq!(body["city"], "203.0.113.20");
    assert_eq!(body["latitude"], 12.5);
    assert_eq!(body["longitude"], -45.25);
    assert!(body.get("text").is_none());
}

#[tokio::test]
async fn test_sentiment_failure_uses_unknown_and_leaves_others_intact() {
    let app = test_app(ProviderSet {
        sentiment: Arc::new(Failing),
        ..echo_providers()
    })
    .await;

    let response = app
        .router
        .clone()
        .oneshot(submit_request(&json!({"text": "kwckwkcwekc"}), Some("198.51.100.1")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["sentiment"], "unknown");
    assert_eq!(body["status"], "open");
    assert_eq!(body["category"], "category:kwckwkcwekc");
    assert_eq!(body["city"], "198.51.100.1");

    let listed = json_body(app.router.oneshot(request("GET", "/feedback")).await.unwrap()).await;
    assert_eq!(listed[0]["sentiment"], "unknown");
    assert_eq!(listed[0]["category"], "category:kwckwkcwekc");
}

#[tokio::test]
async fn test_category_failure_uses_other() {
    let app = test_app(ProviderSet {
        category: Arc::new(Failing),
        ..echo_providers()
    })
    .await;

    let response = app
        .router
        .oneshot(submit_request(&json!({"text": "card declined"}), Some("198.51.100.2")))
        .await
        .unwrap();

    let body = json_body(response).await;
    assert_eq!(body["category"], "other");
    assert_eq!(body["sentiment"], "sentiment:card declined");
}

#[tokio::test]
async fn test_geolocation_failure_nulls_whole_group() {
    let app = test_app(ProviderSet {
        geolocation: Arc::new(Failing),
        ..echo_providers()
    })
    .await;

    let response = app
        .router
        .clone()
        .oneshot(submit_request(&json!({"text": "where am I"}), Some("127.0.0.1")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["ip"], "127.0.0.1");
    for field in GEO_FIELDS {
        assert!(body[field].is_null(), "{} should be null in response", field);
    }

    let listed = json_body(app.router.oneshot(request("GET", "/feedback")).await.unwrap()).await;
    for field in GEO_FIELDS {
        assert!(listed[0][field].is_null(), "{} should be null in store", field);
    }
}

#[tokio::test]
async fn test_all_providers_failing_still_succeeds() {
    let failing = Arc::new(Failing);
    let app = test_app(ProviderSet {
        sentiment: failing.clone(),
        geolocation: failing.clone(),
        category: failing,
    })
    .await;

    let response = app
        .router
        .oneshot(submit_request(&json!({"text": "everything is down"}), Some("198.51.100.3")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert!(body["id"].is_i64());
    assert_eq!(body["sentiment"], "unknown");
    assert_eq!(body["category"], "other");
    assert!(body["country"].is_null());
}

#[tokio::test]
async fn test_submission_without_address_has_no_location() {
    let app = test_app(echo_providers()).await;

    // oneshot carries no ConnectInfo and no forwarded header
    let response = app
        .router
        .oneshot(submit_request(&json!({"text": "anonymous"}), None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert!(body["ip"].is_null());
    for field in GEO_FIELDS {
        assert!(body[field].is_null());
    }
}

#[tokio::test]
async fn test_missing_text_is_rejected_without_record() {
    let app = test_app(echo_providers()).await;

    let response = app
        .router
        .clone()
        .oneshot(submit_request(&json!({"message": "wrong field"}), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = json_body(response).await;
    assert!(body["detail"].is_string());

    let response = app
        .router
        .oneshot(submit_request(&json!({"text": 42}), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    assert_eq!(row_count(&app.db).await, 0);
}

// =============================================================================
// Listing
// =============================================================================

#[tokio::test]
async fn test_submitted_record_round_trips_through_listing() {
    let app = test_app(echo_providers()).await;

    let submitted = json_body(
        app.router
            .clone()
            .oneshot(submit_request(&json!({"text": "refund please"}), Some("192.0.2.44")))
            .await
            .unwrap(),
    )
    .await;

    let response = app.router.oneshot(request("GET", "/feedback")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let listed = json_body(response).await;
    let listed = listed.as_array().unwrap();

    assert_eq!(listed.len(), 1);
    let entry = &listed[0];
    assert_eq!(entry["text"], "refund please");
    assert!(entry["timestamp"].is_i64());
    for (key, value) in submitted.as_object().unwrap() {
        assert_eq!(&entry[key], value, "field {} differs", key);
    }
}

#[tokio::test]
async fn test_listing_filters_by_status_and_timestamp() {
    let app = test_app(echo_providers()).await;
    let (t1, t2) = (1_700_000_000_i64, 1_700_000_500_i64);

    let mut conn = app.db.acquire().await.unwrap();
    let mut expected = HashSet::new();
    for (i, (ts, closed)) in [(t1, false), (t1, true), (t2, false), (t2, true), (t2 + 60, false)]
        .into_iter()
        .enumerate()
    {
        let id = feedback::create(&mut conn, &format!("entry {}", i), None, ts)
            .await
            .unwrap();
        feedback::merge_enrichment(&mut conn, id, &Default::default())
            .await
            .unwrap();
        if closed {
            feedback::close(&mut conn, id).await.unwrap();
        } else if ts >= t2 {
            expected.insert(id);
        }
    }
    drop(conn);

    let uri = format!("/feedback?status=open&timestamp={}", t2);
    let listed = json_body(app.router.oneshot(request("GET", &uri)).await.unwrap()).await;

    let ids: HashSet<i64> = listed
        .as_array()
        .unwrap()
        .iter()
        .map(|entry| {
            assert_eq!(entry["status"], "open");
            assert!(entry["timestamp"].as_i64().unwrap() >= t2);
            entry["id"].as_i64().unwrap()
        })
        .collect();
    assert_eq!(ids, expected);
}

#[tokio::test]
async fn test_invalid_timestamp_filter_is_unprocessable() {
    let app = test_app(echo_providers()).await;

    let response = app
        .router
        .oneshot(request("GET", "/feedback?timestamp=yesterday"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = json_body(response).await;
    assert!(body["detail"].is_string());
}

// =============================================================================
// Closing
// =============================================================================

#[tokio::test]
async fn test_close_existing_record() {
    let app = test_app(echo_providers()).await;

    let submitted = json_body(
        app.router
            .clone()
            .oneshot(submit_request(&json!({"text": "login broken"}), Some("192.0.2.7")))
            .await
            .unwrap(),
    )
    .await;
    let id = submitted["id"].as_i64().unwrap();

    let uri = format!("/feedback/close/{}", id);
    let response = app.router.clone().oneshot(request("POST", &uri)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let closed = json_body(response).await;
    assert_eq!(closed["id"], id);
    assert_eq!(closed["status"], "closed");
    assert_eq!(closed["text"], "login broken");

    // Closing again is idempotent
    let response = app.router.clone().oneshot(request("POST", &uri)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let listed = json_body(
        app.router
            .oneshot(request("GET", "/feedback?status=closed"))
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(listed.as_array().unwrap().len(), 1);
    assert_eq!(listed[0]["id"], id);
}

#[tokio::test]
async fn test_close_unknown_record_is_not_found() {
    let app = test_app(echo_providers()).await;

    let response = app
        .router
        .oneshot(request("POST", "/feedback/close/9999"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = json_body(response).await;
    assert_eq!(body, json!({"detail": "not_found"}));
    assert_eq!(row_count(&app.db).await, 0);
}

#[tokio::test]
async fn test_close_non_numeric_id_is_unprocessable() {
    let app = test_app(echo_providers()).await;

    let response = app
        .router
        .oneshot(request("POST", "/feedback/close/abc"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = json_body(response).await;
    assert!(body["detail"].is_string());
    assert_eq!(row_count(&app.db).await, 0);
}

// =============================================================================
// Concurrency
// =============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_submissions_do_not_leak() {
    let app = test_app(echo_providers()).await;
    const N: usize = 24;

    let tasks: Vec<_> = (0..N)
        .map(|i| {
            let router = app.router.clone();
            tokio::spawn(async move {
                let text = format!("complaint number {}", i);
                let ip = format!("10.0.{}.{}", i / 8, i % 8 + 1);
                let response = router
                    .oneshot(submit_request(&json!({"text": text}), Some(&ip)))
                    .await
                    .unwrap();
                assert_eq!(response.status(), StatusCode::OK);
                (text, ip, json_body(response).await)
            })
        })
        .collect();

    let mut ids = HashSet::new();
    for task in tasks {
        let (text, ip, body) = task.await.unwrap();
        assert!(ids.insert(body["id"].as_i64().unwrap()), "duplicate id");
        assert_eq!(body["sentiment"], format!("sentiment:{}", text));
        assert_eq!(body["category"], format!("category:{}", text));
        assert_eq!(body["city"], ip.as_str());
    }

    let listed = json_body(app.router.oneshot(request("GET", "/feedback")).await.unwrap()).await;
    let listed = listed.as_array().unwrap();
    assert_eq!(listed.len(), N);
    for entry in listed {
        let text = entry["text"].as_str().unwrap();
        assert_eq!(entry["sentiment"], format!("sentiment:{}", text));
        assert_eq!(entry["category"], format!("category:{}", text));
        assert_eq!(entry["city"], entry["ip"]);
    }
}

// =============================================================================
// Health
// =============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let app = test_app(echo_providers()).await;

    let response = app.router.oneshot(request("GET", "/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = json_body(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "feedback-intake");
    assert!(body["version"].is_string());
    assert!(body["uptime_seconds"].is_u64());
}
