//! Shared test helpers: fake providers and a router over a temporary database

#![allow(dead_code)]

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, Response};
use axum::Router;
use feedback_common::GeoLocation;
use feedback_intake::providers::{
    CategoryProvider, GeolocationProvider, ProviderError, ProviderResult, ProviderSet,
    SentimentProvider,
};
use feedback_intake::{build_router, AppState, EnrichmentOrchestrator};
use http_body_util::BodyExt;
use serde_json::Value;
use sqlx::SqlitePool;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

/// Derive a small per-text delay so concurrent requests interleave
fn jitter(text: &str) -> Duration {
    Duration::from_millis((text.len() % 7) as u64 * 5)
}

/// Sentiment fake answering `sentiment:<text>`
pub struct EchoSentiment;

#[async_trait]
impl SentimentProvider for EchoSentiment {
    async fn analyze(&self, text: &str) -> ProviderResult<String> {
        tokio::time::sleep(jitter(text)).await;
        Ok(format!("sentiment:{}", text))
    }
}

/// Category fake answering `category:<text>`
pub struct EchoCategory;

#[async_trait]
impl CategoryProvider for EchoCategory {
    async fn classify(&self, text: &str) -> ProviderResult<String> {
        tokio::time::sleep(jitter(text)).await;
        Ok(format!("category:{}", text))
    }
}

/// Geolocation fake whose city is the looked-up address
pub struct EchoGeolocation;

#[async_trait]
impl GeolocationProvider for EchoGeolocation {
    async fn locate(&self, ip: IpAddr) -> ProviderResult<GeoLocation> {
        Ok(location_for(ip))
    }
}

pub fn location_for(ip: IpAddr) -> GeoLocation {
    GeoLocation {
        country: "Testland".to_string(),
        region: "Fixture Region".to_string(),
        city: ip.to_string(),
        latitude: 12.5,
        longitude: -45.25,
    }
}

/// Fake that fails every call
pub struct Failing;

#[async_trait]
impl SentimentProvider for Failing {
    async fn analyze(&self, _text: &str) -> ProviderResult<String> {
        Err(ProviderError::Status(503))
    }
}

#[async_trait]
impl CategoryProvider for Failing {
    async fn classify(&self, _text: &str) -> ProviderResult<String> {
        Err(ProviderError::Timeout)
    }
}

#[async_trait]
impl GeolocationProvider for Failing {
    async fn locate(&self, _ip: IpAddr) -> ProviderResult<GeoLocation> {
        Err(ProviderError::Rejected("reserved range".to_string()))
    }
}

/// All providers answering successfully
pub fn echo_providers() -> ProviderSet {
    ProviderSet {
        sentiment: Arc::new(EchoSentiment),
        geolocation: Arc::new(EchoGeolocation),
        category: Arc::new(EchoCategory),
    }
}

/// Test application backed by a temporary database
pub struct TestApp {
    pub dir: TempDir,
    pub db: SqlitePool,
    pub router: Router,
}

/// Build the router with the given providers; `X-Forwarded-For` is trusted
pub async fn test_app(providers: ProviderSet) -> TestApp {
    let dir = TempDir::new().unwrap();
    let db = feedback_common::db::init_database(&dir.path().join("test_feedback.db"))
        .await
        .unwrap();

    let orchestrator = EnrichmentOrchestrator::new(providers);
    let state = AppState::new(db.clone(), orchestrator).with_trust_forwarded_for(true);

    TestApp {
        dir,
        db,
        router: build_router(state),
    }
}

/// POST /feedback with a JSON body and optional client address
pub fn submit_request(body: &Value, ip: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/feedback")
        .header("content-type", "application/json");
    if let Some(ip) = ip {
        builder = builder.header("x-forwarded-for", ip);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub fn request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

/// Extract JSON body from response
pub async fn json_body(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).expect("Should parse JSON")
}

pub async fn row_count(db: &SqlitePool) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM feedback_info")
        .fetch_one(db)
        .await
        .unwrap()
}
