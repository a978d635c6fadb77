//! Shared fixture for end-to-end tests.
//!
//! Builds the real router over an in-memory catalog and a mock upstream
//! source, so the full HTTP surface can be exercised in process with
//! `tower::ServiceExt::oneshot`.

// not every test binary touches every helper
#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tokio::sync::broadcast;
use tower::ServiceExt;

use comicsearch_core::testing::MockComicSource;
use comicsearch_core::{
    ComicCatalog, ComicSource, Config, EventBus, JwtAuthenticator, Normalizer, SearchService,
    SnowballNormalizer, SqliteCatalog, UpdateService,
};
use comicsearch_server::api::create_router;
use comicsearch_server::state::AppState;

pub use comicsearch_core::testing::comic_info;

pub const TEST_ADMIN_USER: &str = "admin";
pub const TEST_ADMIN_PASSWORD: &str = "password";

/// Knobs for fixture construction.
pub struct TestConfig {
    /// Highest comic id the mock upstream reports.
    pub last_id: i64,
    pub search_concurrency: usize,
    pub search_rate: i64,
    pub timeout_secs: u64,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            last_id: 0,
            search_concurrency: 10,
            search_rate: 1000,
            timeout_secs: 5,
        }
    }
}

/// An in-process server with controllable collaborators.
pub struct TestFixture {
    pub router: Router,
    pub source: Arc<MockComicSource>,
    pub catalog: Arc<dyn ComicCatalog>,
    pub searcher: Arc<SearchService>,
    // keeps the subscriber task running for the fixture's lifetime
    _shutdown_tx: broadcast::Sender<()>,
}

/// Response from a test request.
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: String,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_str(&self.body).expect("response body is not JSON")
    }
}

impl TestFixture {
    pub fn new() -> Self {
        Self::with_config(TestConfig::default())
    }

    pub fn with_config(test_config: TestConfig) -> Self {
        let mut config = Config::default();
        config.limits.search_concurrency = test_config.search_concurrency;
        config.limits.search_rate = test_config.search_rate;
        config.api.timeout_secs = test_config.timeout_secs;

        let catalog: Arc<dyn ComicCatalog> = Arc::new(SqliteCatalog::in_memory().unwrap());
        let words: Arc<dyn Normalizer> = Arc::new(SnowballNormalizer::new());
        let source = Arc::new(MockComicSource::new(test_config.last_id));

        let bus = EventBus::new(&config.broker.subject, config.broker.capacity);
        let updater = Arc::new(
            UpdateService::new(
                Arc::clone(&catalog),
                Arc::clone(&source) as Arc<dyn ComicSource>,
                Arc::clone(&words),
                bus.publisher(),
                2,
            )
            .unwrap(),
        );
        let searcher = Arc::new(SearchService::new(Arc::clone(&catalog), Arc::clone(&words)));

        let (shutdown_tx, _) = broadcast::channel(1);
        let _subscriber_task = bus.subscribe(Arc::clone(&searcher), shutdown_tx.subscribe());

        let authenticator = JwtAuthenticator::new(
            TEST_ADMIN_USER,
            TEST_ADMIN_PASSWORD,
            "test-secret",
            Duration::from_secs(120),
        );

        let state = Arc::new(AppState::new(
            config,
            authenticator,
            updater,
            Arc::clone(&searcher),
            words,
            Arc::clone(&catalog),
        ));

        Self {
            router: create_router(state),
            source,
            catalog,
            searcher,
            _shutdown_tx: shutdown_tx,
        }
    }

    pub async fn request(&self, request: Request<Body>) -> TestResponse {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        TestResponse {
            status,
            body: String::from_utf8_lossy(&bytes).to_string(),
        }
    }

    pub async fn get(&self, uri: &str) -> TestResponse {
        self.request(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>) -> TestResponse {
        let mut builder = Request::builder().method("POST").uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Token {token}"));
        }
        self.request(builder.body(Body::empty()).unwrap()).await
    }

    pub async fn delete(&self, uri: &str, token: Option<&str>) -> TestResponse {
        let mut builder = Request::builder().method("DELETE").uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Token {token}"));
        }
        self.request(builder.body(Body::empty()).unwrap()).await
    }

    pub async fn post_json(&self, uri: &str, body: Value) -> TestResponse {
        self.request(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }

    /// Log in with the test admin credentials and return the token.
    pub async fn login(&self) -> String {
        let response = self
            .post_json(
                "/api/login",
                serde_json::json!({
                    "name": TEST_ADMIN_USER,
                    "password": TEST_ADMIN_PASSWORD,
                }),
            )
            .await;
        assert_eq!(response.status, StatusCode::OK, "login failed");
        response.body
    }

    /// Poll until the condition holds, failing after a bounded wait. Used
    /// for effects that arrive through the event bus.
    pub async fn wait_until<F, Fut>(&self, check: F)
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = bool>,
    {
        for _ in 0..200 {
            if check().await {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("condition not reached in time");
    }
}
