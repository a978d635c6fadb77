//! Admission-control behavior over the real router.

mod common;

use axum::http::StatusCode;

use common::{comic_info, TestConfig, TestFixture};

#[tokio::test]
async fn test_isearch_rate_limit_zero_rejects_with_408() {
    let fixture = TestFixture::with_config(TestConfig {
        search_rate: 0,
        ..TestConfig::default()
    });

    let response = fixture.get("/api/isearch?phrase=anything").await;
    assert_eq!(response.status, StatusCode::REQUEST_TIMEOUT);
}

#[tokio::test]
async fn test_isearch_rate_limit_enforces_strict_pacing() {
    // burst of one and a deadline of zero seconds: the first request is
    // admitted on the full bucket, the immediate second one would have to
    // wait and times out instead
    let fixture = TestFixture::with_config(TestConfig {
        search_rate: 2,
        timeout_secs: 0,
        ..TestConfig::default()
    });

    let first = fixture.get("/api/isearch?phrase=anything").await;
    assert_eq!(first.status, StatusCode::OK);

    let second = fixture.get("/api/isearch?phrase=anything").await;
    assert_eq!(second.status, StatusCode::REQUEST_TIMEOUT);
}

#[tokio::test]
async fn test_isearch_admitted_requests_succeed() {
    let fixture = TestFixture::with_config(TestConfig {
        last_id: 1,
        search_rate: 1000,
        ..TestConfig::default()
    });
    fixture
        .source
        .insert(comic_info(1, "Barrel", "a boy in a barrel"));

    let token = fixture.login().await;
    fixture.post("/api/db/update", Some(&token)).await;
    fixture
        .wait_until(|| async {
            fixture.get("/api/isearch?phrase=barrel").await.json()["total"] == 1
        })
        .await;

    for _ in 0..5 {
        let response = fixture.get("/api/isearch?phrase=barrel").await;
        assert_eq!(response.status, StatusCode::OK);
    }
}

#[tokio::test]
async fn test_search_is_not_rate_limited() {
    // the full-scan path sits behind the concurrency limiter only; a zero
    // rate must not affect it
    let fixture = TestFixture::with_config(TestConfig {
        search_rate: 0,
        ..TestConfig::default()
    });

    let response = fixture.get("/api/search?phrase=anything").await;
    assert_eq!(response.status, StatusCode::OK);
}

#[tokio::test]
async fn test_search_concurrency_slots_recover_after_burst() {
    let fixture = TestFixture::with_config(TestConfig {
        search_concurrency: 1,
        ..TestConfig::default()
    });

    // sequential requests reuse the single slot
    for _ in 0..3 {
        let response = fixture.get("/api/search?phrase=anything").await;
        assert_eq!(response.status, StatusCode::OK);
    }
}
