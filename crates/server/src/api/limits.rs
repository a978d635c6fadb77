//! Admission-control filters for the search endpoints.
//!
//! Two reusable middlewares: a non-blocking concurrency limiter (503 when
//! every slot is taken) and a strict token-bucket rate limiter (408 when
//! the wait would exceed the per-request deadline).

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tokio::sync::Semaphore;
use tokio::time::Instant;
use tracing::debug;

use crate::metrics::ADMISSION_REJECTED_TOTAL;

/// Bucket size of one enforces strict pacing: no bursts beyond a single
/// request.
const BURST: f64 = 1.0;

/// Admits at most a fixed number of downstream calls at once.
///
/// Acquisition is non-blocking: a request either takes a slot immediately
/// or is rejected. The slot is held until the downstream handler returns.
#[derive(Clone)]
pub struct ConcurrencyLimiter {
    semaphore: Arc<Semaphore>,
}

impl ConcurrencyLimiter {
    pub fn new(capacity: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
        }
    }
}

/// Middleware wrapping a handler with a [`ConcurrencyLimiter`].
pub async fn concurrency_limit(
    State(limiter): State<ConcurrencyLimiter>,
    request: Request<Body>,
    next: Next,
) -> Response {
    match limiter.semaphore.try_acquire() {
        Ok(_permit) => next.run(request).await,
        Err(_) => {
            debug!("concurrency limit reached");
            ADMISSION_REJECTED_TOTAL
                .with_label_values(&["concurrency"])
                .inc();
            StatusCode::SERVICE_UNAVAILABLE.into_response()
        }
    }
}

struct Bucket {
    tokens: f64,
    last: Instant,
}

/// Token-bucket rate limiter with a burst of one.
///
/// Tokens accrue at `rate` per second, clamped to the burst. A request
/// takes one token; a negative balance translates into a wait, and a wait
/// that would overrun the request deadline fails immediately without
/// consuming the token. A non-positive rate never accrues, so every
/// request times out.
#[derive(Clone)]
pub struct RateLimiter {
    bucket: Arc<Mutex<Bucket>>,
    rate: f64,
    deadline: Duration,
}

/// The wait would have overrun the request deadline.
#[derive(Debug)]
pub struct WaitTimeout;

impl RateLimiter {
    pub fn new(rate: i64, deadline: Duration) -> Self {
        let rate = rate as f64;
        Self {
            bucket: Arc::new(Mutex::new(Bucket {
                // a usable limiter starts with a full bucket; a disabled
                // one starts empty and stays empty
                tokens: if rate > 0.0 { BURST } else { 0.0 },
                last: Instant::now(),
            })),
            rate,
            deadline,
        }
    }

    /// Wait for one token, or fail if the wait would exceed the deadline.
    pub async fn wait(&self) -> Result<(), WaitTimeout> {
        let delay = {
            let mut bucket = self.bucket.lock().unwrap();
            let now = Instant::now();
            let current = self.tokens_at(&bucket, now);
            let after = current - 1.0;

            let delay = if after < 0.0 {
                self.duration_from_tokens(-after)
            } else {
                Duration::ZERO
            };
            if delay > self.deadline {
                return Err(WaitTimeout);
            }

            bucket.tokens = after;
            bucket.last = now;
            delay
        };

        if delay.is_zero() {
            return Ok(());
        }

        // If the request is dropped mid-wait, hand the token back so a
        // cancelled request does not starve future ones.
        let mut refund = TokenRefund {
            limiter: self,
            armed: true,
        };
        tokio::time::sleep(delay).await;
        refund.armed = false;
        Ok(())
    }

    fn tokens_at(&self, bucket: &Bucket, now: Instant) -> f64 {
        if self.rate <= 0.0 {
            return bucket.tokens;
        }
        let elapsed = now.saturating_duration_since(bucket.last).as_secs_f64();
        (bucket.tokens + elapsed * self.rate).min(BURST)
    }

    fn duration_from_tokens(&self, tokens: f64) -> Duration {
        if self.rate <= 0.0 {
            return Duration::MAX;
        }
        Duration::from_secs_f64(tokens / self.rate)
    }
}

struct TokenRefund<'a> {
    limiter: &'a RateLimiter,
    armed: bool,
}

impl Drop for TokenRefund<'_> {
    fn drop(&mut self) {
        if self.armed {
            let mut bucket = self.limiter.bucket.lock().unwrap();
            bucket.tokens = (bucket.tokens + 1.0).min(BURST);
        }
    }
}

/// Middleware wrapping a handler with a [`RateLimiter`].
pub async fn rate_limit(
    State(limiter): State<RateLimiter>,
    request: Request<Body>,
    next: Next,
) -> Response {
    match limiter.wait().await {
        Ok(()) => next.run(request).await,
        Err(WaitTimeout) => {
            debug!("rate limit wait would exceed the request deadline");
            ADMISSION_REJECTED_TOTAL
                .with_label_values(&["rate"])
                .inc();
            StatusCode::REQUEST_TIMEOUT.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use axum::{middleware, routing::get, Router};
    use futures::future::join_all;
    use tower::ServiceExt;

    async fn slow_handler() -> &'static str {
        tokio::time::sleep(Duration::from_millis(100)).await;
        "done"
    }

    fn limited_app(capacity: usize) -> Router {
        let limiter = ConcurrencyLimiter::new(capacity);
        Router::new().route(
            "/slow",
            get(slow_handler)
                .layer(middleware::from_fn_with_state(limiter, concurrency_limit)),
        )
    }

    fn request() -> Request<Body> {
        Request::builder().uri("/slow").body(Body::empty()).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrency_limiter_bounds_in_flight_requests() {
        let app = limited_app(2);

        let responses = join_all((0..5).map(|_| app.clone().oneshot(request()))).await;

        let mut ok = 0;
        let mut unavailable = 0;
        for response in responses {
            match response.unwrap().status() {
                StatusCode::OK => ok += 1,
                StatusCode::SERVICE_UNAVAILABLE => unavailable += 1,
                other => panic!("unexpected status {other}"),
            }
        }
        assert_eq!(ok, 2);
        assert_eq!(unavailable, 3);

        // slots are free again once the burst drained
        let response = app.clone().oneshot(request()).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_concurrency_limiter_releases_slot_after_error_response() {
        async fn failing_handler() -> StatusCode {
            StatusCode::INTERNAL_SERVER_ERROR
        }

        let limiter = ConcurrencyLimiter::new(1);
        let app = Router::new().route(
            "/fail",
            get(failing_handler)
                .layer(middleware::from_fn_with_state(limiter, concurrency_limit)),
        );

        for _ in 0..3 {
            let response = app
                .clone()
                .oneshot(
                    Request::builder()
                        .uri("/fail")
                        .body(Body::empty())
                        .unwrap(),
                )
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limiter_paces_sequential_requests() {
        let limiter = RateLimiter::new(5, Duration::from_secs(10));

        let started = Instant::now();
        for _ in 0..10 {
            limiter.wait().await.unwrap();
        }
        let elapsed = started.elapsed();

        // 10 requests at 5 rps with a burst of 1 take at least 1.8s
        assert!(elapsed >= Duration::from_millis(1750), "elapsed {elapsed:?}");
        assert!(elapsed <= Duration::from_millis(2500), "elapsed {elapsed:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limiter_rejects_when_wait_exceeds_deadline() {
        let limiter = RateLimiter::new(1, Duration::from_millis(500));

        limiter.wait().await.unwrap();
        // the next token is a full second away, past the 500ms deadline
        assert!(limiter.wait().await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limiter_failed_wait_consumes_no_token() {
        let limiter = RateLimiter::new(1, Duration::from_millis(100));

        limiter.wait().await.unwrap();
        assert!(limiter.wait().await.is_err());

        // after a second the bucket refilled exactly one token
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(limiter.wait().await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_rate_rejects_everything() {
        let limiter = RateLimiter::new(0, Duration::from_secs(60));
        assert!(limiter.wait().await.is_err());
        assert!(limiter.wait().await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limited_route_returns_408() {
        async fn fast_handler() -> &'static str {
            "ok"
        }

        let limiter = RateLimiter::new(0, Duration::from_secs(1));
        let app = Router::new().route(
            "/limited",
            get(fast_handler).layer(middleware::from_fn_with_state(limiter, rate_limit)),
        );

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/limited")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::REQUEST_TIMEOUT);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_wait_refunds_the_token() {
        let limiter = RateLimiter::new(1, Duration::from_secs(10));
        limiter.wait().await.unwrap();

        // start a wait and drop it halfway through
        {
            let wait = limiter.wait();
            tokio::pin!(wait);
            let _ = tokio::time::timeout(Duration::from_millis(200), &mut wait).await;
        }

        // the dropped wait's token was handed back; one token accrues
        // within the next second and this wait must succeed quickly
        let started = Instant::now();
        limiter.wait().await.unwrap();
        assert!(started.elapsed() <= Duration::from_millis(1100));
    }
}
