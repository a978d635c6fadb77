//! Metrics and token-authentication middleware for API routes.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Body,
    extract::State,
    http::{header, Request, StatusCode},
    middleware::Next,
    response::Response,
};

use crate::metrics::{AUTH_FAILURES_TOTAL, HTTP_REQUESTS_IN_FLIGHT, HTTP_REQUESTS_TOTAL, HTTP_REQUEST_DURATION};
use crate::state::AppState;

const TOKEN_PREFIX: &str = "Token ";
const TOKEN_COOKIE: &str = "jwt_token";

/// Records request duration, counts and the in-flight gauge.
pub async fn metrics_middleware(request: Request<Body>, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();
    let path = request.uri().path().to_string();

    HTTP_REQUESTS_IN_FLIGHT.inc();
    let response = next.run(request).await;
    HTTP_REQUESTS_IN_FLIGHT.dec();

    let duration = start.elapsed().as_secs_f64();
    let status = response.status().as_u16().to_string();

    HTTP_REQUEST_DURATION
        .with_label_values(&[&method, &path, &status])
        .observe(duration);
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[&method, &path, &status])
        .inc();

    response
}

/// Guards mutating endpoints behind the admin token.
///
/// The token is read from the `Authorization: Token <jwt>` header first,
/// then from the `jwt_token` cookie. Anything missing or invalid is 401.
pub async fn require_token(
    State(state): State<Arc<AppState>>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let Some(token) = extract_token(&request) else {
        AUTH_FAILURES_TOTAL
            .with_label_values(&["missing_token"])
            .inc();
        return Err(StatusCode::UNAUTHORIZED);
    };

    if state.authenticator().validate_token(&token).is_err() {
        AUTH_FAILURES_TOTAL
            .with_label_values(&["invalid_token"])
            .inc();
        return Err(StatusCode::UNAUTHORIZED);
    }

    Ok(next.run(request).await)
}

fn extract_token(request: &Request<Body>) -> Option<String> {
    if let Some(value) = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
    {
        if let Some(token) = value.strip_prefix(TOKEN_PREFIX) {
            return Some(token.to_string());
        }
    }

    for value in request.headers().get_all(header::COOKIE) {
        let Ok(value) = value.to_str() else {
            continue;
        };
        for cookie in value.split(';') {
            if let Some((name, token)) = cookie.trim().split_once('=') {
                if name == TOKEN_COOKIE {
                    return Some(token.to_string());
                }
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request_with_headers(headers: &[(header::HeaderName, &str)]) -> Request<Body> {
        let mut builder = Request::builder().uri("/test");
        for (name, value) in headers {
            builder = builder.header(name.clone(), *value);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[test]
    fn test_extract_token_from_authorization_header() {
        let request = request_with_headers(&[(header::AUTHORIZATION, "Token abc.def.ghi")]);
        assert_eq!(extract_token(&request).as_deref(), Some("abc.def.ghi"));
    }

    #[test]
    fn test_extract_token_rejects_other_schemes() {
        let request = request_with_headers(&[(header::AUTHORIZATION, "Bearer abc.def.ghi")]);
        assert!(extract_token(&request).is_none());
    }

    #[test]
    fn test_extract_token_from_cookie() {
        let request =
            request_with_headers(&[(header::COOKIE, "theme=dark; jwt_token=abc.def; lang=en")]);
        assert_eq!(extract_token(&request).as_deref(), Some("abc.def"));
    }

    #[test]
    fn test_header_takes_priority_over_cookie() {
        let request = request_with_headers(&[
            (header::AUTHORIZATION, "Token from-header"),
            (header::COOKIE, "jwt_token=from-cookie"),
        ]);
        assert_eq!(extract_token(&request).as_deref(), Some("from-header"));
    }

    #[test]
    fn test_no_token_anywhere() {
        let request = request_with_headers(&[]);
        assert!(extract_token(&request).is_none());
    }
}
