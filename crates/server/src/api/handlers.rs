//! API handlers and their error-to-status mapping.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use comicsearch_core::{
    AuthError, ComicRef, SanitizedConfig, SearchError, ServiceStats, UpdateError, UpdateStatus,
};

use crate::metrics::{collect_dynamic_metrics, encode_metrics};
use crate::state::AppState;

const DEFAULT_SEARCH_LIMIT: i64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PingStatus {
    Ok,
    Unavailable,
}

#[derive(Debug, Serialize)]
pub struct PingResponse {
    pub replies: BTreeMap<&'static str, PingStatus>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub name: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub phrase: Option<String>,
    #[serde(default)]
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub comics: Vec<ComicRef>,
    pub total: i64,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: UpdateStatus,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
        .into_response()
}

/// GET /api/ping
///
/// Concrete liveness checks for every dependency, always answered 200.
pub async fn ping(State(state): State<Arc<AppState>>) -> Json<PingResponse> {
    let mut replies = BTreeMap::new();

    replies.insert(
        "words",
        match state.words().norm("ping") {
            Ok(_) => PingStatus::Ok,
            Err(e) => {
                warn!(service = "words", error = %e, "service ping failed");
                PingStatus::Unavailable
            }
        },
    );
    replies.insert(
        "update",
        match state.updater().ping() {
            Ok(()) => PingStatus::Ok,
            Err(e) => {
                debug!(service = "update", error = %e, "service unavailable");
                PingStatus::Unavailable
            }
        },
    );
    replies.insert(
        "search",
        match state.searcher().ping() {
            Ok(()) => PingStatus::Ok,
            Err(e) => {
                debug!(service = "search", error = %e, "service unavailable");
                PingStatus::Unavailable
            }
        },
    );

    Json(PingResponse { replies })
}

/// POST /api/login
///
/// Exchanges admin credentials for a plaintext token.
pub async fn login(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Response {
    let Ok(Json(login)) = payload else {
        return StatusCode::BAD_REQUEST.into_response();
    };

    match state
        .authenticator()
        .create_token(&login.name, &login.password)
    {
        Ok(token) => (StatusCode::OK, token).into_response(),
        Err(AuthError::InvalidCredentials) => StatusCode::UNAUTHORIZED.into_response(),
        Err(e) => {
            error!(error = %e, "failed to create token");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

fn validated_params(params: &SearchParams) -> Result<(&str, i64), Response> {
    let phrase = params.phrase.as_deref().unwrap_or_default();
    let limit = params.limit.unwrap_or(DEFAULT_SEARCH_LIMIT);
    if phrase.is_empty() || limit <= 0 {
        return Err(error_response(
            StatusCode::BAD_REQUEST,
            "phrase must be non-empty and limit positive",
        ));
    }
    Ok((phrase, limit))
}

fn search_error_response(e: SearchError) -> Response {
    match e {
        SearchError::BadArguments | SearchError::Words(_) => {
            error_response(StatusCode::BAD_REQUEST, e.to_string())
        }
        SearchError::Storage(_) => {
            warn!(error = %e, "search failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

/// GET /api/search
///
/// Full-scan ranked search. Sits behind the concurrency limiter.
pub async fn search(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchParams>,
) -> Response {
    let (phrase, limit) = match validated_params(&params) {
        Ok(validated) => validated,
        Err(response) => return response,
    };

    match state.searcher().search(phrase, limit) {
        Ok(comics) => {
            let total = comics.len() as i64;
            Json(SearchResponse { comics, total }).into_response()
        }
        Err(e) => search_error_response(e),
    }
}

/// GET /api/isearch
///
/// Indexed ranked search. Sits behind the rate limiter.
pub async fn isearch(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchParams>,
) -> Response {
    let (phrase, limit) = match validated_params(&params) {
        Ok(validated) => validated,
        Err(response) => return response,
    };

    match state.searcher().isearch(phrase, limit).await {
        Ok(comics) => {
            let total = comics.len() as i64;
            Json(SearchResponse { comics, total }).into_response()
        }
        Err(e) => search_error_response(e),
    }
}

/// POST /api/db/update
///
/// Triggers catalog synchronization. 202 when one is already running.
pub async fn update_db(State(state): State<Arc<AppState>>) -> Response {
    match state.updater().update().await {
        Ok(()) => StatusCode::OK.into_response(),
        Err(UpdateError::AlreadyInProgress) => {
            debug!("update already running");
            StatusCode::ACCEPTED.into_response()
        }
        Err(e) => {
            warn!(error = %e, "update failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

/// DELETE /api/db
///
/// Drops the catalog and zeroes the stats.
pub async fn drop_db(State(state): State<Arc<AppState>>) -> Response {
    match state.updater().drop_all().await {
        Ok(()) => StatusCode::OK.into_response(),
        Err(UpdateError::AlreadyInProgress) => {
            debug!("drop rejected, update already running");
            StatusCode::ACCEPTED.into_response()
        }
        Err(e) => {
            warn!(error = %e, "drop failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

/// GET /api/db/stats
pub async fn db_stats(State(state): State<Arc<AppState>>) -> Result<Json<ServiceStats>, Response> {
    match state.updater().stats().await {
        Ok(stats) => Ok(Json(stats)),
        Err(e) => {
            warn!(error = %e, "stats failed");
            Err(error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                e.to_string(),
            ))
        }
    }
}

/// GET /api/db/status
pub async fn db_status(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    Json(StatusResponse {
        status: state.updater().status(),
    })
}

/// GET /api/config
pub async fn get_config(State(state): State<Arc<AppState>>) -> Json<SanitizedConfig> {
    Json(state.sanitized_config())
}

/// GET /metrics
pub async fn metrics(State(state): State<Arc<AppState>>) -> Response {
    collect_dynamic_metrics(&state);
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        encode_metrics(),
    )
        .into_response()
}
