//! Health & readiness handlers.
//!
//! - GET /health  -> simple liveness with server time
//! - GET /readyz  -> readiness that checks DB connectivity

use crate::services::registry_service::RegistryService;
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// `GET /health`
///
/// Liveness probe — always returns 200 OK with the current server time.
/// Cheap and never performs I/O.
pub async fn health() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "ok".into(),
            time: Utc::now(),
        }),
    )
}

/// `GET /readyz`
///
/// Readiness probe that runs a lightweight query against the database
/// (`SELECT 1`). HTTP 200 when the check passes, HTTP 503 otherwise.
pub async fn readyz(State(registry): State<RegistryService>) -> impl IntoResponse {
    let db_check = match sqlx::query_scalar::<_, i64>("SELECT 1")
        .fetch_one(&*registry.db)
        .await
    {
        Ok(1) => (true, None::<String>),
        Ok(v) => (false, Some(format!("unexpected result: {}", v))),
        Err(e) => (false, Some(format!("error: {}", e))),
    };

    let (ok, error) = db_check;
    let body = ReadyResponse {
        status: if ok { "ok".into() } else { "error".into() },
        database: CheckStatus { ok, error },
    };

    let status = if ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(body))
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    time: DateTime<Utc>,
}

#[derive(Serialize)]
struct ReadyResponse {
    status: String,
    database: CheckStatus,
}

#[derive(Serialize)]
struct CheckStatus {
    ok: bool,
    error: Option<String>,
}
