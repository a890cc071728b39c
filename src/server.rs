//! HTTP trigger surface for the ingestion pipeline.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/health` | Liveness, always `{"ok": true}` |
//! | `POST` | `/run` | Run the pipeline now, returns `{kept, skipped, total_links}` |
//!
//! `POST /run` accepts an optional `?max_pages=N` query parameter; the
//! default is `[source].max_pages_each`. A run that is already in progress
//! (scheduled or triggered) is waited for, never overlapped.
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "collection_failed", "message": "all 8 listing pages were unreachable" } }
//! ```
//!
//! Only a collection failure is an error (`502`). Links that fail
//! individually are reported as `skipped` in a `200` response.
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use crate::config::Config;
use crate::db;
use crate::fetch::create_fetcher;
use crate::ingest::Pipeline;
use crate::migrate;
use crate::models::RunSummary;
use crate::scheduler::spawn_scheduler;
use crate::store::SqliteStore;

/// Shared application state passed to all route handlers via Axum's `State` extractor.
#[derive(Clone)]
struct AppState {
    pipeline: Arc<Pipeline>,
}

/// Build the router around an existing pipeline.
pub fn router(pipeline: Arc<Pipeline>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route("/run", post(handle_run))
        .layer(cors)
        .with_state(AppState { pipeline })
}

/// Starts the trigger server, plus the background scheduler when
/// `[schedule].enabled`.
///
/// Binds to `[server].bind` and runs until the process is terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let bind_addr = config.server.bind.clone();
    let config = Arc::new(config.clone());

    let pool = db::connect(&config).await?;
    migrate::migrate_pool(&pool).await?;

    let fetcher = create_fetcher(&config)?;
    let store = Arc::new(SqliteStore::new(pool));
    let pipeline = Arc::new(Pipeline::new(config.clone(), fetcher, store));

    if config.schedule.enabled {
        spawn_scheduler(
            pipeline.clone(),
            Duration::from_secs(config.schedule.interval_minutes * 60),
            config.source.max_pages_each,
        );
    } else {
        info!("Background scheduler disabled");
    }

    let app = router(pipeline);

    println!("Trigger server listening on http://{}", bind_addr);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn collection_failed(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_GATEWAY,
        code: "collection_failed".to_string(),
        message: message.into(),
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    ok: bool,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse { ok: true })
}

// ============ POST /run ============

#[derive(Debug, Deserialize)]
struct RunParams {
    max_pages: Option<u32>,
}

async fn handle_run(
    State(state): State<AppState>,
    Query(params): Query<RunParams>,
) -> Result<Json<RunSummary>, AppError> {
    let max_pages = params
        .max_pages
        .unwrap_or(state.pipeline.config().source.max_pages_each);

    match state.pipeline.run(max_pages).await {
        Ok(summary) => Ok(Json(summary)),
        Err(e) => {
            warn!(error = %e, "Triggered run failed");
            Err(collection_failed(e.to_string()))
        }
    }
}
