//! HTTP surface for triggering ingestion and reading results
//!
//! - `GET /ping` liveness message
//! - `POST /ingest` starts a background ingestion (202, or 409 if one runs)
//! - `GET /urls?page=&limit=` pages through discovered listing URLs

use crate::ingest::{start_ingestion, IngestContext, StartOutcome};
use crate::output::{list_urls, ListQuery};
use crate::Result;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;

pub const PING_MESSAGE: &str = "Listing harvester service is running!";

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    fn new(message: impl Into<String>) -> Json<Self> {
        Json(Self {
            message: message.into(),
        })
    }
}

#[derive(Debug, Serialize)]
pub struct UrlsResponse {
    pub data: Vec<String>,
    pub message: String,
    pub total_count: u64,
    pub page: u64,
    pub limit: u64,
}

/// Build the axum router for all endpoints.
pub fn router(ctx: IngestContext) -> Router {
    Router::new()
        .route("/ping", get(ping))
        .route("/ingest", post(ingest))
        .route("/urls", get(urls))
        .with_state(ctx)
}

/// Binds `bind` and serves the router until the process stops
pub async fn serve(ctx: IngestContext, bind: &str) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(bind).await?;
    tracing::info!("Listening on {}", listener.local_addr()?);
    axum::serve(listener, router(ctx)).await?;
    Ok(())
}

async fn ping() -> Json<MessageResponse> {
    MessageResponse::new(PING_MESSAGE)
}

/// Starts ingestion without waiting for it; pipeline errors only show up in
/// logs and in the `ingestion_runs` table.
async fn ingest(State(ctx): State<IngestContext>) -> (StatusCode, Json<MessageResponse>) {
    match start_ingestion(ctx) {
        StartOutcome::Started(_) => (StatusCode::ACCEPTED, MessageResponse::new("Ingestion started")),
        StartOutcome::AlreadyRunning => (
            StatusCode::CONFLICT,
            MessageResponse::new("Ingestion already running"),
        ),
    }
}

async fn urls(
    State(ctx): State<IngestContext>,
    Query(query): Query<ListQuery>,
) -> std::result::Result<Json<UrlsResponse>, (StatusCode, Json<MessageResponse>)> {
    let page = ctx
        .lock_storage()
        .and_then(|storage| list_urls(&*storage, query))
        .map_err(|e| {
            tracing::error!("Failed to list URLs: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                MessageResponse::new("Failed to list URLs"),
            )
        })?;

    Ok(Json(UrlsResponse {
        data: page.data,
        message: "urls".to_string(),
        total_count: page.total_count,
        page: page.page,
        limit: page.limit,
    }))
}
