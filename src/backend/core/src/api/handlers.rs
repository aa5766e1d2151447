//! API request handlers with proper error propagation.
//!
//! All handlers return `Result<impl IntoResponse, LibrisError>` so that
//! errors are converted to HTTP status codes by the `IntoResponse`
//! implementation on `LibrisError`. Payloads are validated here, before the
//! service sees them.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use uuid::Uuid;

use super::{ApiResponse, AppState};
use crate::error::LibrisError;
use crate::models::{
    AuthorId, AuthorPatch, BookId, BookPatch, ClientId, ClientPatch, NewAuthor, NewBook,
    NewClient, NewSale, SaleId,
};
use crate::validation::Validate;

type HandlerResult = Result<Response, LibrisError>;

fn ok<T: serde::Serialize>(data: T) -> HandlerResult {
    Ok(Json(ApiResponse::success(data)).into_response())
}

fn created<T: serde::Serialize>(data: T) -> HandlerResult {
    Ok((StatusCode::CREATED, Json(ApiResponse::success(data))).into_response())
}

fn no_content() -> HandlerResult {
    Ok(StatusCode::NO_CONTENT.into_response())
}

// ═══════════════════════════════════════════════════════════════════════════════
// Health & Metrics
// ═══════════════════════════════════════════════════════════════════════════════

pub async fn health_check(State(state): State<AppState>) -> Response {
    let backend = state.service.store().backend_name();

    match state.service.ping().await {
        Ok(()) => Json(serde_json::json!({
            "status": "healthy",
            "backend": backend,
            "version": env!("CARGO_PKG_VERSION"),
            "timestamp": chrono::Utc::now().to_rfc3339()
        }))
        .into_response(),
        Err(err) => {
            tracing::warn!(backend, error = %err, "Health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(serde_json::json!({
                    "status": "unhealthy",
                    "backend": backend,
                    "version": env!("CARGO_PKG_VERSION"),
                    "timestamp": chrono::Utc::now().to_rfc3339()
                })),
            )
                .into_response()
        }
    }
}

pub async fn prometheus_metrics(State(state): State<AppState>) -> Response {
    match &state.metrics {
        Some(handle) => (
            [(axum::http::header::CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
            handle.render(),
        )
            .into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Author Handlers
// ═══════════════════════════════════════════════════════════════════════════════

pub async fn list_authors(State(state): State<AppState>) -> HandlerResult {
    ok(state.service.list_authors().await?)
}

pub async fn create_author(
    State(state): State<AppState>,
    Json(req): Json<NewAuthor>,
) -> HandlerResult {
    req.validate()?;
    created(state.service.create_author(req).await?)
}

pub async fn get_author(State(state): State<AppState>, Path(id): Path<Uuid>) -> HandlerResult {
    ok(state.service.get_author(AuthorId(id)).await?)
}

pub async fn get_author_stats(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> HandlerResult {
    ok(state.service.get_author_stats(AuthorId(id)).await?)
}

pub async fn update_author(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<AuthorPatch>,
) -> HandlerResult {
    req.validate()?;
    ok(state.service.update_author(AuthorId(id), req).await?)
}

pub async fn delete_author(State(state): State<AppState>, Path(id): Path<Uuid>) -> HandlerResult {
    state.service.delete_author(AuthorId(id)).await?;
    no_content()
}

// ═══════════════════════════════════════════════════════════════════════════════
// Book Handlers
// ═══════════════════════════════════════════════════════════════════════════════

pub async fn list_books(State(state): State<AppState>) -> HandlerResult {
    ok(state.service.list_books().await?)
}

pub async fn create_book(State(state): State<AppState>, Json(req): Json<NewBook>) -> HandlerResult {
    req.validate()?;
    created(state.service.create_book(req).await?)
}

pub async fn get_book(State(state): State<AppState>, Path(id): Path<Uuid>) -> HandlerResult {
    ok(state.service.get_book(BookId(id)).await?)
}

pub async fn get_book_buyers(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> HandlerResult {
    ok(state.service.get_book_buyers(BookId(id)).await?)
}

pub async fn update_book(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<BookPatch>,
) -> HandlerResult {
    req.validate()?;
    ok(state.service.update_book(BookId(id), req).await?)
}

pub async fn delete_book(State(state): State<AppState>, Path(id): Path<Uuid>) -> HandlerResult {
    state.service.delete_book(BookId(id)).await?;
    no_content()
}

// ═══════════════════════════════════════════════════════════════════════════════
// Client Handlers
// ═══════════════════════════════════════════════════════════════════════════════

pub async fn list_clients(State(state): State<AppState>) -> HandlerResult {
    ok(state.service.list_clients().await?)
}

pub async fn create_client(
    State(state): State<AppState>,
    Json(req): Json<NewClient>,
) -> HandlerResult {
    req.validate()?;
    created(state.service.create_client(req).await?)
}

pub async fn get_client(State(state): State<AppState>, Path(id): Path<i64>) -> HandlerResult {
    ok(state.service.get_client(ClientId(id)).await?)
}

pub async fn get_client_purchases(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> HandlerResult {
    ok(state.service.get_client_purchases(ClientId(id)).await?)
}

pub async fn update_client(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<ClientPatch>,
) -> HandlerResult {
    req.validate()?;
    ok(state.service.update_client(ClientId(id), req).await?)
}

pub async fn delete_client(State(state): State<AppState>, Path(id): Path<i64>) -> HandlerResult {
    state.service.delete_client(ClientId(id)).await?;
    no_content()
}

// ═══════════════════════════════════════════════════════════════════════════════
// Sale Handlers
// ═══════════════════════════════════════════════════════════════════════════════

pub async fn record_sale(State(state): State<AppState>, Json(req): Json<NewSale>) -> HandlerResult {
    created(state.service.record_sale(req).await?)
}

pub async fn delete_sale(State(state): State<AppState>, Path(id): Path<i64>) -> HandlerResult {
    state.service.delete_sale(SaleId(id)).await?;
    no_content()
}

pub async fn list_sales_for_client(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> HandlerResult {
    ok(state.service.list_sales_for_client(ClientId(id)).await?)
}

pub async fn list_sales_for_book(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> HandlerResult {
    ok(state.service.list_sales_for_book(BookId(id)).await?)
}
