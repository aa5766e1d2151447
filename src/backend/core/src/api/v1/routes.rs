//! V1 API routes.

use axum::{
    routing::{delete, get, post},
    Router,
};

use crate::api::{handlers, AppState};

/// V1 API prefix.
pub const V1_PREFIX: &str = "/api/v1";

/// Build the V1 API router.
///
/// All routes are mounted under `/api/v1/`.
///
/// # Endpoints
///
/// ## Authors
/// - `GET /authors`, `POST /authors`
/// - `GET|PUT|PATCH|DELETE /authors/:id`
/// - `GET /authors/:id/stats` - book count and average sales
///
/// ## Books
/// - `GET /books`, `POST /books`
/// - `GET|PUT|PATCH|DELETE /books/:id`
/// - `GET /books/:id/buyers`
///
/// ## Clients
/// - `GET /clients`, `POST /clients`
/// - `GET|PUT|PATCH|DELETE /clients/:id`
/// - `GET /clients/:id/purchases`
///
/// ## Sales
/// - `POST /sales`, `DELETE /sales/:id`
/// - `GET /sales/client/:id`, `GET /sales/book/:id`
pub fn v1_router() -> Router<AppState> {
    Router::new()
        // Author endpoints
        .route(
            "/authors",
            get(handlers::list_authors).post(handlers::create_author),
        )
        .route(
            "/authors/:id",
            get(handlers::get_author)
                .put(handlers::update_author)
                .patch(handlers::update_author)
                .delete(handlers::delete_author),
        )
        .route("/authors/:id/stats", get(handlers::get_author_stats))
        // Book endpoints
        .route("/books", get(handlers::list_books).post(handlers::create_book))
        .route(
            "/books/:id",
            get(handlers::get_book)
                .put(handlers::update_book)
                .patch(handlers::update_book)
                .delete(handlers::delete_book),
        )
        .route("/books/:id/buyers", get(handlers::get_book_buyers))
        // Client endpoints
        .route(
            "/clients",
            get(handlers::list_clients).post(handlers::create_client),
        )
        .route(
            "/clients/:id",
            get(handlers::get_client)
                .put(handlers::update_client)
                .patch(handlers::update_client)
                .delete(handlers::delete_client),
        )
        .route("/clients/:id/purchases", get(handlers::get_client_purchases))
        // Sale endpoints
        .route("/sales", post(handlers::record_sale))
        .route("/sales/:id", delete(handlers::delete_sale))
        .route("/sales/client/:id", get(handlers::list_sales_for_client))
        .route("/sales/book/:id", get(handlers::list_sales_for_book))
}
