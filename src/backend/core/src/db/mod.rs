//! Entity store for Libris.
//!
//! [`LibraryStore`] is the only seam between the service layer and storage.
//! Two backends implement it:
//!
//! - [`Database`]: PostgreSQL via sqlx, used in production.
//! - [`InMemoryStore`]: process-local maps, used for tests and development.
//!
//! Joined reads (`buyer_rows`, `purchase_rows`, the count maps) are batched
//! at this boundary so aggregation never walks relations one row at a time.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use std::collections::HashMap;

use crate::error::Result;
use crate::models::{
    Author, AuthorId, AuthorPatch, Book, BookId, BookPatch, Client, ClientId, ClientPatch,
    NewAuthor, NewBook, NewClient, NewSale, Sale, SaleId,
};
use crate::relations::DeletionPlan;

pub use memory::InMemoryStore;
pub use postgres::Database;

/// Persistence for authors, books, clients and sales.
///
/// Lookups return `Ok(None)` for unknown ids; turning absence into a typed
/// not-found error is the service layer's job. `update_*` overwrite only the
/// fields present in the patch and return `Ok(None)` if the row is gone.
#[async_trait]
pub trait LibraryStore: Send + Sync + 'static {
    // ─── Authors ────────────────────────────────────────────────────────────

    /// All authors ordered by last name, then first name.
    async fn list_authors(&self) -> Result<Vec<Author>>;

    async fn get_author(&self, id: AuthorId) -> Result<Option<Author>>;

    async fn insert_author(&self, author: NewAuthor) -> Result<Author>;

    async fn update_author(&self, id: AuthorId, patch: AuthorPatch) -> Result<Option<Author>>;

    /// Number of books per author. Authors without books are absent.
    async fn book_counts(&self) -> Result<HashMap<AuthorId, u64>>;

    /// Books owned by one author, ordered by title.
    async fn books_by_author(&self, id: AuthorId) -> Result<Vec<Book>>;

    // ─── Books ──────────────────────────────────────────────────────────────

    /// All books joined to their author, ordered by title.
    async fn books_with_authors(&self) -> Result<Vec<(Book, Author)>>;

    async fn get_book(&self, id: BookId) -> Result<Option<Book>>;

    async fn book_with_author(&self, id: BookId) -> Result<Option<(Book, Author)>>;

    async fn insert_book(&self, book: NewBook) -> Result<Book>;

    async fn update_book(&self, id: BookId, patch: BookPatch) -> Result<Option<Book>>;

    // ─── Clients ────────────────────────────────────────────────────────────

    /// All clients ordered by id.
    async fn list_clients(&self) -> Result<Vec<Client>>;

    async fn get_client(&self, id: ClientId) -> Result<Option<Client>>;

    async fn insert_client(&self, client: NewClient) -> Result<Client>;

    async fn update_client(&self, id: ClientId, patch: ClientPatch) -> Result<Option<Client>>;

    /// Number of sales per client. Clients without sales are absent.
    async fn purchase_counts(&self) -> Result<HashMap<ClientId, u64>>;

    // ─── Sales ──────────────────────────────────────────────────────────────

    async fn get_sale(&self, id: SaleId) -> Result<Option<Sale>>;

    /// Persist a sale. References must already have been checked.
    async fn insert_sale(&self, sale: NewSale) -> Result<Sale>;

    /// Number of sales per book for the given books. Books without sales
    /// are absent.
    async fn sales_counts(&self, books: &[BookId]) -> Result<HashMap<BookId, u64>>;

    async fn sales_for_books(&self, books: &[BookId]) -> Result<Vec<Sale>>;

    async fn sales_for_client(&self, id: ClientId) -> Result<Vec<Sale>>;

    /// Every sale of a book joined to its client.
    async fn buyer_rows(&self, id: BookId) -> Result<Vec<(Sale, Client)>>;

    /// Every sale to a client joined to its book and the book's author.
    async fn purchase_rows(&self, id: ClientId) -> Result<Vec<(Sale, Book, Author)>>;

    // ─── Deletion ───────────────────────────────────────────────────────────

    /// Remove every row listed in the plan, all or nothing.
    async fn apply_deletion(&self, plan: &DeletionPlan) -> Result<()>;

    // ─── Health ─────────────────────────────────────────────────────────────

    /// Check that the store is reachable.
    async fn ping(&self) -> Result<()>;

    /// Backend name for logs and health output.
    fn backend_name(&self) -> &'static str;
}
