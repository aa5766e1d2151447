//! Read-time statistics over the entity store.
//!
//! Nothing here is persisted. Every figure is recomputed from the store on
//! each call using batched queries, so a list of N books costs a constant
//! number of round trips rather than one per book.
//!
//! Ordering of buyer and purchase lists is applied here as well, so the
//! result does not depend on how a backend happens to return rows.

use std::collections::HashMap;
use std::sync::Arc;

use crate::db::LibraryStore;
use crate::error::Result;
use crate::models::{
    Author, AuthorId, AuthorStats, AuthorSummary, AuthorView, Book, BookId, BookSummary,
    BookView, Buyer, Client, ClientId, ClientPurchases, ClientSummary, ClientView, Purchase,
    Sale,
};

// ═══════════════════════════════════════════════════════════════════════════════
// Pure helpers
// ═══════════════════════════════════════════════════════════════════════════════

/// Round half away from zero to two decimal places.
pub fn round_to_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Mean sales per book, rounded to two decimals. Zero books yields `0.0`.
pub fn average_sales(total_sales: u64, books_count: u64) -> f64 {
    if books_count == 0 {
        return 0.0;
    }
    round_to_cents(total_sales as f64 / books_count as f64)
}

/// Most recent first; ties broken by the higher sale id.
fn newest_first(a: &Sale, b: &Sale) -> std::cmp::Ordering {
    b.date.cmp(&a.date).then_with(|| b.id.cmp(&a.id))
}

/// Shape `(sale, client)` rows into buyer entries, newest first.
pub fn buyers_from_rows(mut rows: Vec<(Sale, Client)>) -> Vec<Buyer> {
    rows.sort_by(|(a, _), (b, _)| newest_first(a, b));
    rows.into_iter()
        .map(|(sale, client)| Buyer {
            id: sale.id,
            date: sale.date,
            client: ClientSummary::from(&client),
        })
        .collect()
}

/// Shape `(sale, book, author)` rows into purchase entries, newest first.
pub fn purchases_from_rows(mut rows: Vec<(Sale, Book, Author)>) -> Vec<Purchase> {
    rows.sort_by(|(a, ..), (b, ..)| newest_first(a, b));
    rows.into_iter()
        .map(|(sale, book, author)| Purchase {
            id: sale.id,
            date: sale.date,
            book: BookSummary {
                id: book.id,
                title: book.title,
                year_published: book.year_published,
                author: AuthorSummary::from(&author),
            },
        })
        .collect()
}

// ═══════════════════════════════════════════════════════════════════════════════
// Engine
// ═══════════════════════════════════════════════════════════════════════════════

/// Derives counts, averages and relation lists from the store.
///
/// Callers are expected to have checked that the root entity exists; an
/// unknown id simply aggregates to zero or an empty list.
#[derive(Clone)]
pub struct AggregationEngine {
    store: Arc<dyn LibraryStore>,
}

impl AggregationEngine {
    pub fn new(store: Arc<dyn LibraryStore>) -> Self {
        Self { store }
    }

    pub async fn books_count_for(&self, author_id: AuthorId) -> Result<u64> {
        Ok(self.store.books_by_author(author_id).await?.len() as u64)
    }

    pub async fn average_sales_for(&self, author_id: AuthorId) -> Result<f64> {
        let (books_count, average) = self.author_figures(author_id).await?;
        tracing::trace!(%author_id, books_count, average, "Computed average sales");
        Ok(average)
    }

    pub async fn author_stats(&self, author: Author) -> Result<AuthorStats> {
        let (books_count, average_sales) = self.author_figures(author.id).await?;
        Ok(AuthorStats {
            author,
            books_count,
            average_sales,
        })
    }

    /// Book count and average sales in two store calls.
    async fn author_figures(&self, author_id: AuthorId) -> Result<(u64, f64)> {
        let books = self.store.books_by_author(author_id).await?;
        if books.is_empty() {
            return Ok((0, 0.0));
        }

        let ids: Vec<BookId> = books.iter().map(|b| b.id).collect();
        let counts = self.store.sales_counts(&ids).await?;
        let total: u64 = ids.iter().map(|id| counts.get(id).copied().unwrap_or(0)).sum();
        let books_count = books.len() as u64;

        Ok((books_count, average_sales(total, books_count)))
    }

    pub async fn sales_count_for(&self, book_id: BookId) -> Result<u64> {
        let counts = self.store.sales_counts(&[book_id]).await?;
        Ok(counts.get(&book_id).copied().unwrap_or(0))
    }

    pub async fn purchases_count_for(&self, client_id: ClientId) -> Result<u64> {
        Ok(self.store.sales_for_client(client_id).await?.len() as u64)
    }

    pub async fn buyers_for(&self, book_id: BookId) -> Result<Vec<Buyer>> {
        let rows = self.store.buyer_rows(book_id).await?;
        Ok(buyers_from_rows(rows))
    }

    pub async fn purchase_history_for(&self, client_id: ClientId) -> Result<Vec<Purchase>> {
        let rows = self.store.purchase_rows(client_id).await?;
        Ok(purchases_from_rows(rows))
    }

    pub async fn client_purchases(&self, client: Client) -> Result<ClientPurchases> {
        let purchases = self.purchase_history_for(client.id).await?;
        Ok(ClientPurchases {
            client,
            purchases_count: purchases.len() as u64,
            purchases,
        })
    }

    // ─── Projections ────────────────────────────────────────────────────────

    pub async fn author_view(&self, author: Author) -> Result<AuthorView> {
        let books_count = self.books_count_for(author.id).await?;
        Ok(AuthorView {
            author,
            books_count,
        })
    }

    pub async fn authors_with_counts(&self, authors: Vec<Author>) -> Result<Vec<AuthorView>> {
        let counts = self.store.book_counts().await?;
        Ok(authors
            .into_iter()
            .map(|author| AuthorView {
                books_count: counts.get(&author.id).copied().unwrap_or(0),
                author,
            })
            .collect())
    }

    pub async fn book_view(&self, book: Book, author: &Author) -> Result<BookView> {
        let sales_count = self.sales_count_for(book.id).await?;
        Ok(BookView {
            book,
            author: AuthorSummary::from(author),
            sales_count,
        })
    }

    pub async fn books_with_counts(&self, rows: Vec<(Book, Author)>) -> Result<Vec<BookView>> {
        let ids: Vec<BookId> = rows.iter().map(|(b, _)| b.id).collect();
        let counts = if ids.is_empty() {
            HashMap::new()
        } else {
            self.store.sales_counts(&ids).await?
        };

        Ok(rows
            .into_iter()
            .map(|(book, author)| BookView {
                sales_count: counts.get(&book.id).copied().unwrap_or(0),
                author: AuthorSummary::from(&author),
                book,
            })
            .collect())
    }

    pub async fn client_view(&self, client: Client) -> Result<ClientView> {
        let purchases_count = self.purchases_count_for(client.id).await?;
        Ok(ClientView {
            client,
            purchases_count,
        })
    }

    pub async fn clients_with_counts(&self, clients: Vec<Client>) -> Result<Vec<ClientView>> {
        let counts = self.store.purchase_counts().await?;
        Ok(clients
            .into_iter()
            .map(|client| ClientView {
                purchases_count: counts.get(&client.id).copied().unwrap_or(0),
                client,
            })
            .collect())
    }
}
