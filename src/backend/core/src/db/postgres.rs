//! PostgreSQL store backend.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::collections::HashMap;
use std::time::Instant;
use uuid::Uuid;

use super::LibraryStore;
use crate::config::DatabaseConfig;
use crate::error::Result;
use crate::models::{
    Author, AuthorId, AuthorPatch, Book, BookId, BookPatch, Client, ClientId, ClientPatch,
    NewAuthor, NewBook, NewClient, NewSale, Sale, SaleId,
};
use crate::relations::DeletionPlan;

const AUTHOR_COLUMNS: &str = "id, first_name, last_name, photo_url";
const BOOK_COLUMNS: &str = "id, title, year_published, photo_url, author_id";
const CLIENT_COLUMNS: &str = "id, first_name, last_name, email, photo_url";
const SALE_COLUMNS: &str = "id, client_id, book_id, date, created_at";

/// Database connection and operations.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Create a new database connection pool.
    pub async fn new(config: &DatabaseConfig) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.acquire_timeout)
            .connect(&config.url)
            .await?;

        Ok(Self { pool })
    }

    /// Wrap an existing pool.
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Run embedded migrations.
    pub async fn migrate(&self) -> Result<()> {
        let started = Instant::now();
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        tracing::info!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Database migrations applied"
        );
        Ok(())
    }

    /// Get the connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn uuids<T: Copy>(ids: &[T], inner: impl Fn(T) -> Uuid) -> Vec<Uuid> {
    ids.iter().map(|id| inner(*id)).collect()
}

// ═══════════════════════════════════════════════════════════════════════════════
// Joined rows
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, sqlx::FromRow)]
struct BookAuthorRow {
    #[sqlx(flatten)]
    book: Book,
    author_first_name: String,
    author_last_name: String,
    author_photo_url: Option<String>,
}

impl From<BookAuthorRow> for (Book, Author) {
    fn from(row: BookAuthorRow) -> Self {
        let author = Author {
            id: row.book.author_id,
            first_name: row.author_first_name,
            last_name: row.author_last_name,
            photo_url: row.author_photo_url,
        };
        (row.book, author)
    }
}

#[derive(Debug, sqlx::FromRow)]
struct BuyerRow {
    #[sqlx(flatten)]
    sale: Sale,
    client_first_name: String,
    client_last_name: String,
    client_email: Option<String>,
    client_photo_url: Option<String>,
}

impl From<BuyerRow> for (Sale, Client) {
    fn from(row: BuyerRow) -> Self {
        let client = Client {
            id: row.sale.client_id,
            first_name: row.client_first_name,
            last_name: row.client_last_name,
            email: row.client_email,
            photo_url: row.client_photo_url,
        };
        (row.sale, client)
    }
}

#[derive(Debug, sqlx::FromRow)]
struct PurchaseRow {
    id: SaleId,
    client_id: ClientId,
    book_id: BookId,
    date: NaiveDate,
    created_at: DateTime<Utc>,
    book_title: String,
    book_year_published: i32,
    book_photo_url: Option<String>,
    author_id: AuthorId,
    author_first_name: String,
    author_last_name: String,
    author_photo_url: Option<String>,
}

impl From<PurchaseRow> for (Sale, Book, Author) {
    fn from(row: PurchaseRow) -> Self {
        let sale = Sale {
            id: row.id,
            client_id: row.client_id,
            book_id: row.book_id,
            date: row.date,
            created_at: row.created_at,
        };
        let book = Book {
            id: row.book_id,
            title: row.book_title,
            year_published: row.book_year_published,
            photo_url: row.book_photo_url,
            author_id: row.author_id,
        };
        let author = Author {
            id: row.author_id,
            first_name: row.author_first_name,
            last_name: row.author_last_name,
            photo_url: row.author_photo_url,
        };
        (sale, book, author)
    }
}

const BOOK_AUTHOR_SELECT: &str = r#"
    SELECT b.id, b.title, b.year_published, b.photo_url, b.author_id,
           a.first_name AS author_first_name,
           a.last_name AS author_last_name,
           a.photo_url AS author_photo_url
    FROM books b
    JOIN authors a ON a.id = b.author_id
"#;

#[async_trait]
impl LibraryStore for Database {
    // ═══════════════════════════════════════════════════════════════════════
    // Author Operations
    // ═══════════════════════════════════════════════════════════════════════

    async fn list_authors(&self) -> Result<Vec<Author>> {
        let rows = sqlx::query_as::<_, Author>(&format!(
            "SELECT {AUTHOR_COLUMNS} FROM authors ORDER BY last_name, first_name, id"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn get_author(&self, id: AuthorId) -> Result<Option<Author>> {
        let row = sqlx::query_as::<_, Author>(&format!(
            "SELECT {AUTHOR_COLUMNS} FROM authors WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn insert_author(&self, author: NewAuthor) -> Result<Author> {
        let row = sqlx::query_as::<_, Author>(&format!(
            r#"
            INSERT INTO authors (id, first_name, last_name, photo_url)
            VALUES ($1, $2, $3, $4)
            RETURNING {AUTHOR_COLUMNS}
            "#
        ))
        .bind(AuthorId::new())
        .bind(&author.first_name)
        .bind(&author.last_name)
        .bind(&author.photo_url)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn update_author(&self, id: AuthorId, patch: AuthorPatch) -> Result<Option<Author>> {
        let row = sqlx::query_as::<_, Author>(&format!(
            r#"
            UPDATE authors
            SET first_name = COALESCE($2, first_name),
                last_name = COALESCE($3, last_name),
                photo_url = CASE WHEN $4 THEN $5 ELSE photo_url END
            WHERE id = $1
            RETURNING {AUTHOR_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(&patch.first_name)
        .bind(&patch.last_name)
        .bind(patch.photo_url.is_some())
        .bind(patch.photo_url.flatten())
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn book_counts(&self) -> Result<HashMap<AuthorId, u64>> {
        let rows: Vec<(AuthorId, i64)> =
            sqlx::query_as("SELECT author_id, COUNT(*) FROM books GROUP BY author_id")
                .fetch_all(&self.pool)
                .await?;
        Ok(rows.into_iter().map(|(id, n)| (id, n as u64)).collect())
    }

    async fn books_by_author(&self, id: AuthorId) -> Result<Vec<Book>> {
        let rows = sqlx::query_as::<_, Book>(&format!(
            "SELECT {BOOK_COLUMNS} FROM books WHERE author_id = $1 ORDER BY title, id"
        ))
        .bind(id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Book Operations
    // ═══════════════════════════════════════════════════════════════════════

    async fn books_with_authors(&self) -> Result<Vec<(Book, Author)>> {
        let rows = sqlx::query_as::<_, BookAuthorRow>(&format!(
            "{BOOK_AUTHOR_SELECT} ORDER BY b.title, b.id"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn get_book(&self, id: BookId) -> Result<Option<Book>> {
        let row = sqlx::query_as::<_, Book>(&format!(
            "SELECT {BOOK_COLUMNS} FROM books WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn book_with_author(&self, id: BookId) -> Result<Option<(Book, Author)>> {
        let row = sqlx::query_as::<_, BookAuthorRow>(&format!(
            "{BOOK_AUTHOR_SELECT} WHERE b.id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Into::into))
    }

    async fn insert_book(&self, book: NewBook) -> Result<Book> {
        let row = sqlx::query_as::<_, Book>(&format!(
            r#"
            INSERT INTO books (id, title, year_published, photo_url, author_id)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {BOOK_COLUMNS}
            "#
        ))
        .bind(BookId::new())
        .bind(&book.title)
        .bind(book.year_published)
        .bind(&book.photo_url)
        .bind(book.author_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn update_book(&self, id: BookId, patch: BookPatch) -> Result<Option<Book>> {
        let row = sqlx::query_as::<_, Book>(&format!(
            r#"
            UPDATE books
            SET title = COALESCE($2, title),
                year_published = COALESCE($3, year_published),
                author_id = COALESCE($4, author_id),
                photo_url = CASE WHEN $5 THEN $6 ELSE photo_url END
            WHERE id = $1
            RETURNING {BOOK_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(&patch.title)
        .bind(patch.year_published)
        .bind(patch.author_id)
        .bind(patch.photo_url.is_some())
        .bind(patch.photo_url.flatten())
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Client Operations
    // ═══════════════════════════════════════════════════════════════════════

    async fn list_clients(&self) -> Result<Vec<Client>> {
        let rows = sqlx::query_as::<_, Client>(&format!(
            "SELECT {CLIENT_COLUMNS} FROM clients ORDER BY id"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn get_client(&self, id: ClientId) -> Result<Option<Client>> {
        let row = sqlx::query_as::<_, Client>(&format!(
            "SELECT {CLIENT_COLUMNS} FROM clients WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn insert_client(&self, client: NewClient) -> Result<Client> {
        let row = sqlx::query_as::<_, Client>(&format!(
            r#"
            INSERT INTO clients (first_name, last_name, email, photo_url)
            VALUES ($1, $2, $3, $4)
            RETURNING {CLIENT_COLUMNS}
            "#
        ))
        .bind(&client.first_name)
        .bind(&client.last_name)
        .bind(&client.email)
        .bind(&client.photo_url)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn update_client(&self, id: ClientId, patch: ClientPatch) -> Result<Option<Client>> {
        let row = sqlx::query_as::<_, Client>(&format!(
            r#"
            UPDATE clients
            SET first_name = COALESCE($2, first_name),
                last_name = COALESCE($3, last_name),
                email = CASE WHEN $4 THEN $5 ELSE email END,
                photo_url = CASE WHEN $6 THEN $7 ELSE photo_url END
            WHERE id = $1
            RETURNING {CLIENT_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(&patch.first_name)
        .bind(&patch.last_name)
        .bind(patch.email.is_some())
        .bind(patch.email.clone().flatten())
        .bind(patch.photo_url.is_some())
        .bind(patch.photo_url.clone().flatten())
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn purchase_counts(&self) -> Result<HashMap<ClientId, u64>> {
        let rows: Vec<(ClientId, i64)> =
            sqlx::query_as("SELECT client_id, COUNT(*) FROM sales GROUP BY client_id")
                .fetch_all(&self.pool)
                .await?;
        Ok(rows.into_iter().map(|(id, n)| (id, n as u64)).collect())
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Sale Operations
    // ═══════════════════════════════════════════════════════════════════════

    async fn get_sale(&self, id: SaleId) -> Result<Option<Sale>> {
        let row = sqlx::query_as::<_, Sale>(&format!(
            "SELECT {SALE_COLUMNS} FROM sales WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn insert_sale(&self, sale: NewSale) -> Result<Sale> {
        let row = sqlx::query_as::<_, Sale>(&format!(
            r#"
            INSERT INTO sales (client_id, book_id, date)
            VALUES ($1, $2, $3)
            RETURNING {SALE_COLUMNS}
            "#
        ))
        .bind(sale.client_id)
        .bind(sale.book_id)
        .bind(sale.date)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn sales_counts(&self, books: &[BookId]) -> Result<HashMap<BookId, u64>> {
        let rows: Vec<(BookId, i64)> = sqlx::query_as(
            "SELECT book_id, COUNT(*) FROM sales WHERE book_id = ANY($1) GROUP BY book_id",
        )
        .bind(uuids(books, |b| b.0))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(|(id, n)| (id, n as u64)).collect())
    }

    async fn sales_for_books(&self, books: &[BookId]) -> Result<Vec<Sale>> {
        let rows = sqlx::query_as::<_, Sale>(&format!(
            "SELECT {SALE_COLUMNS} FROM sales WHERE book_id = ANY($1) ORDER BY id"
        ))
        .bind(uuids(books, |b| b.0))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn sales_for_client(&self, id: ClientId) -> Result<Vec<Sale>> {
        let rows = sqlx::query_as::<_, Sale>(&format!(
            "SELECT {SALE_COLUMNS} FROM sales WHERE client_id = $1 ORDER BY id"
        ))
        .bind(id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn buyer_rows(&self, id: BookId) -> Result<Vec<(Sale, Client)>> {
        let rows = sqlx::query_as::<_, BuyerRow>(
            r#"
            SELECT s.id, s.client_id, s.book_id, s.date, s.created_at,
                   c.first_name AS client_first_name,
                   c.last_name AS client_last_name,
                   c.email AS client_email,
                   c.photo_url AS client_photo_url
            FROM sales s
            JOIN clients c ON c.id = s.client_id
            WHERE s.book_id = $1
            ORDER BY s.date DESC, s.id DESC
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn purchase_rows(&self, id: ClientId) -> Result<Vec<(Sale, Book, Author)>> {
        let rows = sqlx::query_as::<_, PurchaseRow>(
            r#"
            SELECT s.id, s.client_id, s.book_id, s.date, s.created_at,
                   b.title AS book_title,
                   b.year_published AS book_year_published,
                   b.photo_url AS book_photo_url,
                   a.id AS author_id,
                   a.first_name AS author_first_name,
                   a.last_name AS author_last_name,
                   a.photo_url AS author_photo_url
            FROM sales s
            JOIN books b ON b.id = s.book_id
            JOIN authors a ON a.id = b.author_id
            WHERE s.client_id = $1
            ORDER BY s.date DESC, s.id DESC
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Deletion
    // ═══════════════════════════════════════════════════════════════════════

    async fn apply_deletion(&self, plan: &DeletionPlan) -> Result<()> {
        let sales: Vec<i64> = plan.sales.iter().map(|s| s.0).collect();
        let clients: Vec<i64> = plan.clients.iter().map(|c| c.0).collect();

        // Children first so the RESTRICT foreign keys never fire.
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM sales WHERE id = ANY($1)")
            .bind(&sales)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM books WHERE id = ANY($1)")
            .bind(uuids(&plan.books, |b| b.0))
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM clients WHERE id = ANY($1)")
            .bind(&clients)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM authors WHERE id = ANY($1)")
            .bind(uuids(&plan.authors, |a| a.0))
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}
