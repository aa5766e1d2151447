//! In-memory store backend for testing and development.
//!
//! Mirrors the PostgreSQL schema's constraints: books and sales must point at
//! existing rows, a plan that would orphan a sale is rejected, and deleting an
//! author also drops any of its books the plan did not list.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;

use super::LibraryStore;
use crate::error::{ErrorCode, LibrisError, Result};
use crate::models::{
    Author, AuthorId, AuthorPatch, Book, BookId, BookPatch, Client, ClientId, ClientPatch,
    NewAuthor, NewBook, NewClient, NewSale, Sale, SaleId,
};
use crate::relations::DeletionPlan;

#[derive(Debug, Default)]
struct State {
    authors: HashMap<AuthorId, Author>,
    books: HashMap<BookId, Book>,
    clients: BTreeMap<ClientId, Client>,
    sales: BTreeMap<SaleId, Sale>,
    last_client_id: i64,
    last_sale_id: i64,
}

/// Process-local [`LibraryStore`]. Cloning shares the same data.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    state: Arc<RwLock<State>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn reference_violation(message: String) -> LibrisError {
    LibrisError::with_internal(
        ErrorCode::ConstraintViolation,
        "The operation conflicts with related records",
        message,
    )
}

fn by_name(a: &Author, b: &Author) -> std::cmp::Ordering {
    (&a.last_name, &a.first_name, a.id).cmp(&(&b.last_name, &b.first_name, b.id))
}

fn by_title(a: &Book, b: &Book) -> std::cmp::Ordering {
    (&a.title, a.id).cmp(&(&b.title, b.id))
}

#[async_trait]
impl LibraryStore for InMemoryStore {
    async fn list_authors(&self) -> Result<Vec<Author>> {
        let state = self.state.read().await;
        let mut authors: Vec<Author> = state.authors.values().cloned().collect();
        authors.sort_by(by_name);
        Ok(authors)
    }

    async fn get_author(&self, id: AuthorId) -> Result<Option<Author>> {
        Ok(self.state.read().await.authors.get(&id).cloned())
    }

    async fn insert_author(&self, author: NewAuthor) -> Result<Author> {
        let author = Author {
            id: AuthorId::new(),
            first_name: author.first_name,
            last_name: author.last_name,
            photo_url: author.photo_url,
        };
        self.state
            .write()
            .await
            .authors
            .insert(author.id, author.clone());
        Ok(author)
    }

    async fn update_author(&self, id: AuthorId, patch: AuthorPatch) -> Result<Option<Author>> {
        let mut state = self.state.write().await;
        Ok(state.authors.get_mut(&id).map(|author| {
            patch.apply_to(author);
            author.clone()
        }))
    }

    async fn book_counts(&self) -> Result<HashMap<AuthorId, u64>> {
        let state = self.state.read().await;
        let mut counts = HashMap::new();
        for book in state.books.values() {
            *counts.entry(book.author_id).or_insert(0) += 1;
        }
        Ok(counts)
    }

    async fn books_by_author(&self, id: AuthorId) -> Result<Vec<Book>> {
        let state = self.state.read().await;
        let mut books: Vec<Book> = state
            .books
            .values()
            .filter(|b| b.author_id == id)
            .cloned()
            .collect();
        books.sort_by(by_title);
        Ok(books)
    }

    async fn books_with_authors(&self) -> Result<Vec<(Book, Author)>> {
        let state = self.state.read().await;
        let mut books: Vec<&Book> = state.books.values().collect();
        books.sort_by(|a, b| by_title(a, b));
        Ok(books
            .into_iter()
            .filter_map(|b| {
                state
                    .authors
                    .get(&b.author_id)
                    .map(|a| (b.clone(), a.clone()))
            })
            .collect())
    }

    async fn get_book(&self, id: BookId) -> Result<Option<Book>> {
        Ok(self.state.read().await.books.get(&id).cloned())
    }

    async fn book_with_author(&self, id: BookId) -> Result<Option<(Book, Author)>> {
        let state = self.state.read().await;
        Ok(state.books.get(&id).and_then(|b| {
            state
                .authors
                .get(&b.author_id)
                .map(|a| (b.clone(), a.clone()))
        }))
    }

    async fn insert_book(&self, book: NewBook) -> Result<Book> {
        let mut state = self.state.write().await;
        if !state.authors.contains_key(&book.author_id) {
            return Err(reference_violation(format!(
                "book references missing author {}",
                book.author_id
            )));
        }
        let book = Book {
            id: BookId::new(),
            title: book.title,
            year_published: book.year_published,
            photo_url: book.photo_url,
            author_id: book.author_id,
        };
        state.books.insert(book.id, book.clone());
        Ok(book)
    }

    async fn update_book(&self, id: BookId, patch: BookPatch) -> Result<Option<Book>> {
        let mut state = self.state.write().await;
        if let Some(author_id) = patch.author_id {
            if !state.authors.contains_key(&author_id) {
                return Err(reference_violation(format!(
                    "book references missing author {}",
                    author_id
                )));
            }
        }
        Ok(state.books.get_mut(&id).map(|book| {
            patch.apply_to(book);
            book.clone()
        }))
    }

    async fn list_clients(&self) -> Result<Vec<Client>> {
        Ok(self.state.read().await.clients.values().cloned().collect())
    }

    async fn get_client(&self, id: ClientId) -> Result<Option<Client>> {
        Ok(self.state.read().await.clients.get(&id).cloned())
    }

    async fn insert_client(&self, client: NewClient) -> Result<Client> {
        let mut state = self.state.write().await;
        state.last_client_id += 1;
        let client = Client {
            id: ClientId(state.last_client_id),
            first_name: client.first_name,
            last_name: client.last_name,
            email: client.email,
            photo_url: client.photo_url,
        };
        state.clients.insert(client.id, client.clone());
        Ok(client)
    }

    async fn update_client(&self, id: ClientId, patch: ClientPatch) -> Result<Option<Client>> {
        let mut state = self.state.write().await;
        Ok(state.clients.get_mut(&id).map(|client| {
            patch.apply_to(client);
            client.clone()
        }))
    }

    async fn purchase_counts(&self) -> Result<HashMap<ClientId, u64>> {
        let state = self.state.read().await;
        let mut counts = HashMap::new();
        for sale in state.sales.values() {
            *counts.entry(sale.client_id).or_insert(0) += 1;
        }
        Ok(counts)
    }

    async fn get_sale(&self, id: SaleId) -> Result<Option<Sale>> {
        Ok(self.state.read().await.sales.get(&id).cloned())
    }

    async fn insert_sale(&self, sale: NewSale) -> Result<Sale> {
        let mut state = self.state.write().await;
        if !state.clients.contains_key(&sale.client_id) {
            return Err(reference_violation(format!(
                "sale references missing client {}",
                sale.client_id
            )));
        }
        if !state.books.contains_key(&sale.book_id) {
            return Err(reference_violation(format!(
                "sale references missing book {}",
                sale.book_id
            )));
        }
        state.last_sale_id += 1;
        let sale = Sale {
            id: SaleId(state.last_sale_id),
            client_id: sale.client_id,
            book_id: sale.book_id,
            date: sale.date,
            created_at: Utc::now(),
        };
        state.sales.insert(sale.id, sale.clone());
        Ok(sale)
    }

    async fn sales_counts(&self, books: &[BookId]) -> Result<HashMap<BookId, u64>> {
        let wanted: HashSet<&BookId> = books.iter().collect();
        let state = self.state.read().await;
        let mut counts = HashMap::new();
        for sale in state.sales.values().filter(|s| wanted.contains(&s.book_id)) {
            *counts.entry(sale.book_id).or_insert(0) += 1;
        }
        Ok(counts)
    }

    async fn sales_for_books(&self, books: &[BookId]) -> Result<Vec<Sale>> {
        let wanted: HashSet<&BookId> = books.iter().collect();
        let state = self.state.read().await;
        Ok(state
            .sales
            .values()
            .filter(|s| wanted.contains(&s.book_id))
            .cloned()
            .collect())
    }

    async fn sales_for_client(&self, id: ClientId) -> Result<Vec<Sale>> {
        let state = self.state.read().await;
        Ok(state
            .sales
            .values()
            .filter(|s| s.client_id == id)
            .cloned()
            .collect())
    }

    async fn buyer_rows(&self, id: BookId) -> Result<Vec<(Sale, Client)>> {
        let state = self.state.read().await;
        Ok(state
            .sales
            .values()
            .filter(|s| s.book_id == id)
            .filter_map(|s| state.clients.get(&s.client_id).map(|c| (s.clone(), c.clone())))
            .collect())
    }

    async fn purchase_rows(&self, id: ClientId) -> Result<Vec<(Sale, Book, Author)>> {
        let state = self.state.read().await;
        Ok(state
            .sales
            .values()
            .filter(|s| s.client_id == id)
            .filter_map(|s| {
                let book = state.books.get(&s.book_id)?;
                let author = state.authors.get(&book.author_id)?;
                Some((s.clone(), book.clone(), author.clone()))
            })
            .collect())
    }

    async fn apply_deletion(&self, plan: &DeletionPlan) -> Result<()> {
        let mut state = self.state.write().await;

        // Books of deleted authors go too, as with ON DELETE CASCADE.
        let mut books: HashSet<BookId> = plan.books.iter().copied().collect();
        books.extend(
            state
                .books
                .values()
                .filter(|b| plan.authors.contains(&b.author_id))
                .map(|b| b.id),
        );
        let clients: HashSet<ClientId> = plan.clients.iter().copied().collect();
        let sales: HashSet<SaleId> = plan.sales.iter().copied().collect();

        if let Some(orphan) = state.sales.values().find(|s| {
            !sales.contains(&s.id) && (books.contains(&s.book_id) || clients.contains(&s.client_id))
        }) {
            return Err(reference_violation(format!(
                "deletion would orphan sale {}",
                orphan.id
            )));
        }

        state.sales.retain(|id, _| !sales.contains(id));
        state.books.retain(|id, _| !books.contains(id));
        state.clients.retain(|id, _| !clients.contains(id));
        state.authors.retain(|id, _| !plan.authors.contains(id));
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    async fn seed(store: &InMemoryStore) -> (Author, Book, Client) {
        let author = store
            .insert_author(NewAuthor {
                first_name: "Mary".into(),
                last_name: "Shelley".into(),
                photo_url: None,
            })
            .await
            .unwrap();
        let book = store
            .insert_book(NewBook {
                title: "Frankenstein".into(),
                year_published: 1818,
                author_id: author.id,
                photo_url: None,
            })
            .await
            .unwrap();
        let client = store
            .insert_client(NewClient {
                first_name: "Percy".into(),
                last_name: "Bysshe".into(),
                email: None,
                photo_url: None,
            })
            .await
            .unwrap();
        (author, book, client)
    }

    #[tokio::test]
    async fn test_integer_ids_are_sequential_and_never_reused() {
        let store = InMemoryStore::new();
        let (_, book, client) = seed(&store).await;
        let date = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();

        let s1 = store
            .insert_sale(NewSale { client_id: client.id, book_id: book.id, date })
            .await
            .unwrap();
        store
            .apply_deletion(&DeletionPlan { sales: vec![s1.id], ..Default::default() })
            .await
            .unwrap();
        let s2 = store
            .insert_sale(NewSale { client_id: client.id, book_id: book.id, date })
            .await
            .unwrap();

        assert_eq!(client.id, ClientId(1));
        assert_eq!(s1.id, SaleId(1));
        assert_eq!(s2.id, SaleId(2));
    }

    #[tokio::test]
    async fn test_plan_that_orphans_a_sale_is_rejected() {
        let store = InMemoryStore::new();
        let (_, book, client) = seed(&store).await;
        store
            .insert_sale(NewSale {
                client_id: client.id,
                book_id: book.id,
                date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            })
            .await
            .unwrap();

        let err = store
            .apply_deletion(&DeletionPlan { books: vec![book.id], ..Default::default() })
            .await
            .unwrap_err();

        assert_eq!(err.code(), ErrorCode::ConstraintViolation);
        assert!(store.get_book(book.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_insert_book_requires_author() {
        let store = InMemoryStore::new();
        let err = store
            .insert_book(NewBook {
                title: "Nobody's".into(),
                year_published: 2000,
                author_id: AuthorId::new(),
                photo_url: None,
            })
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::ConstraintViolation);
    }

    #[tokio::test]
    async fn test_counts_omit_rows_without_children() {
        let store = InMemoryStore::new();
        let (author, book, _) = seed(&store).await;

        let book_counts = store.book_counts().await.unwrap();
        assert_eq!(book_counts.get(&author.id), Some(&1));

        let sales_counts = store.sales_counts(&[book.id]).await.unwrap();
        assert!(sales_counts.is_empty());
    }
}
