use super::{found, LibraryService};
use crate::error::{EntityKind, Result};
use crate::models::{Book, BookId, BookPatch, BookView, Buyer, NewBook};
use crate::observability::LibraryEvent;
use crate::relations::resolve_author;
use tracing::instrument;

impl LibraryService {
    /// All books with their author and sales count.
    pub async fn list_books(&self) -> Result<Vec<BookView>> {
        let rows = self.store.books_with_authors().await?;
        self.aggregation.books_with_counts(rows).await
    }

    pub async fn get_book(&self, id: BookId) -> Result<BookView> {
        let (book, author) = found(
            self.store.book_with_author(id).await?,
            EntityKind::Book,
            id,
        )?;
        self.aggregation.book_view(book, &author).await
    }

    /// Everyone who bought the book, most recent sale first.
    pub async fn get_book_buyers(&self, id: BookId) -> Result<Vec<Buyer>> {
        self.find_book(id).await?;
        self.aggregation.buyers_for(id).await
    }

    pub async fn create_book(&self, input: NewBook) -> Result<Book> {
        resolve_author(self.store.as_ref(), input.author_id).await?;

        let book = self.store.insert_book(input).await?;
        LibraryEvent::Created {
            entity: EntityKind::Book.as_str(),
            id: book.id.to_string(),
        }
        .emit();
        Ok(book)
    }

    /// Partial update. A new `authorId` must name an existing author.
    #[instrument(skip_all, fields(id = %id))]
    pub async fn update_book(&self, id: BookId, patch: BookPatch) -> Result<Book> {
        let current = self.find_book(id).await?;

        if let Some(author_id) = patch.author_id {
            if author_id != current.author_id {
                resolve_author(self.store.as_ref(), author_id).await?;
            }
        }

        let updated = self.store.update_book(id, patch).await?;
        let book = found(updated, EntityKind::Book, id)?;
        LibraryEvent::Updated {
            entity: EntityKind::Book.as_str(),
            id: id.to_string(),
        }
        .emit();
        Ok(book)
    }

    #[instrument(skip_all, fields(id = %id))]
    pub async fn delete_book(&self, id: BookId) -> Result<()> {
        let book = self.find_book(id).await?;
        let sales = self.store.sales_for_books(&[id]).await?;

        let plan = self.rules.plan_book_deletion(&book, &sales)?;
        self.apply(EntityKind::Book, id.to_string(), plan).await
    }

    async fn find_book(&self, id: BookId) -> Result<Book> {
        found(self.store.get_book(id).await?, EntityKind::Book, id)
    }
}
