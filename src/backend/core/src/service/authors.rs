use super::{found, LibraryService};
use crate::error::{EntityKind, Result};
use crate::models::{Author, AuthorId, AuthorPatch, AuthorStats, AuthorView, BookId, NewAuthor};
use crate::observability::LibraryEvent;
use tracing::instrument;

impl LibraryService {
    /// All authors with their book counts.
    pub async fn list_authors(&self) -> Result<Vec<AuthorView>> {
        let authors = self.store.list_authors().await?;
        self.aggregation.authors_with_counts(authors).await
    }

    pub async fn get_author(&self, id: AuthorId) -> Result<AuthorView> {
        let author = self.find_author(id).await?;
        self.aggregation.author_view(author).await
    }

    /// Author with book count and average sales per book.
    pub async fn get_author_stats(&self, id: AuthorId) -> Result<AuthorStats> {
        let author = self.find_author(id).await?;
        self.aggregation.author_stats(author).await
    }

    pub async fn create_author(&self, input: NewAuthor) -> Result<Author> {
        let author = self.store.insert_author(input).await?;
        LibraryEvent::Created {
            entity: EntityKind::Author.as_str(),
            id: author.id.to_string(),
        }
        .emit();
        Ok(author)
    }

    #[instrument(skip_all, fields(id = %id))]
    pub async fn update_author(&self, id: AuthorId, patch: AuthorPatch) -> Result<Author> {
        self.find_author(id).await?;

        let updated = self.store.update_author(id, patch).await?;
        let author = found(updated, EntityKind::Author, id)?;
        LibraryEvent::Updated {
            entity: EntityKind::Author.as_str(),
            id: id.to_string(),
        }
        .emit();
        Ok(author)
    }

    /// Delete an author together with its books and their sales.
    #[instrument(skip_all, fields(id = %id))]
    pub async fn delete_author(&self, id: AuthorId) -> Result<()> {
        let author = self.find_author(id).await?;

        let books = self.store.books_by_author(id).await?;
        let ids: Vec<BookId> = books.iter().map(|b| b.id).collect();
        let sales = if ids.is_empty() {
            Vec::new()
        } else {
            self.store.sales_for_books(&ids).await?
        };

        let plan = self.rules.plan_author_deletion(&author, &books, &sales)?;
        self.apply(EntityKind::Author, id.to_string(), plan).await
    }

    async fn find_author(&self, id: AuthorId) -> Result<Author> {
        found(self.store.get_author(id).await?, EntityKind::Author, id)
    }
}
