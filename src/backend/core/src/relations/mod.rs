//! Referential integrity between authors, books, clients and sales.
//!
//! Cascades are computed here rather than left to the storage engine, so
//! both store backends delete exactly the same rows. A delete request is
//! turned into a [`DeletionPlan`] from a snapshot of the dependent rows;
//! the store then applies the plan atomically.
//!
//! Ownership:
//!
//! ```text
//! Author ──owns──▶ Book ──has──▶ Sale ◀──has── Client
//! ```
//!
//! - Author → Book always cascades.
//! - Book → Sale and Client → Sale follow [`DependentSalesPolicy`], and the
//!   same policy covers sales reached through an author's books.
//! - Sales are never updated; they are only recorded and deleted.

use serde::{Deserialize, Serialize};

use crate::db::LibraryStore;
use crate::error::{EntityKind, LibrisError, Result};
use crate::models::{
    Author, AuthorId, Book, BookId, Client, ClientId, NewSale, Sale, SaleId,
};

/// What happens to sales whose book or client is deleted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DependentSalesPolicy {
    /// Delete the dependent sales together with their parent.
    #[default]
    Cascade,
    /// Refuse the delete with a constraint violation.
    Restrict,
}

/// Every row a single delete request removes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeletionPlan {
    pub authors: Vec<AuthorId>,
    pub books: Vec<BookId>,
    pub clients: Vec<ClientId>,
    pub sales: Vec<SaleId>,
}

impl DeletionPlan {
    /// Total number of rows the plan removes.
    pub fn row_count(&self) -> usize {
        self.authors.len() + self.books.len() + self.clients.len() + self.sales.len()
    }
}

/// Pure planning rules over snapshots of dependent rows.
#[derive(Debug, Clone, Copy, Default)]
pub struct RelationshipRules {
    policy: DependentSalesPolicy,
}

impl RelationshipRules {
    pub fn new(policy: DependentSalesPolicy) -> Self {
        Self { policy }
    }

    /// Author plus its books plus the sales of those books.
    ///
    /// `books` and `sales` may contain unrelated rows; only rows owned by
    /// `author` end up in the plan.
    pub fn plan_author_deletion(
        &self,
        author: &Author,
        books: &[Book],
        sales: &[Sale],
    ) -> Result<DeletionPlan> {
        let owned: Vec<BookId> = books
            .iter()
            .filter(|b| b.author_id == author.id)
            .map(|b| b.id)
            .collect();
        let dependent: Vec<SaleId> = sales
            .iter()
            .filter(|s| owned.contains(&s.book_id))
            .map(|s| s.id)
            .collect();

        self.check_dependents(EntityKind::Author, author.id, &dependent)?;

        Ok(DeletionPlan {
            authors: vec![author.id],
            books: owned,
            clients: Vec::new(),
            sales: dependent,
        })
    }

    pub fn plan_book_deletion(&self, book: &Book, sales: &[Sale]) -> Result<DeletionPlan> {
        let dependent: Vec<SaleId> = sales
            .iter()
            .filter(|s| s.book_id == book.id)
            .map(|s| s.id)
            .collect();

        self.check_dependents(EntityKind::Book, book.id, &dependent)?;

        Ok(DeletionPlan {
            books: vec![book.id],
            sales: dependent,
            ..Default::default()
        })
    }

    pub fn plan_client_deletion(&self, client: &Client, sales: &[Sale]) -> Result<DeletionPlan> {
        let dependent: Vec<SaleId> = sales
            .iter()
            .filter(|s| s.client_id == client.id)
            .map(|s| s.id)
            .collect();

        self.check_dependents(EntityKind::Client, client.id, &dependent)?;

        Ok(DeletionPlan {
            clients: vec![client.id],
            sales: dependent,
            ..Default::default()
        })
    }

    pub fn plan_sale_deletion(&self, sale: &Sale) -> DeletionPlan {
        DeletionPlan {
            sales: vec![sale.id],
            ..Default::default()
        }
    }

    fn check_dependents(
        &self,
        entity: EntityKind,
        id: impl std::fmt::Display,
        dependent_sales: &[SaleId],
    ) -> Result<()> {
        if self.policy == DependentSalesPolicy::Restrict && !dependent_sales.is_empty() {
            return Err(LibrisError::constraint_violation(
                entity,
                id,
                EntityKind::Sale,
                dependent_sales.len(),
            ));
        }
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Write-time reference checks
// ═══════════════════════════════════════════════════════════════════════════════

/// Resolve the owner of a new or re-assigned book.
pub async fn resolve_author(store: &dyn LibraryStore, author_id: AuthorId) -> Result<Author> {
    store
        .get_author(author_id)
        .await?
        .ok_or_else(|| LibrisError::not_found(EntityKind::Author, author_id))
}

/// Resolve both references of a sale, client first.
pub async fn resolve_sale_references(
    store: &dyn LibraryStore,
    sale: &NewSale,
) -> Result<(Client, Book)> {
    let client = store
        .get_client(sale.client_id)
        .await?
        .ok_or_else(|| LibrisError::not_found(EntityKind::Client, sale.client_id))?;

    let book = store
        .get_book(sale.book_id)
        .await?
        .ok_or_else(|| LibrisError::not_found(EntityKind::Book, sale.book_id))?;

    Ok((client, book))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use chrono::{NaiveDate, Utc};

    fn author() -> Author {
        Author {
            id: AuthorId::new(),
            first_name: "Italo".into(),
            last_name: "Calvino".into(),
            photo_url: None,
        }
    }

    fn book(author: &Author, title: &str) -> Book {
        Book {
            id: BookId::new(),
            title: title.into(),
            year_published: 1972,
            photo_url: None,
            author_id: author.id,
        }
    }

    fn client(id: i64) -> Client {
        Client {
            id: ClientId(id),
            first_name: "Ada".into(),
            last_name: "Byron".into(),
            email: None,
            photo_url: None,
        }
    }

    fn sale(id: i64, client: &Client, book: &Book) -> Sale {
        Sale {
            id: SaleId(id),
            client_id: client.id,
            book_id: book.id,
            date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_author_deletion_cascades_books_and_their_sales() {
        let a = author();
        let other = author();
        let b1 = book(&a, "Invisible Cities");
        let b2 = book(&a, "If on a winter's night");
        let foreign = book(&other, "Elsewhere");
        let c = client(1);
        let sales = vec![sale(1, &c, &b1), sale(2, &c, &b1), sale(3, &c, &foreign)];

        let plan = RelationshipRules::default()
            .plan_author_deletion(&a, &[b1.clone(), b2.clone(), foreign], &sales)
            .unwrap();

        assert_eq!(plan.authors, vec![a.id]);
        assert_eq!(plan.books, vec![b1.id, b2.id]);
        assert_eq!(plan.sales, vec![SaleId(1), SaleId(2)]);
        assert!(plan.clients.is_empty());
        assert_eq!(plan.row_count(), 5);
    }

    #[test]
    fn test_author_without_books_plans_only_itself() {
        let a = author();
        let plan = RelationshipRules::default()
            .plan_author_deletion(&a, &[], &[])
            .unwrap();
        assert_eq!(plan.row_count(), 1);
    }

    #[test]
    fn test_restrict_blocks_book_with_sales() {
        let a = author();
        let b = book(&a, "Cosmicomics");
        let c = client(4);
        let rules = RelationshipRules::new(DependentSalesPolicy::Restrict);

        let err = rules
            .plan_book_deletion(&b, &[sale(1, &c, &b), sale(2, &c, &b)])
            .unwrap_err();

        assert_eq!(err.code(), ErrorCode::ConstraintViolation);
        assert_eq!(err.details().entity_type.as_deref(), Some("Book"));
        assert_eq!(err.details().context["dependentCount"], 2);
    }

    #[test]
    fn test_restrict_allows_book_without_sales() {
        let a = author();
        let b = book(&a, "Mr. Palomar");
        let plan = RelationshipRules::new(DependentSalesPolicy::Restrict)
            .plan_book_deletion(&b, &[])
            .unwrap();
        assert_eq!(plan.books, vec![b.id]);
        assert!(plan.sales.is_empty());
    }

    #[test]
    fn test_restrict_applies_through_author_books() {
        let a = author();
        let b = book(&a, "The Baron in the Trees");
        let c = client(2);
        let err = RelationshipRules::new(DependentSalesPolicy::Restrict)
            .plan_author_deletion(&a, &[b.clone()], &[sale(9, &c, &b)])
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::ConstraintViolation);
        assert_eq!(err.details().entity_type.as_deref(), Some("Author"));
    }

    #[test]
    fn test_client_deletion_cascades_only_its_sales() {
        let a = author();
        let b = book(&a, "Marcovaldo");
        let c1 = client(1);
        let c2 = client(2);
        let sales = vec![sale(1, &c1, &b), sale(2, &c2, &b), sale(3, &c1, &b)];

        let plan = RelationshipRules::default()
            .plan_client_deletion(&c1, &sales)
            .unwrap();

        assert_eq!(plan.clients, vec![ClientId(1)]);
        assert_eq!(plan.sales, vec![SaleId(1), SaleId(3)]);
    }

    #[test]
    fn test_sale_deletion_plan() {
        let a = author();
        let b = book(&a, "Six Memos");
        let s = sale(5, &client(1), &b);
        let plan = RelationshipRules::default().plan_sale_deletion(&s);
        assert_eq!(plan.sales, vec![SaleId(5)]);
        assert_eq!(plan.row_count(), 1);
    }

    #[test]
    fn test_policy_deserializes_lowercase() {
        let policy: DependentSalesPolicy = serde_json::from_str("\"restrict\"").unwrap();
        assert_eq!(policy, DependentSalesPolicy::Restrict);
        assert_eq!(DependentSalesPolicy::default(), DependentSalesPolicy::Cascade);
    }
}
