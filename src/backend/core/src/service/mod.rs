//! CRUD service layer.
//!
//! [`LibraryService`] is what the HTTP handlers talk to. Each mutating
//! operation looks its target up first; a missing row fails with
//! [`ErrorCode::RecordNotFound`](crate::error::ErrorCode) before anything
//! else touches the store. Reads are shaped into view models by the
//! [`AggregationEngine`].

mod authors;
mod books;
mod clients;
mod sales;

use std::sync::Arc;

use crate::aggregation::AggregationEngine;
use crate::db::LibraryStore;
use crate::error::{EntityKind, LibrisError, Result};
use crate::observability::LibraryEvent;
use crate::relations::{DeletionPlan, DependentSalesPolicy, RelationshipRules};

/// Entry point for every library operation.
#[derive(Clone)]
pub struct LibraryService {
    store: Arc<dyn LibraryStore>,
    rules: RelationshipRules,
    aggregation: AggregationEngine,
}

impl LibraryService {
    pub fn new(store: Arc<dyn LibraryStore>, policy: DependentSalesPolicy) -> Self {
        Self {
            aggregation: AggregationEngine::new(store.clone()),
            rules: RelationshipRules::new(policy),
            store,
        }
    }

    pub fn store(&self) -> &Arc<dyn LibraryStore> {
        &self.store
    }

    /// Store reachability for the health endpoint.
    pub async fn ping(&self) -> Result<()> {
        self.store.ping().await
    }

    /// Apply a deletion plan and report what went with it.
    async fn apply(&self, entity: EntityKind, id: String, plan: DeletionPlan) -> Result<()> {
        self.store.apply_deletion(&plan).await?;
        deletion_event(entity, id, &plan).emit();
        Ok(())
    }
}

/// `rows` includes the deleted entity itself.
fn deletion_event(entity: EntityKind, id: String, plan: &DeletionPlan) -> LibraryEvent {
    LibraryEvent::Deleted {
        entity: entity.as_str(),
        id,
        rows: plan.row_count(),
        sales: plan.sales.len(),
    }
}

/// Turn a lookup result into a typed not-found error.
fn found<T>(row: Option<T>, entity: EntityKind, id: impl std::fmt::Display) -> Result<T> {
    row.ok_or_else(|| LibrisError::not_found(entity, id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AuthorId, BookId, SaleId};

    #[test]
    fn test_deletion_event_counts_root_row_for_every_entity() {
        let book_plan = DeletionPlan {
            books: vec![BookId::new()],
            sales: vec![SaleId(1), SaleId(2)],
            ..Default::default()
        };
        let author_plan = DeletionPlan {
            authors: vec![AuthorId::new()],
            books: vec![BookId::new()],
            sales: vec![SaleId(1), SaleId(2)],
            ..Default::default()
        };

        let book_event = deletion_event(EntityKind::Book, "b".into(), &book_plan);
        let author_event = deletion_event(EntityKind::Author, "a".into(), &author_plan);

        assert_eq!(
            book_event,
            LibraryEvent::Deleted { entity: "Book", id: "b".into(), rows: 3, sales: 2 }
        );
        assert_eq!(
            author_event,
            LibraryEvent::Deleted { entity: "Author", id: "a".into(), rows: 4, sales: 2 }
        );
    }
}
