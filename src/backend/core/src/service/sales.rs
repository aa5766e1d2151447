use super::{found, LibraryService};
use crate::error::{EntityKind, Result};
use crate::models::{BookId, Buyer, ClientId, NewSale, Purchase, Sale, SaleId};
use crate::observability::LibraryEvent;
use crate::relations::resolve_sale_references;
use tracing::instrument;

impl LibraryService {
    /// Record a sale. Client and book must both exist.
    #[instrument(skip_all, fields(client = %input.client_id, book = %input.book_id))]
    pub async fn record_sale(&self, input: NewSale) -> Result<Sale> {
        resolve_sale_references(self.store.as_ref(), &input).await?;

        let sale = self.store.insert_sale(input).await?;
        LibraryEvent::SaleRecorded {
            sale_id: sale.id.0,
            client_id: sale.client_id.0,
            book_id: sale.book_id.to_string(),
        }
        .emit();
        Ok(sale)
    }

    #[instrument(skip_all, fields(id = %id))]
    pub async fn delete_sale(&self, id: SaleId) -> Result<()> {
        let sale = found(self.store.get_sale(id).await?, EntityKind::Sale, id)?;
        let plan = self.rules.plan_sale_deletion(&sale);
        self.apply(EntityKind::Sale, id.to_string(), plan).await
    }

    /// Sales made to one client, most recent first.
    pub async fn list_sales_for_client(&self, id: ClientId) -> Result<Vec<Purchase>> {
        self.find_client(id).await?;
        self.aggregation.purchase_history_for(id).await
    }

    /// Sales of one book, most recent first.
    pub async fn list_sales_for_book(&self, id: BookId) -> Result<Vec<Buyer>> {
        found(self.store.get_book(id).await?, EntityKind::Book, id)?;
        self.aggregation.buyers_for(id).await
    }
}
