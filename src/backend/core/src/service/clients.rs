use super::{found, LibraryService};
use crate::error::{EntityKind, Result};
use crate::models::{Client, ClientId, ClientPatch, ClientPurchases, ClientView, NewClient};
use crate::observability::LibraryEvent;
use tracing::instrument;

impl LibraryService {
    /// All clients with their purchase counts.
    pub async fn list_clients(&self) -> Result<Vec<ClientView>> {
        let clients = self.store.list_clients().await?;
        self.aggregation.clients_with_counts(clients).await
    }

    pub async fn get_client(&self, id: ClientId) -> Result<ClientView> {
        let client = self.find_client(id).await?;
        self.aggregation.client_view(client).await
    }

    /// Client with every purchase, most recent first.
    pub async fn get_client_purchases(&self, id: ClientId) -> Result<ClientPurchases> {
        let client = self.find_client(id).await?;
        self.aggregation.client_purchases(client).await
    }

    pub async fn create_client(&self, input: NewClient) -> Result<Client> {
        let client = self.store.insert_client(input).await?;
        LibraryEvent::Created {
            entity: EntityKind::Client.as_str(),
            id: client.id.to_string(),
        }
        .emit();
        Ok(client)
    }

    #[instrument(skip_all, fields(id = %id))]
    pub async fn update_client(&self, id: ClientId, patch: ClientPatch) -> Result<Client> {
        self.find_client(id).await?;

        let updated = self.store.update_client(id, patch).await?;
        let client = found(updated, EntityKind::Client, id)?;
        LibraryEvent::Updated {
            entity: EntityKind::Client.as_str(),
            id: id.to_string(),
        }
        .emit();
        Ok(client)
    }

    #[instrument(skip_all, fields(id = %id))]
    pub async fn delete_client(&self, id: ClientId) -> Result<()> {
        let client = self.find_client(id).await?;
        let sales = self.store.sales_for_client(id).await?;

        let plan = self.rules.plan_client_deletion(&client, &sales)?;
        self.apply(EntityKind::Client, id.to_string(), plan).await
    }

    pub(super) async fn find_client(&self, id: ClientId) -> Result<Client> {
        found(self.store.get_client(id).await?, EntityKind::Client, id)
    }
}
