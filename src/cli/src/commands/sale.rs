//! Sale recording commands.

use anyhow::Result;
use chrono::NaiveDate;
use clap::Subcommand;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::client::ApiClient;
use crate::output::{self, OutputFormat};

const SALES: &str = "/api/v1/sales";

#[derive(Subcommand)]
pub enum SaleCommands {
    /// Record the sale of a book to a client
    Record {
        /// Buying client ID
        #[arg(long)]
        client: i64,
        /// Book ID
        #[arg(long)]
        book: Uuid,
        /// Sale date (YYYY-MM-DD), defaults to today
        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Delete a recorded sale
    Delete {
        /// Sale ID
        id: i64,
    },
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleInfo {
    pub id: i64,
    pub client_id: i64,
    pub book_id: Uuid,
    pub date: NaiveDate,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RecordSaleRequest {
    client_id: i64,
    book_id: Uuid,
    date: NaiveDate,
}

pub async fn execute(cmd: SaleCommands, client: &ApiClient, format: OutputFormat) -> Result<()> {
    match cmd {
        SaleCommands::Record {
            client: client_id,
            book,
            date,
        } => {
            let req = RecordSaleRequest {
                client_id,
                book_id: book,
                date: date.unwrap_or_else(|| chrono::Local::now().date_naive()),
            };
            let sale: SaleInfo = client.post(SALES, &req).await?;
            match format {
                OutputFormat::Table => {
                    output::print_success(&format!(
                        "Sale {} recorded: book {} to client {} on {}",
                        sale.id, sale.book_id, sale.client_id, sale.date
                    ));
                }
                _ => output::print_item(&sale, format)?,
            }
        }

        SaleCommands::Delete { id } => {
            client.delete(&format!("{}/{}", SALES, id)).await?;
            output::print_success(&format!("Sale {} deleted", id));
        }
    }

    Ok(())
}
