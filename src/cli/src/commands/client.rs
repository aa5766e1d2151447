//! Client (customer) management commands.

use anyhow::Result;
use chrono::NaiveDate;
use clap::Subcommand;
use serde::{Deserialize, Serialize};
use tabled::Tabled;
use uuid::Uuid;

use crate::client::ApiClient;
use crate::output::{self, OutputFormat};

const CLIENTS: &str = "/api/v1/clients";

#[derive(Subcommand)]
pub enum ClientCommands {
    /// List all clients with their purchase counts
    List,

    /// Get details of a client
    Get {
        /// Client ID
        id: i64,
    },

    /// Show a client's purchase history, newest first
    Purchases {
        /// Client ID
        id: i64,
    },

    /// Register a new client
    Create {
        /// First name
        #[arg(long)]
        first_name: String,
        /// Last name
        #[arg(long)]
        last_name: String,
        /// Contact email
        #[arg(long)]
        email: Option<String>,
        /// Photo URL
        #[arg(long)]
        photo_url: Option<String>,
    },

    /// Delete a client along with their purchases
    Delete {
        /// Client ID
        id: i64,
    },
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientInfo {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub photo_url: Option<String>,
    #[serde(default)]
    pub purchases_count: u64,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchasedBook {
    pub id: Uuid,
    pub title: String,
    pub year_published: i32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PurchaseInfo {
    pub id: i64,
    pub date: NaiveDate,
    pub book: PurchasedBook,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientPurchasesInfo {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub purchases_count: u64,
    pub purchases: Vec<PurchaseInfo>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateClientRequest {
    first_name: String,
    last_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    photo_url: Option<String>,
}

#[derive(Tabled)]
struct ClientRow {
    #[tabled(rename = "ID")]
    id: i64,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Email")]
    email: String,
    #[tabled(rename = "Purchases")]
    purchases: u64,
}

impl From<&ClientInfo> for ClientRow {
    fn from(c: &ClientInfo) -> Self {
        Self {
            id: c.id,
            name: format!("{} {}", c.first_name, c.last_name),
            email: output::or_dash(c.email.as_deref()),
            purchases: c.purchases_count,
        }
    }
}

#[derive(Tabled)]
struct PurchaseRow {
    #[tabled(rename = "Sale")]
    sale: i64,
    #[tabled(rename = "Date")]
    date: String,
    #[tabled(rename = "Book")]
    book: String,
    #[tabled(rename = "Year")]
    year: i32,
}

impl From<&PurchaseInfo> for PurchaseRow {
    fn from(p: &PurchaseInfo) -> Self {
        Self {
            sale: p.id,
            date: p.date.to_string(),
            book: p.book.title.clone(),
            year: p.book.year_published,
        }
    }
}

pub async fn execute(cmd: ClientCommands, client: &ApiClient, format: OutputFormat) -> Result<()> {
    match cmd {
        ClientCommands::List => {
            let clients: Vec<ClientInfo> = client.get(CLIENTS).await?;
            let rows: Vec<ClientRow> = clients.iter().map(ClientRow::from).collect();
            output::print_list(&rows, &clients, format)?;
        }

        ClientCommands::Get { id } => {
            let info: ClientInfo = client.get(&format!("{}/{}", CLIENTS, id)).await?;
            match format {
                OutputFormat::Table => {
                    output::print_header(&format!("Client: {} {}", info.first_name, info.last_name));
                    output::print_detail("ID", &info.id.to_string());
                    output::print_detail("Email", &output::or_dash(info.email.as_deref()));
                    output::print_detail("Purchases", &info.purchases_count.to_string());
                }
                _ => output::print_item(&info, format)?,
            }
        }

        ClientCommands::Purchases { id } => {
            let history: ClientPurchasesInfo =
                client.get(&format!("{}/{}/purchases", CLIENTS, id)).await?;
            match format {
                OutputFormat::Table => {
                    output::print_header(&format!(
                        "Purchases: {} {} ({})",
                        history.first_name, history.last_name, history.purchases_count
                    ));
                    let rows: Vec<PurchaseRow> = history.purchases.iter().map(PurchaseRow::from).collect();
                    output::print_list(&rows, &history.purchases, format)?;
                }
                _ => output::print_item(&history, format)?,
            }
        }

        ClientCommands::Create {
            first_name,
            last_name,
            email,
            photo_url,
        } => {
            let req = CreateClientRequest {
                first_name,
                last_name,
                email,
                photo_url,
            };
            let info: ClientInfo = client.post(CLIENTS, &req).await?;
            match format {
                OutputFormat::Table => {
                    output::print_success(&format!(
                        "Client '{} {}' registered with ID {}",
                        info.first_name, info.last_name, info.id
                    ));
                }
                _ => output::print_item(&info, format)?,
            }
        }

        ClientCommands::Delete { id } => {
            client.delete(&format!("{}/{}", CLIENTS, id)).await?;
            output::print_success(&format!("Client {} deleted", id));
        }
    }

    Ok(())
}
