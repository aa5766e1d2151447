//! Author management commands.

use anyhow::Result;
use clap::Subcommand;
use serde::{Deserialize, Serialize};
use tabled::Tabled;
use uuid::Uuid;

use crate::client::ApiClient;
use crate::output::{self, OutputFormat};

const AUTHORS: &str = "/api/v1/authors";

#[derive(Subcommand)]
pub enum AuthorCommands {
    /// List all authors with their book counts
    List,

    /// Get details of an author
    Get {
        /// Author ID
        id: Uuid,
    },

    /// Show book count and average sales per book
    Stats {
        /// Author ID
        id: Uuid,
    },

    /// Create a new author
    Create {
        /// First name
        #[arg(long)]
        first_name: String,
        /// Last name
        #[arg(long)]
        last_name: String,
        /// Photo URL (http or https)
        #[arg(long)]
        photo_url: Option<String>,
    },

    /// Delete an author along with their books and sales
    Delete {
        /// Author ID
        id: Uuid,
    },
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorInfo {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub photo_url: Option<String>,
    pub books_count: u64,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorStatsInfo {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub photo_url: Option<String>,
    pub books_count: u64,
    pub average_sales: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateAuthorRequest {
    first_name: String,
    last_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    photo_url: Option<String>,
}

#[derive(Tabled)]
struct AuthorRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Books")]
    books: u64,
}

impl From<&AuthorInfo> for AuthorRow {
    fn from(a: &AuthorInfo) -> Self {
        Self {
            id: output::short_id(&a.id.to_string()),
            name: format!("{} {}", a.first_name, a.last_name),
            books: a.books_count,
        }
    }
}

pub async fn execute(cmd: AuthorCommands, client: &ApiClient, format: OutputFormat) -> Result<()> {
    match cmd {
        AuthorCommands::List => {
            let authors: Vec<AuthorInfo> = client.get(AUTHORS).await?;
            let rows: Vec<AuthorRow> = authors.iter().map(AuthorRow::from).collect();
            output::print_list(&rows, &authors, format)?;
        }

        AuthorCommands::Get { id } => {
            let author: AuthorInfo = client.get(&format!("{}/{}", AUTHORS, id)).await?;
            match format {
                OutputFormat::Table => print_author(&author),
                _ => output::print_item(&author, format)?,
            }
        }

        AuthorCommands::Stats { id } => {
            let stats: AuthorStatsInfo = client.get(&format!("{}/{}/stats", AUTHORS, id)).await?;
            match format {
                OutputFormat::Table => {
                    output::print_header(&format!("Author Stats: {} {}", stats.first_name, stats.last_name));
                    output::print_detail("ID", &stats.id.to_string());
                    output::print_detail("Books", &stats.books_count.to_string());
                    output::print_detail("Average Sales", &format!("{:.2}", stats.average_sales));
                }
                _ => output::print_item(&stats, format)?,
            }
        }

        AuthorCommands::Create {
            first_name,
            last_name,
            photo_url,
        } => {
            let req = CreateAuthorRequest {
                first_name,
                last_name,
                photo_url,
            };
            let author: AuthorInfo = client.post(AUTHORS, &req).await?;
            match format {
                OutputFormat::Table => {
                    output::print_success(&format!(
                        "Author '{} {}' created with ID {}",
                        author.first_name, author.last_name, author.id
                    ));
                }
                _ => output::print_item(&author, format)?,
            }
        }

        AuthorCommands::Delete { id } => {
            client.delete(&format!("{}/{}", AUTHORS, id)).await?;
            output::print_success(&format!("Author {} deleted", id));
        }
    }

    Ok(())
}

fn print_author(author: &AuthorInfo) {
    output::print_header(&format!("Author: {} {}", author.first_name, author.last_name));
    output::print_detail("ID", &author.id.to_string());
    output::print_detail("Books", &author.books_count.to_string());
    output::print_detail("Photo", &output::or_dash(author.photo_url.as_deref()));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_author_info_reads_server_json() {
        let json = r#"{"id":"5f0c6f6e-4f7c-4a51-9d61-1f0e0b5b0a11","firstName":"Ursula","lastName":"Le Guin","photoUrl":null,"booksCount":3}"#;
        let info: AuthorInfo = serde_json::from_str(json).unwrap();
        assert_eq!(info.books_count, 3);

        let row = AuthorRow::from(&info);
        assert_eq!(row.id, "5f0c6f6e");
        assert_eq!(row.name, "Ursula Le Guin");
    }

    #[test]
    fn test_create_request_omits_missing_photo() {
        let req = CreateAuthorRequest {
            first_name: "A".into(),
            last_name: "B".into(),
            photo_url: None,
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json, serde_json::json!({"firstName": "A", "lastName": "B"}));
    }
}
