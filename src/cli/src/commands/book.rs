//! Book management commands.

use anyhow::Result;
use chrono::NaiveDate;
use clap::Subcommand;
use serde::{Deserialize, Serialize};
use tabled::Tabled;
use uuid::Uuid;

use crate::client::ApiClient;
use crate::output::{self, OutputFormat};

const BOOKS: &str = "/api/v1/books";

#[derive(Subcommand)]
pub enum BookCommands {
    /// List all books with author and sales count
    List,

    /// Get details of a book
    Get {
        /// Book ID
        id: Uuid,
    },

    /// List the clients who bought a book, newest sale first
    Buyers {
        /// Book ID
        id: Uuid,
    },

    /// Create a new book
    Create {
        /// Title
        #[arg(long)]
        title: String,
        /// Year of publication
        #[arg(long)]
        year: i32,
        /// Owning author ID
        #[arg(long)]
        author: Uuid,
        /// Cover photo URL
        #[arg(long)]
        photo_url: Option<String>,
    },

    /// Delete a book along with its sales
    Delete {
        /// Book ID
        id: Uuid,
    },
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorRef {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookInfo {
    pub id: Uuid,
    pub title: String,
    pub year_published: i32,
    pub photo_url: Option<String>,
    pub author: AuthorRef,
    pub sales_count: u64,
}

/// Book as returned on create, before any sales exist.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedBook {
    pub id: Uuid,
    pub title: String,
    pub year_published: i32,
    pub author_id: Uuid,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuyerClient {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BuyerInfo {
    pub id: i64,
    pub date: NaiveDate,
    pub client: BuyerClient,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateBookRequest {
    title: String,
    year_published: i32,
    author_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    photo_url: Option<String>,
}

#[derive(Tabled)]
struct BookRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Title")]
    title: String,
    #[tabled(rename = "Year")]
    year: i32,
    #[tabled(rename = "Author")]
    author: String,
    #[tabled(rename = "Sales")]
    sales: u64,
}

impl From<&BookInfo> for BookRow {
    fn from(b: &BookInfo) -> Self {
        Self {
            id: output::short_id(&b.id.to_string()),
            title: b.title.clone(),
            year: b.year_published,
            author: format!("{} {}", b.author.first_name, b.author.last_name),
            sales: b.sales_count,
        }
    }
}

#[derive(Tabled)]
struct BuyerRow {
    #[tabled(rename = "Sale")]
    sale: i64,
    #[tabled(rename = "Date")]
    date: String,
    #[tabled(rename = "Client")]
    client: String,
    #[tabled(rename = "Email")]
    email: String,
}

impl From<&BuyerInfo> for BuyerRow {
    fn from(b: &BuyerInfo) -> Self {
        Self {
            sale: b.id,
            date: b.date.to_string(),
            client: format!("{} {}", b.client.first_name, b.client.last_name),
            email: output::or_dash(b.client.email.as_deref()),
        }
    }
}

pub async fn execute(cmd: BookCommands, client: &ApiClient, format: OutputFormat) -> Result<()> {
    match cmd {
        BookCommands::List => {
            let books: Vec<BookInfo> = client.get(BOOKS).await?;
            let rows: Vec<BookRow> = books.iter().map(BookRow::from).collect();
            output::print_list(&rows, &books, format)?;
        }

        BookCommands::Get { id } => {
            let book: BookInfo = client.get(&format!("{}/{}", BOOKS, id)).await?;
            match format {
                OutputFormat::Table => {
                    output::print_header(&format!("Book: {}", book.title));
                    output::print_detail("ID", &book.id.to_string());
                    output::print_detail("Year", &book.year_published.to_string());
                    output::print_detail(
                        "Author",
                        &format!("{} {} ({})", book.author.first_name, book.author.last_name, book.author.id),
                    );
                    output::print_detail("Sales", &book.sales_count.to_string());
                    output::print_detail("Photo", &output::or_dash(book.photo_url.as_deref()));
                }
                _ => output::print_item(&book, format)?,
            }
        }

        BookCommands::Buyers { id } => {
            let buyers: Vec<BuyerInfo> = client.get(&format!("{}/{}/buyers", BOOKS, id)).await?;
            let rows: Vec<BuyerRow> = buyers.iter().map(BuyerRow::from).collect();
            output::print_list(&rows, &buyers, format)?;
        }

        BookCommands::Create {
            title,
            year,
            author,
            photo_url,
        } => {
            let req = CreateBookRequest {
                title,
                year_published: year,
                author_id: author,
                photo_url,
            };
            let book: CreatedBook = client.post(BOOKS, &req).await?;
            match format {
                OutputFormat::Table => {
                    output::print_success(&format!("Book '{}' created with ID {}", book.title, book.id));
                }
                _ => output::print_item(&book, format)?,
            }
        }

        BookCommands::Delete { id } => {
            client.delete(&format!("{}/{}", BOOKS, id)).await?;
            output::print_success(&format!("Book {} deleted", id));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_book_view_json_maps_to_row() {
        let json = r#"{
            "id": "0b7d2c5e-8a5e-4c1a-9f0e-3a2b1c0d9e8f",
            "title": "The Dispossessed",
            "yearPublished": 1974,
            "photoUrl": null,
            "authorId": "5f0c6f6e-4f7c-4a51-9d61-1f0e0b5b0a11",
            "author": {"id": "5f0c6f6e-4f7c-4a51-9d61-1f0e0b5b0a11", "firstName": "Ursula", "lastName": "Le Guin"},
            "salesCount": 4
        }"#;
        let info: BookInfo = serde_json::from_str(json).unwrap();
        let row = BookRow::from(&info);
        assert_eq!(row.author, "Ursula Le Guin");
        assert_eq!(row.sales, 4);
        assert_eq!(row.year, 1974);
    }

    #[test]
    fn test_buyer_row_dashes_missing_email() {
        let json = r#"{"id": 7, "date": "2024-03-01", "client": {"id": 2, "firstName": "Ana", "lastName": "Diaz", "email": null}}"#;
        let info: BuyerInfo = serde_json::from_str(json).unwrap();
        let row = BuyerRow::from(&info);
        assert_eq!(row.date, "2024-03-01");
        assert_eq!(row.email, "-");
    }
}
