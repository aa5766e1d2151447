//! Read models.
//!
//! Derived statistics never live on the persisted entities. Each view wraps
//! an entity (flattened into the same JSON object) next to the figures that
//! were computed for it at read time.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::entities::{Author, AuthorId, Book, BookId, Client, ClientId, SaleId};

/// Author fields embedded in other views.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorSummary {
    pub id: AuthorId,
    pub first_name: String,
    pub last_name: String,
}

impl From<&Author> for AuthorSummary {
    fn from(author: &Author) -> Self {
        Self {
            id: author.id,
            first_name: author.first_name.clone(),
            last_name: author.last_name.clone(),
        }
    }
}

/// Author with the number of books it owns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorView {
    #[serde(flatten)]
    pub author: Author,
    pub books_count: u64,
}

/// Author with book count and average sales per book.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorStats {
    #[serde(flatten)]
    pub author: Author,
    pub books_count: u64,
    pub average_sales: f64,
}

/// Book with its author and number of sales.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookView {
    #[serde(flatten)]
    pub book: Book,
    pub author: AuthorSummary,
    pub sales_count: u64,
}

/// Book fields embedded in a purchase, including the author.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookSummary {
    pub id: BookId,
    pub title: String,
    pub year_published: i32,
    pub author: AuthorSummary,
}

/// Client fields embedded in a buyer entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientSummary {
    pub id: ClientId,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
}

impl From<&Client> for ClientSummary {
    fn from(client: &Client) -> Self {
        Self {
            id: client.id,
            first_name: client.first_name.clone(),
            last_name: client.last_name.clone(),
            email: client.email.clone(),
        }
    }
}

/// Client with the number of purchases made.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientView {
    #[serde(flatten)]
    pub client: Client,
    pub purchases_count: u64,
}

/// One sale of a book, seen from the book.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Buyer {
    pub id: SaleId,
    pub date: NaiveDate,
    pub client: ClientSummary,
}

/// One sale to a client, seen from the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Purchase {
    pub id: SaleId,
    pub date: NaiveDate,
    pub book: BookSummary,
}

/// Client with its purchase history, most recent first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientPurchases {
    #[serde(flatten)]
    pub client: Client,
    pub purchases_count: u64,
    pub purchases: Vec<Purchase>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_author_stats_flattens_entity() {
        let stats = AuthorStats {
            author: Author {
                id: AuthorId::new(),
                first_name: "Jorge".into(),
                last_name: "Borges".into(),
                photo_url: None,
            },
            books_count: 2,
            average_sales: 1.5,
        };

        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["firstName"], "Jorge");
        assert_eq!(json["booksCount"], 2);
        assert_eq!(json["averageSales"], 1.5);
        assert!(json.get("author").is_none());
    }
}
