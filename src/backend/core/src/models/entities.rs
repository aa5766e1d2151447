//! Persisted entities and the inputs that create or modify them.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::nullable;

// ═══════════════════════════════════════════════════════════════════════════════
// Identifiers
// ═══════════════════════════════════════════════════════════════════════════════

/// Unique identifier for an author.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type)]
#[serde(transparent)]
#[sqlx(transparent)]
pub struct AuthorId(pub Uuid);

impl AuthorId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for AuthorId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AuthorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a book.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type)]
#[serde(transparent)]
#[sqlx(transparent)]
pub struct BookId(pub Uuid);

impl BookId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for BookId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for BookId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Store-assigned identifier for a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type)]
#[serde(transparent)]
#[sqlx(transparent)]
pub struct ClientId(pub i64);

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Store-assigned identifier for a sale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type)]
#[serde(transparent)]
#[sqlx(transparent)]
pub struct SaleId(pub i64);

impl fmt::Display for SaleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Author
// ═══════════════════════════════════════════════════════════════════════════════

/// A book author.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Author {
    pub id: AuthorId,
    pub first_name: String,
    pub last_name: String,
    pub photo_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAuthor {
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub photo_url: Option<String>,
}

/// Partial update of an author. Absent fields keep their stored value.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorPatch {
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub photo_url: Option<Option<String>>,
}

impl AuthorPatch {
    pub fn apply_to(self, author: &mut Author) {
        if let Some(first_name) = self.first_name {
            author.first_name = first_name;
        }
        if let Some(last_name) = self.last_name {
            author.last_name = last_name;
        }
        if let Some(photo_url) = self.photo_url {
            author.photo_url = photo_url;
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Book
// ═══════════════════════════════════════════════════════════════════════════════

/// A book, owned by exactly one author.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    pub id: BookId,
    pub title: String,
    pub year_published: i32,
    pub photo_url: Option<String>,
    pub author_id: AuthorId,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewBook {
    pub title: String,
    pub year_published: i32,
    pub author_id: AuthorId,
    #[serde(default)]
    pub photo_url: Option<String>,
}

/// Partial update of a book. Changing `author_id` re-assigns ownership.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookPatch {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub year_published: Option<i32>,
    #[serde(default)]
    pub author_id: Option<AuthorId>,
    #[serde(default, deserialize_with = "nullable")]
    pub photo_url: Option<Option<String>>,
}

impl BookPatch {
    pub fn apply_to(self, book: &mut Book) {
        if let Some(title) = self.title {
            book.title = title;
        }
        if let Some(year_published) = self.year_published {
            book.year_published = year_published;
        }
        if let Some(author_id) = self.author_id {
            book.author_id = author_id;
        }
        if let Some(photo_url) = self.photo_url {
            book.photo_url = photo_url;
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Client
// ═══════════════════════════════════════════════════════════════════════════════

/// A library client (buyer).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Client {
    pub id: ClientId,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub photo_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewClient {
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub photo_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientPatch {
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub email: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub photo_url: Option<Option<String>>,
}

impl ClientPatch {
    pub fn apply_to(self, client: &mut Client) {
        if let Some(first_name) = self.first_name {
            client.first_name = first_name;
        }
        if let Some(last_name) = self.last_name {
            client.last_name = last_name;
        }
        if let Some(email) = self.email {
            client.email = email;
        }
        if let Some(photo_url) = self.photo_url {
            client.photo_url = photo_url;
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Sale
// ═══════════════════════════════════════════════════════════════════════════════

/// One purchase of one book by one client. Immutable once recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Sale {
    pub id: SaleId,
    pub client_id: ClientId,
    pub book_id: BookId,
    pub date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSale {
    pub client_id: ClientId,
    pub book_id: BookId,
    #[serde(alias = "saleDate")]
    pub date: NaiveDate,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn author() -> Author {
        Author {
            id: AuthorId::new(),
            first_name: "Ursula".into(),
            last_name: "Le Guin".into(),
            photo_url: Some("https://example.com/ulg.png".into()),
        }
    }

    #[test]
    fn test_patch_keeps_absent_fields() {
        let mut a = author();
        let patch: AuthorPatch = serde_json::from_value(json!({ "firstName": "U. K." })).unwrap();
        patch.apply_to(&mut a);

        assert_eq!(a.first_name, "U. K.");
        assert_eq!(a.last_name, "Le Guin");
        assert_eq!(a.photo_url.as_deref(), Some("https://example.com/ulg.png"));
    }

    #[test]
    fn test_patch_explicit_null_clears_nullable_field() {
        let mut a = author();
        let patch: AuthorPatch = serde_json::from_value(json!({ "photoUrl": null })).unwrap();
        assert_eq!(patch.photo_url, Some(None));
        patch.apply_to(&mut a);
        assert!(a.photo_url.is_none());
    }

    #[test]
    fn test_new_sale_accepts_sale_date_alias() {
        let book = BookId::new();
        let sale: NewSale = serde_json::from_value(json!({
            "clientId": 7,
            "bookId": book,
            "saleDate": "2024-03-01"
        }))
        .unwrap();

        assert_eq!(sale.client_id, ClientId(7));
        assert_eq!(sale.book_id, book);
        assert_eq!(sale.date, NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
    }

    #[test]
    fn test_entity_serializes_camel_case() {
        let json = serde_json::to_value(author()).unwrap();
        assert!(json.get("firstName").is_some());
        assert!(json.get("photoUrl").is_some());
        assert!(json["id"].is_string());
    }
}
