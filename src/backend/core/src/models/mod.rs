//! Domain model for the library.
//!
//! - [`entities`]: persisted records, their identifiers and write inputs
//! - [`views`]: read models carrying derived statistics next to an entity

pub mod entities;
pub mod views;

pub use entities::{
    Author, AuthorId, AuthorPatch, Book, BookId, BookPatch, Client, ClientId, ClientPatch,
    NewAuthor, NewBook, NewClient, NewSale, Sale, SaleId,
};
pub use views::{
    AuthorStats, AuthorSummary, AuthorView, BookSummary, BookView, Buyer, ClientPurchases,
    ClientSummary, ClientView, Purchase,
};

use serde::{Deserialize, Deserializer};

/// Deserialize a nullable field of a partial update.
///
/// Use with `#[serde(default, deserialize_with = "nullable")]`: an absent key
/// stays `None`, an explicit `null` becomes `Some(None)`.
pub(crate) fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
