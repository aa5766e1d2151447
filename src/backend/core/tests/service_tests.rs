//! Service-level tests against the in-memory store.
//!
//! Tests cover:
//! - Author statistics (books count, average sales)
//! - Cascade and restrict deletion
//! - Sale reference checks
//! - Buyer lists and purchase history ordering
//! - Partial updates and author re-assignment

use std::sync::Arc;

use chrono::NaiveDate;
use libris_core::prelude::*;

// ============================================================================
// Fixtures
// ============================================================================

fn service(policy: DependentSalesPolicy) -> (Arc<InMemoryStore>, LibraryService) {
    let store = Arc::new(InMemoryStore::new());
    let service = LibraryService::new(store.clone(), policy);
    (store, service)
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

async fn author(service: &LibraryService, last: &str) -> Author {
    service
        .create_author(NewAuthor {
            first_name: "Test".into(),
            last_name: last.into(),
            photo_url: None,
        })
        .await
        .unwrap()
}

async fn book(service: &LibraryService, author: &Author, title: &str) -> Book {
    service
        .create_book(NewBook {
            title: title.into(),
            year_published: 2001,
            author_id: author.id,
            photo_url: None,
        })
        .await
        .unwrap()
}

async fn client(service: &LibraryService, first: &str) -> Client {
    service
        .create_client(NewClient {
            first_name: first.into(),
            last_name: "Reader".into(),
            email: Some(format!("{}@example.com", first.to_lowercase())),
            photo_url: None,
        })
        .await
        .unwrap()
}

async fn sell(service: &LibraryService, client: &Client, book: &Book, on: NaiveDate) -> Sale {
    service
        .record_sale(NewSale {
            client_id: client.id,
            book_id: book.id,
            date: on,
        })
        .await
        .unwrap()
}

// ============================================================================
// Author statistics
// ============================================================================

#[tokio::test]
async fn test_author_without_books_has_zero_stats() {
    let (_, service) = service(DependentSalesPolicy::Cascade);
    let a = author(&service, "Empty").await;

    let stats = service.get_author_stats(a.id).await.unwrap();
    assert_eq!(stats.books_count, 0);
    assert_eq!(stats.average_sales, 0.0);

    let json = serde_json::to_value(&stats).unwrap();
    assert_eq!(json["booksCount"], 0);
    assert_eq!(json["averageSales"], 0.0);
}

#[tokio::test]
async fn test_average_sales_two_books_one_sold_twice() {
    let (_, service) = service(DependentSalesPolicy::Cascade);
    let a = author(&service, "Pratchett").await;
    let b1 = book(&service, &a, "Mort").await;
    let _b2 = book(&service, &a, "Eric").await;
    let c = client(&service, "Sam").await;

    sell(&service, &c, &b1, date(2024, 1, 1)).await;
    sell(&service, &c, &b1, date(2024, 1, 2)).await;

    let stats = service.get_author_stats(a.id).await.unwrap();
    assert_eq!(stats.books_count, 2);
    assert_eq!(stats.average_sales, 1.0);
}

#[tokio::test]
async fn test_average_sales_matches_per_book_counts() {
    let (_, service) = service(DependentSalesPolicy::Cascade);
    let a = author(&service, "Jemisin").await;
    let books = [
        book(&service, &a, "The Fifth Season").await,
        book(&service, &a, "The Obelisk Gate").await,
        book(&service, &a, "The Stone Sky").await,
    ];
    let c = client(&service, "Essun").await;

    // 1 + 0 + 1 sales over 3 books
    sell(&service, &c, &books[0], date(2024, 2, 1)).await;
    sell(&service, &c, &books[2], date(2024, 2, 2)).await;

    let mut total = 0;
    for b in &books {
        total += service.get_book(b.id).await.unwrap().sales_count;
    }
    let expected = ((total as f64 / books.len() as f64) * 100.0).round() / 100.0;

    let stats = service.get_author_stats(a.id).await.unwrap();
    assert_eq!(stats.average_sales, expected);
    assert_eq!(stats.average_sales, 0.67);
}

#[tokio::test]
async fn test_list_authors_carries_books_count() {
    let (_, service) = service(DependentSalesPolicy::Cascade);
    let a = author(&service, "Atwood").await;
    let _b = author(&service, "Borges").await;
    book(&service, &a, "Oryx and Crake").await;

    let authors = service.list_authors().await.unwrap();
    assert_eq!(authors.len(), 2);
    assert_eq!(authors[0].author.last_name, "Atwood");
    assert_eq!(authors[0].books_count, 1);
    assert_eq!(authors[1].books_count, 0);
}

#[tokio::test]
async fn test_stats_for_unknown_author_is_not_found() {
    let (_, service) = service(DependentSalesPolicy::Cascade);
    let err = service.get_author_stats(AuthorId::new()).await.unwrap_err();
    assert!(err.is_not_found_for(EntityKind::Author));
}

// ============================================================================
// Deletion
// ============================================================================

#[tokio::test]
async fn test_delete_author_cascades_books_and_sales() {
    let (store, service) = service(DependentSalesPolicy::Cascade);
    let a = author(&service, "Le Guin").await;
    let b = book(&service, &a, "The Dispossessed").await;
    let c = client(&service, "Shevek").await;
    let s = sell(&service, &c, &b, date(2024, 3, 3)).await;

    service.delete_author(a.id).await.unwrap();

    let err = service.get_book(b.id).await.unwrap_err();
    assert!(err.is_not_found_for(EntityKind::Book));
    assert!(service.get_author(a.id).await.is_err());
    assert!(store.get_sale(s.id).await.unwrap().is_none());

    // The client survives with an empty history
    let history = service.get_client_purchases(c.id).await.unwrap();
    assert_eq!(history.purchases_count, 0);
}

#[tokio::test]
async fn test_delete_missing_author_is_not_found() {
    let (_, service) = service(DependentSalesPolicy::Cascade);
    let id = AuthorId::new();
    let err = service.delete_author(id).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::RecordNotFound);
    assert_eq!(err.user_message(), format!("Author with ID {} not found", id));
}

#[tokio::test]
async fn test_delete_client_cascades_sales_and_shrinks_buyers() {
    let (_, service) = service(DependentSalesPolicy::Cascade);
    let a = author(&service, "Tolkien").await;
    let b = book(&service, &a, "The Hobbit").await;
    let c1 = client(&service, "Bilbo").await;
    let c2 = client(&service, "Frodo").await;
    sell(&service, &c1, &b, date(2024, 1, 1)).await;
    sell(&service, &c2, &b, date(2024, 1, 2)).await;

    service.delete_client(c1.id).await.unwrap();

    let buyers = service.get_book_buyers(b.id).await.unwrap();
    assert_eq!(buyers.len(), 1);
    assert_eq!(buyers[0].client.id, c2.id);
    assert_eq!(service.get_book(b.id).await.unwrap().sales_count, 1);
}

#[tokio::test]
async fn test_restrict_blocks_deletes_with_sales_and_changes_nothing() {
    let (_, service) = service(DependentSalesPolicy::Restrict);
    let a = author(&service, "Herbert").await;
    let b = book(&service, &a, "Dune").await;
    let c = client(&service, "Paul").await;
    sell(&service, &c, &b, date(2024, 4, 4)).await;

    for err in [
        service.delete_book(b.id).await.unwrap_err(),
        service.delete_client(c.id).await.unwrap_err(),
        service.delete_author(a.id).await.unwrap_err(),
    ] {
        assert_eq!(err.code(), ErrorCode::ConstraintViolation);
        assert_eq!(err.http_status().as_u16(), 409);
    }

    assert_eq!(service.get_book(b.id).await.unwrap().sales_count, 1);
    assert_eq!(service.get_client(c.id).await.unwrap().purchases_count, 1);
    assert_eq!(service.get_author(a.id).await.unwrap().books_count, 1);
}

#[tokio::test]
async fn test_restrict_allows_delete_once_sales_are_gone() {
    let (_, service) = service(DependentSalesPolicy::Restrict);
    let a = author(&service, "Ishiguro").await;
    let b = book(&service, &a, "Klara and the Sun").await;
    let c = client(&service, "Josie").await;
    let s = sell(&service, &c, &b, date(2024, 5, 5)).await;

    service.delete_sale(s.id).await.unwrap();
    service.delete_book(b.id).await.unwrap();
    service.delete_client(c.id).await.unwrap();
    service.delete_author(a.id).await.unwrap();
}

// ============================================================================
// Sales
// ============================================================================

#[tokio::test]
async fn test_sale_with_missing_client_is_not_found_and_not_persisted() {
    let (_, service) = service(DependentSalesPolicy::Cascade);
    let a = author(&service, "Calvino").await;
    let b = book(&service, &a, "Invisible Cities").await;

    let err = service
        .record_sale(NewSale {
            client_id: ClientId(999),
            book_id: b.id,
            date: date(2024, 6, 1),
        })
        .await
        .unwrap_err();

    assert!(err.is_not_found_for(EntityKind::Client));
    assert_eq!(err.details().entity_id.as_deref(), Some("999"));
    assert_eq!(err.user_message(), "Client with ID 999 not found");
    assert!(service.get_book_buyers(b.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_sale_with_missing_book_names_the_book() {
    let (_, service) = service(DependentSalesPolicy::Cascade);
    let c = client(&service, "Marco").await;
    let missing = BookId::new();

    let err = service
        .record_sale(NewSale {
            client_id: c.id,
            book_id: missing,
            date: date(2024, 6, 1),
        })
        .await
        .unwrap_err();

    assert!(err.is_not_found_for(EntityKind::Book));
    assert_eq!(service.get_client(c.id).await.unwrap().purchases_count, 0);
}

#[tokio::test]
async fn test_missing_client_is_reported_before_missing_book() {
    let (_, service) = service(DependentSalesPolicy::Cascade);
    let err = service
        .record_sale(NewSale {
            client_id: ClientId(1),
            book_id: BookId::new(),
            date: date(2024, 6, 1),
        })
        .await
        .unwrap_err();
    assert!(err.is_not_found_for(EntityKind::Client));
}

#[tokio::test]
async fn test_buyers_length_equals_sales_count() {
    let (_, service) = service(DependentSalesPolicy::Cascade);
    let a = author(&service, "Morrison").await;
    let b1 = book(&service, &a, "Beloved").await;
    let b2 = book(&service, &a, "Jazz").await;
    let c1 = client(&service, "Sethe").await;
    let c2 = client(&service, "Denver").await;
    sell(&service, &c1, &b1, date(2024, 1, 1)).await;
    sell(&service, &c2, &b1, date(2024, 1, 1)).await;
    sell(&service, &c2, &b2, date(2024, 1, 3)).await;

    for view in service.list_books().await.unwrap() {
        let buyers = service.get_book_buyers(view.book.id).await.unwrap();
        assert_eq!(buyers.len() as u64, view.sales_count);
    }
}

#[tokio::test]
async fn test_purchase_history_is_newest_first_and_stable() {
    let (_, service) = service(DependentSalesPolicy::Cascade);
    let a = author(&service, "Eco").await;
    let b = book(&service, &a, "The Name of the Rose").await;
    let c = client(&service, "Adso").await;

    let march = sell(&service, &c, &b, date(2024, 3, 1)).await;
    let may = sell(&service, &c, &b, date(2024, 5, 1)).await;

    let before = service.get_client_purchases(c.id).await.unwrap();
    assert_eq!(
        before.purchases.iter().map(|p| p.id).collect::<Vec<_>>(),
        vec![may.id, march.id]
    );

    // An older sale lands at the end without moving the recent ones
    let january = sell(&service, &c, &b, date(2024, 1, 1)).await;
    let after = service.get_client_purchases(c.id).await.unwrap();
    assert_eq!(
        after.purchases.iter().map(|p| p.id).collect::<Vec<_>>(),
        vec![may.id, march.id, january.id]
    );
    assert_eq!(after.purchases_count, 3);
    assert_eq!(after.purchases[0].book.author.last_name, "Eco");

    let by_client = service.list_sales_for_client(c.id).await.unwrap();
    assert_eq!(by_client, after.purchases);
}

#[tokio::test]
async fn test_sale_lists_check_their_root_exists() {
    let (_, service) = service(DependentSalesPolicy::Cascade);
    assert!(service
        .list_sales_for_client(ClientId(5))
        .await
        .unwrap_err()
        .is_not_found_for(EntityKind::Client));
    assert!(service
        .list_sales_for_book(BookId::new())
        .await
        .unwrap_err()
        .is_not_found_for(EntityKind::Book));
}

#[tokio::test]
async fn test_delete_missing_sale_is_not_found() {
    let (_, service) = service(DependentSalesPolicy::Cascade);
    let err = service.delete_sale(SaleId(41)).await.unwrap_err();
    assert!(err.is_not_found_for(EntityKind::Sale));
}

// ============================================================================
// Updates
// ============================================================================

#[tokio::test]
async fn test_partial_update_keeps_absent_fields_and_clears_null() {
    let (_, service) = service(DependentSalesPolicy::Cascade);
    let c = service
        .create_client(NewClient {
            first_name: "Anne".into(),
            last_name: "Shirley".into(),
            email: Some("anne@example.com".into()),
            photo_url: Some("anne.png".into()),
        })
        .await
        .unwrap();

    let patch: ClientPatch =
        serde_json::from_value(serde_json::json!({ "lastName": "Blythe", "email": null }))
            .unwrap();
    let updated = service.update_client(c.id, patch).await.unwrap();

    assert_eq!(updated.first_name, "Anne");
    assert_eq!(updated.last_name, "Blythe");
    assert!(updated.email.is_none());
    assert_eq!(updated.photo_url.as_deref(), Some("anne.png"));
}

#[tokio::test]
async fn test_book_reassignment_moves_books_count() {
    let (_, service) = service(DependentSalesPolicy::Cascade);
    let from = author(&service, "First").await;
    let to = author(&service, "Second").await;
    let b = book(&service, &from, "Orphaned").await;

    let updated = service
        .update_book(
            b.id,
            BookPatch {
                author_id: Some(to.id),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.author_id, to.id);
    assert_eq!(service.get_author(from.id).await.unwrap().books_count, 0);
    assert_eq!(service.get_author(to.id).await.unwrap().books_count, 1);
}

#[tokio::test]
async fn test_book_reassignment_to_missing_author_fails() {
    let (_, service) = service(DependentSalesPolicy::Cascade);
    let a = author(&service, "Kept").await;
    let b = book(&service, &a, "Stays").await;

    let err = service
        .update_book(
            b.id,
            BookPatch {
                author_id: Some(AuthorId::new()),
                title: Some("Renamed".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();

    assert!(err.is_not_found_for(EntityKind::Author));
    let view = service.get_book(b.id).await.unwrap();
    assert_eq!(view.book.title, "Stays");
    assert_eq!(view.author.id, a.id);
}

#[tokio::test]
async fn test_create_book_for_missing_author_fails() {
    let (_, service) = service(DependentSalesPolicy::Cascade);
    let err = service
        .create_book(NewBook {
            title: "Nobody's".into(),
            year_published: 1999,
            author_id: AuthorId::new(),
            photo_url: None,
        })
        .await
        .unwrap_err();
    assert!(err.is_not_found_for(EntityKind::Author));
    assert!(service.list_books().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_update_missing_client_is_not_found() {
    let (_, service) = service(DependentSalesPolicy::Cascade);
    let err = service
        .update_client(ClientId(3), ClientPatch::default())
        .await
        .unwrap_err();
    assert!(err.is_not_found_for(EntityKind::Client));
}
