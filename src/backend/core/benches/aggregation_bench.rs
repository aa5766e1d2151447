//! Benchmarks for read-time aggregation. Run with: cargo bench --bench aggregation_bench

use std::sync::Arc;

use chrono::{Duration, NaiveDate, Utc};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use libris_core::aggregation::{average_sales, buyers_from_rows, AggregationEngine};
use libris_core::db::{InMemoryStore, LibraryStore};
use libris_core::models::{
    AuthorId, BookId, Client, ClientId, NewAuthor, NewBook, NewClient, NewSale, Sale, SaleId,
};
use tokio::runtime::Runtime;

fn buyer_rows(n: usize) -> Vec<(Sale, Client)> {
    let base = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    let book = BookId::new();
    (0..n)
        .map(|i| {
            let client = Client {
                id: ClientId(i as i64),
                first_name: format!("First{i}"),
                last_name: format!("Last{i}"),
                email: None,
                photo_url: None,
            };
            let sale = Sale {
                id: SaleId(i as i64),
                client_id: client.id,
                book_id: book,
                date: base + Duration::days((i * 7919 % 365) as i64),
                created_at: Utc::now(),
            };
            (sale, client)
        })
        .collect()
}

/// One author with `books` books, each sold `sales_per_book` times.
async fn seeded_store(books: usize, sales_per_book: usize) -> (Arc<InMemoryStore>, AuthorId) {
    let store = Arc::new(InMemoryStore::new());
    let author = store
        .insert_author(NewAuthor {
            first_name: "Bench".into(),
            last_name: "Author".into(),
            photo_url: None,
        })
        .await
        .unwrap();
    let client = store
        .insert_client(NewClient {
            first_name: "Bench".into(),
            last_name: "Client".into(),
            email: None,
            photo_url: None,
        })
        .await
        .unwrap();
    let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();

    for i in 0..books {
        let book = store
            .insert_book(NewBook {
                title: format!("Book {i}"),
                year_published: 2000,
                author_id: author.id,
                photo_url: None,
            })
            .await
            .unwrap();
        for _ in 0..sales_per_book {
            store
                .insert_sale(NewSale {
                    client_id: client.id,
                    book_id: book.id,
                    date,
                })
                .await
                .unwrap();
        }
    }
    (store, author.id)
}

fn bench_pure(c: &mut Criterion) {
    let mut g = c.benchmark_group("aggregation_pure");
    g.bench_function("average_sales", |b| b.iter(|| black_box(average_sales(black_box(17), black_box(3)))));

    for &n in &[10usize, 100, 1000] {
        g.throughput(Throughput::Elements(n as u64));
        g.bench_with_input(BenchmarkId::new("buyers_from_rows", n), &n, |b, &n| {
            let rows = buyer_rows(n);
            b.iter(|| black_box(buyers_from_rows(rows.clone())));
        });
    }
    g.finish();
}

fn bench_engine(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut g = c.benchmark_group("aggregation_engine");

    for &books in &[10usize, 100] {
        let (store, author) = rt.block_on(seeded_store(books, 5));
        let engine = AggregationEngine::new(store.clone());

        g.throughput(Throughput::Elements(books as u64));
        g.bench_with_input(BenchmarkId::new("average_sales_for", books), &books, |b, _| {
            b.to_async(&rt).iter(|| async { black_box(engine.average_sales_for(author).await.unwrap()) });
        });
        g.bench_with_input(BenchmarkId::new("books_with_counts", books), &books, |b, _| {
            b.to_async(&rt).iter(|| async {
                let rows = store.books_with_authors().await.unwrap();
                black_box(engine.books_with_counts(rows).await.unwrap())
            });
        });
    }
    g.finish();
}

criterion_group!(benches, bench_pure, bench_engine);
criterion_main!(benches);
