//! V1 API module for Libris.
//!
//! Stable endpoints for authors, books, clients and sales.

pub mod routes;

pub use routes::{v1_router, V1_PREFIX};
