#![allow(clippy::result_large_err)]
//! # Libris Core
//!
//! Library-management backend over authors, books, clients and sales.
//!
//! ## Architecture
//!
//! - **Entity Store**: one `LibraryStore` trait, PostgreSQL and in-memory backends
//! - **Relationship Rules**: ownership, cascades and write-time reference checks
//! - **Aggregation**: books count, average sales, sales count, buyers, purchase history
//! - **Service**: existence-checked CRUD operations shaped into read models
//! - **API**: axum REST surface under `/api/v1`
//! - **Observability**: structured logging, optional OTLP export, Prometheus metrics

pub mod aggregation;
pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod observability;
pub mod relations;
pub mod service;
pub mod validation;

pub use error::{EntityKind, ErrorCode, ErrorDetails, ErrorSeverity, LibrisError, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::aggregation::AggregationEngine;
    pub use crate::api::{build_router, ApiResponse, AppState};
    pub use crate::config::{Config, StoreBackend};
    pub use crate::db::{Database, InMemoryStore, LibraryStore};
    pub use crate::error::{EntityKind, ErrorCode, ErrorDetails, ErrorSeverity, LibrisError, Result};
    pub use crate::models::*;
    pub use crate::relations::{DeletionPlan, DependentSalesPolicy, RelationshipRules};
    pub use crate::service::LibraryService;
    pub use crate::validation::{Validate, ValidationErrors};
}
