//! Error type shared by every Libris layer.
//!
//! [`LibrisError`] pairs a stable [`ErrorCode`] with a message that is safe to
//! show callers, an optional internal message that only reaches the logs, and
//! structured [`ErrorDetails`]. Each code carries its HTTP status, numeric
//! code, severity and retryability in one [`CodeInfo`] table.
//!
//! ```rust,ignore
//! use libris_core::error::{EntityKind, LibrisError, Result};
//!
//! fn find(id: i64) -> Result<()> {
//!     Err(LibrisError::not_found(EntityKind::Client, id))
//! }
//! ```

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use metrics::counter;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, LibrisError>;

type BoxedSource = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The persisted entity an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    Author,
    Book,
    Client,
    Sale,
}

impl EntityKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Author => "Author",
            Self::Book => "Book",
            Self::Client => "Client",
            Self::Sale => "Sale",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Machine-readable error codes. Serialized names are stable for API clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    RecordNotFound,
    ConstraintViolation,
    DuplicateRecord,

    DatabaseError,
    DatabaseConnectionFailed,
    DatabaseQueryFailed,

    SerializationError,
    DeserializationError,

    ValidationError,

    ConfigurationError,
    MissingConfiguration,

    InternalError,
}

/// How loudly an error is logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorSeverity {
    /// The caller asked for something that cannot be done.
    Low,
    /// Malformed data crossing a boundary.
    Medium,
    /// A dependency misbehaved.
    High,
    /// The service cannot do useful work.
    Critical,
}

/// Static facts about an [`ErrorCode`].
#[derive(Debug, Clone, Copy)]
pub struct CodeInfo {
    pub numeric: u32,
    pub status: StatusCode,
    pub severity: ErrorSeverity,
    pub retryable: bool,
}

const fn info(numeric: u32, status: StatusCode, severity: ErrorSeverity, retryable: bool) -> CodeInfo {
    CodeInfo {
        numeric,
        status,
        severity,
        retryable,
    }
}

impl ErrorCode {
    pub const fn info(&self) -> CodeInfo {
        use ErrorSeverity::*;
        match self {
            Self::RecordNotFound => info(1000, StatusCode::NOT_FOUND, Low, false),
            Self::ConstraintViolation => info(1001, StatusCode::CONFLICT, Low, false),
            Self::DuplicateRecord => info(1002, StatusCode::CONFLICT, Low, false),

            Self::DatabaseError => info(2000, StatusCode::INTERNAL_SERVER_ERROR, High, false),
            Self::DatabaseConnectionFailed => info(2001, StatusCode::SERVICE_UNAVAILABLE, Critical, true),
            Self::DatabaseQueryFailed => info(2002, StatusCode::INTERNAL_SERVER_ERROR, High, true),

            Self::SerializationError => info(2200, StatusCode::INTERNAL_SERVER_ERROR, High, false),
            Self::DeserializationError => info(2201, StatusCode::INTERNAL_SERVER_ERROR, Medium, false),

            Self::ValidationError => info(4100, StatusCode::UNPROCESSABLE_ENTITY, Low, false),

            Self::ConfigurationError => info(5000, StatusCode::INTERNAL_SERVER_ERROR, High, false),
            Self::MissingConfiguration => info(5001, StatusCode::INTERNAL_SERVER_ERROR, High, false),

            Self::InternalError => info(9000, StatusCode::INTERNAL_SERVER_ERROR, Critical, false),
        }
    }

    pub const fn numeric_code(&self) -> u32 {
        self.info().numeric
    }

    pub const fn http_status(&self) -> StatusCode {
        self.info().status
    }

    /// Transient on the infrastructure side. Nothing in Libris retries on its
    /// own; the flag is only surfaced to callers.
    pub const fn is_retryable(&self) -> bool {
        self.info().retryable
    }

    /// Grouping label used in logs and metrics.
    pub const fn category(&self) -> &'static str {
        match self.numeric_code() / 100 {
            10 => "domain",
            20 => "database",
            22 => "serialization",
            41 => "validation",
            50 => "configuration",
            _ => "internal",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Structured details attached to an error and echoed in the response body.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorDetails {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_type: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_id: Option<String>,

    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub context: HashMap<String, serde_json::Value>,

    /// Field name to validation messages.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub fields: HashMap<String, Vec<String>>,
}

impl ErrorDetails {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entity(mut self, entity_type: impl Into<String>, entity_id: impl Into<String>) -> Self {
        self.entity_type = Some(entity_type.into());
        self.entity_id = Some(entity_id.into());
        self
    }

    pub fn with_context(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        if let Ok(v) = serde_json::to_value(value) {
            self.context.insert(key.into(), v);
        }
        self
    }

    pub fn with_fields(mut self, fields: HashMap<String, Vec<String>>) -> Self {
        self.fields = fields;
        self
    }

    fn is_empty(&self) -> bool {
        self.entity_type.is_none() && self.context.is_empty() && self.fields.is_empty()
    }
}

#[derive(Error, Debug)]
pub struct LibrisError {
    code: ErrorCode,
    user_message: Cow<'static, str>,
    internal_message: Option<String>,
    details: ErrorDetails,
    #[source]
    source: Option<BoxedSource>,
}

impl fmt::Display for LibrisError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.user_message)?;
        match &self.internal_message {
            Some(internal) => write!(f, " (internal: {})", internal),
            None => Ok(()),
        }
    }
}

impl LibrisError {
    pub fn new(code: ErrorCode, user_message: impl Into<Cow<'static, str>>) -> Self {
        Self {
            code,
            user_message: user_message.into(),
            internal_message: None,
            details: ErrorDetails::default(),
            source: None,
        }
    }

    /// An error whose `internal_message` is logged but never sent to callers.
    pub fn with_internal(
        code: ErrorCode,
        user_message: impl Into<Cow<'static, str>>,
        internal_message: impl Into<String>,
    ) -> Self {
        let mut error = Self::new(code, user_message);
        error.internal_message = Some(internal_message.into());
        error
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::with_internal(ErrorCode::InternalError, "An internal error occurred", message)
    }

    pub fn not_found(entity: EntityKind, entity_id: impl fmt::Display) -> Self {
        let entity_id = entity_id.to_string();
        Self::new(
            ErrorCode::RecordNotFound,
            format!("{} with ID {} not found", entity, entity_id),
        )
        .with_details(ErrorDetails::new().with_entity(entity.as_str(), entity_id))
    }

    /// A delete refused because `dependent_count` rows of `dependent` still
    /// reference the entity.
    pub fn constraint_violation(
        entity: EntityKind,
        entity_id: impl fmt::Display,
        dependent: EntityKind,
        dependent_count: usize,
    ) -> Self {
        let entity_id = entity_id.to_string();
        Self::new(
            ErrorCode::ConstraintViolation,
            format!(
                "{} with ID {} still has {} dependent {} record(s)",
                entity, entity_id, dependent_count, dependent
            ),
        )
        .with_details(
            ErrorDetails::new()
                .with_entity(entity.as_str(), entity_id)
                .with_context("dependentType", dependent.as_str())
                .with_context("dependentCount", dependent_count),
        )
    }

    pub fn validation(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorCode::ValidationError, message)
    }

    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.source = Some(Box::new(source));
        self
    }

    pub fn with_details(mut self, details: ErrorDetails) -> Self {
        self.details = details;
        self
    }

    pub fn with_context(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        self.details = self.details.with_context(key, value);
        self
    }

    pub fn code(&self) -> ErrorCode {
        self.code
    }

    pub fn user_message(&self) -> &str {
        &self.user_message
    }

    pub fn internal_message(&self) -> Option<&str> {
        self.internal_message.as_deref()
    }

    pub fn details(&self) -> &ErrorDetails {
        &self.details
    }

    pub fn http_status(&self) -> StatusCode {
        self.code.http_status()
    }

    pub fn is_retryable(&self) -> bool {
        self.code.is_retryable()
    }

    pub fn severity(&self) -> ErrorSeverity {
        self.code.info().severity
    }

    pub fn is_not_found_for(&self, entity: EntityKind) -> bool {
        self.code == ErrorCode::RecordNotFound
            && self.details.entity_type.as_deref() == Some(entity.as_str())
    }

    /// Emit one log event at a level matching the severity. Caller errors
    /// stay at debug so routine 404s and 422s do not flood the logs.
    pub fn log(&self) {
        let code = self.code.to_string();
        let category = self.code.category();
        let status = self.http_status().as_u16();

        match self.severity() {
            ErrorSeverity::Critical | ErrorSeverity::High => tracing::error!(
                error_code = %code,
                category,
                http_status = status,
                user_message = %self.user_message,
                internal_message = ?self.internal_message,
                source = ?self.source,
                "Request failed"
            ),
            ErrorSeverity::Medium => tracing::warn!(
                error_code = %code,
                category,
                http_status = status,
                internal_message = ?self.internal_message,
                "Malformed data"
            ),
            ErrorSeverity::Low => tracing::debug!(
                error_code = %code,
                http_status = status,
                entity_type = ?self.details.entity_type,
                entity_id = ?self.details.entity_id,
                "Request rejected"
            ),
        }
    }
}

/// Body of every failed API response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: ErrorInfo,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorInfo {
    pub code: ErrorCode,
    pub numeric_code: u32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<ErrorDetails>,
    pub timestamp: DateTime<Utc>,
}

impl From<&LibrisError> for ErrorResponse {
    fn from(error: &LibrisError) -> Self {
        let details = (!error.details.is_empty()).then(|| error.details.clone());
        Self {
            success: false,
            error: ErrorInfo {
                code: error.code,
                numeric_code: error.code.numeric_code(),
                message: error.user_message.to_string(),
                details,
                timestamp: Utc::now(),
            },
        }
    }
}

impl IntoResponse for LibrisError {
    fn into_response(self) -> Response {
        self.log();
        counter!(
            "libris_errors_total",
            "code" => self.code.to_string(),
            "category" => self.code.category(),
            "severity" => format!("{:?}", self.code.info().severity).to_lowercase(),
        )
        .increment(1);
        (self.http_status(), Json(ErrorResponse::from(&self))).into_response()
    }
}

// SQLSTATE codes mapped to domain errors.
const PG_FOREIGN_KEY_VIOLATION: &str = "23503";
const PG_UNIQUE_VIOLATION: &str = "23505";

impl From<sqlx::Error> for LibrisError {
    fn from(error: sqlx::Error) -> Self {
        let (code, user_msg) = match &error {
            sqlx::Error::RowNotFound => (ErrorCode::RecordNotFound, "The requested record was not found"),
            sqlx::Error::Database(db_err) => match db_err.code().as_deref() {
                Some(PG_FOREIGN_KEY_VIOLATION) => (
                    ErrorCode::ConstraintViolation,
                    "The operation conflicts with related records",
                ),
                Some(PG_UNIQUE_VIOLATION) => (
                    ErrorCode::DuplicateRecord,
                    "A record with this identifier already exists",
                ),
                _ => (ErrorCode::DatabaseQueryFailed, "A database error occurred"),
            },
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => (
                ErrorCode::DatabaseConnectionFailed,
                "Unable to connect to the database",
            ),
            _ => (ErrorCode::DatabaseError, "A database error occurred"),
        };

        Self::with_internal(code, user_msg, error.to_string()).with_source(error)
    }
}

impl From<sqlx::migrate::MigrateError> for LibrisError {
    fn from(error: sqlx::migrate::MigrateError) -> Self {
        Self::with_internal(ErrorCode::DatabaseError, "Database migration failed", error.to_string())
            .with_source(error)
    }
}

impl From<serde_json::Error> for LibrisError {
    fn from(error: serde_json::Error) -> Self {
        let code = match error.classify() {
            serde_json::error::Category::Io => ErrorCode::SerializationError,
            _ => ErrorCode::DeserializationError,
        };
        Self::with_internal(code, "Failed to process JSON data", error.to_string()).with_source(error)
    }
}

impl From<std::io::Error> for LibrisError {
    fn from(error: std::io::Error) -> Self {
        Self::with_internal(ErrorCode::InternalError, "An I/O error occurred", error.to_string())
            .with_source(error)
    }
}

impl From<anyhow::Error> for LibrisError {
    fn from(error: anyhow::Error) -> Self {
        error
            .downcast::<LibrisError>()
            .unwrap_or_else(|other| Self::internal(format!("{:#}", other)))
    }
}

impl From<config::ConfigError> for LibrisError {
    fn from(error: config::ConfigError) -> Self {
        let (code, user_msg) = match &error {
            config::ConfigError::NotFound(_) => {
                (ErrorCode::MissingConfiguration, "Required configuration not found")
            }
            _ => (ErrorCode::ConfigurationError, "Invalid configuration"),
        };
        Self::with_internal(code, user_msg, error.to_string()).with_source(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_table() {
        assert_eq!(ErrorCode::RecordNotFound.http_status(), StatusCode::NOT_FOUND);
        assert_eq!(ErrorCode::ConstraintViolation.http_status(), StatusCode::CONFLICT);
        assert_eq!(ErrorCode::ValidationError.http_status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            ErrorCode::DatabaseConnectionFailed.http_status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert!(ErrorCode::DatabaseConnectionFailed.is_retryable());
        assert!(!ErrorCode::ConstraintViolation.is_retryable());
    }

    #[test]
    fn test_category_follows_numeric_range() {
        assert_eq!(ErrorCode::DuplicateRecord.category(), "domain");
        assert_eq!(ErrorCode::DatabaseQueryFailed.category(), "database");
        assert_eq!(ErrorCode::DeserializationError.category(), "serialization");
        assert_eq!(ErrorCode::ValidationError.category(), "validation");
        assert_eq!(ErrorCode::MissingConfiguration.category(), "configuration");
        assert_eq!(ErrorCode::InternalError.category(), "internal");
    }

    #[test]
    fn test_not_found_names_entity_and_id() {
        let error = LibrisError::not_found(EntityKind::Client, 999);
        assert_eq!(error.code(), ErrorCode::RecordNotFound);
        assert_eq!(error.user_message(), "Client with ID 999 not found");
        assert_eq!(error.details().entity_type.as_deref(), Some("Client"));
        assert_eq!(error.details().entity_id.as_deref(), Some("999"));
        assert!(error.is_not_found_for(EntityKind::Client));
        assert!(!error.is_not_found_for(EntityKind::Book));
        assert_eq!(error.severity(), ErrorSeverity::Low);
    }

    #[test]
    fn test_constraint_violation_context() {
        let error = LibrisError::constraint_violation(EntityKind::Book, "b-1", EntityKind::Sale, 3);
        assert_eq!(error.http_status(), StatusCode::CONFLICT);
        assert_eq!(error.details().context["dependentCount"], 3);
        assert_eq!(error.details().context["dependentType"], "Sale");
    }

    #[test]
    fn test_error_response_serialization() {
        let error = LibrisError::not_found(EntityKind::Author, "abc");
        let json = serde_json::to_value(ErrorResponse::from(&error)).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["error"]["code"], "RECORD_NOT_FOUND");
        assert_eq!(json["error"]["numericCode"], 1000);
        assert_eq!(json["error"]["details"]["entityType"], "Author");
    }

    #[test]
    fn test_internal_message_not_exposed() {
        let error = LibrisError::internal("pool exhausted on shard 3");
        let response = ErrorResponse::from(&error);
        assert_eq!(response.error.message, "An internal error occurred");
        assert!(response.error.details.is_none());
        assert_eq!(error.internal_message(), Some("pool exhausted on shard 3"));
    }

    #[test]
    fn test_anyhow_round_trips_libris_error() {
        let original = LibrisError::not_found(EntityKind::Sale, 4);
        let converted = LibrisError::from(anyhow::Error::new(original));
        assert!(converted.is_not_found_for(EntityKind::Sale));
    }

    #[test]
    fn test_error_counter_counts_only_rendered_errors() {
        let recorder = metrics_exporter_prometheus::PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();

        metrics::with_local_recorder(&recorder, || {
            let _discarded = LibrisError::validation("never returned");
            let _ = LibrisError::not_found(EntityKind::Book, "b-1").into_response();
        });

        let rendered = handle.render();
        assert!(rendered.contains("libris_errors_total"));
        assert!(rendered.contains("code=\"RecordNotFound\""));
        assert!(!rendered.contains("ValidationError"));
    }
}
