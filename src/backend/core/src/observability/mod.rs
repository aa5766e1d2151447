//! Observability: Distributed Tracing, Metrics, and Logging.

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use opentelemetry_otlp::WithExportConfig;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::ObservabilityConfig;

/// Initialize the observability stack.
pub fn init(service_name: &str, config: &ObservabilityConfig) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))?;

    // Set up OpenTelemetry tracing if endpoint is provided
    let telemetry_layer = match config.otlp_endpoint.as_deref() {
        Some(endpoint) => {
            let tracer = opentelemetry_otlp::new_pipeline()
                .tracing()
                .with_exporter(
                    opentelemetry_otlp::new_exporter()
                        .tonic()
                        .with_endpoint(endpoint),
                )
                .with_trace_config(
                    opentelemetry_sdk::trace::config()
                        .with_resource(opentelemetry_sdk::Resource::new(vec![
                            opentelemetry::KeyValue::new("service.name", service_name.to_string()),
                        ])),
                )
                .install_batch(opentelemetry_sdk::runtime::Tokio)?;
            Some(tracing_opentelemetry::layer().with_tracer(tracer))
        }
        None => None,
    };

    let (json_layer, pretty_layer) = if config.json_logging {
        (Some(tracing_subscriber::fmt::layer().json()), None)
    } else {
        (None, Some(tracing_subscriber::fmt::layer()))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(telemetry_layer)
        .with(json_layer)
        .with(pretty_layer)
        .try_init()?;

    Ok(())
}

/// Install the Prometheus recorder. The handle renders `/metrics`.
pub fn install_metrics() -> anyhow::Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    metrics::register_metrics();
    Ok(handle)
}

/// Shutdown OpenTelemetry.
pub fn shutdown() {
    opentelemetry::global::shutdown_tracer_provider();
}

/// Metrics registry and helpers.
pub mod metrics {
    use metrics::{counter, describe_counter, describe_histogram, histogram};

    /// Register all metric descriptions.
    pub fn register_metrics() {
        describe_counter!(
            "libris_mutations_total",
            "Entity creates, updates and deletes by entity and operation"
        );
        describe_counter!(
            "libris_sales_recorded_total",
            "Total sales recorded"
        );
        describe_counter!(
            "libris_cascade_rows_total",
            "Rows removed by deletion plans, including the requested row"
        );
        describe_counter!(
            "libris_errors_total",
            "Errors returned to callers by error code"
        );
        describe_histogram!(
            "libris_deletion_plan_rows",
            "Size of applied deletion plans"
        );
    }

    /// Record a successful create/update/delete.
    pub fn record_mutation(entity: &'static str, operation: &'static str) {
        counter!("libris_mutations_total", "entity" => entity, "operation" => operation)
            .increment(1);
    }

    /// Record a recorded sale.
    pub fn record_sale() {
        counter!("libris_sales_recorded_total").increment(1);
    }

    /// Record an applied deletion plan.
    pub fn record_deletion(entity: &'static str, rows: usize) {
        counter!("libris_cascade_rows_total", "entity" => entity).increment(rows as u64);
        histogram!("libris_deletion_plan_rows").record(rows as f64);
    }
}

/// Structured event types for logging.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(tag = "event_type")]
pub enum LibraryEvent {
    Created {
        entity: &'static str,
        id: String,
    },
    Updated {
        entity: &'static str,
        id: String,
    },
    Deleted {
        entity: &'static str,
        id: String,
        rows: usize,
        sales: usize,
    },
    SaleRecorded {
        sale_id: i64,
        client_id: i64,
        book_id: String,
    },
}

impl LibraryEvent {
    /// Log this event and bump the matching counters.
    pub fn emit(&self) {
        match self {
            LibraryEvent::Created { entity, id } => {
                tracing::info!(entity = %entity, id = %id, "Entity created");
                metrics::record_mutation(*entity, "create");
            }
            LibraryEvent::Updated { entity, id } => {
                tracing::info!(entity = %entity, id = %id, "Entity updated");
                metrics::record_mutation(*entity, "update");
            }
            LibraryEvent::Deleted { entity, id, rows, sales } => {
                tracing::info!(
                    entity = %entity,
                    id = %id,
                    rows_removed = %rows,
                    sales_removed = %sales,
                    "Entity deleted"
                );
                metrics::record_mutation(*entity, "delete");
                metrics::record_deletion(*entity, *rows);
            }
            LibraryEvent::SaleRecorded { sale_id, client_id, book_id } => {
                tracing::info!(
                    sale_id = %sale_id,
                    client_id = %client_id,
                    book_id = %book_id,
                    "Sale recorded"
                );
                metrics::record_mutation("Sale", "create");
                metrics::record_sale();
            }
        }
    }
}
