//! Health check command.
//!
//! Queries the `/health` endpoint and reports server and store status.

use anyhow::Result;
use clap::Args;

use crate::client::ApiClient;
use crate::output::{self, OutputFormat};

#[derive(Args)]
pub struct HealthArgs {
    /// Include the store backend in the report
    #[arg(short, long)]
    detailed: bool,
}

pub async fn execute(args: HealthArgs, client: &ApiClient, format: OutputFormat) -> Result<()> {
    let health: serde_json::Value = client.get_raw("/health").await?;

    match format {
        OutputFormat::Table => {
            let status = health
                .get("status")
                .and_then(|v| v.as_str())
                .unwrap_or("unknown");

            output::print_header("Libris Health");
            output::print_detail("Status", status);
            output::print_detail("API URL", client.base_url());

            if let Some(version) = health.get("version").and_then(|v| v.as_str()) {
                output::print_detail("Version", version);
            }

            if let Some(ts) = health.get("timestamp").and_then(|v| v.as_str()) {
                output::print_detail("Timestamp", ts);
            }

            if args.detailed {
                if let Some(backend) = health.get("backend").and_then(|v| v.as_str()) {
                    output::print_detail("Store Backend", backend);
                }
            }

            if status == "healthy" {
                output::print_success("All systems operational");
            } else {
                output::print_error(&format!("System status: {}", status));
            }
        }
        _ => output::print_item(&health, format)?,
    }

    Ok(())
}
