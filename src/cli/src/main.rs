//! Libris CLI - Command-line interface for a Libris library server.
//!
//! Provides commands for authors, books, clients, sales, health, and configuration.

mod client;
mod commands;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{author, book, client as customer, config, health, sale};
use output::OutputFormat;

/// Libris - Library Management CLI
#[derive(Parser)]
#[command(
    name = "libris",
    version = "0.1.0",
    about = "Libris - Library Management",
    long_about = "CLI tool for managing authors, books, clients, and sales on a Libris server.",
    propagate_version = true
)]
pub struct Cli {
    /// Output format (defaults to the saved `output` setting, then table)
    #[arg(short, long, global = true)]
    output: Option<OutputFormat>,

    /// API server URL
    #[arg(long, global = true, env = "LIBRIS_API_URL")]
    api_url: Option<String>,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Author management operations
    #[command(subcommand)]
    Author(author::AuthorCommands),

    /// Book management operations
    #[command(subcommand)]
    Book(book::BookCommands),

    /// Client management operations
    #[command(subcommand)]
    Client(customer::ClientCommands),

    /// Sale recording operations
    #[command(subcommand)]
    Sale(sale::SaleCommands),

    /// Check system health
    Health(health::HealthArgs),

    /// Configuration management
    #[command(subcommand)]
    Config(config::ConfigCommands),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.no_color {
        colored::control::set_override(false);
    }

    let api_url = cli
        .api_url
        .clone()
        .or_else(config::load_api_url)
        .unwrap_or_else(|| "http://localhost:8080".to_string());

    let client = client::ApiClient::new(&api_url)?;
    let format = cli.output.or_else(config::load_output).unwrap_or_default();

    let result = match cli.command {
        Commands::Author(cmd) => author::execute(cmd, &client, format).await,
        Commands::Book(cmd) => book::execute(cmd, &client, format).await,
        Commands::Client(cmd) => customer::execute(cmd, &client, format).await,
        Commands::Sale(cmd) => sale::execute(cmd, &client, format).await,
        Commands::Health(args) => health::execute(args, &client, format).await,
        Commands::Config(cmd) => config::execute(cmd, format).await,
    };

    if let Err(e) = result {
        output::print_error(&format!("{:#}", e));
        std::process::exit(1);
    }

    Ok(())
}
