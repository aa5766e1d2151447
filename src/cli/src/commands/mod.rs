//! CLI subcommands.

pub mod author;
pub mod book;
pub mod client;
pub mod config;
pub mod health;
pub mod sale;
