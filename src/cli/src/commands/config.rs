//! CLI settings persisted in `~/.libris/config.toml`.
//!
//! Only known keys are accepted so a typo fails loudly instead of being
//! stored and silently ignored.

use anyhow::{bail, Context, Result};
use clap::Subcommand;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::output::{self, OutputFormat};

/// Overrides the settings file location.
const CONFIG_ENV: &str = "LIBRIS_CLI_CONFIG";

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Set a setting (api-url, output)
    Set { key: String, value: String },

    /// Print a single setting
    Get { key: String },

    /// Show all settings
    Show,

    /// Remove the settings file
    Reset {
        /// Skip confirmation
        #[arg(short, long)]
        force: bool,
    },
}

#[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CliSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,
    /// Default output format when `-o` is not given.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
}

impl CliSettings {
    fn get(&self, key: &str) -> Result<Option<&str>> {
        Ok(match key {
            "api-url" => self.api_url.as_deref(),
            "output" => self.output.as_deref(),
            other => bail!("Unknown setting '{}' (expected api-url or output)", other),
        })
    }

    fn set(&mut self, key: &str, value: String) -> Result<()> {
        match key {
            "api-url" => {
                if !(value.starts_with("http://") || value.starts_with("https://")) {
                    bail!("api-url must start with http:// or https://");
                }
                self.api_url = Some(value);
            }
            "output" => {
                if !matches!(value.as_str(), "table" | "json" | "yaml") {
                    bail!("output must be one of table, json, yaml");
                }
                self.output = Some(value);
            }
            other => bail!("Unknown setting '{}' (expected api-url or output)", other),
        }
        Ok(())
    }

    fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
    }

    fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let content = toml::to_string_pretty(self).context("Failed to serialize settings")?;
        std::fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))
    }
}

fn settings_path() -> Result<PathBuf> {
    if let Ok(path) = std::env::var(CONFIG_ENV) {
        return Ok(PathBuf::from(path));
    }
    let home = dirs::home_dir().context("Could not determine home directory")?;
    Ok(home.join(".libris").join("config.toml"))
}

fn load() -> Result<CliSettings> {
    CliSettings::load_from(&settings_path()?)
}

/// Saved `api-url`, used when neither `--api-url` nor `LIBRIS_API_URL` is set.
pub fn load_api_url() -> Option<String> {
    load().ok().and_then(|s| s.api_url)
}

/// Saved default output format.
pub fn load_output() -> Option<OutputFormat> {
    use clap::ValueEnum;
    load()
        .ok()
        .and_then(|s| s.output)
        .and_then(|v| OutputFormat::from_str(&v, true).ok())
}

pub async fn execute(cmd: ConfigCommands, format: OutputFormat) -> Result<()> {
    match cmd {
        ConfigCommands::Set { key, value } => {
            let path = settings_path()?;
            let mut settings = CliSettings::load_from(&path)?;
            settings.set(&key, value.clone())?;
            settings.save_to(&path)?;
            output::print_success(&format!("{} = {}", key, value));
        }

        ConfigCommands::Get { key } => match load()?.get(&key)? {
            Some(value) => match format {
                OutputFormat::Table => println!("{}", value),
                _ => output::print_item(&serde_json::json!({ "key": key, "value": value }), format)?,
            },
            None => output::print_info(&format!("'{}' is not set", key)),
        },

        ConfigCommands::Show => {
            let settings = load()?;
            match format {
                OutputFormat::Table => {
                    output::print_header("Settings");
                    output::print_detail("File", &settings_path()?.display().to_string());
                    output::print_detail("api-url", &output::or_dash(settings.api_url.as_deref()));
                    output::print_detail("output", &output::or_dash(settings.output.as_deref()));
                }
                _ => output::print_item(&settings, format)?,
            }
        }

        ConfigCommands::Reset { force } => {
            if !force {
                output::print_info("This removes all saved settings. Re-run with --force to confirm.");
                return Ok(());
            }
            let path = settings_path()?;
            if path.exists() {
                std::fs::remove_file(&path)
                    .with_context(|| format!("Failed to remove {}", path.display()))?;
            }
            output::print_success("Settings reset");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_unknown_key() {
        let mut settings = CliSettings::default();
        assert!(settings.set("api_url", "http://x".into()).is_err());
        assert!(settings.get("colour").is_err());
    }

    #[test]
    fn test_validates_values() {
        let mut settings = CliSettings::default();
        assert!(settings.set("api-url", "localhost:8080".into()).is_err());
        assert!(settings.set("output", "xml".into()).is_err());

        settings.set("api-url", "http://libris.local:8080".into()).unwrap();
        settings.set("output", "json".into()).unwrap();
        assert_eq!(settings.get("api-url").unwrap(), Some("http://libris.local:8080"));
        assert_eq!(settings.get("output").unwrap(), Some("json"));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        assert_eq!(CliSettings::load_from(&path).unwrap(), CliSettings::default());

        let mut settings = CliSettings::default();
        settings.set("api-url", "https://books.example.com".into()).unwrap();
        settings.save_to(&path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("api-url = \"https://books.example.com\""));
        assert_eq!(CliSettings::load_from(&path).unwrap(), settings);
    }
}
