use clap::{Args, Subcommand};

use super::OutputFormat;
use crate::config::Config;

const CONFIG_TEMPLATE: &str = "\
# Mealie CLI configuration
# database_path: /path/to/mealie.db
server:
  # url: https://mealie.example.com
  auto_sync: true
  fetch_concurrency: 1
  http_timeout_secs: 30
  page_size: 50
";

#[derive(Args)]
pub struct ConfigCommand {
    #[command(subcommand)]
    pub command: ConfigSubcommand,
}

#[derive(Subcommand)]
pub enum ConfigSubcommand {
    /// Show current configuration values
    Show {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },
    /// Print the config file path
    Path,
    /// Write a starter config file if none exists
    Init,
}

impl ConfigCommand {
    pub fn run(&self, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            ConfigSubcommand::Show { format } => {
                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(&redacted(config))?);
                    }
                    OutputFormat::Text => {
                        println!("Configuration");
                        println!("=============\n");

                        if let Some(path) = &config.config_file {
                            println!("Config file: {}", path.display());
                        } else {
                            println!(
                                "Config file: {} (not found)",
                                Config::default_config_path().display()
                            );
                        }
                        println!();

                        println!("database_path: {}", config.database_path.value.display());
                        println!("  source: {}", config.database_path.source);
                        println!();

                        let server = &config.server;
                        println!("server.url: {}", server.url.as_deref().unwrap_or("(not set)"));
                        println!(
                            "server.token: {}",
                            if server.token.is_some() { "(set)" } else { "(not set)" }
                        );
                        println!("server.auto_sync: {}", server.auto_sync);
                        println!("server.fetch_concurrency: {}", server.fetch_concurrency);
                        println!("server.http_timeout_secs: {}", server.http_timeout_secs);
                        println!("server.page_size: {}", server.page_size);
                    }
                }
                Ok(())
            }
            ConfigSubcommand::Path => {
                println!("{}", config.writable_config_path().display());
                Ok(())
            }
            ConfigSubcommand::Init => {
                let path = config.writable_config_path();
                if init_config_file(&path)? {
                    println!("Wrote {}", path.display());
                } else {
                    println!("Config file already exists: {}", path.display());
                }
                Ok(())
            }
        }
    }
}

/// Copy of the config safe to print: the token is replaced by a marker.
fn redacted(config: &Config) -> Config {
    let mut config = config.clone();
    if config.server.token.is_some() {
        config.server.token = Some("(set)".to_string());
    }
    config
}

/// Writes the starter config. Returns false if a file is already there.
fn init_config_file(path: &std::path::Path) -> std::io::Result<bool> {
    if path.exists() {
        return Ok(false);
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, CONFIG_TEMPLATE)?;
    Ok(true)
}
