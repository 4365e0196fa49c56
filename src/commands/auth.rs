//! Authentication commands for the Mealie CLI.
//!
//! Login exchanges a username and password for an access token and stores it
//! in the YAML config next to the server URL.

use clap::{Args, Subcommand};
use mealie_sync_core::api::{normalize_server_url, ApiError, MealieClient};
use std::io::{self, Write};
use std::path::Path;

use crate::config::Config;

/// Authentication commands
#[derive(Args)]
pub struct AuthCommand {
    #[command(subcommand)]
    command: AuthSubcommand,
}

#[derive(Subcommand)]
enum AuthSubcommand {
    /// Log in to a Mealie server
    Login {
        /// Server URL (defaults to the configured server)
        #[arg(long)]
        server: Option<String>,

        /// Username or email (prompted when omitted)
        #[arg(long, short)]
        username: Option<String>,
    },
    /// Log out (remove the access token from config)
    Logout,
    /// Show authentication status
    Status,
}

impl AuthCommand {
    pub async fn run(&self, config: &Config) -> Result<(), AuthError> {
        match &self.command {
            AuthSubcommand::Login { server, username } => {
                login(config, server.as_deref(), username.as_deref()).await
            }
            AuthSubcommand::Logout => logout(config),
            AuthSubcommand::Status => status(config).await,
        }
    }
}

/// Errors that can occur during authentication
#[derive(Debug)]
pub enum AuthError {
    /// I/O error
    IoError(io::Error),
    /// Mealie API error
    Api(ApiError),
    /// Config file error
    ConfigError(String),
    /// No server URL given or configured
    NotConfigured,
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::IoError(e) => write!(f, "I/O error: {}", e),
            AuthError::Api(e) => write!(f, "{}", e),
            AuthError::ConfigError(e) => write!(f, "Config error: {}", e),
            AuthError::NotConfigured => write!(
                f,
                "Mealie server not configured. Pass --server or set server.url in config."
            ),
        }
    }
}

impl std::error::Error for AuthError {}

impl From<io::Error> for AuthError {
    fn from(e: io::Error) -> Self {
        AuthError::IoError(e)
    }
}

impl From<ApiError> for AuthError {
    fn from(e: ApiError) -> Self {
        AuthError::Api(e)
    }
}

fn prompt(label: &str) -> Result<String, AuthError> {
    print!("{}", label);
    io::stdout().flush()?;
    let mut value = String::new();
    io::stdin().read_line(&mut value)?;
    Ok(value.trim().to_string())
}

/// Interactive login flow
async fn login(
    config: &Config,
    server: Option<&str>,
    username: Option<&str>,
) -> Result<(), AuthError> {
    let server_url = server
        .or(config.server.url.as_deref())
        .ok_or(AuthError::NotConfigured)?;
    let server_url = normalize_server_url(server_url)?;

    let username = match username {
        Some(username) => username.trim().to_string(),
        None => prompt("Username or email: ")?,
    };
    if username.is_empty() {
        return Err(AuthError::IoError(io::Error::new(
            io::ErrorKind::InvalidInput,
            "Username cannot be empty",
        )));
    }
    let password = prompt("Password: ")?;

    let mut client =
        MealieClient::with_options(&server_url, None, config.server.client_options())?;
    let token = client.login(&username, &password).await?;

    save_credentials(&server_url, &token, &config.writable_config_path())?;

    let user = client.current_user().await?;
    println!("Logged in to {} as {}", server_url, user.display_name());
    Ok(())
}

/// Reads the config file as a YAML mapping, or an empty mapping when absent.
fn read_config_yaml(config_path: &Path) -> Result<serde_yaml::Value, AuthError> {
    if !config_path.exists() {
        return Ok(serde_yaml::Value::Mapping(serde_yaml::Mapping::new()));
    }
    let contents =
        std::fs::read_to_string(config_path).map_err(|e| AuthError::ConfigError(e.to_string()))?;
    let value: serde_yaml::Value =
        serde_yaml::from_str(&contents).map_err(|e| AuthError::ConfigError(e.to_string()))?;
    // An empty file parses as null
    if value.is_null() {
        return Ok(serde_yaml::Value::Mapping(serde_yaml::Mapping::new()));
    }
    Ok(value)
}

fn write_config_yaml(config: &serde_yaml::Value, config_path: &Path) -> Result<(), AuthError> {
    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| AuthError::ConfigError(e.to_string()))?;
    }
    let yaml = serde_yaml::to_string(config).map_err(|e| AuthError::ConfigError(e.to_string()))?;
    std::fs::write(config_path, yaml).map_err(|e| AuthError::ConfigError(e.to_string()))?;
    Ok(())
}

/// Save server URL and token to the config file, keeping every other key
fn save_credentials(server_url: &str, token: &str, config_path: &Path) -> Result<(), AuthError> {
    let mut config = read_config_yaml(config_path)?;

    let mapping = config
        .as_mapping_mut()
        .ok_or_else(|| AuthError::ConfigError("Invalid config format".to_string()))?;

    let server_key = serde_yaml::Value::String("server".to_string());
    let has_server_mapping = mapping
        .get(&server_key)
        .map(|v| v.is_mapping())
        .unwrap_or(false);
    if !has_server_mapping {
        mapping.insert(
            server_key.clone(),
            serde_yaml::Value::Mapping(serde_yaml::Mapping::new()),
        );
    }

    if let Some(server_mapping) = mapping.get_mut(&server_key).and_then(|s| s.as_mapping_mut()) {
        server_mapping.insert(
            serde_yaml::Value::String("url".to_string()),
            serde_yaml::Value::String(server_url.to_string()),
        );
        server_mapping.insert(
            serde_yaml::Value::String("token".to_string()),
            serde_yaml::Value::String(token.to_string()),
        );
    }

    write_config_yaml(&config, config_path)
}

/// Remove the token from the server section. Returns false if there was no config file.
fn clear_token(config_path: &Path) -> Result<bool, AuthError> {
    if !config_path.exists() {
        return Ok(false);
    }

    let mut yaml = read_config_yaml(config_path)?;
    if let Some(mapping) = yaml.as_mapping_mut() {
        let server_key = serde_yaml::Value::String("server".to_string());
        if let Some(server_mapping) = mapping.get_mut(&server_key).and_then(|s| s.as_mapping_mut()) {
            server_mapping.remove(serde_yaml::Value::String("token".to_string()));
        }
    }

    write_config_yaml(&yaml, config_path)?;
    Ok(true)
}

fn logout(config: &Config) -> Result<(), AuthError> {
    if clear_token(&config.writable_config_path())? {
        println!("Logged out. Sync disabled until you log in again.");
    } else {
        println!("Already logged out (no config file).");
    }
    Ok(())
}

fn mask_token(token: &str) -> String {
    if token.len() > 8 {
        format!("{}...{}", &token[..4], &token[token.len() - 4..])
    } else {
        "****".to_string()
    }
}

/// Show authentication status
async fn status(config: &Config) -> Result<(), AuthError> {
    let (Some(url), Some(token)) = (&config.server.url, &config.server.token) else {
        if config.server.url.is_some() {
            println!("Not logged in. Run 'mealie auth login' to authenticate.");
        } else {
            println!("Not configured. Run 'mealie auth login --server <url>' first.");
        }
        return Ok(());
    };

    println!("Server: {}", url);
    println!("Token:  {}", mask_token(token));

    let client = config.server.client()?;
    match client.current_user().await {
        Ok(user) => {
            println!("User:   {}", user.display_name());
            if !user.household.is_empty() {
                println!("Household: {}", user.household);
            }
        }
        Err(ApiError::Unauthorized) => {
            println!("Token rejected by server. Run 'mealie auth login' again.");
        }
        Err(e) => return Err(e.into()),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_save_credentials_creates_file() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("nested").join("config.yaml");

        save_credentials("https://mealie.example.com", "secret-token", &config_path).unwrap();

        let config = Config::load(Some(config_path)).unwrap();
        assert_eq!(
            config.server.url.as_deref(),
            Some("https://mealie.example.com")
        );
        assert_eq!(config.server.token.as_deref(), Some("secret-token"));
    }

    #[test]
    fn test_save_credentials_preserves_other_keys() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("config.yaml");
        std::fs::write(
            &config_path,
            "database_path: /data/recipes.db\nserver:\n  fetch_concurrency: 3\n",
        )
        .unwrap();

        save_credentials("https://mealie.example.com", "abc", &config_path).unwrap();

        let config = Config::load(Some(config_path)).unwrap();
        assert_eq!(
            config.database_path.value,
            std::path::PathBuf::from("/data/recipes.db")
        );
        assert_eq!(config.server.fetch_concurrency, 3);
        assert!(config.server.is_configured());
    }

    #[test]
    fn test_clear_token_keeps_url() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("config.yaml");
        save_credentials("https://mealie.example.com", "abc", &config_path).unwrap();

        assert!(clear_token(&config_path).unwrap());

        let config = Config::load(Some(config_path)).unwrap();
        assert!(config.server.url.is_some());
        assert!(config.server.token.is_none());
        assert!(!config.server.is_configured());
    }

    #[test]
    fn test_clear_token_without_file() {
        let temp_dir = tempdir().unwrap();
        assert!(!clear_token(&temp_dir.path().join("missing.yaml")).unwrap());
    }

    #[test]
    fn test_mask_token() {
        assert_eq!(mask_token("abcdefghijkl"), "abcd...ijkl");
        assert_eq!(mask_token("short"), "****");
    }
}
