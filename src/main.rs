use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod config;
mod db;
mod sync;

use commands::{AuthCommand, ConfigCommand, RecipeCommand, SyncCommand};
use config::Config;
use db::{init_db, SqliteRecipeStore};

#[derive(Parser)]
#[command(name = "mealie")]
#[command(version)]
#[command(about = "Offline recipe cache for a Mealie server", long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in and out of the Mealie server
    Auth(AuthCommand),

    /// Browse and edit recipes
    Recipe(RecipeCommand),

    /// Sync recipes from the server
    Sync(SyncCommand),

    /// Manage configuration
    Config(ConfigCommand),
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        tracing::error!("{}", e);
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose {
        "mealie=debug,mealie_sync_core=debug"
    } else {
        "mealie=warn,mealie_sync_core=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

async fn open_store(config: &Config) -> Result<SqliteRecipeStore, Box<dyn std::error::Error>> {
    let pool = init_db(&config.database_path.value).await?;
    Ok(SqliteRecipeStore::new(pool))
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    // Load configuration
    let config = Config::load(cli.config)?;

    match cli.command {
        Some(Commands::Auth(cmd)) => {
            cmd.run(&config).await?;
        }
        Some(Commands::Recipe(cmd)) => {
            let store = open_store(&config).await?;
            if cmd.command.is_read_command() {
                sync::try_auto_sync(&config, &store).await;
            }
            cmd.run(&store, &config).await?;
        }
        Some(Commands::Sync(cmd)) => {
            let store = open_store(&config).await?;
            cmd.run(&store, &config).await?;
        }
        Some(Commands::Config(cmd)) => {
            cmd.run(&config)?;
        }
        None => {
            println!("Use --help to see available commands");
        }
    }

    Ok(())
}
