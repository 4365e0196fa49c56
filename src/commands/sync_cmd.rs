//! Sync CLI commands for pulling the recipe catalog from the server.

use chrono::{Local, Utc};
use clap::{Args, Subcommand};
use mealie_sync_core::api::ApiError;
use mealie_sync_core::sync::{
    should_sync, RecipeStore, StoreError, SyncError, SyncMode, SyncOutcome, SyncPhase, SyncReport,
};
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::db::SqliteRecipeStore;
use crate::sync::build_engine;

/// Sync with the Mealie server
#[derive(Debug, Args)]
pub struct SyncCommand {
    /// Refetch every recipe instead of only new and changed ones
    #[arg(long)]
    force: bool,

    #[command(subcommand)]
    command: Option<SyncSubcommand>,
}

#[derive(Debug, Subcommand)]
enum SyncSubcommand {
    /// Show sync configuration and local state
    Status,
    /// Refresh local favorite flags from the server
    Favorites,
}

impl SyncCommand {
    pub async fn run(
        &self,
        store: &SqliteRecipeStore,
        config: &Config,
    ) -> Result<(), SyncCommandError> {
        match &self.command {
            None => self.sync(store, config).await,
            Some(SyncSubcommand::Status) => self.status(store, config).await,
            Some(SyncSubcommand::Favorites) => self.favorites(store, config).await,
        }
    }

    async fn sync(
        &self,
        store: &SqliteRecipeStore,
        config: &Config,
    ) -> Result<(), SyncCommandError> {
        let engine = build_engine(config, store.clone())?;
        let mode = if self.force {
            SyncMode::Forced
        } else {
            SyncMode::Optimized
        };

        let cancel = CancellationToken::new();
        let ctrl_c = cancel.clone();
        let signal_task = tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                eprintln!("\nCancelling sync...");
                ctrl_c.cancel();
            }
        });

        let mut phases = engine.watch_phase();
        let progress_task = tokio::spawn(async move {
            while phases.changed().await.is_ok() {
                let phase = *phases.borrow_and_update();
                if matches!(phase, SyncPhase::Listing | SyncPhase::Fetching) {
                    println!("  {}...", phase);
                }
            }
        });

        println!("Syncing with {}...", engine.catalog().server_url());
        let outcome = engine.sync(mode, &cancel).await;

        signal_task.abort();
        progress_task.abort();

        match outcome? {
            SyncOutcome::Completed(report) => {
                println!();
                print_report(&report);
            }
            SyncOutcome::Skipped => println!("A sync is already running."),
        }
        Ok(())
    }

    async fn status(
        &self,
        store: &SqliteRecipeStore,
        config: &Config,
    ) -> Result<(), SyncCommandError> {
        println!("Sync Configuration");
        println!("==================");
        println!();

        let Some(server_url) = config.server.url.as_deref() else {
            println!("Status: Not configured");
            println!();
            println!("To enable sync, log in to your server:");
            println!();
            println!("  mealie auth login --server https://mealie.example.com");
            println!();
            println!("Or set environment variables:");
            println!("  MEALIE_SERVER_URL, MEALIE_TOKEN");
            return Ok(());
        };

        println!("Server:    {}", server_url);
        println!(
            "Logged in: {}",
            if config.server.token.is_some() { "yes" } else { "no" }
        );
        println!(
            "Auto-sync: {}",
            if config.server.auto_sync {
                "enabled"
            } else {
                "disabled"
            }
        );
        println!();

        let local_count = store.count().await?;
        let last_sync = store.last_synced_at().await?;
        println!("Local recipes: {}", local_count);
        match last_sync {
            Some(at) => println!("Last sync:     {}", at.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S")),
            None => println!("Last sync:     never"),
        }
        println!(
            "Sync due:      {}",
            if should_sync(local_count, last_sync, Utc::now()) {
                "yes"
            } else {
                "no"
            }
        );
        Ok(())
    }

    async fn favorites(
        &self,
        store: &SqliteRecipeStore,
        config: &Config,
    ) -> Result<(), SyncCommandError> {
        let engine = build_engine(config, store.clone())?;
        match engine.sync_favorites().await? {
            Some(0) => println!("Favorites already up to date."),
            Some(changed) => println!(
                "Updated {} favorite{}.",
                changed,
                if changed == 1 { "" } else { "s" }
            ),
            None => println!("A sync is already running."),
        }
        Ok(())
    }
}

fn print_report(report: &SyncReport) {
    let counts = &report.counts;
    println!(
        "  {} cached, {} refreshed, {} new",
        counts.cached, counts.fetched, counts.new
    );
    if report.inserted + report.updated + report.deleted == 0 {
        println!("Already up to date.");
    } else {
        println!(
            "Sync complete: {} added, {} updated, {} removed.",
            report.inserted, report.updated, report.deleted
        );
    }
    if !report.recorded {
        println!("Warning: sync time was not saved; the next read will sync again.");
    }
}

/// Errors from sync commands
#[derive(Debug)]
pub enum SyncCommandError {
    Sync(SyncError),
    Api(ApiError),
    Store(StoreError),
}

impl std::fmt::Display for SyncCommandError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyncCommandError::Sync(e) => match e.api_error() {
                Some(api) if api.is_auth() => {
                    write!(f, "{} Run 'mealie auth login' to sign in again.", e)
                }
                _ => write!(f, "{}", e),
            },
            SyncCommandError::Api(e) => write!(f, "{}", e),
            SyncCommandError::Store(e) => write!(f, "Local store error: {}", e),
        }
    }
}

impl std::error::Error for SyncCommandError {}

impl From<SyncError> for SyncCommandError {
    fn from(e: SyncError) -> Self {
        SyncCommandError::Sync(e)
    }
}

impl From<ApiError> for SyncCommandError {
    fn from(e: ApiError) -> Self {
        SyncCommandError::Api(e)
    }
}

impl From<StoreError> for SyncCommandError {
    fn from(e: StoreError) -> Self {
        SyncCommandError::Store(e)
    }
}
