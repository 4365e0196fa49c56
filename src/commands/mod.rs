mod auth;
mod config_cmd;
mod recipe;
mod sync_cmd;

pub use auth::AuthCommand;
pub use config_cmd::ConfigCommand;
pub use recipe::RecipeCommand;
pub use sync_cmd::SyncCommand;

use clap::ValueEnum;

#[derive(Clone, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}
