//! CLI command definitions and dispatch.

pub mod category;
pub mod health;
pub mod migrate;
pub mod product;

use std::sync::Arc;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};

use catalog_core::config::AppConfig;
use catalog_core::error::AppError;
use catalog_database::{DatabasePool, PgStore};
use catalog_service::ListRequest;

use crate::output::OutputFormat;

/// Catalog: product and category administration
#[derive(Debug, Parser)]
#[command(name = "catalog", version, about, long_about = None)]
pub struct Cli {
    /// Directory holding `default.toml` and per-environment overlays
    #[arg(long, default_value = "config")]
    pub config_dir: String,

    /// Environment overlay to load from the config directory
    #[arg(short, long, default_value = "development")]
    pub env: String,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Database migration management
    Migrate(migrate::MigrateArgs),
    /// Check database connectivity
    Health,
    /// Category management
    Category(category::CategoryArgs),
    /// Product management
    Product(product::ProductArgs),
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(&self, config: &AppConfig) -> Result<(), AppError> {
        match &self.command {
            Commands::Migrate(args) => migrate::execute(args, config).await,
            Commands::Health => health::execute(config).await,
            Commands::Category(args) => category::execute(args, config, self.format).await,
            Commands::Product(args) => product::execute(args, config, self.format).await,
        }
    }
}

/// Filter, sort and paging options shared by list commands
#[derive(Debug, Args)]
pub struct ListArgs {
    /// Substring to search for in the name
    #[arg(short, long)]
    pub search: Option<String>,
    /// Earliest creation date (YYYY-MM-DD), inclusive
    #[arg(long)]
    pub from: Option<NaiveDate>,
    /// Latest creation date (YYYY-MM-DD), inclusive
    #[arg(long)]
    pub to: Option<NaiveDate>,
    /// Sort key, e.g. Id, Name, CreatedDate
    #[arg(short, long)]
    pub order: Option<String>,
    /// Sort direction: `ascend` or anything else for descending
    #[arg(long)]
    pub sort_dir: Option<String>,
    /// Rows to skip
    #[arg(long)]
    pub skip: Option<u64>,
    /// Rows to return; all matches when omitted
    #[arg(long)]
    pub take: Option<u64>,
}

impl ListArgs {
    /// Convert into a service listing request.
    pub fn to_request(&self) -> ListRequest {
        ListRequest {
            start_date: self.from,
            end_date: self.to,
            search: self.search.clone(),
            order: self.order.clone(),
            sort_dir: self.sort_dir.clone(),
            skip: self.skip,
            take: self.take,
        }
    }
}

/// Helper: connect the database pool from config
pub async fn connect(config: &AppConfig) -> Result<DatabasePool, AppError> {
    DatabasePool::connect(&config.database).await
}

/// Helper: open a PostgreSQL store from config
pub async fn open_store(config: &AppConfig) -> Result<Arc<PgStore>, AppError> {
    let pool = connect(config).await?;
    Ok(Arc::new(PgStore::from_config(&pool, config)))
}

/// Helper: ask before a destructive action unless `yes` is set
pub fn confirm(prompt: &str, yes: bool) -> Result<bool, AppError> {
    if yes {
        return Ok(true);
    }
    dialoguer::Confirm::new()
        .with_prompt(prompt)
        .default(false)
        .interact()
        .map_err(|e| AppError::internal(format!("Input error: {e}")))
}
