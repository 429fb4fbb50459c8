//! Category management CLI commands.

use clap::{Args, Subcommand};
use serde::Serialize;
use tabled::Tabled;

use catalog_core::config::AppConfig;
use catalog_core::error::AppError;
use catalog_entity::CategoryGet;
use catalog_service::{CategoryService, CreateCategoryRequest, UpdateCategoryRequest};

use super::ListArgs;
use crate::output::{self, OutputFormat};

/// Arguments for category commands
#[derive(Debug, Args)]
pub struct CategoryArgs {
    /// Category subcommand
    #[command(subcommand)]
    pub command: CategoryCommand,
}

/// Category subcommands
#[derive(Debug, Subcommand)]
pub enum CategoryCommand {
    /// List categories
    List(ListArgs),
    /// Show one category
    Get {
        /// Category ID
        id: i64,
    },
    /// Create a category
    Create {
        /// Category name
        name: String,
    },
    /// Rename a category
    Update {
        /// Category ID
        id: i64,
        /// New name
        name: String,
    },
    /// Delete a category and unassign it from every product
    Delete {
        /// Category ID
        id: i64,
        /// Skip confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

/// Category display row for table output
#[derive(Debug, Serialize, Tabled)]
struct CategoryRow {
    /// Category ID
    id: i64,
    /// Name
    name: String,
    /// Created at
    created_date: String,
}

impl From<CategoryGet> for CategoryRow {
    fn from(c: CategoryGet) -> Self {
        Self {
            id: c.id,
            name: c.name,
            created_date: c.created_date.format("%Y-%m-%d %H:%M").to_string(),
        }
    }
}

/// Execute category commands
pub async fn execute(
    args: &CategoryArgs,
    config: &AppConfig,
    format: OutputFormat,
) -> Result<(), AppError> {
    let store = super::open_store(config).await?;
    let service = CategoryService::new(store)?;

    match &args.command {
        CategoryCommand::List(list) => {
            let page = service.list(&list.to_request()).await?;
            let rows: Vec<CategoryRow> = page.data.into_iter().map(Into::into).collect();
            output::print_page(&rows, page.total, format);
        }
        CategoryCommand::Get { id } => {
            let category = service.get(*id).await?;
            output::print_item(&CategoryRow::from(category), format);
        }
        CategoryCommand::Create { name } => {
            let category = service
                .create(CreateCategoryRequest { name: name.clone() })
                .await?;
            output::print_success(&format!("Category '{}' created", category.name));
            output::print_item(&CategoryRow::from(category), format);
        }
        CategoryCommand::Update { id, name } => {
            let category = service
                .update(*id, UpdateCategoryRequest { name: name.clone() })
                .await?;
            output::print_success(&format!("Category {id} updated"));
            output::print_item(&CategoryRow::from(category), format);
        }
        CategoryCommand::Delete { id, yes } => {
            if !super::confirm(&format!("Delete category {id}?"), *yes)? {
                output::print_warning("Cancelled.");
                return Ok(());
            }
            service.delete(*id).await?;
            output::print_success(&format!("Category {id} deleted"));
        }
    }

    Ok(())
}
