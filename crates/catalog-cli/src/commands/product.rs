//! Product management CLI commands.

use clap::{Args, Subcommand};
use serde::Serialize;
use tabled::Tabled;

use catalog_core::config::AppConfig;
use catalog_core::error::AppError;
use catalog_entity::ProductGet;
use catalog_service::{CreateProductRequest, ProductService, UpdateProductRequest};

use super::ListArgs;
use crate::output::{self, OutputFormat};

/// Arguments for product commands
#[derive(Debug, Args)]
pub struct ProductArgs {
    /// Product subcommand
    #[command(subcommand)]
    pub command: ProductCommand,
}

/// Product fields accepted by create and update
#[derive(Debug, Args)]
pub struct ProductFields {
    /// Product name
    #[arg(long)]
    pub name: String,
    /// Description
    #[arg(long)]
    pub description: Option<String>,
    /// Price in the smallest currency unit
    #[arg(long)]
    pub price: i64,
    /// Category IDs, comma separated
    #[arg(long = "categories", value_delimiter = ',')]
    pub categories: Vec<i64>,
}

/// Product subcommands
#[derive(Debug, Subcommand)]
pub enum ProductCommand {
    /// List products
    List(ListArgs),
    /// Show one product
    Get {
        /// Product ID
        id: i64,
    },
    /// Create a product
    Create(ProductFields),
    /// Update a product and replace its categories
    Update {
        /// Product ID
        id: i64,
        /// New field values
        #[command(flatten)]
        fields: ProductFields,
    },
    /// Delete a product
    Delete {
        /// Product ID
        id: i64,
        /// Skip confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

/// Product display row for table output
#[derive(Debug, Serialize, Tabled)]
struct ProductRow {
    /// Product ID
    id: i64,
    /// Name
    name: String,
    /// Description
    description: String,
    /// Price
    price: i64,
    /// Category names
    categories: String,
    /// Created at
    created_date: String,
}

impl From<&ProductGet> for ProductRow {
    fn from(p: &ProductGet) -> Self {
        Self {
            id: p.id,
            name: p.name.clone(),
            description: p.description.clone().unwrap_or_default(),
            price: p.price,
            categories: p
                .categories
                .iter()
                .map(|c| c.category_name.as_str())
                .collect::<Vec<_>>()
                .join(", "),
            created_date: p.created_date.format("%Y-%m-%d %H:%M").to_string(),
        }
    }
}

/// Print a product; JSON keeps category IDs, tables show names.
fn print_product(product: &ProductGet, format: OutputFormat) {
    match format {
        OutputFormat::Json => output::print_json(product),
        OutputFormat::Table => output::print_item(&ProductRow::from(product), format),
    }
}

/// Execute product commands
pub async fn execute(
    args: &ProductArgs,
    config: &AppConfig,
    format: OutputFormat,
) -> Result<(), AppError> {
    let store = super::open_store(config).await?;
    let service = ProductService::new(store)?;

    match &args.command {
        ProductCommand::List(list) => {
            let page = service.list(&list.to_request()).await?;
            match format {
                OutputFormat::Json => output::print_json(&page),
                OutputFormat::Table => {
                    let rows: Vec<ProductRow> = page.data.iter().map(ProductRow::from).collect();
                    output::print_page(&rows, page.total, format);
                }
            }
        }
        ProductCommand::Get { id } => {
            let product = service.get(*id).await?;
            print_product(&product, format);
        }
        ProductCommand::Create(fields) => {
            let product = service
                .create(CreateProductRequest {
                    name: fields.name.clone(),
                    description: fields.description.clone(),
                    price: fields.price,
                    categories: fields.categories.clone(),
                })
                .await?;
            output::print_success(&format!("Product '{}' created", product.name));
            print_product(&product, format);
        }
        ProductCommand::Update { id, fields } => {
            let product = service
                .update(
                    *id,
                    UpdateProductRequest {
                        name: fields.name.clone(),
                        description: fields.description.clone(),
                        price: fields.price,
                        categories: fields.categories.clone(),
                    },
                )
                .await?;
            output::print_success(&format!("Product {id} updated"));
            print_product(&product, format);
        }
        ProductCommand::Delete { id, yes } => {
            if !super::confirm(&format!("Delete product {id}?"), *yes)? {
                output::print_warning("Cancelled.");
                return Ok(());
            }
            service.delete(*id).await?;
            output::print_success(&format!("Product {id} deleted"));
        }
    }

    Ok(())
}
