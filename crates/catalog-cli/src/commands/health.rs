//! Database health check command.

use catalog_core::config::AppConfig;
use catalog_core::error::AppError;
use catalog_database::connection::mask_password;

use crate::output;

/// Execute the health check
pub async fn execute(config: &AppConfig) -> Result<(), AppError> {
    let pool = super::connect(config).await?;
    let healthy = pool.health_check().await?;

    output::print_kv("Database", &mask_password(&config.database.url));
    output::print_kv("Isolation", config.database.isolation.as_sql());
    output::print_kv("Collation", config.text.collation().unwrap_or("(column default)"));
    pool.close().await;

    if healthy {
        output::print_success("Database is reachable.");
        Ok(())
    } else {
        Err(AppError::store_unavailable("Database health check returned an unexpected value"))
    }
}
