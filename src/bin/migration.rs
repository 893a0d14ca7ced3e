//! Applies (or rolls back) the schema migrations.
//!
//! Reads the database URL from `APP__DATABASE_URL`, falling back to
//! `DATABASE_URL`. Pass `down` to roll back the last migration, `status` to
//! list what has been applied.

use lenta_gestionale::{config::init_tracing, migrator::Migrator};
use sea_orm::{ConnectOptions, Database};
use sea_orm_migration::prelude::*;
use std::time::Duration;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), DbErr> {
    init_tracing("info", false);

    let database_url = std::env::var("APP__DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .unwrap_or_else(|_| "sqlite://lenta.db?mode=rwc".to_string());
    info!("Connecting to database");

    let mut options = ConnectOptions::new(database_url);
    options
        .max_connections(2)
        .connect_timeout(Duration::from_secs(10))
        .acquire_timeout(Duration::from_secs(10))
        .sqlx_logging(false);
    let db = Database::connect(options).await?;

    match std::env::args().nth(1).as_deref() {
        Some("down") => {
            Migrator::down(&db, Some(1)).await?;
            info!("Rolled back the last migration");
        }
        Some("status") => Migrator::status(&db).await?,
        _ => {
            Migrator::up(&db, None).await?;
            info!("Migration completed successfully");
        }
    }

    Ok(())
}
