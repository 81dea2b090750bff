use std::time::Duration;

use anyhow::Result;
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use sea_orm_migration::MigratorTrait;

use crate::migration::Migrator;

/// Create a SeaORM connection. In-memory SQLite URLs are pinned to a single
/// connection, since every new connection would open an empty database.
pub async fn create_orm_conn(database_url: &str) -> Result<DatabaseConnection> {
    let mut options = ConnectOptions::new(database_url.to_owned());
    options
        .connect_timeout(Duration::from_secs(10))
        .sqlx_logging(false);
    if database_url.starts_with("sqlite") && database_url.contains(":memory:") {
        options.max_connections(1).min_connections(1);
    } else {
        options.max_connections(20);
    }
    let conn = Database::connect(options).await?;
    Ok(conn)
}

/// Apply every pending schema migration.
pub async fn run_migrations(conn: &DatabaseConnection) -> Result<()> {
    Migrator::up(conn, None).await?;
    Ok(())
}
