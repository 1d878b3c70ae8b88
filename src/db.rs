//! Database connection pool and migration management.
//!
//! The accounts service and the transactions service each own a separate
//! Postgres database. Both share this pool setup but run their own
//! migration set.

use sqlx::{Pool, Postgres};

/// Type alias for PostgreSQL connection pool.
pub type DbPool = Pool<Postgres>;

/// Create a new PostgreSQL connection pool.
///
/// # Arguments
///
/// * `database_url` - PostgreSQL connection string
/// * `max_connections` - upper bound on pooled connections
///
/// # Errors
///
/// Returns an error if the connection string is invalid or the server
/// cannot be reached.
pub async fn create_pool(database_url: &str, max_connections: u32) -> Result<DbPool, sqlx::Error> {
    sqlx::postgres::PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
}

/// Schema owned by the accounts service (`migrations/accounts`).
pub async fn run_account_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    let mut migrator = sqlx::migrate!("./migrations/accounts");
    // Tolerate a database that also carries the transactions schema
    migrator.set_ignore_missing(true);
    migrator.run(pool).await
}

/// Schema owned by the transactions service (`migrations/transactions`).
pub async fn run_transaction_migrations(
    pool: &DbPool,
) -> Result<(), sqlx::migrate::MigrateError> {
    let mut migrator = sqlx::migrate!("./migrations/transactions");
    migrator.set_ignore_missing(true);
    migrator.run(pool).await
}
