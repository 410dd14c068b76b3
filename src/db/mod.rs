use anyhow::Result;
use sqlx::postgres::PgPoolOptions;
use sqlx::{Pool, Postgres};
use tracing::info;

pub mod queries;
pub mod schema;
pub mod store;

pub type DbPool = Pool<Postgres>;

pub use store::PgStore;

pub async fn init_pool(database_url: &str, max_connections: u32) -> Result<DbPool> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await?;
    Ok(pool)
}

/// Applies the DDL in order. Every statement is idempotent.
pub async fn apply_schema(pool: &DbPool) -> Result<()> {
    for statement in schema::STATEMENTS {
        sqlx::query(statement).execute(pool).await?;
    }
    info!("Schema ready ({} statements)", schema::STATEMENTS.len());
    Ok(())
}
