use crate::db::schema::SQLITE_INIT;
use crate::error::NexusError;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite, Transaction};
use std::str::FromStr;
use tracing::info;

pub type SqlitePool = Pool<Sqlite>;

/// Handle over the SQLite pool. Repository methods for each area live in
/// sibling modules as further `impl GrcStorage` blocks.
#[derive(Clone)]
pub struct GrcStorage {
    pool: SqlitePool,
}

impl GrcStorage {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open (creating if missing) the database at `database_url`, enforce
    /// foreign keys and apply the bundled schema.
    pub async fn connect(database_url: &str) -> Result<Self, NexusError> {
        let connect_opts = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(8)
            .connect_with(connect_opts)
            .await?;
        let storage = Self::new(pool);
        storage.init_schema().await?;
        info!(database_url, "storage ready");
        Ok(storage)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Transaction holding the write lock from the first statement, so rows
    /// read inside it cannot change before it commits.
    pub async fn begin_write(&self) -> Result<Transaction<'static, Sqlite>, NexusError> {
        Ok(self.pool.begin_with("BEGIN IMMEDIATE").await?)
    }

    /// Initialize the schema by executing the bundled DDL.
    pub async fn init_schema(&self) -> Result<(), NexusError> {
        // sqlx::query runs one statement at a time
        for stmt in SQLITE_INIT.split(';') {
            let s = stmt.trim();
            if s.is_empty() {
                continue;
            }
            sqlx::query(s).execute(&self.pool).await?;
        }
        Ok(())
    }

    pub async fn ping(&self) -> Result<(), NexusError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
