use super::{PersistError, ResolvedEvent, ResolvedSink};
use async_trait::async_trait;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Pool, Sqlite,
};
use std::str::FromStr;

const SCHEMA: &str = r"
    CREATE TABLE IF NOT EXISTS security_audits (
        contract TEXT,
        chain TEXT,
        report TEXT,
        resolved_at TEXT
    )
";

/// Writes one `security_audits` row per resolved event.
///
/// `report` holds the full event as JSON.
pub struct SqliteSink {
    pool: Pool<Sqlite>,
}

impl SqliteSink {
    /// Opens (creating if missing) the database at `database_url` and ensures the schema.
    ///
    /// In-memory databases are pinned to a single connection so every query sees the same
    /// database.
    ///
    /// # Errors
    /// Returns `PersistError::Database` if the url is invalid or the connection fails.
    pub async fn connect(database_url: &str) -> Result<Self, PersistError> {
        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);

        let pool = if database_url.contains(":memory:") {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect_with(options)
                .await?
        } else {
            SqlitePoolOptions::new().max_connections(4).connect_with(options).await?
        };

        Self::from_pool(pool).await
    }

    /// # Errors
    /// Returns `PersistError::Database` if the schema cannot be created.
    pub async fn from_pool(pool: Pool<Sqlite>) -> Result<Self, PersistError> {
        sqlx::query(SCHEMA).execute(&pool).await?;
        Ok(Self { pool })
    }

    #[must_use]
    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }
}

#[async_trait]
impl ResolvedSink for SqliteSink {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    async fn persist(&self, batch: &[ResolvedEvent]) -> Result<(), PersistError> {
        let mut tx = self.pool.begin().await?;

        for event in batch {
            let report = serde_json::to_string(event)?;

            sqlx::query(
                r"
                INSERT INTO security_audits (contract, chain, report, resolved_at)
                VALUES (?, ?, ?, ?)
                ",
            )
            .bind(&event.contract)
            .bind(&event.snapshot.chain)
            .bind(report)
            .bind(event.resolved_at.to_rfc3339())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }
}
