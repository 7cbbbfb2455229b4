use std::str::FromStr;

use anyhow::Context;
use sqlx::sqlite::{SqliteArguments, SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::Arguments;

use crate::api::Book;
use crate::books_gateway::{BooksGateway, ExecutionOutcome, GatewayError};
use crate::query::{SqlParam, Statement, NOW};

pub const IN_MEMORY_DATABASE: &str = ":memory:";

pub struct SqliteBooksGateway {
    pool: SqlitePool,
}

pub struct SqliteBooksGatewayConfig {
    /// Path of the database file, created when missing. `:memory:` keeps everything in memory.
    pub database_path: String,
}

impl SqliteBooksGateway {
    pub async fn init(config: SqliteBooksGatewayConfig) -> anyhow::Result<Self> {
        let options = if config.database_path == IN_MEMORY_DATABASE {
            SqliteConnectOptions::from_str("sqlite::memory:")
                .context("Failed to build in-memory options")?
        } else {
            SqliteConnectOptions::new()
                .filename(&config.database_path)
                .create_if_missing(true)
        };

        // One connection that is never recycled, an in-memory database lives only as long as it does
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .with_context(|| format!("Failed to connect to SQLite {}", config.database_path))?;
        tracing::info!("Connected to SQLite DB: {}", config.database_path);

        sqlx::query(&format!(
            "
        CREATE TABLE IF NOT EXISTS books (
            id              INTEGER PRIMARY KEY AUTOINCREMENT,
            title           TEXT NOT NULL,
            author          TEXT NOT NULL,
            year            INTEGER NOT NULL,
            created_at      TEXT NOT NULL DEFAULT ({now}),
            updated_at      TEXT NOT NULL DEFAULT ({now})
            )
        ",
            now = NOW
        ))
        .execute(&pool)
        .await
        .context("Failed to setup table")?;

        Ok(Self { pool })
    }
}

fn arguments(params: &[SqlParam]) -> Result<SqliteArguments<'_>, GatewayError> {
    let mut arguments = SqliteArguments::default();
    for param in params {
        let added = match param {
            SqlParam::Text(value) => arguments.add(value.as_str()),
            SqlParam::Integer(value) => arguments.add(*value),
        };
        added.map_err(|err| GatewayError::Other(format!("Failed to bind parameter: {}", err)))?;
    }
    Ok(arguments)
}

#[async_trait::async_trait]
impl BooksGateway for SqliteBooksGateway {
    async fn execute(&self, statement: &Statement) -> Result<ExecutionOutcome, GatewayError> {
        let result = sqlx::query_with(&statement.sql, arguments(&statement.params)?)
            .execute(&self.pool)
            .await?;

        Ok(ExecutionOutcome {
            generated_id: result.last_insert_rowid(),
            rows_affected: result.rows_affected(),
        })
    }

    async fn fetch_one(&self, statement: &Statement) -> Result<Option<Book>, GatewayError> {
        Ok(
            sqlx::query_as_with::<_, Book, _>(&statement.sql, arguments(&statement.params)?)
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    async fn fetch_many(&self, statement: &Statement) -> Result<Vec<Book>, GatewayError> {
        Ok(
            sqlx::query_as_with::<_, Book, _>(&statement.sql, arguments(&statement.params)?)
                .fetch_all(&self.pool)
                .await?,
        )
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}
