pub use sqlite_books_gateway::{SqliteBooksGateway, SqliteBooksGatewayConfig};

use crate::api::{Book, BookId};
use crate::query::Statement;

mod sqlite_books_gateway;

#[derive(thiserror::Error, Debug)]
pub enum GatewayError {
    #[error("DatabaseFailure failure {0}")]
    DatabaseFailure(#[from] sqlx::Error),

    #[error("Other error {0}")]
    Other(String),
}

/// Result of a statement that modifies the table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionOutcome {
    /// Row id assigned by the last insert on the connection
    pub generated_id: BookId,
    pub rows_affected: u64,
}

/// Sole owner of the `books` table. Every statement is executed once and on its own.
#[async_trait::async_trait]
pub trait BooksGateway: Send + Sync {
    /// Runs an insert, update or delete
    async fn execute(&self, statement: &Statement) -> Result<ExecutionOutcome, GatewayError>;
    /// Returns the first row of the result, if any
    async fn fetch_one(&self, statement: &Statement) -> Result<Option<Book>, GatewayError>;
    /// Returns all rows in the order produced by the query
    async fn fetch_many(&self, statement: &Statement) -> Result<Vec<Book>, GatewayError>;
    /// Closes the underlying connection, further calls fail
    async fn close(&self);
}
