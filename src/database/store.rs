use async_trait::async_trait;
use futures::stream::BoxStream;
use thiserror::Error;

use super::models::{Book, NewBook};
use super::query::BookQuery;

/// Errors raised by a book store backend
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Missing configuration: {0}")]
    ConfigMissing(&'static str),

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Query error: {0}")]
    QueryError(String),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

/// Single-pass sequence of books from one read
pub type BookStream = BoxStream<'static, Result<Book, StoreError>>;

/// Persistence backend for books.
///
/// Implementations handle single-row inserts and filtered reads atomically;
/// callers add no locking of their own.
#[async_trait]
pub trait BookStore: Send + Sync {
    /// Short backend name for logs and the health endpoint
    fn kind(&self) -> &'static str;

    /// Persist a book and return it with its assigned id
    async fn insert(&self, book: NewBook) -> Result<Book, StoreError>;

    /// Books matching the query, ordered by id. Nothing is read until the
    /// stream is first polled; dropping it stops the read.
    fn find(&self, query: &BookQuery) -> BookStream;

    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
