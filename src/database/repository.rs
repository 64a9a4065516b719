use std::sync::Arc;

use thiserror::Error;

use super::models::{Book, NewBook};
use super::query::BookQuery;
use super::store::{BookStore, BookStream, StoreError};
use crate::audit::CreationAuditor;
use crate::auth::{AuthError, IdentityResolver};

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Book access with row scoping on reads and owner stamping on create
#[derive(Clone)]
pub struct BookRepository {
    store: Arc<dyn BookStore>,
    auditor: CreationAuditor,
}

impl BookRepository {
    pub fn new(store: Arc<dyn BookStore>, auditor: CreationAuditor) -> Self {
        Self { store, auditor }
    }

    pub fn store(&self) -> &Arc<dyn BookStore> {
        &self.store
    }

    /// Books owned by the caller. The name is resolved before the query is
    /// built; with no caller the call fails instead of returning a set.
    pub async fn find_owned_by_current_principal<R>(&self, resolver: &R) -> Result<BookStream, RepositoryError>
    where
        R: IdentityResolver + ?Sized,
    {
        let name = resolver.require_principal_name().await?;
        tracing::debug!("Listing books owned by '{}'", name);
        Ok(self.run(BookQuery::owned_by(Some(name))))
    }

    /// Books owned by an explicit value. Not a security boundary: the caller
    /// picks whose books to read. `None` matches only books without an owner.
    pub async fn find_owned_by(&self, owner: Option<String>) -> Result<BookStream, RepositoryError> {
        tracing::debug!("Listing books for explicit owner {:?}", owner);
        Ok(self.run(BookQuery::owned_by(owner)))
    }

    /// Stamp the owner through the creation auditor, then persist
    pub async fn save<R>(&self, book: NewBook, resolver: &R) -> Result<Book, RepositoryError>
    where
        R: IdentityResolver + ?Sized,
    {
        let book = self.auditor.on_before_insert(book, resolver).await?;
        let saved = self.store.insert(book).await?;
        tracing::info!("Created book {} for owner {:?}", saved.id, saved.owner);
        Ok(saved)
    }

    fn run(&self, query: BookQuery) -> BookStream {
        self.store.find(&query)
    }
}
