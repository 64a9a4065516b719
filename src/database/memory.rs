use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use tokio::sync::RwLock;

use super::models::{Book, NewBook};
use super::query::BookQuery;
use super::store::{BookStore, BookStream, StoreError};

#[derive(Debug, Default)]
struct Inner {
    next_id: i64,
    books: BTreeMap<i64, Book>,
}

/// Process-local store used when no database is configured and in tests
#[derive(Debug, Default)]
pub struct MemoryBookStore {
    inner: Arc<RwLock<Inner>>,
}

impl MemoryBookStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.books.len()
    }
}

#[async_trait]
impl BookStore for MemoryBookStore {
    fn kind(&self) -> &'static str {
        "memory"
    }

    async fn insert(&self, book: NewBook) -> Result<Book, StoreError> {
        let mut inner = self.inner.write().await;
        inner.next_id += 1;
        let book = book.into_book(inner.next_id);
        inner.books.insert(book.id, book.clone());
        Ok(book)
    }

    fn find(&self, query: &BookQuery) -> BookStream {
        let inner = Arc::clone(&self.inner);
        let query = query.clone();

        // One read under the lock, taken on first poll
        stream::once(async move {
            let inner = inner.read().await;
            // BTreeMap iteration keeps id order
            inner
                .books
                .values()
                .filter(|book| query.matches(book))
                .cloned()
                .collect::<Vec<_>>()
        })
        .flat_map(|books| stream::iter(books.into_iter().map(Ok)))
        .boxed()
    }
}
