pub mod memory;
pub mod models;
pub mod postgres;
pub mod query;
pub mod repository;
pub mod store;

pub use memory::MemoryBookStore;
pub use models::{Book, BookPayload, NewBook};
pub use postgres::PgBookStore;
pub use query::{BookQuery, OwnerFilter, SqlResult};
pub use repository::{BookRepository, RepositoryError};
pub use store::{BookStore, BookStream, StoreError};
