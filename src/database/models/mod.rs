pub mod book;

pub use book::{Book, BookPayload, NewBook};
