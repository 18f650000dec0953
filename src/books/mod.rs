//! Order book subsystem (spec.md §4.3): one independent book per
//! `book_id`, each with its own lock, grounded on the teacher's
//! `services::matching::orderbook::Orderbook` and the per-key sharding
//! the teacher also uses for its order index.

pub mod book;
pub mod price_level;

pub use book::{Book, BookSnapshot, RestingOrder, SnapshotLevel};
pub use price_level::PriceLevel;

use dashmap::DashMap;
use std::sync::Arc;

use crate::error::BookError;

/// Registry of all books, keyed by `book_id`. A book is created lazily on
/// first reference — freight-leg books and ownership books are opened on
/// demand by the scheduler (spec.md §4.6), not pre-declared.
#[derive(Default)]
pub struct BookRegistry {
    books: DashMap<String, Arc<Book>>,
}

impl BookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_create(&self, book_id: &str) -> Arc<Book> {
        self.books
            .entry(book_id.to_string())
            .or_insert_with(|| Arc::new(Book::new(book_id)))
            .clone()
    }

    pub fn get(&self, book_id: &str) -> Result<Arc<Book>, BookError> {
        self.books
            .get(book_id)
            .map(|r| r.clone())
            .ok_or_else(|| BookError::UnknownBook(book_id.to_string()))
    }

    pub fn book_ids(&self) -> Vec<String> {
        self.books.iter().map(|r| r.key().clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_or_create_returns_the_same_book_on_repeat_lookup() {
        let registry = BookRegistry::new();
        let a = registry.get_or_create("L1_C1");
        let b = registry.get_or_create("L1_C1");
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn get_fails_for_unknown_book() {
        let registry = BookRegistry::new();
        assert!(registry.get("nope").is_err());
    }
}
