//! Per-security registry of market order books.

use super::book::MarketOrderBook;
use super::spread_table::SpreadTable;
use rustc_hash::FxHashMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Owns one [`MarketOrderBook`] per security, keyed by `sec_sid`.
///
/// Books are created on demand with the manager's depth and default spread
/// table; securities quoted in another table can be registered with
/// [`add_book_with_table`](Self::add_book_with_table). Like the books it owns,
/// the manager is driven by the single thread applying decoded updates.
#[derive(Debug)]
pub struct BookManager {
    books: FxHashMap<u64, MarketOrderBook>,
    book_depth: usize,
    spread_table: Arc<SpreadTable>,
}

impl BookManager {
    /// Creates an empty manager.
    #[must_use]
    pub fn new(book_depth: usize, spread_table: Arc<SpreadTable>) -> Self {
        Self {
            books: FxHashMap::default(),
            book_depth,
            spread_table,
        }
    }

    /// Returns the book for `sec_sid`, creating it if needed.
    pub fn add_book(&mut self, sec_sid: u64) -> &mut MarketOrderBook {
        let table = Arc::clone(&self.spread_table);
        self.add_book_with_table(sec_sid, table)
    }

    /// Returns the book for `sec_sid`, creating it on `spread_table` if needed.
    ///
    /// An existing book keeps the table it was created with.
    pub fn add_book_with_table(
        &mut self,
        sec_sid: u64,
        spread_table: Arc<SpreadTable>,
    ) -> &mut MarketOrderBook {
        let book_depth = self.book_depth;
        self.books.entry(sec_sid).or_insert_with(|| {
            info!(sec_sid, book_depth, spread_table = spread_table.name(), "book added");
            MarketOrderBook::new(sec_sid, book_depth, spread_table)
        })
    }

    /// The book for `sec_sid`, if registered.
    #[must_use]
    pub fn get_book(&self, sec_sid: u64) -> Option<&MarketOrderBook> {
        self.books.get(&sec_sid)
    }

    /// Mutable book for `sec_sid`, if registered.
    pub fn get_book_mut(&mut self, sec_sid: u64) -> Option<&mut MarketOrderBook> {
        self.books.get_mut(&sec_sid)
    }

    /// Unregisters and returns the book for `sec_sid`.
    pub fn remove_book(&mut self, sec_sid: u64) -> Option<MarketOrderBook> {
        let removed = self.books.remove(&sec_sid);
        if removed.is_some() {
            debug!(sec_sid, "book removed");
        }
        removed
    }

    /// Whether a book exists for `sec_sid`.
    #[must_use]
    pub fn has_book(&self, sec_sid: u64) -> bool {
        self.books.contains_key(&sec_sid)
    }

    /// Number of registered books.
    #[must_use]
    pub fn book_count(&self) -> usize {
        self.books.len()
    }

    /// Registered security ids, ascending.
    #[must_use]
    pub fn sec_sids(&self) -> Vec<u64> {
        let mut sec_sids: Vec<u64> = self.books.keys().copied().collect();
        sec_sids.sort_unstable();
        sec_sids
    }

    /// Empties every book, e.g. before applying a full recovery snapshot.
    pub fn clear_all(&mut self) {
        for book in self.books.values_mut() {
            book.clear();
        }
        debug!(books = self.books.len(), "all books cleared");
    }

    /// Configured depth of new books.
    #[must_use]
    pub fn book_depth(&self) -> usize {
        self.book_depth
    }
}
