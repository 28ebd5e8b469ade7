//! Time-series store contract.
//!
//! A store hands back raw per-instrument history rows; the consumer turns
//! NULL numeric fields into 0 / 0.0 when building bars (`StoreRecord`
//! substitution lives in `barcast-core`). Two implementations ship here:
//! an in-memory store for tests and fixtures, and a Parquet-backed store
//! for real data.

pub mod memory;
pub mod parquet;

use chrono::NaiveDate;
use thiserror::Error;

use barcast_core::domain::{InstrumentId, StoreRecord};

pub use memory::MemoryStore;
pub use parquet::ParquetStore;

/// One page of store rows plus the pagination cursor state.
#[derive(Debug, Clone, PartialEq)]
pub struct StorePage {
    pub records: Vec<StoreRecord>,
    pub is_last: bool,
}

/// Structured error types for store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("instrument {0} not found")]
    NotFound(InstrumentId),

    #[error("store I/O error: {0}")]
    Io(String),

    #[error("parquet I/O error: {0}")]
    Parquet(String),

    #[error("csv import error: {0}")]
    Csv(String),

    #[error("corrupt data for instrument {id}: {reason}")]
    Corrupt { id: InstrumentId, reason: String },
}

/// Read side of a daily-bar store.
///
/// Rows come back ordered by date ascending. `load_page` returns rows dated
/// on or after `start`, in fixed-size pages; the driver keeps asking for the
/// next page until `is_last`.
pub trait BarStore: Send + Sync {
    /// Whether the store has any history for this instrument.
    fn exists(&self, id: InstrumentId) -> bool;

    /// Full history for one instrument, oldest first.
    fn load_full_history(&self, id: InstrumentId) -> Result<Vec<StoreRecord>, StoreError>;

    /// Page `page` (0-based) of rows dated on or after `start`.
    fn load_page(
        &self,
        id: InstrumentId,
        start: NaiveDate,
        page: usize,
        page_size: usize,
    ) -> Result<StorePage, StoreError>;
}

/// Shared pagination arithmetic over an already-filtered, ordered row slice.
pub(crate) fn slice_page(rows: &[StoreRecord], page: usize, page_size: usize) -> StorePage {
    let from = page.saturating_mul(page_size).min(rows.len());
    let to = from.saturating_add(page_size).min(rows.len());
    StorePage {
        records: rows[from..to].to_vec(),
        is_last: to == rows.len(),
    }
}
