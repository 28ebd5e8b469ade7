//! Engine error taxonomy.
//!
//! Callers get typed failure reasons; the transport layer above this crate
//! decides how much of that to expose. Unknown indicator names are NOT an
//! error (the registry substitutes close price), and out-of-range indices
//! surface as NaN values, not errors.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use barcast_core::domain::InstrumentId;

use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid {field} date '{value}': expected YYYY-MM-DD")]
    InvalidDate { field: &'static str, value: String },

    #[error("unknown instrument {0}")]
    UnknownInstrument(InstrumentId),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("cache file {path}: {source}")]
    CacheIo { path: PathBuf, source: io::Error },

    #[error("stream I/O: {0}")]
    Io(#[from] io::Error),

    #[error("serialize response: {0}")]
    Serialize(#[from] serde_json::Error),
}
