//! Domain types for barcast.

pub mod bar;
pub mod series;

pub use bar::Bar;
pub use series::{BarSeries, StoreRecord};

/// Opaque instrument identifier as carried on the wire.
pub type InstrumentId = i64;
