//! Barcast Engine — execution layer over the evaluation core.
//!
//! Owns everything with I/O or shared state:
//! - The time-series store contract and its memory/Parquet implementations
//! - The cross-request session cache (series + indicator instances)
//! - The bounded in-memory response cache and the on-disk stream replay cache
//! - The execution driver: batch (sequential/parallel) and streaming
//!   (sequential, cached, parallel) modes
//! - Engine configuration and the typed error taxonomy

pub mod config;
pub mod driver;
pub mod error;
pub mod response_cache;
pub mod session;
pub mod store;
pub mod stream_cache;

pub use config::EngineConfig;
pub use driver::Engine;
pub use error::EngineError;
