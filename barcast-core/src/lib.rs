//! Barcast Core — condition evaluation over daily bar series.
//!
//! This crate contains the evaluation heart of the system:
//! - Domain types (bars, bar series)
//! - The `Indicator` capability trait with per-index memoization
//! - The indicator registry (name → constructor) and the per-pass cache
//! - Condition model and the per-bar condition evaluator
//! - The ordered result record (wire-format field ordering)
//! - Request model and request fingerprinting
//!
//! It performs no I/O: stores, session caches, and drivers live in
//! `barcast-engine`.

pub mod conditions;
pub mod domain;
pub mod fingerprint;
pub mod indicators;
pub mod record;
pub mod request;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    /// Compile-time check: everything shared across driver tasks is Send + Sync.
    ///
    /// The parallel driver hands `Arc<BarSeries>` and `Arc<dyn Indicator>` to
    /// rayon tasks; if any of these types loses Send/Sync the build breaks here
    /// instead of deep inside the engine crate.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        require_send::<domain::Bar>();
        require_sync::<domain::Bar>();
        require_send::<Arc<domain::BarSeries>>();
        require_sync::<Arc<domain::BarSeries>>();
        require_send::<Arc<dyn indicators::Indicator>>();
        require_sync::<Arc<dyn indicators::Indicator>>();

        require_send::<conditions::Condition>();
        require_sync::<conditions::Condition>();
        require_send::<request::EvalRequest>();
        require_sync::<request::EvalRequest>();
        require_send::<record::ResultRecord>();
        require_sync::<record::ResultRecord>();
        require_send::<record::InstrumentResult>();
        require_sync::<record::InstrumentResult>();
        require_send::<fingerprint::Fingerprint>();
        require_sync::<fingerprint::Fingerprint>();
    }
}
