//! Commentary processing: classification, deduplication, quality filtering
//! and dataset statistics.

pub mod classify;
pub mod dedup;
pub mod metrics;
pub mod quality;

pub use classify::classify;
pub use dedup::deduplicate;
pub use metrics::QualityMetrics;
pub use quality::{QualityFilter, Rejection};
