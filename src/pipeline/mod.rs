//! Pipeline entry points.
//!
//! - `run_pipeline`: crawl every enabled platform, dedup, enrich and sort
//! - `dedup_problems` / `sort_problems`: the pure merge and ordering steps

pub mod aggregate;
pub mod dedup;
pub mod sort;

pub use aggregate::{
    AggregationOutcome, AggregationPipeline, PlatformReport, RunReport, run_pipeline,
};
pub use dedup::dedup_problems;
pub use sort::{PlatformPriority, sort_problems};
