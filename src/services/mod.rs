//! Service layer for the aggregator.
//!
//! This module contains the business logic for:
//! - Judge crawlers (`CodeforcesCrawler`, `AtCoderCrawler`, `LeetCodeCrawler`)
//!   behind the closed `PlatformCrawler` enum
//! - Rating enrichment (`ClistClient`) and its run-scoped `RatingCache`

mod atcoder;
pub mod cache;
pub mod clist;
mod codeforces;
pub mod crawler;
mod leetcode;

pub use atcoder::AtCoderCrawler;
pub use cache::{CacheEntry, RatingCache};
pub use clist::{ClistClient, EnrichmentStats, LookupSource};
pub use codeforces::CodeforcesCrawler;
pub use crawler::PlatformCrawler;
pub use leetcode::LeetCodeCrawler;
