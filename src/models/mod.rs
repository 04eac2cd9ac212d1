// src/models/mod.rs

//! Domain models for the upsolve application.
//!
//! This module contains all data structures shared between crawlers,
//! the rating client and the pipeline.

mod config;
mod problem;

// Re-export all public types
pub use config::{
    AtCoderConfig, ClistConfig, CodeforcesConfig, Config, ContestSource, ExportConfig,
    HttpConfig, LeetCodeConfig, LoggingConfig, PipelineConfig, PlatformsConfig, SortConfig,
};
pub use problem::{Platform, Problem};
