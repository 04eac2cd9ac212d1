//! Export of the final problem list.
//!
//! ## Output Layout
//!
//! ```text
//! {output_dir}/
//! ├── problems.json   # Sorted problems, one object each
//! ├── problems.csv    # Same columns as the JSON objects
//! └── README.md       # Markdown table of the same list
//! ```

pub mod local;

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::{AppError, Result};
use crate::models::Problem;

// Re-export for convenience
pub use local::LocalExporter;

/// Output format of an export target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Csv,
    Markdown,
}

impl std::str::FromStr for ExportFormat {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "csv" => Ok(Self::Csv),
            "markdown" | "md" => Ok(Self::Markdown),
            other => Err(AppError::validation(format!(
                "Unsupported export format '{other}'"
            ))),
        }
    }
}

/// Metadata about an export operation.
#[derive(Debug, Clone)]
pub struct ExportSummary {
    pub problem_count: usize,
    /// Files written, in format order
    pub files: Vec<PathBuf>,
    pub timestamp: DateTime<Utc>,
}

/// Trait for export backends.
#[async_trait]
pub trait ProblemExporter: Send + Sync {
    /// Write the already-sorted problems in every configured format.
    async fn export(&self, problems: &[Problem]) -> Result<ExportSummary>;
}
