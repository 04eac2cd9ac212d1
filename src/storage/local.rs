//! Local filesystem exporter.
//!
//! Every file is written atomically: the content goes to a `.tmp` sibling
//! which is then renamed over the target.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{Local, Utc};
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};
use crate::models::{ExportConfig, Problem};
use crate::storage::{ExportFormat, ExportSummary, ProblemExporter};

/// Exporter writing JSON, CSV and Markdown files under one directory.
#[derive(Debug, Clone)]
pub struct LocalExporter {
    root_dir: PathBuf,
    targets: Vec<(ExportFormat, String)>,
}

impl LocalExporter {
    /// Create an exporter rooted at the given directory.
    pub fn new(root_dir: impl Into<PathBuf>, targets: Vec<(ExportFormat, String)>) -> Self {
        Self {
            root_dir: root_dir.into(),
            targets,
        }
    }

    /// Exporter for the `[export]` section; unknown formats are rejected.
    pub fn from_config(config: &ExportConfig) -> Result<Self> {
        let mut targets = Vec::new();
        for name in &config.formats {
            let format: ExportFormat = name.parse()?;
            let file = match format {
                ExportFormat::Json => config.json_file.clone(),
                ExportFormat::Csv => config.csv_file.clone(),
                ExportFormat::Markdown => config.markdown_file.clone(),
            };
            if !targets.iter().any(|(f, _)| *f == format) {
                targets.push((format, file));
            }
        }
        Ok(Self::new(&config.output_dir, targets))
    }

    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    /// Get the full path for a relative key.
    fn path(&self, key: &str) -> PathBuf {
        self.root_dir.join(key)
    }

    /// Write bytes atomically (write to temp, then rename).
    async fn write_bytes(&self, key: &str, bytes: &[u8]) -> Result<PathBuf> {
        let path = self.path(key);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let tmp = path.with_extension("tmp");
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        drop(file);

        tokio::fs::rename(&tmp, &path).await?;
        Ok(path)
    }
}

/// Pretty JSON array of the problems.
pub fn render_json(problems: &[Problem]) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec_pretty(problems)?)
}

/// Header row of the CSV export, matching the JSON field names.
pub const CSV_COLUMNS: [&str; 7] = [
    "platform",
    "problem_id",
    "contest_id",
    "problem_index",
    "title",
    "url",
    "clist_rating",
];

/// UTF-8 byte order mark so spreadsheet tools pick the right encoding.
const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// CSV table of the problems; unset titles and ratings are empty cells.
pub fn render_csv(problems: &[Problem]) -> Result<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(UTF8_BOM.to_vec());
    writer.write_record(CSV_COLUMNS)?;
    for problem in problems {
        writer.serialize(problem)?;
    }
    writer
        .into_inner()
        .map_err(|e| AppError::from(e.into_error()))
}

fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|").replace('\n', " ")
}

/// Markdown table of the problems with a generation header.
pub fn render_markdown(problems: &[Problem]) -> String {
    let mut lines = vec![
        "# Unsolved Problems".to_string(),
        String::new(),
        format!(
            "**Generated**: {}",
            Local::now().format("%Y-%m-%d %H:%M:%S")
        ),
        String::new(),
        format!("**Problems**: {}", problems.len()),
        String::new(),
        "| # | Platform | Problem | Rating | Link |".to_string(),
        "|---|----------|---------|--------|------|".to_string(),
    ];

    for (i, problem) in problems.iter().enumerate() {
        let rating = problem
            .rating
            .map(|r| r.to_string())
            .unwrap_or_else(|| "N/A".to_string());
        lines.push(format!(
            "| {} | {} | {} | {} | [{}]({}) |",
            i + 1,
            problem.platform,
            problem.problem_id(),
            rating,
            escape_cell(problem.label()),
            problem.url
        ));
    }

    lines.push(String::new());
    lines.join("\n")
}

#[async_trait]
impl ProblemExporter for LocalExporter {
    async fn export(&self, problems: &[Problem]) -> Result<ExportSummary> {
        let mut files = Vec::new();
        for (format, file) in &self.targets {
            let bytes = match format {
                ExportFormat::Json => render_json(problems)?,
                ExportFormat::Csv => render_csv(problems)?,
                ExportFormat::Markdown => render_markdown(problems).into_bytes(),
            };
            let path = self.write_bytes(file, &bytes).await?;
            log::info!("Exported {} problems to {}", problems.len(), path.display());
            files.push(path);
        }

        Ok(ExportSummary {
            problem_count: problems.len(),
            files,
            timestamp: Utc::now(),
        })
    }
}
