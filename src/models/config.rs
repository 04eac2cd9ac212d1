//! Application configuration structures.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::Platform;
use crate::storage::ExportFormat;

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// HTTP client and retry settings
    #[serde(default)]
    pub http: HttpConfig,

    /// Per-platform crawler settings
    #[serde(default)]
    pub platforms: PlatformsConfig,

    /// Crawl ordering
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Rating aggregator settings
    #[serde(default)]
    pub clist: ClistConfig,

    /// Sort tiebreak settings
    #[serde(default)]
    pub sort: SortConfig,

    /// Export targets
    #[serde(default)]
    pub export: ExportConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.http.user_agent.trim().is_empty() {
            return Err(AppError::validation("http.user_agent is empty"));
        }
        if self.http.timeout_secs == 0 {
            return Err(AppError::validation("http.timeout_secs must be > 0"));
        }
        if self.http.max_attempts == 0 {
            return Err(AppError::validation("http.max_attempts must be > 0"));
        }
        if self.platforms.atcoder.history_days == 0 {
            return Err(AppError::validation(
                "platforms.atcoder.history_days must be > 0",
            ));
        }
        if self.platforms.leetcode.submission_limit == 0 {
            return Err(AppError::validation(
                "platforms.leetcode.submission_limit must be > 0",
            ));
        }
        for name in &self.pipeline.order {
            name.parse::<Platform>()?;
        }
        for format in &self.export.formats {
            format.parse::<ExportFormat>()?;
        }
        Ok(())
    }

    /// Enabled platforms in configured crawl order, without repeats.
    pub fn enabled_platforms(&self) -> Vec<Platform> {
        let mut platforms = Vec::new();
        for name in &self.pipeline.order {
            match name.parse::<Platform>() {
                Ok(platform) if self.platforms.is_enabled(platform) => {
                    if !platforms.contains(&platform) {
                        platforms.push(platform);
                    }
                }
                Ok(_) => {}
                Err(e) => log::warn!("Ignoring pipeline.order entry: {}", e),
            }
        }
        platforms
    }
}

/// HTTP client and retry behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Per-call timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Total tries per request, the first one included
    #[serde(default = "defaults::max_attempts")]
    pub max_attempts: u32,

    /// First wait after HTTP 429; doubles on each further 429
    #[serde(default = "defaults::rate_limit_base_delay")]
    pub rate_limit_base_delay_ms: u64,

    /// Wait unit after a transient failure; multiplied by the attempt number
    #[serde(default = "defaults::transient_base_delay")]
    pub transient_base_delay_ms: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
            max_attempts: defaults::max_attempts(),
            rate_limit_base_delay_ms: defaults::rate_limit_base_delay(),
            transient_base_delay_ms: defaults::transient_base_delay(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlatformsConfig {
    #[serde(default)]
    pub codeforces: CodeforcesConfig,

    #[serde(default)]
    pub atcoder: AtCoderConfig,

    #[serde(default)]
    pub leetcode: LeetCodeConfig,
}

impl PlatformsConfig {
    pub fn is_enabled(&self, platform: Platform) -> bool {
        match platform {
            Platform::Codeforces => self.codeforces.enabled,
            Platform::AtCoder => self.atcoder.enabled,
            Platform::LeetCode => self.leetcode.enabled,
        }
    }
}

/// Where Codeforces contests for unattempted detection come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContestSource {
    /// Contests the user has at least one submission in
    #[default]
    Submissions,
    /// Rated contests from the user's rating history
    RatingHistory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeforcesConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default)]
    pub handle: String,

    /// Keep gym contests
    #[serde(default = "defaults::yes")]
    pub include_gym: bool,

    /// Contest ids at or above this value are gym contests
    #[serde(default = "defaults::gym_min_contest_id")]
    pub gym_min_contest_id: u64,

    /// Also report untouched problems of participated contests
    #[serde(default)]
    pub include_unattempted: bool,

    #[serde(default)]
    pub contest_source: ContestSource,

    /// Submissions requested from `user.status`
    #[serde(default = "defaults::cf_submission_count")]
    pub submission_count: u32,

    #[serde(default = "defaults::cf_api_base")]
    pub api_base: String,
}

impl Default for CodeforcesConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            handle: String::new(),
            include_gym: true,
            gym_min_contest_id: defaults::gym_min_contest_id(),
            include_unattempted: false,
            contest_source: ContestSource::default(),
            submission_count: defaults::cf_submission_count(),
            api_base: defaults::cf_api_base(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AtCoderConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default)]
    pub handle: String,

    /// Drop practice contests
    #[serde(default = "defaults::yes")]
    pub contest_only: bool,

    /// Case-insensitive substrings marking a practice contest id
    #[serde(default = "defaults::practice_markers")]
    pub practice_markers: Vec<String>,

    #[serde(default)]
    pub include_unattempted: bool,

    /// Submission history window in days
    #[serde(default = "defaults::history_days")]
    pub history_days: u32,

    #[serde(default = "defaults::at_api_base")]
    pub api_base: String,

    #[serde(default = "defaults::at_problems_url")]
    pub problems_url: String,
}

impl Default for AtCoderConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            handle: String::new(),
            contest_only: true,
            practice_markers: defaults::practice_markers(),
            include_unattempted: false,
            history_days: defaults::history_days(),
            api_base: defaults::at_api_base(),
            problems_url: defaults::at_problems_url(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeetCodeConfig {
    #[serde(default)]
    pub enabled: bool,

    /// Browser session cookies (`LEETCODE_SESSION`, `csrftoken`, ...)
    #[serde(default)]
    pub cookies: BTreeMap<String, String>,

    /// Recent submissions requested per crawl
    #[serde(default = "defaults::lc_submission_limit")]
    pub submission_limit: u32,

    #[serde(default = "defaults::lc_graphql_url")]
    pub graphql_url: String,
}

impl Default for LeetCodeConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            cookies: BTreeMap::new(),
            submission_limit: defaults::lc_submission_limit(),
            graphql_url: defaults::lc_graphql_url(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Platform crawl order; also the dedup precedence
    #[serde(default = "defaults::platform_order")]
    pub order: Vec<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            order: defaults::platform_order(),
        }
    }
}

/// clist.by aggregator settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClistConfig {
    #[serde(default = "defaults::yes")]
    pub enabled: bool,

    /// `user:key` pair; requests go unauthenticated without it
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "defaults::clist_api_base")]
    pub api_base: String,

    /// Pause between consecutive network lookups
    #[serde(default = "defaults::clist_request_delay")]
    pub request_delay_ms: u64,

    /// Platform name to clist resource
    #[serde(default = "defaults::clist_resources")]
    pub resources: BTreeMap<String, String>,
}

impl Default for ClistConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            api_key: None,
            api_base: defaults::clist_api_base(),
            request_delay_ms: defaults::clist_request_delay(),
            resources: defaults::clist_resources(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SortConfig {
    /// Lower sorts first among equal ratings
    #[serde(default = "defaults::platform_priority")]
    pub platform_priority: BTreeMap<String, u32>,
}

impl Default for SortConfig {
    fn default() -> Self {
        Self {
            platform_priority: defaults::platform_priority(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    #[serde(default = "defaults::output_dir")]
    pub output_dir: String,

    #[serde(default = "defaults::formats")]
    pub formats: Vec<String>,

    #[serde(default = "defaults::json_file")]
    pub json_file: String,

    #[serde(default = "defaults::csv_file")]
    pub csv_file: String,

    #[serde(default = "defaults::markdown_file")]
    pub markdown_file: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            output_dir: defaults::output_dir(),
            formats: defaults::formats(),
            json_file: defaults::json_file(),
            csv_file: defaults::csv_file(),
            markdown_file: defaults::markdown_file(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "defaults::log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::log_level(),
        }
    }
}

mod defaults {
    use std::collections::BTreeMap;

    pub fn yes() -> bool {
        true
    }

    // HTTP defaults
    pub fn user_agent() -> String {
        "Mozilla/5.0 (compatible; upsolve/0.1)".into()
    }
    pub fn timeout() -> u64 {
        15
    }
    pub fn max_attempts() -> u32 {
        3
    }
    pub fn rate_limit_base_delay() -> u64 {
        15_000
    }
    pub fn transient_base_delay() -> u64 {
        2_000
    }

    // Codeforces defaults
    pub fn gym_min_contest_id() -> u64 {
        100_000
    }
    pub fn cf_submission_count() -> u32 {
        10_000
    }
    pub fn cf_api_base() -> String {
        "https://codeforces.com/api".into()
    }

    // AtCoder defaults
    pub fn practice_markers() -> Vec<String> {
        vec!["practice".into()]
    }
    pub fn history_days() -> u32 {
        730
    }
    pub fn at_api_base() -> String {
        "https://kenkoooo.com/atcoder/atcoder-api/v3".into()
    }
    pub fn at_problems_url() -> String {
        "https://kenkoooo.com/atcoder/resources/problems.json".into()
    }

    // LeetCode defaults
    pub fn lc_submission_limit() -> u32 {
        50
    }
    pub fn lc_graphql_url() -> String {
        "https://leetcode.com/graphql".into()
    }

    pub fn platform_order() -> Vec<String> {
        vec!["codeforces".into(), "atcoder".into(), "leetcode".into()]
    }

    // clist defaults
    pub fn clist_api_base() -> String {
        "https://clist.by/api/v4".into()
    }
    pub fn clist_request_delay() -> u64 {
        800
    }
    pub fn clist_resources() -> BTreeMap<String, String> {
        BTreeMap::from([
            ("codeforces".into(), "codeforces.com".into()),
            ("atcoder".into(), "atcoder.jp".into()),
            ("leetcode".into(), "leetcode.com".into()),
        ])
    }

    pub fn platform_priority() -> BTreeMap<String, u32> {
        BTreeMap::from([
            ("codeforces".into(), 1),
            ("atcoder".into(), 2),
            ("leetcode".into(), 3),
        ])
    }

    // Export defaults
    pub fn output_dir() -> String {
        "output".into()
    }
    pub fn formats() -> Vec<String> {
        vec!["json".into(), "csv".into(), "markdown".into()]
    }
    pub fn json_file() -> String {
        "problems.json".into()
    }
    pub fn csv_file() -> String {
        "problems.csv".into()
    }
    pub fn markdown_file() -> String {
        "README.md".into()
    }

    pub fn log_level() -> String {
        "info".into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_default_config_ok() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn validate_rejects_empty_user_agent() {
        let mut config = Config::default();
        config.http.user_agent = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_attempts() {
        let mut config = Config::default();
        config.http.max_attempts = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_unknown_format() {
        let mut config = Config::default();
        config.export.formats.push("xlsx".into());
        assert!(config.validate().is_err());
    }

    #[test]
    fn enabled_platforms_follow_configured_order() {
        let mut config = Config::default();
        config.platforms.codeforces.enabled = true;
        config.platforms.leetcode.enabled = true;
        config.pipeline.order = vec!["leetcode".into(), "atcoder".into(), "codeforces".into()];
        assert_eq!(
            config.enabled_platforms(),
            vec![Platform::LeetCode, Platform::Codeforces]
        );
    }

    #[test]
    fn parses_partial_toml_with_defaults() {
        let config: Config = toml::from_str(
            r#"
            [platforms.codeforces]
            enabled = true
            handle = "tourist"
            include_gym = false
            contest_source = "rating_history"

            [platforms.leetcode]
            enabled = true
            cookies = { LEETCODE_SESSION = "abc", csrftoken = "xyz" }

            [sort.platform_priority]
            leetcode = 0
            "#,
        )
        .unwrap();

        assert_eq!(config.platforms.codeforces.handle, "tourist");
        assert!(!config.platforms.codeforces.include_gym);
        assert_eq!(
            config.platforms.codeforces.contest_source,
            ContestSource::RatingHistory
        );
        assert_eq!(config.platforms.codeforces.gym_min_contest_id, 100_000);
        assert_eq!(config.platforms.leetcode.cookies.len(), 2);
        assert_eq!(config.sort.platform_priority.get("leetcode"), Some(&0));
        assert_eq!(config.http.max_attempts, 3);
        assert!(config.clist.enabled);
    }
}
