//! Problem and platform data structures.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// A supported online judge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Codeforces,
    AtCoder,
    LeetCode,
}

impl Platform {
    /// Every platform in default enable order.
    pub const ALL: [Platform; 3] = [Platform::Codeforces, Platform::AtCoder, Platform::LeetCode];

    /// Lowercase name used in configuration tables and exports.
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Codeforces => "codeforces",
            Platform::AtCoder => "atcoder",
            Platform::LeetCode => "leetcode",
        }
    }

    /// Prefix of the derived problem identity.
    fn id_prefix(&self) -> &'static str {
        match self {
            Platform::Codeforces => "CF",
            Platform::AtCoder => "AT",
            Platform::LeetCode => "LC",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "codeforces" | "cf" => Ok(Platform::Codeforces),
            "atcoder" | "at" => Ok(Platform::AtCoder),
            "leetcode" | "lc" => Ok(Platform::LeetCode),
            other => Err(AppError::validation(format!("Unknown platform '{other}'"))),
        }
    }
}

/// A normalized judge problem.
///
/// Two problems with the same [`Problem::problem_id`] are the same real-world
/// problem, whatever their title or url.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Problem {
    pub platform: Platform,

    problem_id: String,

    /// Contest identifier (title slug on LeetCode)
    pub contest_id: String,

    /// Letter code on Codeforces, full task id on AtCoder, empty on LeetCode
    pub problem_index: String,

    pub title: Option<String>,

    pub url: String,

    /// Difficulty from the rating aggregator, set during enrichment
    #[serde(rename = "clist_rating")]
    pub rating: Option<i32>,
}

impl Problem {
    /// Create a problem with its url derived from the identity.
    pub fn new(
        platform: Platform,
        contest_id: impl Into<String>,
        problem_index: impl Into<String>,
        title: Option<String>,
    ) -> Self {
        let contest_id = contest_id.into();
        let problem_index = problem_index.into();
        let url = Self::derive_url(platform, &contest_id, &problem_index);
        Self::with_url(platform, contest_id, problem_index, title, url)
    }

    /// Create a problem with an explicit url.
    pub fn with_url(
        platform: Platform,
        contest_id: impl Into<String>,
        problem_index: impl Into<String>,
        title: Option<String>,
        url: impl Into<String>,
    ) -> Self {
        let contest_id = contest_id.into();
        let problem_index = problem_index.into();
        let title = title.filter(|t| !t.trim().is_empty());
        let problem_id = Self::derive_id(platform, &contest_id, &problem_index);
        Self {
            platform,
            problem_id,
            contest_id,
            problem_index,
            title,
            url: url.into(),
            rating: None,
        }
    }

    /// Stable identity of the problem across the run.
    pub fn problem_id(&self) -> &str {
        &self.problem_id
    }

    /// Compute the identity from platform, contest and index.
    pub fn derive_id(platform: Platform, contest_id: &str, problem_index: &str) -> String {
        let prefix = platform.id_prefix();
        match platform {
            Platform::Codeforces => format!("{prefix}-{contest_id}-{problem_index}"),
            Platform::AtCoder => format!("{prefix}-{contest_id}-{}", problem_index.to_lowercase()),
            Platform::LeetCode => format!("{prefix}-{contest_id}"),
        }
    }

    /// Canonical problem page for the platform.
    pub fn derive_url(platform: Platform, contest_id: &str, problem_index: &str) -> String {
        match platform {
            Platform::Codeforces => {
                format!("https://codeforces.com/contest/{contest_id}/problem/{problem_index}")
            }
            Platform::AtCoder => {
                format!("https://atcoder.jp/contests/{contest_id}/tasks/{problem_index}")
            }
            Platform::LeetCode => format!("https://leetcode.com/problems/{contest_id}/"),
        }
    }

    /// Human-readable label: the title, or the url when there is none.
    pub fn label(&self) -> &str {
        self.title.as_deref().unwrap_or(&self.url)
    }

    /// Term sent to the rating aggregator.
    ///
    /// Untitled problems still get looked up, by a name derived from the identity.
    pub fn search_term(&self) -> String {
        match &self.title {
            Some(title) => title.clone(),
            None => match self.platform {
                Platform::LeetCode => self.contest_id.replace('-', " "),
                _ => self.problem_index.clone(),
            },
        }
    }
}
