// src/services/crawler.rs

//! Closed set of platform crawlers and the shared submission grouping.

use std::collections::HashMap;

use crate::error::{AppError, Result};
use crate::models::{Config, Platform, Problem};
use crate::services::{AtCoderCrawler, CodeforcesCrawler, LeetCodeCrawler};
use crate::utils::retry::RetryingHttpClient;

/// One raw submission, reduced to what solved/unsolved detection needs.
#[derive(Debug, Clone)]
pub(crate) struct SubmissionRecord {
    pub contest_id: String,
    pub problem_index: String,
    pub title: Option<String>,
    pub accepted: bool,
}

/// Group submissions by problem and keep the groups without an accepted verdict.
///
/// Groups come out in first-seen order; the title is the first non-blank one
/// seen in the group.
pub(crate) fn unsolved_problems(platform: Platform, records: Vec<SubmissionRecord>) -> Vec<Problem> {
    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<(SubmissionRecord, bool)> = Vec::new();

    for record in records {
        let id = Problem::derive_id(platform, &record.contest_id, &record.problem_index);
        match positions.get(&id) {
            Some(&pos) => {
                let (first, solved) = &mut groups[pos];
                *solved |= record.accepted;
                if first.title.as_deref().is_none_or(|t| t.trim().is_empty()) {
                    first.title = record.title;
                }
            }
            None => {
                positions.insert(id, groups.len());
                let solved = record.accepted;
                groups.push((record, solved));
            }
        }
    }

    groups
        .into_iter()
        .filter(|(_, solved)| !solved)
        .map(|(record, _)| {
            Problem::new(platform, record.contest_id, record.problem_index, record.title)
        })
        .collect()
}

/// A crawler for one supported judge.
pub enum PlatformCrawler {
    Codeforces(CodeforcesCrawler),
    AtCoder(AtCoderCrawler),
    LeetCode(LeetCodeCrawler),
}

impl PlatformCrawler {
    /// Build the crawler for `platform`, or a `ConfigurationGap` when its
    /// handle or credentials are missing.
    pub fn from_config(
        platform: Platform,
        config: &Config,
        http: RetryingHttpClient,
    ) -> Result<Self> {
        match platform {
            Platform::Codeforces => {
                let cf = &config.platforms.codeforces;
                if cf.handle.trim().is_empty() {
                    return Err(AppError::gap(platform, "handle is not configured"));
                }
                Ok(Self::Codeforces(CodeforcesCrawler::new(cf.clone(), http)))
            }
            Platform::AtCoder => {
                let at = &config.platforms.atcoder;
                if at.handle.trim().is_empty() {
                    return Err(AppError::gap(platform, "handle is not configured"));
                }
                Ok(Self::AtCoder(AtCoderCrawler::new(at.clone(), http)))
            }
            Platform::LeetCode => {
                let lc = &config.platforms.leetcode;
                if lc.cookies.values().all(|v| v.trim().is_empty()) {
                    return Err(AppError::gap(platform, "cookies are not configured"));
                }
                Ok(Self::LeetCode(LeetCodeCrawler::new(lc.clone(), http)))
            }
        }
    }

    pub fn platform(&self) -> Platform {
        match self {
            Self::Codeforces(_) => Platform::Codeforces,
            Self::AtCoder(_) => Platform::AtCoder,
            Self::LeetCode(_) => Platform::LeetCode,
        }
    }

    /// Problems with submissions but no accepted verdict.
    pub async fn fetch_unsolved_problems(&self) -> Result<Vec<Problem>> {
        match self {
            Self::Codeforces(c) => c.fetch_unsolved_problems().await,
            Self::AtCoder(c) => c.fetch_unsolved_problems().await,
            Self::LeetCode(c) => c.fetch_unsolved_problems().await,
        }
    }

    /// Whether the platform can enumerate contest problem sets.
    pub fn supports_unattempted(&self) -> bool {
        !matches!(self, Self::LeetCode(_))
    }

    /// Whether unattempted detection is both supported and switched on.
    pub fn wants_unattempted(&self) -> bool {
        match self {
            Self::Codeforces(c) => c.include_unattempted(),
            Self::AtCoder(c) => c.include_unattempted(),
            Self::LeetCode(_) => false,
        }
    }

    /// Problems of participated contests that were never submitted to.
    pub async fn fetch_contest_unattempted_problems(&self) -> Result<Vec<Problem>> {
        match self {
            Self::Codeforces(c) => c.fetch_contest_unattempted_problems().await,
            Self::AtCoder(c) => c.fetch_contest_unattempted_problems().await,
            Self::LeetCode(_) => Ok(Vec::new()),
        }
    }
}
