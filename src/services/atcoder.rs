// src/services/atcoder.rs

//! AtCoder crawler over the AtCoder Problems API.
//!
//! Submissions come from the paginated `user/submissions` endpoint; titles and
//! contest problem sets come from the bulk `problems.json` resource.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::OnceLock;
use std::time::Duration;

use chrono::Utc;
use serde::Deserialize;

use crate::error::Result;
use crate::models::{AtCoderConfig, Platform, Problem};
use crate::services::crawler::{SubmissionRecord, unsolved_problems};
use crate::utils::http::HttpRequest;
use crate::utils::retry::RetryingHttpClient;

const ACCEPTED: &str = "AC";

/// Submissions returned per page by `user/submissions`.
const PAGE_SIZE: usize = 500;

/// The API asks clients to wait at least a second between calls.
const PAGE_DELAY: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Deserialize)]
struct AtSubmission {
    id: u64,
    epoch_second: i64,
    problem_id: String,
    #[serde(default)]
    contest_id: String,
    result: String,
}

#[derive(Debug, Clone, Deserialize)]
struct AtProblem {
    id: String,
    contest_id: String,
    /// Bare problem name
    #[serde(default)]
    name: Option<String>,
    /// Name prefixed with the task letter
    #[serde(default)]
    title: Option<String>,
}

impl AtProblem {
    fn display_name(&self) -> Option<String> {
        self.name.clone().or_else(|| self.title.clone())
    }
}

/// Crawler for a single AtCoder handle.
pub struct AtCoderCrawler {
    config: AtCoderConfig,
    http: RetryingHttpClient,
    submissions: OnceLock<Vec<AtSubmission>>,
    problems: OnceLock<Vec<AtProblem>>,
}

impl AtCoderCrawler {
    pub fn new(config: AtCoderConfig, http: RetryingHttpClient) -> Self {
        Self {
            config,
            http,
            submissions: OnceLock::new(),
            problems: OnceLock::new(),
        }
    }

    pub fn include_unattempted(&self) -> bool {
        self.config.include_unattempted
    }

    /// Whether a contest id names a practice pool.
    pub fn is_practice(&self, contest_id: &str) -> bool {
        let contest_id = contest_id.to_lowercase();
        self.config
            .practice_markers
            .iter()
            .any(|m| !m.is_empty() && contest_id.contains(&m.to_lowercase()))
    }

    /// Whether a submission's contest counts; empty contest ids never do.
    fn counts(&self, contest_id: &str) -> bool {
        if contest_id.trim().is_empty() {
            return false;
        }
        !(self.config.contest_only && self.is_practice(contest_id))
    }

    /// Submission history within the configured window, fetched once.
    ///
    /// Each page starts at the newest second of the previous one, so
    /// submissions sharing that second are refetched and dropped by id.
    async fn submissions(&self) -> Result<&[AtSubmission]> {
        if let Some(cached) = self.submissions.get() {
            return Ok(cached.as_slice());
        }

        let url = format!(
            "{}/user/submissions",
            self.config.api_base.trim_end_matches('/')
        );
        let window = i64::from(self.config.history_days) * 86_400;
        let mut from_second = Utc::now().timestamp() - window;
        let mut all = Vec::new();
        let mut seen = HashSet::new();

        loop {
            let request = HttpRequest::get(&url)
                .query("user", &self.config.handle)
                .query("from_second", from_second);
            let response = self.http.execute(&request).await?;
            let page: Vec<AtSubmission> = response.json("atcoder user/submissions")?;

            let page_len = page.len();
            let last_epoch = page.iter().map(|s| s.epoch_second).max();
            let before = all.len();
            all.extend(page.into_iter().filter(|s| seen.insert(s.id)));
            let fresh = all.len() - before;

            match last_epoch {
                Some(epoch) if page_len >= PAGE_SIZE && fresh > 0 => {
                    from_second = epoch;
                    self.http.sleeper().sleep(PAGE_DELAY).await;
                }
                _ => break,
            }
        }

        log::debug!(
            "AtCoder: {} submissions for {}",
            all.len(),
            self.config.handle
        );
        Ok(self.submissions.get_or_init(|| all).as_slice())
    }

    /// Global problem list, fetched once.
    async fn problems(&self) -> Result<&[AtProblem]> {
        if let Some(cached) = self.problems.get() {
            return Ok(cached.as_slice());
        }
        let response = self
            .http
            .execute(&HttpRequest::get(&self.config.problems_url))
            .await?;
        let problems: Vec<AtProblem> = response.json("atcoder problems.json")?;
        Ok(self.problems.get_or_init(|| problems).as_slice())
    }

    /// Attempted but never accepted tasks.
    ///
    /// A task shared by simultaneous contests is keyed by the contest that
    /// owns it in `problems.json`; the submission's own contest is used only
    /// for tasks the list does not know.
    pub async fn fetch_unsolved_problems(&self) -> Result<Vec<Problem>> {
        let submissions = self.submissions().await?;

        let catalog: HashMap<&str, &AtProblem> = match self.problems().await {
            Ok(problems) => problems.iter().map(|p| (p.id.as_str(), p)).collect(),
            Err(e) => {
                log::warn!("AtCoder: problem list unavailable, continuing without: {}", e);
                HashMap::new()
            }
        };

        let records = submissions
            .iter()
            .filter_map(|s| {
                let known = catalog.get(s.problem_id.as_str());
                let contest_id = known.map_or(s.contest_id.as_str(), |p| p.contest_id.as_str());
                if !self.counts(contest_id) {
                    return None;
                }
                Some(SubmissionRecord {
                    contest_id: contest_id.to_string(),
                    problem_index: s.problem_id.clone(),
                    title: known.and_then(|p| p.display_name()),
                    accepted: s.result == ACCEPTED,
                })
            })
            .collect();
        Ok(unsolved_problems(Platform::AtCoder, records))
    }

    pub async fn fetch_contest_unattempted_problems(&self) -> Result<Vec<Problem>> {
        let submissions = self.submissions().await?;
        let attempted: HashSet<&str> = submissions.iter().map(|s| s.problem_id.as_str()).collect();
        let contests: BTreeSet<&str> = submissions
            .iter()
            .map(|s| s.contest_id.as_str())
            .filter(|c| self.counts(c))
            .collect();
        log::info!("AtCoder: checking {} participated contests", contests.len());

        let problems = match self.problems().await {
            Ok(problems) => problems,
            Err(e) => {
                log::warn!("AtCoder: skipping all contest problem lists: {}", e);
                return Ok(Vec::new());
            }
        };

        let mut by_contest: BTreeMap<&str, Vec<&AtProblem>> = BTreeMap::new();
        for problem in problems {
            if contests.contains(problem.contest_id.as_str()) {
                by_contest
                    .entry(problem.contest_id.as_str())
                    .or_default()
                    .push(problem);
            }
        }

        let unattempted = by_contest
            .into_values()
            .flatten()
            .filter(|p| !attempted.contains(p.id.as_str()))
            .map(|p| Problem::new(Platform::AtCoder, &p.contest_id, &p.id, p.display_name()))
            .collect();
        Ok(unattempted)
    }
}
