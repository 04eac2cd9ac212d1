// src/services/codeforces.rs

//! Codeforces crawler over the official JSON API.

use std::collections::{BTreeSet, HashSet};
use std::sync::OnceLock;

use serde::Deserialize;
use serde::de::{DeserializeOwned, IgnoredAny};

use crate::error::{AppError, Result};
use crate::models::{CodeforcesConfig, ContestSource, Platform, Problem};
use crate::services::crawler::{SubmissionRecord, unsolved_problems};
use crate::utils::http::HttpRequest;
use crate::utils::retry::RetryingHttpClient;

const ACCEPTED: &str = "OK";

/// `{"status": "OK", "result": ...}` wrapper of every API method.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    status: String,
    #[serde(default)]
    comment: Option<String>,
    result: Option<T>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CfProblem {
    #[serde(default)]
    contest_id: Option<u64>,
    index: String,
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct CfSubmission {
    problem: CfProblem,
    #[serde(default)]
    verdict: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CfStandings {
    problems: Vec<CfProblem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CfRatingChange {
    contest_id: u64,
}

/// Crawler for a single Codeforces handle.
pub struct CodeforcesCrawler {
    config: CodeforcesConfig,
    http: RetryingHttpClient,
    submissions: OnceLock<Vec<CfSubmission>>,
}

impl CodeforcesCrawler {
    pub fn new(config: CodeforcesConfig, http: RetryingHttpClient) -> Self {
        Self {
            config,
            http,
            submissions: OnceLock::new(),
        }
    }

    pub fn include_unattempted(&self) -> bool {
        self.config.include_unattempted
    }

    /// Whether a contest id belongs to the gym range.
    pub fn is_gym(&self, contest_id: u64) -> bool {
        contest_id >= self.config.gym_min_contest_id
    }

    /// Contest id if the submission counts; `None` when it is unclassifiable or filtered out.
    fn classify(&self, contest_id: Option<u64>) -> Option<u64> {
        let contest_id = contest_id?;
        if !self.config.include_gym && self.is_gym(contest_id) {
            return None;
        }
        Some(contest_id)
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/{}", self.config.api_base.trim_end_matches('/'), method)
    }

    /// Invoke an API method and unwrap its envelope.
    ///
    /// Rejected calls (unknown handle, bad contest id) answer HTTP 400 with a
    /// `FAILED` envelope; its comment becomes the protocol error message.
    async fn call<T: DeserializeOwned>(&self, method: &str, request: HttpRequest) -> Result<T> {
        let context = format!("codeforces {method}");
        let response = match self.http.execute(&request).await {
            Ok(response) => response,
            Err(AppError::UpstreamStatus {
                url,
                status: 400,
                body,
            }) => {
                return Err(match serde_json::from_str::<Envelope<IgnoredAny>>(&body) {
                    Ok(Envelope {
                        comment: Some(comment),
                        ..
                    }) => AppError::protocol(context, comment),
                    _ => AppError::UpstreamStatus {
                        url,
                        status: 400,
                        body,
                    },
                });
            }
            Err(e) => return Err(e),
        };
        let envelope: Envelope<T> = response.json(&context)?;
        if envelope.status != "OK" {
            return Err(AppError::protocol(
                context,
                envelope
                    .comment
                    .unwrap_or_else(|| format!("status {}", envelope.status)),
            ));
        }
        envelope
            .result
            .ok_or_else(|| AppError::protocol(context, "missing result"))
    }

    /// Full submission history, fetched once per crawler.
    async fn submissions(&self) -> Result<&[CfSubmission]> {
        if let Some(cached) = self.submissions.get() {
            return Ok(cached.as_slice());
        }
        let request = HttpRequest::get(self.method_url("user.status"))
            .query("handle", &self.config.handle)
            .query("from", 1)
            .query("count", self.config.submission_count);
        let fetched: Vec<CfSubmission> = self.call("user.status", request).await?;
        log::debug!(
            "Codeforces: {} submissions for {}",
            fetched.len(),
            self.config.handle
        );
        Ok(self.submissions.get_or_init(|| fetched).as_slice())
    }

    async fn fetch_contest_problems(&self, contest_id: u64) -> Result<Vec<CfProblem>> {
        let request = HttpRequest::get(self.method_url("contest.standings"))
            .query("contestId", contest_id)
            .query("from", 1)
            .query("count", 1);
        let standings: CfStandings = self.call("contest.standings", request).await?;
        Ok(standings.problems)
    }

    async fn fetch_rated_contests(&self) -> Result<Vec<u64>> {
        let request =
            HttpRequest::get(self.method_url("user.rating")).query("handle", &self.config.handle);
        let changes: Vec<CfRatingChange> = self.call("user.rating", request).await?;
        Ok(changes.into_iter().map(|c| c.contest_id).collect())
    }

    pub async fn fetch_unsolved_problems(&self) -> Result<Vec<Problem>> {
        let submissions = self.submissions().await?;
        let records = submissions
            .iter()
            .filter_map(|s| {
                let contest_id = self.classify(s.problem.contest_id)?;
                Some(SubmissionRecord {
                    contest_id: contest_id.to_string(),
                    problem_index: s.problem.index.clone(),
                    title: s.problem.name.clone(),
                    accepted: s.verdict.as_deref() == Some(ACCEPTED),
                })
            })
            .collect();
        Ok(unsolved_problems(Platform::Codeforces, records))
    }

    pub async fn fetch_contest_unattempted_problems(&self) -> Result<Vec<Problem>> {
        let submissions = self.submissions().await?;
        let attempted: HashSet<(u64, &str)> = submissions
            .iter()
            .filter_map(|s| Some((s.problem.contest_id?, s.problem.index.as_str())))
            .collect();

        let contests: Vec<u64> = match self.config.contest_source {
            ContestSource::Submissions => submissions
                .iter()
                .filter_map(|s| self.classify(s.problem.contest_id))
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect(),
            ContestSource::RatingHistory => {
                let mut seen = HashSet::new();
                self.fetch_rated_contests()
                    .await?
                    .into_iter()
                    .filter_map(|id| self.classify(Some(id)))
                    .filter(|id| seen.insert(*id))
                    .collect()
            }
        };
        log::info!("Codeforces: checking {} participated contests", contests.len());

        let mut unattempted = Vec::new();
        for contest_id in contests {
            let problems = match self.fetch_contest_problems(contest_id).await {
                Ok(problems) => problems,
                Err(e) => {
                    log::warn!(
                        "Codeforces: skipping contest {} problem list: {}",
                        contest_id,
                        e
                    );
                    continue;
                }
            };
            for problem in problems {
                if attempted.contains(&(contest_id, problem.index.as_str())) {
                    continue;
                }
                unattempted.push(Problem::new(
                    Platform::Codeforces,
                    contest_id.to_string(),
                    problem.index,
                    problem.name,
                ));
            }
        }
        Ok(unattempted)
    }
}
