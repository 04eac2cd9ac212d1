// src/services/leetcode.rs

//! LeetCode crawler over the cookie-authenticated GraphQL endpoint.
//!
//! Only the recent submission list is reachable this way, so the unsolved set
//! is limited to the last `submission_limit` submissions.

use serde::Deserialize;
use serde_json::json;

use crate::error::{AppError, Result};
use crate::models::{LeetCodeConfig, Platform, Problem};
use crate::services::crawler::{SubmissionRecord, unsolved_problems};
use crate::utils::cookie_header;
use crate::utils::http::HttpRequest;
use crate::utils::retry::RetryingHttpClient;

const ACCEPTED: &str = "Accepted";

const ORIGIN: &str = "https://leetcode.com";

const RECENT_SUBMISSIONS_QUERY: &str = "query getRecentSubmissionList($limit: Int!) { \
     recentSubmissionList(limit: $limit) { title titleSlug statusDisplay timestamp } }";

#[derive(Debug, Deserialize)]
struct GraphQlResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RecentSubmissions {
    #[serde(default)]
    recent_submission_list: Option<Vec<LcSubmission>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LcSubmission {
    #[serde(default)]
    title: Option<String>,
    title_slug: String,
    #[serde(alias = "status")]
    status_display: String,
}

/// Crawler for the account behind the configured session cookies.
pub struct LeetCodeCrawler {
    config: LeetCodeConfig,
    http: RetryingHttpClient,
}

impl LeetCodeCrawler {
    pub fn new(config: LeetCodeConfig, http: RetryingHttpClient) -> Self {
        Self { config, http }
    }

    fn request(&self) -> HttpRequest {
        let body = json!({
            "query": RECENT_SUBMISSIONS_QUERY,
            "variables": { "limit": self.config.submission_limit },
        });
        let mut request = HttpRequest::post_json(&self.config.graphql_url, body)
            .header("Cookie", cookie_header(&self.config.cookies))
            .header("Origin", ORIGIN)
            .header("Referer", format!("{ORIGIN}/"));
        if let Some(token) = self.config.cookies.get("csrftoken") {
            request = request.header("x-csrftoken", token.as_str());
        }
        request
    }

    async fn recent_submissions(&self) -> Result<Vec<LcSubmission>> {
        let context = "leetcode recentSubmissionList";
        let response = self.http.execute(&self.request()).await?;
        let reply: GraphQlResponse<RecentSubmissions> = response.json(context)?;

        if !reply.errors.is_empty() {
            let messages: Vec<String> = reply
                .errors
                .iter()
                .map(|e| {
                    e.get("message")
                        .and_then(|m| m.as_str())
                        .map(str::to_string)
                        .unwrap_or_else(|| e.to_string())
                })
                .collect();
            return Err(AppError::protocol(context, messages.join("; ")));
        }

        reply
            .data
            .and_then(|d| d.recent_submission_list)
            .ok_or_else(|| AppError::protocol(context, "no submission list (expired cookies?)"))
    }

    pub async fn fetch_unsolved_problems(&self) -> Result<Vec<Problem>> {
        let submissions = self.recent_submissions().await?;
        log::debug!("LeetCode: {} recent submissions", submissions.len());

        let records = submissions
            .into_iter()
            .filter(|s| !s.title_slug.trim().is_empty())
            .map(|s| SubmissionRecord {
                accepted: s.status_display == ACCEPTED,
                contest_id: s.title_slug,
                problem_index: String::new(),
                title: s.title,
            })
            .collect();
        Ok(unsolved_problems(Platform::LeetCode, records))
    }
}
