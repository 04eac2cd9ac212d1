// src/pipeline/aggregate.rs

//! Crawl, dedup, enrich and sort in one run.

use std::time::Duration;

use crate::error::{AppError, Result};
use crate::models::{Config, Platform, Problem};
use crate::pipeline::dedup::dedup_problems;
use crate::pipeline::sort::{PlatformPriority, sort_problems};
use crate::services::{ClistClient, EnrichmentStats, PlatformCrawler};
use crate::utils::log;
use crate::utils::retry::RetryingHttpClient;

const TOTAL_STEPS: usize = 4;

/// Crawl result of one platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformReport {
    pub platform: Platform,
    pub unsolved: usize,
    pub unattempted: usize,
    /// Error text when the platform's crawl failed
    pub error: Option<String>,
}

/// What happened during a run.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub platforms: Vec<PlatformReport>,
    /// Platforms skipped for missing handles or credentials
    pub skipped: Vec<(Platform, String)>,
    pub duplicates_removed: usize,
    pub total: usize,
    pub rated: usize,
    pub enrichment: Option<EnrichmentStats>,
}

impl RunReport {
    pub fn failed_platforms(&self) -> impl Iterator<Item = &PlatformReport> {
        self.platforms.iter().filter(|p| p.error.is_some())
    }

    /// Summary rows for [`log::summary`].
    pub fn summary_items(&self) -> Vec<(&'static str, String)> {
        let mut items = vec![
            ("Problems", self.total.to_string()),
            ("Rated", self.rated.to_string()),
            ("Duplicates removed", self.duplicates_removed.to_string()),
        ];
        for p in &self.platforms {
            let value = match &p.error {
                Some(e) => format!("failed: {e}"),
                None => format!("{} unsolved, {} unattempted", p.unsolved, p.unattempted),
            };
            items.push((p.platform.as_str(), value));
        }
        for (platform, reason) in &self.skipped {
            items.push((platform.as_str(), format!("skipped: {reason}")));
        }
        if let Some(stats) = &self.enrichment {
            items.push((
                "Rating lookups",
                format!(
                    "{} network, {} cached, {} failed",
                    stats.network_calls, stats.cache_hits, stats.failures
                ),
            ));
        }
        items
    }
}

/// Sorted, enriched problems plus the run report.
#[derive(Debug, Clone)]
pub struct AggregationOutcome {
    pub problems: Vec<Problem>,
    pub report: RunReport,
}

/// Orchestrates crawlers, dedup, enrichment and sort.
pub struct AggregationPipeline {
    crawlers: Vec<PlatformCrawler>,
    skipped: Vec<(Platform, String)>,
    enrichment: Option<ClistClient>,
    enrichment_delay: Duration,
    priority: PlatformPriority,
}

impl AggregationPipeline {
    /// Build crawlers for `platforms` in the given order.
    ///
    /// Platforms with missing handles or credentials are skipped with a
    /// warning. Enrichment runs when `with_rating` and `clist.enabled` are both set.
    pub fn from_config(
        config: &Config,
        platforms: &[Platform],
        http: RetryingHttpClient,
        with_rating: bool,
    ) -> Self {
        let mut crawlers = Vec::new();
        let mut skipped = Vec::new();
        for &platform in platforms {
            if crawlers
                .iter()
                .any(|c: &PlatformCrawler| c.platform() == platform)
            {
                continue;
            }
            match PlatformCrawler::from_config(platform, config, http.clone()) {
                Ok(crawler) => crawlers.push(crawler),
                Err(e) => {
                    ::log::warn!("Skipping {}: {}", platform, e);
                    skipped.push((platform, e.to_string()));
                }
            }
        }

        let enrichment = (with_rating && config.clist.enabled)
            .then(|| ClistClient::new(config.clist.clone(), http));

        Self {
            crawlers,
            skipped,
            enrichment,
            enrichment_delay: Duration::from_millis(config.clist.request_delay_ms),
            priority: PlatformPriority::new(config.sort.platform_priority.clone()),
        }
    }

    pub fn platforms(&self) -> Vec<Platform> {
        self.crawlers.iter().map(|c| c.platform()).collect()
    }

    /// Crawl every platform, then dedup, enrich and sort.
    ///
    /// Fails with [`AppError::NoData`] only when there is nothing to crawl or
    /// every platform's crawl failed.
    pub async fn run(&mut self) -> Result<AggregationOutcome> {
        if self.crawlers.is_empty() {
            ::log::error!("No platform is enabled and configured");
            return Err(AppError::NoData);
        }

        let mut report = RunReport {
            skipped: self.skipped.clone(),
            ..RunReport::default()
        };

        log::step(1, TOTAL_STEPS, "Crawl - Fetching submission histories");
        let mut collected = Vec::new();
        for crawler in &self.crawlers {
            let platform_report = crawl_platform(crawler, &mut collected).await;
            report.platforms.push(platform_report);
        }

        if report.platforms.iter().all(|p| p.error.is_some()) {
            ::log::error!("Every platform failed to crawl");
            return Err(AppError::NoData);
        }

        log::step(2, TOTAL_STEPS, "Dedup - Merging platforms");
        let (mut problems, removed) = dedup_problems(collected);
        report.duplicates_removed = removed;
        log::sub_item(&format!(
            "{} problems kept, {} duplicates removed",
            problems.len(),
            removed
        ));

        match self.enrichment.as_mut() {
            Some(clist) => {
                log::step(3, TOTAL_STEPS, "Enrich - Looking up clist ratings");
                let stats = clist.enrich_all(&mut problems, self.enrichment_delay).await;
                log::sub_item(&format!("{}/{} problems rated", stats.rated, stats.total));
                report.enrichment = Some(stats);
            }
            None => log::step(3, TOTAL_STEPS, "Enrich - Skipped"),
        }

        log::step(4, TOTAL_STEPS, "Sort - Ordering by rating");
        sort_problems(&mut problems, &self.priority);

        report.total = problems.len();
        report.rated = problems.iter().filter(|p| p.rating.is_some()).count();
        Ok(AggregationOutcome { problems, report })
    }
}

/// Run one crawler, appending its problems to `out` and isolating failures.
async fn crawl_platform(crawler: &PlatformCrawler, out: &mut Vec<Problem>) -> PlatformReport {
    let platform = crawler.platform();
    let mut report = PlatformReport {
        platform,
        unsolved: 0,
        unattempted: 0,
        error: None,
    };

    match crawler.fetch_unsolved_problems().await {
        Ok(problems) => {
            report.unsolved = problems.len();
            log::sub_item(&format!("{}: {} unsolved", platform, problems.len()));
            out.extend(problems);
        }
        Err(e) => {
            ::log::warn!("{}: crawl failed, skipping: {}", platform, e);
            report.error = Some(e.to_string());
            return report;
        }
    }

    if crawler.wants_unattempted() {
        match crawler.fetch_contest_unattempted_problems().await {
            Ok(problems) => {
                report.unattempted = problems.len();
                log::sub_item(&format!("{}: {} unattempted", platform, problems.len()));
                out.extend(problems);
            }
            Err(e) => ::log::warn!("{}: unattempted detection failed: {}", platform, e),
        }
    }

    report
}

/// Build the pipeline from `config` and run it.
pub async fn run_pipeline(
    config: &Config,
    platforms: &[Platform],
    http: RetryingHttpClient,
    with_rating: bool,
) -> Result<AggregationOutcome> {
    log::header("upsolve - collecting unsolved problems");
    let mut pipeline = AggregationPipeline::from_config(config, platforms, http, with_rating);
    let outcome = pipeline.run().await?;
    log::success(&format!("Collected {} problems", outcome.problems.len()));
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::models::CodeforcesConfig;
    use crate::services::CodeforcesCrawler;
    use crate::utils::retry::testing::{RecordingSleeper, Reply, ScriptedTransport, client};

    const CF_STATUS: &str = r#"{"status": "OK", "result": [
        {"problem": {"contestId": 1, "index": "A", "name": "Shared"}, "verdict": "WRONG_ANSWER"},
        {"problem": {"contestId": 2, "index": "B", "name": "Hard"}, "verdict": "TIME_LIMIT_EXCEEDED"},
        {"problem": {"contestId": 3, "index": "C", "name": "Done"}, "verdict": "OK"}
    ]}"#;

    fn config() -> Config {
        let mut config = Config::default();
        config.platforms.codeforces.enabled = true;
        config.platforms.codeforces.handle = "tourist".into();
        config.platforms.atcoder.enabled = true;
        config.platforms.atcoder.handle = "tourist".into();
        config.clist.request_delay_ms = 0;
        config
    }

    fn http(transport: &Arc<ScriptedTransport>) -> RetryingHttpClient {
        client(Arc::clone(transport), Arc::new(RecordingSleeper::default()), 1)
    }

    #[tokio::test]
    async fn test_overlapping_sources_keep_first_crawled_copy() {
        let mirror_status = r#"{"status": "OK", "result": [
            {"problem": {"contestId": 1, "index": "A", "name": "Mirror title"}, "verdict": "WRONG_ANSWER"},
            {"problem": {"contestId": 4, "index": "D", "name": "Mirror only"}, "verdict": "WRONG_ANSWER"}
        ]}"#;
        let transport = Arc::new(
            ScriptedTransport::new()
                .route("codeforces.com/api/user.status", vec![Reply::ok(CF_STATUS)])
                .route("cf-mirror.test/api/user.status", vec![Reply::ok(mirror_status)])
                .route("clist.by", vec![Reply::ok(r#"{"objects": [{"rating": 1900}]}"#)]),
        );
        let config = config();
        let mut pipeline = AggregationPipeline::from_config(
            &config,
            &[Platform::Codeforces],
            http(&transport),
            true,
        );
        let mirror = CodeforcesConfig {
            api_base: "https://cf-mirror.test/api".into(),
            ..config.platforms.codeforces.clone()
        };
        pipeline
            .crawlers
            .push(PlatformCrawler::Codeforces(CodeforcesCrawler::new(
                mirror,
                http(&transport),
            )));

        let outcome = pipeline.run().await.unwrap();

        assert_eq!(outcome.report.duplicates_removed, 1);
        let ids: Vec<_> = outcome.problems.iter().map(|p| p.problem_id()).collect();
        assert_eq!(ids, vec!["CF-1-A", "CF-2-B", "CF-4-D"]);
        let shared = &outcome.problems[0];
        assert_eq!(shared.title.as_deref(), Some("Shared"));
        assert_eq!(shared.url, "https://codeforces.com/contest/1/problem/A");
        assert_eq!(outcome.report.rated, 3);
        assert_eq!(transport.requests_to("clist.by"), 3);
    }

    #[tokio::test]
    async fn test_failed_platform_does_not_abort_others() {
        let transport = Arc::new(
            ScriptedTransport::new()
                .route("user.status", vec![Reply::Status(403, String::new())])
                .route(
                    "user/submissions",
                    vec![Reply::ok(
                        r#"[{"id": 1, "epoch_second": 1, "problem_id": "abc300_c", "contest_id": "abc300", "result": "WA"}]"#,
                    )],
                )
                .route(
                    "problems.json",
                    vec![Reply::ok(
                        r#"[{"id": "abc300_c", "contest_id": "abc300", "name": "Cross"}]"#,
                    )],
                ),
        );
        let mut pipeline = AggregationPipeline::from_config(
            &config(),
            &[Platform::Codeforces, Platform::AtCoder],
            http(&transport),
            false,
        );

        let outcome = pipeline.run().await.unwrap();

        assert_eq!(outcome.problems.len(), 1);
        assert_eq!(outcome.problems[0].title.as_deref(), Some("Cross"));
        let failed: Vec<_> = outcome.report.failed_platforms().map(|p| p.platform).collect();
        assert_eq!(failed, vec![Platform::Codeforces]);
        assert_eq!(transport.requests_to("clist.by"), 0);
    }

    #[tokio::test]
    async fn test_rate_limited_platform_is_reported_failed() {
        let transport = Arc::new(
            ScriptedTransport::new()
                .route("user.status", vec![Reply::Status(429, String::new())])
                .route("user/submissions", vec![Reply::ok("[]")])
                .route("problems.json", vec![Reply::ok("[]")]),
        );
        let mut pipeline = AggregationPipeline::from_config(
            &config(),
            &[Platform::Codeforces, Platform::AtCoder],
            http(&transport),
            false,
        );

        let outcome = pipeline.run().await.unwrap();

        let failed: Vec<_> = outcome.report.failed_platforms().collect();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].platform, Platform::Codeforces);
        assert!(failed[0].error.as_deref().is_some_and(|e| e.contains("Rate limited")));
        assert!(outcome.problems.is_empty());
    }

    #[tokio::test]
    async fn test_all_platforms_failing_is_no_data() {
        let transport = Arc::new(ScriptedTransport::new());
        let mut pipeline = AggregationPipeline::from_config(
            &config(),
            &[Platform::Codeforces, Platform::AtCoder],
            http(&transport),
            true,
        );

        let result = pipeline.run().await;
        assert!(matches!(result, Err(AppError::NoData)));
    }

    #[tokio::test]
    async fn test_unconfigured_platforms_are_skipped() {
        let transport = Arc::new(ScriptedTransport::new());
        let mut pipeline = AggregationPipeline::from_config(
            &Config::default(),
            &[Platform::LeetCode, Platform::Codeforces],
            http(&transport),
            true,
        );

        assert!(pipeline.platforms().is_empty());
        assert!(matches!(pipeline.run().await, Err(AppError::NoData)));
        assert_eq!(transport.request_count(), 0);
    }
}
