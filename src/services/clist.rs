// src/services/clist.rs

//! Difficulty lookups against the clist.by problem search.
//!
//! Lookups run strictly one after another. Results, including confirmed
//! misses, are remembered in a [`RatingCache`] owned by the client, so a title
//! is queried at most once per run. Failed lookups are not cached.

use std::time::Duration;

use serde::Deserialize;

use crate::error::Result;
use crate::models::{ClistConfig, Platform, Problem};
use crate::services::cache::RatingCache;
use crate::utils::http::HttpRequest;
use crate::utils::retry::RetryingHttpClient;

#[derive(Debug, Deserialize)]
struct ProblemSearch {
    #[serde(default)]
    objects: Vec<ClistProblem>,
}

#[derive(Debug, Deserialize)]
struct ClistProblem {
    #[serde(default)]
    rating: Option<f64>,
}

/// Where a lookup result came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupSource {
    Cache,
    Network,
    /// The platform has no aggregator resource; nothing was sent
    Unmapped,
}

/// Counters for one [`ClistClient::enrich_all`] batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnrichmentStats {
    pub total: usize,
    pub rated: usize,
    pub cache_hits: usize,
    pub network_calls: usize,
    pub failures: usize,
}

/// Rating lookup client for clist.by.
pub struct ClistClient {
    http: RetryingHttpClient,
    config: ClistConfig,
    cache: RatingCache,
}

impl ClistClient {
    pub fn new(config: ClistConfig, http: RetryingHttpClient) -> Self {
        Self::with_cache(config, http, RatingCache::new())
    }

    pub fn with_cache(config: ClistConfig, http: RetryingHttpClient, cache: RatingCache) -> Self {
        Self {
            http,
            config,
            cache,
        }
    }

    pub fn cache(&self) -> &RatingCache {
        &self.cache
    }

    /// Aggregator resource for a platform, if mapped.
    pub fn resource(&self, platform: Platform) -> Option<&str> {
        self.config
            .resources
            .get(platform.as_str())
            .map(String::as_str)
            .filter(|r| !r.trim().is_empty())
    }

    fn authorization(&self) -> Option<String> {
        let key = self.config.api_key.as_deref()?.trim();
        if key.is_empty() {
            None
        } else if key.starts_with("ApiKey ") {
            Some(key.to_string())
        } else {
            Some(format!("ApiKey {key}"))
        }
    }

    /// Rating for `(platform, title)`, `None` when the aggregator has none.
    pub async fn lookup_rating(&mut self, platform: Platform, title: &str) -> Result<Option<i32>> {
        self.lookup(platform, title).await.map(|(rating, _)| rating)
    }

    async fn lookup(&mut self, platform: Platform, title: &str) -> Result<(Option<i32>, LookupSource)> {
        if let Some(entry) = self.cache.get(platform, title) {
            return Ok((entry.rating, LookupSource::Cache));
        }

        let Some(resource) = self.resource(platform).map(str::to_string) else {
            log::debug!("clist: no resource for {}, skipping lookup", platform);
            self.cache.insert(platform, title, None);
            return Ok((None, LookupSource::Unmapped));
        };

        let mut request = HttpRequest::get(format!(
            "{}/problem/",
            self.config.api_base.trim_end_matches('/')
        ))
        .query("resource", resource)
        .query("name", title);
        if let Some(auth) = self.authorization() {
            request = request.header("Authorization", auth);
        }

        let response = self.http.execute(&request).await?;
        let search: ProblemSearch = response.json("clist problem search")?;
        let rating = search
            .objects
            .first()
            .and_then(|p| p.rating)
            .map(|r| r.round() as i32);

        let entry = self.cache.insert(platform, title, rating);
        Ok((entry.rating, LookupSource::Network))
    }

    /// Set the rating of every problem in place.
    ///
    /// `delay` is slept before each network lookup that follows an earlier
    /// one; cache hits and unmapped platforms never wait. A failed lookup
    /// leaves the rating unset and does not stop the batch.
    pub async fn enrich_all(&mut self, problems: &mut [Problem], delay: Duration) -> EnrichmentStats {
        let mut stats = EnrichmentStats {
            total: problems.len(),
            ..EnrichmentStats::default()
        };

        for (i, problem) in problems.iter_mut().enumerate() {
            let term = problem.search_term();
            let needs_network = !self.cache.contains(problem.platform, &term)
                && self.resource(problem.platform).is_some();
            if needs_network && stats.network_calls > 0 && !delay.is_zero() {
                self.http.sleeper().sleep(delay).await;
            }

            log::debug!(
                "clist: rating {}/{} {} {}",
                i + 1,
                stats.total,
                problem.platform,
                problem.problem_id()
            );

            match self.lookup(problem.platform, &term).await {
                Ok((rating, source)) => {
                    match source {
                        LookupSource::Cache => stats.cache_hits += 1,
                        LookupSource::Network => stats.network_calls += 1,
                        LookupSource::Unmapped => {}
                    }
                    problem.rating = rating;
                    if rating.is_some() {
                        stats.rated += 1;
                    }
                }
                Err(e) => {
                    stats.network_calls += 1;
                    stats.failures += 1;
                    problem.rating = None;
                    log::warn!(
                        "clist: rating lookup failed for {} {} ({}): {}",
                        problem.platform,
                        problem.problem_id(),
                        term,
                        e
                    );
                }
            }
        }

        stats
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::error::AppError;
    use crate::utils::retry::testing::{RecordingSleeper, Reply, ScriptedTransport, client};

    fn setup(
        transport: ScriptedTransport,
        config: ClistConfig,
    ) -> (ClistClient, Arc<ScriptedTransport>, Arc<RecordingSleeper>) {
        let transport = Arc::new(transport);
        let sleeper = Arc::new(RecordingSleeper::default());
        let http = client(Arc::clone(&transport), Arc::clone(&sleeper), 1);
        (ClistClient::new(config, http), transport, sleeper)
    }

    fn rated(rating: f64) -> Reply {
        Reply::ok(format!(r#"{{"objects": [{{"rating": {rating}}}, {{"rating": 3000}}]}}"#))
    }

    #[tokio::test]
    async fn test_cache_round_trip_skips_network() {
        let (mut clist, transport, _) = setup(
            ScriptedTransport::new().route("problem", vec![rated(1199.6)]),
            ClistConfig::default(),
        );

        let first = clist.lookup_rating(Platform::Codeforces, "Two Sum").await.unwrap();
        let second = clist.lookup_rating(Platform::Codeforces, " two  sum").await.unwrap();

        assert_eq!(first, Some(1200));
        assert_eq!(second, Some(1200));
        assert_eq!(transport.request_count(), 1);
    }

    #[tokio::test]
    async fn test_not_found_is_cached() {
        let (mut clist, transport, _) = setup(
            ScriptedTransport::new().route("problem", vec![Reply::ok(r#"{"objects": []}"#)]),
            ClistConfig::default(),
        );

        assert_eq!(clist.lookup_rating(Platform::AtCoder, "Cross").await.unwrap(), None);
        assert_eq!(clist.lookup_rating(Platform::AtCoder, "Cross").await.unwrap(), None);
        assert_eq!(transport.request_count(), 1);
        assert!(clist.cache().contains(Platform::AtCoder, "cross"));
    }

    #[tokio::test]
    async fn test_unmapped_platform_makes_no_call() {
        let mut config = ClistConfig::default();
        config.resources.remove("leetcode");
        let (mut clist, transport, _) = setup(ScriptedTransport::new(), config);

        assert_eq!(clist.lookup_rating(Platform::LeetCode, "Two Sum").await.unwrap(), None);
        assert_eq!(transport.request_count(), 0);
    }

    #[tokio::test]
    async fn test_request_shape_and_api_key() {
        let config = ClistConfig {
            api_key: Some("alice:secret".into()),
            ..ClistConfig::default()
        };
        let (mut clist, transport, _) = setup(
            ScriptedTransport::new().route("problem", vec![rated(800.0)]),
            config,
        );

        clist.lookup_rating(Platform::AtCoder, "Cross").await.unwrap();

        let requests = transport.requests.lock().unwrap();
        let request = &requests[0];
        assert_eq!(request.url, "https://clist.by/api/v4/problem/");
        assert!(request.query.contains(&("resource".to_string(), "atcoder.jp".to_string())));
        assert!(request.query.contains(&("name".to_string(), "Cross".to_string())));
        assert!(request.headers.contains(&(
            "Authorization".to_string(),
            "ApiKey alice:secret".to_string()
        )));
    }

    #[tokio::test]
    async fn test_errors_are_not_cached() {
        let (mut clist, transport, _) = setup(
            ScriptedTransport::new().route(
                "problem",
                vec![Reply::Status(403, String::new()), rated(1500.0)],
            ),
            ClistConfig::default(),
        );

        let err = clist.lookup_rating(Platform::Codeforces, "Cross").await.unwrap_err();
        assert!(matches!(err, AppError::UpstreamStatus { status: 403, .. }));
        assert_eq!(
            clist.lookup_rating(Platform::Codeforces, "Cross").await.unwrap(),
            Some(1500)
        );
        assert_eq!(transport.request_count(), 2);
    }

    #[tokio::test]
    async fn test_enrich_all_delays_only_between_network_calls() {
        let (mut clist, transport, sleeper) = setup(
            ScriptedTransport::new()
                .route("name=Alpha", vec![rated(900.0)])
                .route("name=Beta", vec![Reply::Status(404, String::new())])
                .route("name=Gamma", vec![Reply::ok(r#"{"objects": [{}]}"#)]),
            ClistConfig::default(),
        );
        let mut problems = vec![
            Problem::new(Platform::Codeforces, "1", "A", Some("Alpha".into())),
            Problem::new(Platform::Codeforces, "2", "A", Some("Alpha".into())),
            Problem::new(Platform::Codeforces, "1", "B", Some("Beta".into())),
            Problem::new(Platform::Codeforces, "1", "C", Some("Gamma".into())),
        ];
        let delay = Duration::from_millis(800);

        let stats = clist.enrich_all(&mut problems, delay).await;

        assert_eq!(transport.request_count(), 3);
        assert_eq!(sleeper.recorded(), vec![delay, delay]);
        assert_eq!(problems[0].rating, Some(900));
        assert_eq!(problems[1].rating, Some(900));
        assert_eq!(problems[2].rating, None);
        assert_eq!(problems[3].rating, None);
        assert_eq!(
            stats,
            EnrichmentStats {
                total: 4,
                rated: 2,
                cache_hits: 1,
                network_calls: 3,
                failures: 1,
            }
        );
    }
}
