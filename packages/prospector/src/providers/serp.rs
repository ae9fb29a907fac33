//! SerpApi organic-search provider.
//!
//! A secondary enrichment source. Location context stays in the query
//! text; SerpApi's `location` parameter has been unreliable for
//! city/state inputs in this workflow and causes 400/retry cycles.

use std::time::Duration;

use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

use crate::config::Config;
use crate::deadline::Deadline;
use crate::progress::{ProgressEvent, ProgressSink, StopReason};
use crate::types::OrganizationCandidate;

const SEARCH_URL: &str = "https://serpapi.com/search";

/// SerpApi Google organic search client.
pub struct SerpClient {
    client: reqwest::Client,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    organic_results: Vec<OrganicResult>,
}

#[derive(Debug, Deserialize)]
struct OrganicResult {
    #[serde(default)]
    title: String,
    #[serde(default)]
    link: String,
    #[serde(default)]
    snippet: String,
}

impl SerpClient {
    /// Build from config; `None` when no API key is configured.
    pub fn from_config(config: &Config) -> Option<Self> {
        let api_key = config.serpapi_key.clone()?;
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(config.serp_http_timeout)
            .build()
            .ok()?;
        Some(Self { client, api_key })
    }

    /// Run one query, paginating result pages of at most 10 until `target`
    /// candidates are collected or a page comes back short.
    pub async fn search(
        &self,
        query: &str,
        target: usize,
        location_scoped: bool,
    ) -> anyhow::Result<Vec<OrganizationCandidate>> {
        let target = target.clamp(1, 100);
        let mut candidates = Vec::new();
        let mut start = 0usize;

        while candidates.len() < target {
            let batch_size = (target - candidates.len()).min(10);
            let mut request = self.client.get(SEARCH_URL).query(&[
                ("q", query),
                ("api_key", self.api_key.as_str()),
                ("num", &batch_size.to_string()),
                ("engine", "google"),
            ]);
            if start > 0 {
                request = request.query(&[("start", start.to_string())]);
            }

            let response: SearchResponse = request
                .send()
                .await?
                .error_for_status()?
                .json()
                .await?;
            let results = response.organic_results;
            if results.is_empty() {
                break;
            }

            let page_len = results.len();
            for result in results {
                if candidates.len() >= target {
                    break;
                }
                candidates.push(OrganizationCandidate::search_result(
                    &result.title,
                    &result.link,
                    &result.snippet,
                    location_scoped,
                ));
            }
            if page_len < batch_size {
                break;
            }
            start += page_len;
        }

        Ok(candidates)
    }
}

/// Run the whole search-engine stage over the planned queries.
///
/// Stops early on the global deadline, the stage time budget, or after
/// `failure_budget` consecutive empty-result queries; every stop emits a
/// warning event with its stop reason and the stage returns whatever was
/// collected so far.
pub async fn run_search_stage(
    client: &SerpClient,
    queries: &[String],
    per_query: usize,
    location_scoped: bool,
    global_deadline: Deadline,
    stage_budget: Duration,
    failure_budget: u32,
    progress: &ProgressSink,
) -> Vec<OrganizationCandidate> {
    let stage_deadline = Deadline::after(stage_budget.max(Duration::from_secs(1)));
    let mut candidates = Vec::new();
    let mut consecutive_failures = 0u32;

    for query in queries {
        if global_deadline.expired() {
            stop(progress, StopReason::GlobalDeadline);
            break;
        }
        if stage_deadline.expired() {
            stop(progress, StopReason::SerpapiStageDeadline);
            break;
        }

        let results = match client.search(query, per_query, location_scoped).await {
            Ok(results) => results,
            Err(err) => {
                warn!(query, error = %err, "SerpApi query failed");
                Vec::new()
            }
        };
        info!(query, count = results.len(), source = "serpapi", "search query done");

        if results.is_empty() {
            consecutive_failures += 1;
        } else {
            consecutive_failures = 0;
        }
        candidates.extend(results);

        if consecutive_failures >= failure_budget.max(1) {
            stop(progress, StopReason::SerpapiFailureBudget);
            break;
        }
    }

    candidates
}

fn stop(progress: &ProgressSink, reason: StopReason) {
    info!(reason = ?reason, "stopping SerpAPI stage early");
    progress(
        ProgressEvent::warning(
            "serpapi",
            format!(
                "Stopped SerpAPI early ({}). Continuing with collected candidates.",
                reason.describe()
            ),
        )
        .with_progress(40)
        .with_extra("source", json!("serpapi"))
        .with_stop_reason(reason),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn recording_sink() -> (ProgressSink, Arc<Mutex<Vec<ProgressEvent>>>) {
        let events: Arc<Mutex<Vec<ProgressEvent>>> = Arc::new(Mutex::new(Vec::new()));
        let sink_events = events.clone();
        let sink: ProgressSink = Arc::new(move |event| sink_events.lock().unwrap().push(event));
        (sink, events)
    }

    #[tokio::test]
    async fn test_stage_respects_expired_global_deadline() {
        // Key is never used: the deadline check runs before any request.
        let client = SerpClient {
            client: reqwest::Client::new(),
            api_key: "test".to_string(),
        };
        let (sink, events) = recording_sink();

        let collected = run_search_stage(
            &client,
            &["a query".to_string()],
            10,
            false,
            Deadline::after(Duration::ZERO),
            Duration::from_secs(90),
            4,
            &sink,
        )
        .await;

        assert!(collected.is_empty());
        let events = events.lock().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].stop_reason, Some(StopReason::GlobalDeadline));
        assert!(events[0].stopped_early);
    }
}
