//! Shelter-listing feed import.
//!
//! Parses the Petfinder shelter feed, caps at 50 entries, and assigns a
//! fixed moderate score. Parse or fetch failures degrade to an empty
//! contribution.

use std::time::Duration;

use tracing::warn;

use crate::types::OrganizationCandidate;

const MAX_ENTRIES: usize = 50;

/// Fetch and parse the shelter feed into candidates.
pub async fn fetch_feed_candidates(feed_url: &str) -> Vec<OrganizationCandidate> {
    let client = match reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(5))
        .timeout(Duration::from_secs(15))
        .build()
    {
        Ok(client) => client,
        Err(err) => {
            warn!(error = %err, "feed client construction failed");
            return Vec::new();
        }
    };

    let bytes = match client.get(feed_url).send().await {
        Ok(response) => match response.error_for_status() {
            Ok(response) => match response.bytes().await {
                Ok(bytes) => bytes,
                Err(err) => {
                    warn!(error = %err, "feed body read failed");
                    return Vec::new();
                }
            },
            Err(err) => {
                warn!(error = %err, "feed request rejected");
                return Vec::new();
            }
        },
        Err(err) => {
            warn!(error = %err, "feed request failed");
            return Vec::new();
        }
    };

    parse_feed(&bytes)
}

/// Parse RSS/Atom bytes into candidates, capped at 50.
pub fn parse_feed(bytes: &[u8]) -> Vec<OrganizationCandidate> {
    let feed = match feed_rs::parser::parse(bytes) {
        Ok(feed) => feed,
        Err(err) => {
            warn!(error = %err, "feed parse failed");
            return Vec::new();
        }
    };

    feed.entries
        .iter()
        .take(MAX_ENTRIES)
        .map(|entry| {
            let title = entry
                .title
                .as_ref()
                .map(|t| t.content.as_str())
                .unwrap_or("Unknown");
            let link = entry.links.first().map(|l| l.href.as_str()).unwrap_or("");
            OrganizationCandidate::feed_entry(title, link)
        })
        .collect()
}
