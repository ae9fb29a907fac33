//! Headless-render fallback for JS-heavy sites.
//!
//! Only attempted when the static pass produced zero contacts, and only
//! when explicitly enabled by configuration. The renderer is a
//! browserless-style HTTP content API; the same static heuristics re-run
//! over the rendered HTML.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use crate::config::Config;

/// Renders a JS page and returns the resulting HTML.
#[async_trait]
pub trait PageRenderer: Send + Sync {
    async fn render(&self, url: &str) -> anyhow::Result<String>;
}

/// Client for a browserless-style `/content` endpoint.
pub struct BrowserlessRenderer {
    client: reqwest::Client,
    base_url: String,
}

impl BrowserlessRenderer {
    /// Build from config; `None` unless rendering is enabled and a
    /// renderer URL is configured.
    pub fn from_config(config: &Config) -> Option<Self> {
        if !config.renderer_enabled {
            return None;
        }
        let base_url = config.renderer_url.clone()?;
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(config.renderer_timeout)
            .build()
            .ok()?;
        Some(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl PageRenderer for BrowserlessRenderer {
    async fn render(&self, url: &str) -> anyhow::Result<String> {
        let response = self
            .client
            .post(format!("{}/content", self.base_url))
            .json(&json!({"url": url, "waitUntil": "networkidle2"}))
            .send()
            .await?
            .error_for_status()?;
        Ok(response.text().await?)
    }
}
