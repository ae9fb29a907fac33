//! Testing utilities including mock collaborators.
//!
//! Hand-written fakes for the network seams so pipeline behavior can be
//! exercised without real HTTP, geocoding, or LLM calls.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use serde_json::Value;

use crate::contacts::{PageFetcher, PageRenderer};
use crate::geo::GeoPoint;
use crate::geocode::Geocoder;
use crate::planner::PlannerAssist;

/// A page fetcher serving canned HTML by URL.
///
/// Unknown URLs error, which exercises the same degrade paths a network
/// failure would.
#[derive(Default)]
pub struct StaticFetcher {
    pages: HashMap<String, String>,
    fetched: Arc<RwLock<Vec<String>>>,
}

impl StaticFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a page body for a URL.
    pub fn with_page(mut self, url: impl Into<String>, html: impl Into<String>) -> Self {
        self.pages.insert(url.into(), html.into());
        self
    }

    /// URLs fetched so far, in order.
    pub fn fetched_urls(&self) -> Vec<String> {
        self.fetched.read().map(|f| f.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl PageFetcher for StaticFetcher {
    async fn fetch(&self, url: &str) -> anyhow::Result<String> {
        if let Ok(mut fetched) = self.fetched.write() {
            fetched.push(url.to_string());
        }
        self.pages
            .get(url)
            .or_else(|| self.pages.get(url.trim_end_matches('/')))
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("no canned page for {url}"))
    }
}

/// A renderer returning one fixed HTML body for every URL.
pub struct StaticRenderer {
    html: String,
}

impl StaticRenderer {
    pub fn new(html: impl Into<String>) -> Self {
        Self { html: html.into() }
    }
}

#[async_trait]
impl PageRenderer for StaticRenderer {
    async fn render(&self, _url: &str) -> anyhow::Result<String> {
        Ok(self.html.clone())
    }
}

/// A geocoder resolving every query to one fixed point.
pub struct FixedGeocoder {
    latitude: f64,
    longitude: f64,
}

impl FixedGeocoder {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }
}

#[async_trait]
impl Geocoder for FixedGeocoder {
    async fn geocode(&self, query: &str) -> anyhow::Result<Option<GeoPoint>> {
        Ok(Some(GeoPoint {
            latitude: self.latitude,
            longitude: self.longitude,
            display_name: Some(query.to_string()),
        }))
    }
}

/// A planning assist returning a scripted JSON reply, or erroring to
/// exercise the heuristic fallback.
pub struct ScriptedAssist {
    reply: Option<String>,
    prompts: Arc<RwLock<Vec<Value>>>,
}

impl ScriptedAssist {
    /// Always reply with the given JSON text.
    pub fn replying(reply: impl Into<String>) -> Self {
        Self {
            reply: Some(reply.into()),
            prompts: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Fail every request.
    pub fn failing() -> Self {
        Self {
            reply: None,
            prompts: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Prompts received so far.
    pub fn prompts(&self) -> Vec<Value> {
        self.prompts.read().map(|p| p.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl PlannerAssist for ScriptedAssist {
    async fn complete_json(&self, prompt: &Value) -> anyhow::Result<String> {
        if let Ok(mut prompts) = self.prompts.write() {
            prompts.push(prompt.clone());
        }
        self.reply
            .clone()
            .ok_or_else(|| anyhow::anyhow!("scripted assist failure"))
    }
}
