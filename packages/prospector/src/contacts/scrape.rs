//! Page fetching and static page analysis.
//!
//! The fetcher honors robots.txt (an unreachable robots.txt means
//! allowed, not blocked) and sleeps a randomized 1.5-3.5 s before every
//! fetch regardless of concurrency. Page analysis is synchronous over
//! the fetched HTML so parsed documents never live across an await.

use std::collections::{HashMap, HashSet};
use std::sync::{LazyLock, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use regex::Regex;
use scraper::{Html, Selector};
use tracing::{debug, warn};
use url::Url;

use super::staff::{find_staff_entries, StaffEntry};

const USER_AGENT: &str =
    "Mozilla/5.0 (compatible; FurryFriendsShelterBot/1.0; +https://furryfriendswa.org/bot)";

/// Keywords marking subpages worth scanning for contacts.
pub const CONTACT_PAGE_KEYWORDS: [&str; 13] = [
    "contact",
    "about",
    "team",
    "staff",
    "leadership",
    "giving",
    "donate",
    "philanthropy",
    "csr",
    "foundation",
    "responsibility",
    "grant",
    "community",
];

static EMAIL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[a-zA-Z0-9._%+\-]+@[a-zA-Z0-9.\-]+\.[a-zA-Z]{2,}").unwrap());
static PHONE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\+?1[-.\s]?)?(\(?\d{3}\)?[-.\s]?\d{3}[-.\s]?\d{4})").unwrap()
});

/// Fetches a URL and returns its HTML body.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> anyhow::Result<String>;
}

/// Polite HTTP fetcher with robots.txt consultation.
pub struct HttpFetcher {
    client: reqwest::Client,
    /// Parsed robots rules per host; None means robots.txt was unreadable
    /// and everything is allowed.
    robots: Mutex<HashMap<String, Option<RobotsRules>>>,
    delay_range: (f64, f64),
}

#[derive(Debug, Clone, Default)]
struct RobotsRules {
    disallow: Vec<String>,
    allow: Vec<String>,
}

impl RobotsRules {
    /// Parse the sections applying to us (our bot token or `*`).
    fn parse(content: &str) -> Self {
        let mut rules = Self::default();
        let mut section_applies = false;
        let mut in_agent_lines = false;

        for line in content.lines() {
            let line = line.split('#').next().unwrap_or("").trim();
            if line.is_empty() {
                continue;
            }
            let Some((directive, value)) = line.split_once(':') else {
                continue;
            };
            let directive = directive.trim().to_lowercase();
            let value = value.trim();

            match directive.as_str() {
                "user-agent" => {
                    if !in_agent_lines {
                        section_applies = false;
                        in_agent_lines = true;
                    }
                    let agent = value.to_lowercase();
                    if agent == "*" || agent.contains("furryfriendsshelterbot") {
                        section_applies = true;
                    }
                }
                "disallow" if section_applies && !value.is_empty() => {
                    in_agent_lines = false;
                    rules.disallow.push(value.to_string());
                }
                "allow" if section_applies && !value.is_empty() => {
                    in_agent_lines = false;
                    rules.allow.push(value.to_string());
                }
                _ => in_agent_lines = false,
            }
        }
        rules
    }

    /// Longest-matching-prefix check; allow wins ties over disallow.
    fn allows(&self, path: &str) -> bool {
        let longest = |prefixes: &[String]| {
            prefixes
                .iter()
                .filter(|p| path.starts_with(p.as_str()))
                .map(|p| p.len())
                .max()
        };
        match (longest(&self.allow), longest(&self.disallow)) {
            (Some(allow), Some(disallow)) => allow >= disallow,
            (None, Some(_)) => false,
            _ => true,
        }
    }
}

impl HttpFetcher {
    pub fn new() -> anyhow::Result<Self> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::ACCEPT,
            "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"
                .parse()
                .expect("static header"),
        );
        headers.insert(
            reqwest::header::ACCEPT_LANGUAGE,
            "en-US,en;q=0.5".parse().expect("static header"),
        );

        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(15))
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()?;
        Ok(Self {
            client,
            robots: Mutex::new(HashMap::new()),
            delay_range: (1.5, 3.5),
        })
    }

    /// Shrink the polite delay; test-only lever.
    pub fn with_delay_range(mut self, min_s: f64, max_s: f64) -> Self {
        self.delay_range = (min_s, max_s);
        self
    }

    async fn can_fetch(&self, url: &Url) -> bool {
        let host = match url.host_str() {
            Some(host) => host.to_string(),
            None => return true,
        };

        let cached = self.robots.lock().unwrap().get(&host).cloned();
        let rules = match cached {
            Some(rules) => rules,
            None => {
                let robots_url = format!("{}://{}/robots.txt", url.scheme(), host);
                let fetched = match self.client.get(&robots_url).send().await {
                    Ok(response) if response.status().is_success() => {
                        response.text().await.ok().map(|body| RobotsRules::parse(&body))
                    }
                    // Unreachable or non-200 robots.txt: proceed.
                    _ => None,
                };
                self.robots.lock().unwrap().insert(host, fetched.clone());
                fetched
            }
        };

        rules.map(|r| r.allows(url.path())).unwrap_or(true)
    }

    async fn polite_delay(&self) {
        let (min_s, max_s) = self.delay_range;
        let secs = if max_s > min_s {
            rand::thread_rng().gen_range(min_s..max_s)
        } else {
            min_s
        };
        if secs > 0.0 {
            tokio::time::sleep(Duration::from_secs_f64(secs)).await;
        }
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> anyhow::Result<String> {
        let parsed = Url::parse(url)?;
        if !self.can_fetch(&parsed).await {
            warn!(url, "robots.txt disallows fetch");
            anyhow::bail!("robots.txt disallows {url}");
        }

        self.polite_delay().await;
        debug!(url, "fetching page");
        let response = self.client.get(url).send().await?.error_for_status()?;
        Ok(response.text().await?)
    }
}

/// Everything one page contributes to contact extraction.
#[derive(Debug, Default)]
pub struct PageExtract {
    pub emails: Vec<String>,
    pub phone: Option<String>,
    pub staff: Vec<StaffEntry>,
    pub subpages: Vec<String>,
}

/// Analyze fetched HTML: emails, first phone, staff entries, and
/// candidate subpages. Pure function over the page text.
pub fn analyze_page(html: &str, base_url: &str) -> PageExtract {
    let document = Html::parse_document(html);
    PageExtract {
        emails: extract_emails(&document),
        phone: extract_phone(&document),
        staff: find_staff_entries(&document),
        subpages: find_subpages(&document, base_url),
    }
}

/// All mailto and plaintext email addresses on a page, lowercased, with
/// obvious asset-file false positives stripped.
fn extract_emails(document: &Html) -> Vec<String> {
    let mut emails: HashSet<String> = HashSet::new();

    if let Ok(selector) = Selector::parse("a[href]") {
        for anchor in document.select(&selector) {
            if let Some(href) = anchor.value().attr("href") {
                if let Some(address) = href.strip_prefix("mailto:") {
                    let address = address.split('?').next().unwrap_or("").trim().to_lowercase();
                    if !address.is_empty() {
                        emails.insert(address);
                    }
                }
            }
        }
    }

    let text = document.root_element().text().collect::<String>();
    for found in EMAIL_PATTERN.find_iter(&text) {
        emails.insert(found.as_str().to_lowercase());
    }

    let mut out: Vec<String> = emails
        .into_iter()
        .filter(|email| {
            ![".png", ".jpg", ".gif", ".svg", ".css", ".js"]
                .iter()
                .any(|ext| email.ends_with(ext))
        })
        .collect();
    out.sort();
    out
}

/// First phone-number match in the page text.
fn extract_phone(document: &Html) -> Option<String> {
    let text = document.root_element().text().collect::<String>();
    PHONE_PATTERN
        .find(&text)
        .map(|m| m.as_str().trim().to_string())
}

/// Internal links whose href or anchor text matches the contact-page
/// keyword set.
fn find_subpages(document: &Html, base_url: &str) -> Vec<String> {
    let Ok(base) = Url::parse(base_url) else {
        return Vec::new();
    };
    let Ok(selector) = Selector::parse("a[href]") else {
        return Vec::new();
    };

    let mut found: Vec<String> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();
    for anchor in document.select(&selector) {
        let Some(href) = anchor.value().attr("href") else {
            continue;
        };
        let text = anchor.text().collect::<String>().to_lowercase();
        let href_lower = href.to_lowercase();
        if !CONTACT_PAGE_KEYWORDS
            .iter()
            .any(|kw| href_lower.contains(kw) || text.contains(kw))
        {
            continue;
        }
        let Ok(full) = base.join(href) else {
            continue;
        };
        if full.host_str() != base.host_str() {
            continue;
        }
        let full = full.to_string();
        if full != base_url && seen.insert(full.clone()) {
            found.push(full);
        }
    }
    found
}
