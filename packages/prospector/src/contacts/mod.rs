//! Per-organization contact extraction pipeline.
//!
//! Stage order per organization: people-search enrichment (optional),
//! static scrape, headless-render fallback (only when the static pass
//! found nothing), then merge/dedup/rank. Every stage is gated by the
//! run deadline and degrades to partial output.

pub mod enrich;
pub mod render;
pub mod scrape;
pub mod staff;

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{info, warn};

use crate::config::Config;
use crate::deadline::Deadline;
use crate::planner::contact_justification;
use crate::storage::{self, NewContact, Storage};
use crate::types::{Confidence, ContactCandidate, ContactProvenance, OrganizationCandidate};

pub use enrich::ApolloEnricher;
pub use render::{BrowserlessRenderer, PageRenderer};
pub use scrape::{analyze_page, HttpFetcher, PageFetcher};
pub use staff::{classify_contact_role, match_email_to_person, pick_best_email, score_title, StaffEntry};

const MAX_SUBPAGES: usize = 6;
const RENDERED_STAFF_CAP: usize = 5;
const PREVIEW_PER_ORG: usize = 5;
const EXTRACTION_ORG_LIMIT: usize = 500;

pub struct ContactExtractor {
    fetcher: Arc<dyn PageFetcher>,
    renderer: Option<Arc<dyn PageRenderer>>,
    enricher: Option<ApolloEnricher>,
}

impl ContactExtractor {
    pub fn new(fetcher: Arc<dyn PageFetcher>) -> Self {
        Self {
            fetcher,
            renderer: None,
            enricher: None,
        }
    }

    /// Wire the real fetcher and whichever optional collaborators the
    /// config enables.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let mut extractor = Self::new(Arc::new(HttpFetcher::new()?));
        if let Some(renderer) = BrowserlessRenderer::from_config(config) {
            extractor.renderer = Some(Arc::new(renderer));
        }
        extractor.enricher = ApolloEnricher::from_config(config);
        Ok(extractor)
    }

    pub fn with_renderer(mut self, renderer: Arc<dyn PageRenderer>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    pub fn with_enricher(mut self, enricher: ApolloEnricher) -> Self {
        self.enricher = Some(enricher);
        self
    }

    /// Run the full pipeline for one organization.
    ///
    /// Output never contains a contact with neither email nor name.
    pub async fn extract_for_org(
        &self,
        org: &OrganizationCandidate,
        deadline: Deadline,
    ) -> Vec<ContactCandidate> {
        let mut contacts = Vec::new();

        if let Some(enricher) = &self.enricher {
            if !deadline.expired() {
                contacts.extend(enricher.enrich(&org.name, org.website.as_deref()).await);
            }
        }

        if let Some(website) = org.website.as_deref().filter(|w| !w.is_empty()) {
            if !deadline.expired() {
                let scraped = self.extract_static(website, deadline).await;
                if scraped.is_empty() {
                    contacts.extend(self.extract_rendered(website, deadline).await);
                } else {
                    contacts.extend(scraped);
                }
            }
        }

        let mut merged = rank_and_dedupe(contacts);
        for contact in &mut merged {
            contact.organization_key = Some(org.stable_key());
            contact.organization_name = Some(org.name.clone());
            contact.organization_website = org.website.clone();
            let (city, state, _) = org.location_fields();
            contact.organization_city = city;
            contact.organization_state = state;
        }
        merged
    }

    /// Static scrape: homepage plus up to 6 keyword-matched subpages.
    async fn extract_static(&self, website: &str, deadline: Deadline) -> Vec<ContactCandidate> {
        let homepage = match self.fetcher.fetch(website).await {
            Ok(html) => html,
            Err(err) => {
                warn!(website, error = %err, "homepage fetch failed");
                return Vec::new();
            }
        };

        let first = analyze_page(&homepage, website);
        let mut all_emails: HashSet<String> = first.emails.iter().cloned().collect();
        let mut best_phone = first.phone;
        let mut staff = first.staff;

        for subpage in first.subpages.iter().take(MAX_SUBPAGES) {
            if deadline.expired() {
                break;
            }
            let html = match self.fetcher.fetch(subpage).await {
                Ok(html) => html,
                Err(err) => {
                    warn!(url = subpage.as_str(), error = %err, "subpage fetch failed");
                    continue;
                }
            };
            let extract = analyze_page(&html, website);
            all_emails.extend(extract.emails);
            if best_phone.is_none() {
                best_phone = extract.phone;
            }
            staff.extend(extract.staff);
        }

        let mut emails: Vec<String> = all_emails.into_iter().collect();
        emails.sort();
        build_contacts(&staff, &emails, best_phone, ContactProvenance::Scraped, usize::MAX)
    }

    /// Re-run the static heuristics over JS-rendered HTML.
    async fn extract_rendered(&self, website: &str, deadline: Deadline) -> Vec<ContactCandidate> {
        let Some(renderer) = &self.renderer else {
            return Vec::new();
        };
        if deadline.expired() {
            return Vec::new();
        }
        let html = match renderer.render(website).await {
            Ok(html) => html,
            Err(err) => {
                warn!(website, error = %err, "render fallback failed");
                return Vec::new();
            }
        };
        let extract = analyze_page(&html, website);
        build_contacts(
            &extract.staff,
            &extract.emails,
            extract.phone,
            ContactProvenance::Rendered,
            RENDERED_STAFF_CAP,
        )
    }

    /// Preview-mode extraction for dry-run discovery (no writes).
    ///
    /// Enriches surviving records with a role category, a record key, and
    /// justification text; contacts whose email is already persisted are
    /// dropped.
    pub async fn preview_for_orgs(
        &self,
        orgs: &[OrganizationCandidate],
        existing_emails: &HashSet<String>,
        deadline: Deadline,
    ) -> Vec<ContactCandidate> {
        let mut results = Vec::new();
        let mut seen_keys: HashSet<String> = HashSet::new();

        for org in orgs {
            if deadline.expired() {
                break;
            }
            if org.website.as_deref().unwrap_or("").is_empty() {
                continue;
            }
            let org_key = org
                .preview_key
                .clone()
                .unwrap_or_else(|| org.stable_key());

            let contacts = self.extract_for_org(org, deadline).await;
            for mut contact in contacts.into_iter().take(PREVIEW_PER_ORG) {
                let email = contact
                    .email
                    .as_deref()
                    .unwrap_or("")
                    .trim()
                    .to_lowercase();
                if !email.is_empty() && existing_emails.contains(&email) {
                    continue;
                }
                if !contact.has_identity() {
                    continue;
                }
                let name = contact.full_name.as_deref().unwrap_or("").trim().to_string();
                let title = contact.title.as_deref().unwrap_or("").trim().to_lowercase();
                let identity = if email.is_empty() { name } else { email.clone() };
                let dedupe_key = format!("{org_key}|{identity}|{title}");
                if !seen_keys.insert(dedupe_key.clone()) {
                    continue;
                }

                contact.role_category =
                    Some(classify_contact_role(contact.title.as_deref()).to_string());
                contact.organization_key = Some(org_key.clone());
                contact.record_key = Some(format!("contact:{dedupe_key}"));
                contact.justification = Some(contact_justification(&contact));
                results.push(contact);
            }
        }
        results
    }

    /// Persistence-mode extraction: load organizations at/above a score
    /// floor, extract per org under the deadline, upsert contacts by
    /// email. One bad record never aborts the batch. Returns saved count.
    pub async fn run_extraction(
        &self,
        store: &dyn Storage,
        min_score: i64,
        org_ids: Option<&[String]>,
        org_limit: Option<usize>,
        deadline: Deadline,
    ) -> anyhow::Result<usize> {
        let mut orgs = store
            .organizations_with_min_score(min_score, EXTRACTION_ORG_LIMIT)
            .await?;
        if let Some(ids) = org_ids {
            let wanted: HashSet<&str> = ids.iter().map(String::as_str).collect();
            orgs.retain(|org| wanted.contains(org.id.as_str()));
        }
        if let Some(limit) = org_limit {
            orgs.truncate(limit.max(1));
        }
        info!(count = orgs.len(), "organizations selected for contact extraction");

        let existing_emails = storage::load_existing_contact_emails(store).await;
        let mut saved = 0usize;

        for org in &orgs {
            if deadline.expired() {
                info!("deadline reached during contact extraction, stopping");
                break;
            }
            let Some(website) = org.website.as_deref().filter(|w| !w.is_empty()) else {
                continue;
            };
            let candidate = OrganizationCandidate::seed(
                &org.name,
                website,
                crate::types::Category::Other,
                org.donation_potential_score.unwrap_or(5),
                org.notes.as_deref().unwrap_or(""),
            );

            for contact in self.extract_for_org(&candidate, deadline).await {
                let Some(email) = contact
                    .email
                    .as_deref()
                    .map(|e| e.trim().to_lowercase())
                    .filter(|e| !e.is_empty())
                else {
                    continue;
                };
                if existing_emails.contains(&email) {
                    continue;
                }
                let row = NewContact {
                    org_id: Some(org.id.clone()),
                    full_name: contact.full_name.clone(),
                    title: contact.title.clone(),
                    email,
                    phone: contact.phone.clone(),
                    justification: contact.justification.clone(),
                    confidence: contact.confidence,
                };
                match store.upsert_contact(row).await {
                    Ok(_) => saved += 1,
                    Err(err) => {
                        warn!(org = org.name.as_str(), error = %err, "contact upsert failed")
                    }
                }
            }
        }

        info!(saved, "contact extraction complete");
        Ok(saved)
    }
}

/// Build contact candidates from staff entries and the collected email
/// pool; with no named staff, fall back to one generic low-confidence
/// contact for the best available address.
fn build_contacts(
    staff: &[StaffEntry],
    emails: &[String],
    phone: Option<String>,
    provenance: ContactProvenance,
    staff_cap: usize,
) -> Vec<ContactCandidate> {
    let mut contacts = Vec::new();

    if !staff.is_empty() {
        let mut seen_names: HashSet<String> = HashSet::new();
        for entry in staff.iter().take(staff_cap) {
            let name_key = entry.full_name.trim().to_lowercase();
            if !seen_names.insert(name_key) {
                continue;
            }
            let email = match_email_to_person(&entry.full_name, emails);
            let mut contact = ContactCandidate::new(provenance);
            contact.confidence = if email.is_some() {
                Confidence::High
            } else {
                Confidence::Medium
            };
            contact.full_name = Some(entry.full_name.clone());
            contact.title = Some(entry.title.clone());
            contact.email = email;
            contact.phone = phone.clone();
            contact.justification = Some(format!(
                "Identified via staff/team page as {}. Relevant role for donation outreach.",
                entry.title
            ));
            contacts.push(contact);
        }
    } else if let Some(best) = pick_best_email(emails) {
        let mut contact = ContactCandidate::new(provenance);
        contact.title = Some("General Contact".to_string());
        contact.email = Some(best);
        contact.phone = phone;
        contact.justification = Some("Best available contact email from website.".to_string());
        contacts.push(contact);
    }

    contacts
}

/// Composite ranking score for merge ordering.
fn rank_score(contact: &ContactCandidate) -> i64 {
    let mut score = 0i64;
    if contact.provenance == ContactProvenance::Apollo {
        score += 5;
    }
    if contact.email.is_some() {
        score += 3;
    }
    if contact.phone.is_some() {
        score += 2;
    }
    score + contact.title.as_deref().map(score_title).unwrap_or(0).min(5)
}

/// Dedup by (email, name, title) lowercased, first occurrence winning,
/// then sort by composite score descending. Contacts with neither email
/// nor name are dropped here, making the invariant hold at every exit.
fn rank_and_dedupe(contacts: Vec<ContactCandidate>) -> Vec<ContactCandidate> {
    let mut seen: HashSet<(String, String, String)> = HashSet::new();
    let mut unique: Vec<ContactCandidate> = Vec::new();
    for contact in contacts {
        if !contact.has_identity() {
            continue;
        }
        let key = (
            contact.email.as_deref().unwrap_or("").trim().to_lowercase(),
            contact.full_name.as_deref().unwrap_or("").trim().to_lowercase(),
            contact.title.as_deref().unwrap_or("").trim().to_lowercase(),
        );
        if seen.insert(key) {
            unique.push(contact);
        }
    }
    unique.sort_by_key(|contact| std::cmp::Reverse(rank_score(contact)));
    unique
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contact(
        name: Option<&str>,
        email: Option<&str>,
        title: Option<&str>,
        provenance: ContactProvenance,
    ) -> ContactCandidate {
        let mut c = ContactCandidate::new(provenance);
        c.full_name = name.map(str::to_string);
        c.email = email.map(str::to_string);
        c.title = title.map(str::to_string);
        c
    }

    #[test]
    fn test_rank_and_dedupe_drops_identityless() {
        let list = vec![
            contact(None, None, Some("CEO"), ContactProvenance::Scraped),
            contact(Some("Jane Doe"), None, None, ContactProvenance::Scraped),
        ];
        let out = rank_and_dedupe(list);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].full_name.as_deref(), Some("Jane Doe"));
    }

    #[test]
    fn test_rank_and_dedupe_key_and_order() {
        let list = vec![
            contact(Some("Jane Doe"), Some("jane@org.org"), Some("CEO"), ContactProvenance::Scraped),
            contact(Some("JANE DOE"), Some("Jane@org.org"), Some("ceo"), ContactProvenance::Rendered),
            contact(Some("Generic"), None, None, ContactProvenance::Scraped),
            contact(Some("Apollo Person"), Some("ap@org.org"), Some("CEO"), ContactProvenance::Apollo),
        ];
        let out = rank_and_dedupe(list);
        assert_eq!(out.len(), 3);
        // Apollo-sourced with email ranks first.
        assert_eq!(out[0].full_name.as_deref(), Some("Apollo Person"));
    }

    #[test]
    fn test_build_contacts_generic_fallback() {
        let emails = vec!["careers@org.org".to_string(), "info@org.org".to_string()];
        let out = build_contacts(&[], &emails, None, ContactProvenance::Scraped, usize::MAX);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].email.as_deref(), Some("info@org.org"));
        assert_eq!(out[0].confidence, Confidence::Low);
        assert_eq!(out[0].title.as_deref(), Some("General Contact"));
    }

    #[test]
    fn test_build_contacts_name_dedup_first_wins() {
        let staff = vec![
            StaffEntry {
                full_name: "Jane Doe".to_string(),
                title: "CEO".to_string(),
            },
            StaffEntry {
                full_name: "jane doe".to_string(),
                title: "Founder".to_string(),
            },
        ];
        let out = build_contacts(&staff, &[], None, ContactProvenance::Scraped, usize::MAX);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].title.as_deref(), Some("CEO"));
        assert_eq!(out[0].confidence, Confidence::Medium);
    }
}
