//! Integration tests for the contact-extraction pipeline.
//!
//! Drives the extractor over canned pages: staff-card detection, email
//! matching, subpage discovery, the render fallback, preview enrichment,
//! and persistence against the in-memory store.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use prospector::contacts::ContactExtractor;
use prospector::deadline::Deadline;
use prospector::storage::{MemoryStorage, NewOrganization, Storage};
use prospector::testing::{StaticFetcher, StaticRenderer};
use prospector::types::{Category, Confidence, ContactProvenance, OrganizationCandidate};

// =============================================================================
// Test Helpers
// =============================================================================

const TEAM_PAGE: &str = r#"
    <html><body>
        <div class="team-member"><h3>Jane Doe</h3><p>Director of Development</p></div>
        <a href="mailto:jane@org.org">Email Jane</a>
    </body></html>
"#;

fn org(website: &str) -> OrganizationCandidate {
    OrganizationCandidate::seed("Friends of Ferals", website, Category::Nonprofit, 7, "")
}

fn extractor_with(fetcher: StaticFetcher) -> ContactExtractor {
    ContactExtractor::new(Arc::new(fetcher))
}

// =============================================================================
// Static scrape
// =============================================================================

#[tokio::test]
async fn test_team_card_yields_one_high_confidence_contact() {
    let extractor = extractor_with(StaticFetcher::new().with_page("https://org.org", TEAM_PAGE));

    let contacts = extractor.extract_for_org(&org("https://org.org"), Deadline::never()).await;

    assert_eq!(contacts.len(), 1);
    let contact = &contacts[0];
    assert_eq!(contact.full_name.as_deref(), Some("Jane Doe"));
    assert_eq!(contact.title.as_deref(), Some("Director of Development"));
    assert_eq!(contact.email.as_deref(), Some("jane@org.org"));
    assert_eq!(contact.confidence, Confidence::High);
    assert_eq!(contact.provenance, ContactProvenance::Scraped);
    assert_eq!(contact.organization_name.as_deref(), Some("Friends of Ferals"));
    assert!(contact.organization_key.is_some());
}

#[tokio::test]
async fn test_no_identityless_contact_for_any_input() {
    let pages = [
        "",
        "<html><body><p>Nothing here</p></body></html>",
        "<div class='team-member'><h3></h3><p>CEO</p></div>",
        "<h3>Not a person</h3>",
        "<p>reach us at (503) 555-0100</p>",
    ];
    for page in pages {
        let extractor = extractor_with(StaticFetcher::new().with_page("https://org.org", page));
        let contacts = extractor.extract_for_org(&org("https://org.org"), Deadline::never()).await;
        for contact in &contacts {
            assert!(contact.has_identity(), "identityless contact from {page:?}");
        }
    }
}

#[tokio::test]
async fn test_subpage_discovery_collects_contact_email() {
    let homepage = r#"<html><body><a href="/contact">Contact us</a></body></html>"#;
    let contact_page = r#"<html><body><a href="mailto:giving@org.org">Give</a></body></html>"#;
    let fetcher = Arc::new(
        StaticFetcher::new()
            .with_page("https://org.org", homepage)
            .with_page("https://org.org/contact", contact_page),
    );
    let extractor = ContactExtractor::new(fetcher.clone());

    let contacts = extractor.extract_for_org(&org("https://org.org"), Deadline::never()).await;

    assert_eq!(contacts.len(), 1);
    assert_eq!(contacts[0].email.as_deref(), Some("giving@org.org"));
    assert_eq!(contacts[0].title.as_deref(), Some("General Contact"));
    assert_eq!(contacts[0].confidence, Confidence::Low);
    assert!(fetcher
        .fetched_urls()
        .contains(&"https://org.org/contact".to_string()));
}

#[tokio::test]
async fn test_expired_deadline_skips_all_fetching() {
    let fetcher = Arc::new(StaticFetcher::new().with_page("https://org.org", TEAM_PAGE));
    let extractor = ContactExtractor::new(fetcher.clone());

    let contacts = extractor
        .extract_for_org(&org("https://org.org"), Deadline::after(Duration::ZERO))
        .await;

    assert!(contacts.is_empty());
    assert!(fetcher.fetched_urls().is_empty());
}

// =============================================================================
// Render fallback
// =============================================================================

#[tokio::test]
async fn test_render_fallback_runs_only_when_static_is_empty() {
    let rendered = r#"<div class="staff-card"><h3>Rene Derer</h3><p>Executive Director</p></div>"#;

    // Static pass finds nothing: the renderer's output is used.
    let empty_site = StaticFetcher::new().with_page("https://org.org", "<html><body></body></html>");
    let extractor =
        extractor_with(empty_site).with_renderer(Arc::new(StaticRenderer::new(rendered)));
    let contacts = extractor.extract_for_org(&org("https://org.org"), Deadline::never()).await;
    assert_eq!(contacts.len(), 1);
    assert_eq!(contacts[0].provenance, ContactProvenance::Rendered);
    assert_eq!(contacts[0].full_name.as_deref(), Some("Rene Derer"));

    // Static pass succeeds: the renderer must not contribute.
    let real_site = StaticFetcher::new().with_page("https://org.org", TEAM_PAGE);
    let extractor =
        extractor_with(real_site).with_renderer(Arc::new(StaticRenderer::new(rendered)));
    let contacts = extractor.extract_for_org(&org("https://org.org"), Deadline::never()).await;
    assert!(contacts.iter().all(|c| c.provenance == ContactProvenance::Scraped));
}

// =============================================================================
// Preview mode
// =============================================================================

#[tokio::test]
async fn test_preview_classifies_roles_and_skips_known_emails() {
    let extractor = extractor_with(StaticFetcher::new().with_page("https://org.org", TEAM_PAGE));
    let orgs = vec![org("https://org.org")];

    let fresh = extractor
        .preview_for_orgs(&orgs, &HashSet::new(), Deadline::never())
        .await;
    assert_eq!(fresh.len(), 1);
    assert_eq!(fresh[0].role_category.as_deref(), Some("Giving Manager"));
    assert!(fresh[0].record_key.as_deref().unwrap_or("").starts_with("contact:"));
    assert!(fresh[0].justification.is_some());

    let known: HashSet<String> = ["jane@org.org".to_string()].into_iter().collect();
    let repeat = extractor.preview_for_orgs(&orgs, &known, Deadline::never()).await;
    assert!(repeat.is_empty());
}

// =============================================================================
// Persistence mode
// =============================================================================

#[tokio::test]
async fn test_run_extraction_persists_then_skips_existing() {
    let store = MemoryStorage::new();
    store
        .upsert_organization(NewOrganization {
            name: "Friends of Ferals".to_string(),
            website: Some("https://org.org".to_string()),
            donation_potential_score: Some(8),
            ..Default::default()
        })
        .await
        .unwrap();

    let extractor = extractor_with(StaticFetcher::new().with_page("https://org.org", TEAM_PAGE));

    let saved = extractor
        .run_extraction(&store, 5, None, None, Deadline::never())
        .await
        .unwrap();
    assert_eq!(saved, 1);
    let contacts = store.contacts();
    assert_eq!(contacts.len(), 1);
    assert_eq!(contacts[0].email, "jane@org.org");
    assert_eq!(contacts[0].full_name.as_deref(), Some("Jane Doe"));
    assert!(contacts[0].org_id.is_some());

    // The persisted email is loaded up front on the next run and skipped.
    let again = extractor
        .run_extraction(&store, 5, None, None, Deadline::never())
        .await
        .unwrap();
    assert_eq!(again, 0);
    assert_eq!(store.contact_count(), 1);
}

#[tokio::test]
async fn test_run_extraction_respects_score_floor() {
    let store = MemoryStorage::new();
    store
        .upsert_organization(NewOrganization {
            name: "Low Fit Shop".to_string(),
            website: Some("https://org.org".to_string()),
            donation_potential_score: Some(3),
            ..Default::default()
        })
        .await
        .unwrap();

    let extractor = extractor_with(StaticFetcher::new().with_page("https://org.org", TEAM_PAGE));
    let saved = extractor
        .run_extraction(&store, 5, None, None, Deadline::never())
        .await
        .unwrap();
    assert_eq!(saved, 0);
    assert_eq!(store.contact_count(), 0);
}
