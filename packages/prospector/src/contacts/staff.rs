//! Staff-entry heuristics over parsed pages.
//!
//! Two DOM patterns cover most org sites: structured team cards
//! (class/itemtype hints) and bare heading-followed-by-text pairs. Both
//! are heuristics with known false negatives; a page that lists staff in
//! any other markup yields nothing, which downstream treats as "no named
//! contacts", not an error.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};

/// Role keywords prioritized when scanning staff pages, best first.
const PRIORITY_TITLES: [&str; 17] = [
    "chief executive",
    "ceo",
    "president",
    "executive director",
    "director of development",
    "director of giving",
    "vp of csr",
    "philanthropy",
    "corporate responsibility",
    "community relations",
    "communications",
    "outreach",
    "donations",
    "grants",
    "foundation",
    "partnerships",
    "marketing director",
];

static CARD_CLASS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)team|staff|person|member|bio|card").unwrap());
static TITLE_CLASS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)title|role|position|job").unwrap());

const MAX_ENTRIES: usize = 10;
const MAX_NAME_LEN: usize = 80;

/// A name/title pair found on a staff or team page.
#[derive(Debug, Clone, PartialEq)]
pub struct StaffEntry {
    pub full_name: String,
    pub title: String,
}

/// Priority score for a job title; higher is more relevant to outreach,
/// 0 means irrelevant.
pub fn score_title(title: &str) -> i64 {
    let lowered = title.to_lowercase();
    for (i, keyword) in PRIORITY_TITLES.iter().enumerate() {
        if lowered.contains(keyword) {
            return (PRIORITY_TITLES.len() - i) as i64;
        }
    }
    0
}

/// Map a raw title to a user-facing contact role bucket.
pub fn classify_contact_role(title: Option<&str>) -> &'static str {
    let lowered = match title.map(str::trim).filter(|t| !t.is_empty()) {
        Some(title) => title.to_lowercase(),
        None => return "General Contact",
    };
    let has = |keywords: &[&str]| keywords.iter().any(|k| lowered.contains(k));

    if has(&["owner", "founder", "co-founder", "principal"]) {
        "Business Owner"
    } else if has(&["philanthropy", "giving", "development", "donations", "grants", "foundation"]) {
        "Giving Manager"
    } else if has(&["ceo", "chief executive", "president", "executive director", "director"]) {
        "Executive Leader"
    } else if has(&["community", "outreach", "partnership", "communications", "marketing"]) {
        "Community / Outreach Lead"
    } else {
        "Prospective Contact"
    }
}

/// Heuristically extract staff name + title pairs from a page.
///
/// Only titles scoring above 0 on the priority ladder are kept; results
/// come back sorted by that score descending, capped at 10.
pub fn find_staff_entries(document: &Html) -> Vec<StaffEntry> {
    let mut entries = Vec::new();

    // Pattern 1: structured team cards.
    if let Ok(container) = Selector::parse("div, article, li, section") {
        for card in document.select(&container) {
            let is_card = card
                .value()
                .attr("class")
                .is_some_and(|classes| CARD_CLASS.is_match(classes))
                || card
                    .value()
                    .attr("itemtype")
                    .is_some_and(|itemtype| itemtype.contains("Person"));
            if !is_card {
                continue;
            }
            if let Some(entry) = card_entry(&card) {
                entries.push(entry);
            }
        }
    }

    // Pattern 2: h3/h4 followed by a p/span, common on smaller org sites.
    if let Ok(headings) = Selector::parse("h3, h4") {
        for heading in document.select(&headings) {
            let Some(sibling) = next_text_sibling(&heading) else {
                continue;
            };
            let name = element_text(&heading);
            let title = element_text(&sibling);
            if !name.is_empty() && name.len() < MAX_NAME_LEN && score_title(&title) > 0 {
                entries.push(StaffEntry {
                    full_name: name,
                    title,
                });
            }
        }
    }

    entries.sort_by_key(|entry| std::cmp::Reverse(score_title(&entry.title)));
    entries.truncate(MAX_ENTRIES);
    entries
}

fn card_entry(card: &ElementRef) -> Option<StaffEntry> {
    let name_selector = Selector::parse("h2, h3, h4, strong, b").ok()?;
    let name_tag = card.select(&name_selector).next()?;
    let name = element_text(&name_tag);

    let text_selector = Selector::parse("p, span").ok()?;
    let title_tag = card
        .select(&text_selector)
        .find(|tag| {
            tag.value()
                .attr("class")
                .is_some_and(|classes| TITLE_CLASS.is_match(classes))
        })
        // Second text tag as fallback when no class hints the title.
        .or_else(|| card.select(&text_selector).nth(1));
    let title = title_tag.map(|tag| element_text(&tag)).unwrap_or_default();

    if !name.is_empty() && name.len() < MAX_NAME_LEN && score_title(&title) > 0 {
        Some(StaffEntry {
            full_name: name,
            title,
        })
    } else {
        None
    }
}

fn next_text_sibling<'a>(heading: &ElementRef<'a>) -> Option<ElementRef<'a>> {
    heading
        .next_siblings()
        .filter_map(ElementRef::wrap)
        .find(|el| matches!(el.value().name(), "p" | "span"))
}

fn element_text(element: &ElementRef) -> String {
    element
        .text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Match an email from the pool to a person by first/last-name substring
/// against local parts, else the best generic address.
pub fn match_email_to_person(full_name: &str, emails: &[String]) -> Option<String> {
    let lowered = full_name.to_lowercase();
    let parts: Vec<&str> = lowered.split_whitespace().collect();
    let (Some(first), last) = (parts.first(), parts.last().filter(|_| parts.len() > 1)) else {
        return pick_best_email(emails);
    };

    for email in emails {
        let local = email.split('@').next().unwrap_or("").to_lowercase();
        if local.contains(first) || last.is_some_and(|l| local.contains(l)) {
            return Some(email.clone());
        }
    }
    pick_best_email(emails)
}

/// Pick the most outreach-relevant email from a set: fundraising/CSR
/// addresses first, generic contact addresses next, anything not in the
/// avoid list after that, then first available.
pub fn pick_best_email(emails: &[String]) -> Option<String> {
    const PRIORITY: [&str; 8] = [
        "giving", "donate", "csr", "philanthropy", "grants", "foundation", "development", "partner",
    ];
    const SECONDARY: [&str; 5] = ["contact", "hello", "info", "connect", "outreach"];
    const AVOID: [&str; 11] = [
        "noreply", "no-reply", "support", "help", "sales", "hr", "jobs", "careers", "press",
        "media", "legal",
    ];

    if emails.is_empty() {
        return None;
    }
    for keyword in PRIORITY {
        if let Some(email) = emails.iter().find(|e| e.to_lowercase().contains(keyword)) {
            return Some(email.clone());
        }
    }
    for keyword in SECONDARY {
        if let Some(email) = emails.iter().find(|e| e.to_lowercase().contains(keyword)) {
            return Some(email.clone());
        }
    }
    emails
        .iter()
        .find(|e| !AVOID.iter().any(|kw| e.to_lowercase().contains(kw)))
        .or_else(|| emails.first())
        .cloned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_score_title_ladder() {
        assert!(score_title("Chief Executive Officer") > score_title("Grants Coordinator"));
        assert!(score_title("Director of Development") > 0);
        assert_eq!(score_title("Janitor"), 0);
    }

    #[test]
    fn test_classify_contact_role_buckets() {
        assert_eq!(classify_contact_role(Some("Founder & Owner")), "Business Owner");
        assert_eq!(classify_contact_role(Some("Director of Giving")), "Giving Manager");
        assert_eq!(classify_contact_role(Some("President")), "Executive Leader");
        assert_eq!(
            classify_contact_role(Some("Community Outreach Coordinator")),
            "Community / Outreach Lead"
        );
        assert_eq!(classify_contact_role(Some("Software Engineer")), "Prospective Contact");
        assert_eq!(classify_contact_role(None), "General Contact");
    }

    #[test]
    fn test_find_staff_entries_card_pattern() {
        let html = Html::parse_document(
            r#"<div class="team-member"><h3>Jane Doe</h3><p>Director of Development</p></div>"#,
        );
        let entries = find_staff_entries(&html);
        assert!(entries.contains(&StaffEntry {
            full_name: "Jane Doe".to_string(),
            title: "Director of Development".to_string(),
        }));
    }

    #[test]
    fn test_find_staff_entries_heading_pattern() {
        let html = Html::parse_document(
            r#"<main><h4>John Smith</h4><p>Executive Director</p><h4>Menu</h4><p>Our locations</p></main>"#,
        );
        let entries = find_staff_entries(&html);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].full_name, "John Smith");
    }

    #[test]
    fn test_find_staff_entries_card_title_class_hint() {
        let html = Html::parse_document(
            r#"<div class="staff-card">
                <h2>Ann Lee</h2>
                <span>Portland, OR</span>
                <span class="job-title">VP of CSR</span>
            </div>"#,
        );
        let entries = find_staff_entries(&html);
        assert_eq!(entries[0].title, "VP of CSR");
    }

    #[test]
    fn test_find_staff_entries_rejects_long_names_and_zero_titles() {
        let long_name = "X".repeat(100);
        let html = Html::parse_document(&format!(
            r#"<div class="team"><h3>{long_name}</h3><p>CEO</p></div>
               <div class="team"><h3>Real Person</h3><p>Warehouse Associate</p></div>"#
        ));
        assert!(find_staff_entries(&html).is_empty());
    }

    #[test]
    fn test_find_staff_entries_sorted_by_title_score() {
        let html = Html::parse_document(
            r#"<div class="team"><h3>A Grants</h3><p>Grants Manager</p></div>
               <div class="team"><h3>B Chief</h3><p>CEO</p></div>"#,
        );
        let entries = find_staff_entries(&html);
        assert_eq!(entries[0].full_name, "B Chief");
    }

    #[test]
    fn test_match_email_prefers_name_match() {
        let emails = vec!["info@org.org".to_string(), "jane@org.org".to_string()];
        assert_eq!(
            match_email_to_person("Jane Doe", &emails),
            Some("jane@org.org".to_string())
        );
        assert_eq!(
            match_email_to_person("Bob Unknown", &emails),
            Some("info@org.org".to_string())
        );
    }

    #[test]
    fn test_pick_best_email_priority_order() {
        let emails = vec![
            "careers@org.org".to_string(),
            "info@org.org".to_string(),
            "giving@org.org".to_string(),
        ];
        assert_eq!(pick_best_email(&emails), Some("giving@org.org".to_string()));

        let avoid_only = vec!["noreply@org.org".to_string()];
        assert_eq!(pick_best_email(&avoid_only), Some("noreply@org.org".to_string()));

        assert_eq!(pick_best_email(&[]), None);
    }
}
