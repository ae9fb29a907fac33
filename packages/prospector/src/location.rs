//! Parsing of user-supplied locations and best-effort address fields.
//!
//! The regex extraction here is intentionally narrow: it recognizes the
//! common `City, ST` and 5-digit ZIP shapes of US addresses and nothing
//! else. Candidates whose location only appears in some other format are
//! missed (false negatives), which callers treat as "no structured
//! location" rather than an error.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

const STATE_ABBR: [&str; 51] = [
    "AL", "AK", "AZ", "AR", "CA", "CO", "CT", "DE", "FL", "GA", "HI", "ID", "IL", "IN", "IA",
    "KS", "KY", "LA", "ME", "MD", "MA", "MI", "MN", "MS", "MO", "MT", "NE", "NV", "NH", "NJ",
    "NM", "NY", "NC", "ND", "OH", "OK", "OR", "PA", "RI", "SC", "SD", "TN", "TX", "UT", "VT",
    "VA", "WA", "WV", "WI", "WY", "DC",
];

static ZIP_INPUT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{5}(?:-\d{4})?$").unwrap());
static CITY_STATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b([A-Z][a-zA-Z]+(?:\s+[A-Z][a-zA-Z]+)*)\s*,\s*([A-Z]{2})\b").unwrap());
static ZIP_IN_TEXT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{5})(?:-\d{4})?\b").unwrap());
static ADDRESS_TAIL_ZIP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([A-Za-z .'-]+),\s*([A-Z]{2})\s+(\d{5})(?:-\d{4})?(?:,\s*USA)?$").unwrap()
});
static ADDRESS_TAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([A-Za-z .'-]+),\s*([A-Z]{2})(?:,\s*USA)?$").unwrap());

/// Parsed discovery-location input.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LocationFilter {
    /// The input exactly as supplied.
    pub raw: String,
    pub zip_code: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    /// Geocodable query string derived from the input.
    pub query: Option<String>,
}

impl LocationFilter {
    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }
}

/// Parse user-provided discovery location input.
///
/// Supports `City ST`, `City, ST`, and 5-digit ZIP (with optional +4).
pub fn parse_search_location(value: Option<&str>) -> LocationFilter {
    let raw = value.unwrap_or_default().trim().to_string();
    let mut parsed = LocationFilter {
        raw: raw.clone(),
        ..Default::default()
    };
    if raw.is_empty() {
        return parsed;
    }

    if ZIP_INPUT.is_match(&raw) {
        let zip = raw[..5].to_string();
        parsed.query = Some(zip.clone());
        parsed.zip_code = Some(zip);
        return parsed;
    }

    let normalized: Vec<&str> = raw
        .replace(',', " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .into_iter()
        .collect();
    let parts: Vec<String> = normalized.iter().map(|p| p.to_string()).collect();
    if parts.len() >= 2 && STATE_ABBR.contains(&parts[parts.len() - 1].to_uppercase().as_str()) {
        parsed.state = Some(parts[parts.len() - 1].to_uppercase());
        parsed.city = Some(parts[..parts.len() - 1].join(" "));
    } else {
        parsed.city = Some(parts.join(" "));
    }

    let query: Vec<&str> = [parsed.city.as_deref(), parsed.state.as_deref()]
        .into_iter()
        .flatten()
        .collect();
    parsed.query = Some(query.join(", "));
    parsed
}

/// Find a `City, ST` pair in free text.
pub fn find_city_state(text: &str) -> Option<(String, String)> {
    CITY_STATE
        .captures(text)
        .map(|c| (c[1].trim().to_string(), c[2].to_uppercase()))
}

/// Find a 5-digit ZIP in free text.
pub fn find_zip(text: &str) -> Option<String> {
    ZIP_IN_TEXT.captures(text).map(|c| c[1].to_string())
}

/// Parse the trailing `City, ST 12345[, USA]` of a formatted address.
pub fn parse_city_state_zip(address: &str) -> (Option<String>, Option<String>, Option<String>) {
    if address.is_empty() {
        return (None, None, None);
    }
    if let Some(c) = ADDRESS_TAIL_ZIP.captures(address) {
        return (
            Some(c[1].trim().to_string()),
            Some(c[2].to_string()),
            Some(c[3].to_string()),
        );
    }
    if let Some(c) = ADDRESS_TAIL.captures(address) {
        return (Some(c[1].trim().to_string()), Some(c[2].to_string()), None);
    }
    (None, None, None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_city_state_with_and_without_comma() {
        let a = parse_search_location(Some("Portland OR"));
        assert_eq!(a.city.as_deref(), Some("Portland"));
        assert_eq!(a.state.as_deref(), Some("OR"));
        assert_eq!(a.query.as_deref(), Some("Portland, OR"));

        let b = parse_search_location(Some("Portland, OR"));
        assert_eq!(b.city.as_deref(), Some("Portland"));
        assert_eq!(b.state.as_deref(), Some("OR"));
    }

    #[test]
    fn test_parse_zip() {
        let parsed = parse_search_location(Some("97201-1234"));
        assert_eq!(parsed.zip_code.as_deref(), Some("97201"));
        assert_eq!(parsed.query.as_deref(), Some("97201"));
        assert!(parsed.city.is_none());
    }

    #[test]
    fn test_parse_city_only() {
        let parsed = parse_search_location(Some("Lake Oswego"));
        assert_eq!(parsed.city.as_deref(), Some("Lake Oswego"));
        assert!(parsed.state.is_none());
        assert_eq!(parsed.query.as_deref(), Some("Lake Oswego"));
    }

    #[test]
    fn test_parse_empty() {
        assert!(parse_search_location(None).is_empty());
        assert!(parse_search_location(Some("  ")).is_empty());
    }

    #[test]
    fn test_find_city_state_in_notes() {
        let found = find_city_state("Serving families near Lake Oswego, OR since 1998");
        assert_eq!(found, Some(("Lake Oswego".to_string(), "OR".to_string())));
        assert!(find_city_state("no location here").is_none());
    }

    #[test]
    fn test_parse_formatted_address() {
        let (city, state, zip) = parse_city_state_zip("123 SW Main St, Portland, OR 97204, USA");
        assert_eq!(city.as_deref(), Some("Portland"));
        assert_eq!(state.as_deref(), Some("OR"));
        assert_eq!(zip.as_deref(), Some("97204"));

        let (city, state, zip) = parse_city_state_zip("500 Oak Ave, Salem, OR");
        assert_eq!(city.as_deref(), Some("Salem"));
        assert_eq!(state.as_deref(), Some("OR"));
        assert!(zip.is_none());

        assert_eq!(parse_city_state_zip(""), (None, None, None));
    }
}
