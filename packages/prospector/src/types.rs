//! Canonical candidate records and the discovery run contract.
//!
//! Each source provider produces raw shapes with different fields; the
//! tagged constructors here unify them into one `OrganizationCandidate`
//! so the rest of the pipeline never touches provider-specific JSON.

use serde::{Deserialize, Serialize};

use crate::location;
use crate::score::{normalize_score_10, ui_score};

/// Coarse organization category assigned at discovery time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    PetIndustry,
    VeganBrand,
    CorporateCsr,
    Foundation,
    Nonprofit,
    Financial,
    LocalBusiness,
    Other,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::PetIndustry => "pet_industry",
            Category::VeganBrand => "vegan_brand",
            Category::CorporateCsr => "corporate_csr",
            Category::Foundation => "foundation",
            Category::Nonprofit => "nonprofit",
            Category::Financial => "financial",
            Category::LocalBusiness => "local_business",
            Category::Other => "other",
        }
    }
}

/// Which provider produced a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceTag {
    Seed,
    SerpApi,
    GooglePlaces,
    Petfinder,
}

/// Per-source candidate counts reported in progress events and outcomes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceCounts {
    pub google_places: usize,
    pub serpapi: usize,
    pub seed: usize,
    pub petfinder: usize,
}

impl SourceCounts {
    pub fn increment(&mut self, source: SourceTag) {
        match source {
            SourceTag::GooglePlaces => self.google_places += 1,
            SourceTag::SerpApi => self.serpapi += 1,
            SourceTag::Seed => self.seed += 1,
            SourceTag::Petfinder => self.petfinder += 1,
        }
    }

    pub fn tally<'a>(candidates: impl IntoIterator<Item = &'a OrganizationCandidate>) -> Self {
        let mut counts = Self::default();
        for candidate in candidates {
            counts.increment(candidate.source);
        }
        counts
    }
}

/// An unconfirmed organization produced by a source provider.
///
/// Mutated only by normalization (location/score enrichment) and
/// justification generation; never after being handed to persistence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrganizationCandidate {
    pub name: String,
    pub website: Option<String>,
    pub category: Category,
    /// 1-10 scale internally; see `score::normalize_score_10`.
    pub donation_potential_score: i64,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub notes: Option<String>,
    pub justification: Option<String>,
    pub additional_info: Option<String>,
    pub source: SourceTag,
    pub place_id: Option<String>,
    pub primary_type: Option<String>,
    #[serde(default)]
    pub place_types: Vec<String>,
    /// Set when the producing query was already location-scoped, which
    /// earns a provisional pass through the location filter.
    #[serde(default)]
    pub location_hint_applied: bool,
    pub preview_key: Option<String>,
}

impl OrganizationCandidate {
    fn base(name: impl Into<String>, source: SourceTag) -> Self {
        Self {
            name: name.into(),
            website: None,
            category: Category::Other,
            donation_potential_score: 5,
            address: None,
            city: None,
            state: None,
            postal_code: None,
            latitude: None,
            longitude: None,
            email: None,
            phone: None,
            notes: None,
            justification: None,
            additional_info: None,
            source,
            place_id: None,
            primary_type: None,
            place_types: Vec::new(),
            location_hint_applied: false,
            preview_key: None,
        }
    }

    /// A hand-curated seed entry with a pre-assigned category and score.
    pub fn seed(
        name: &str,
        website: &str,
        category: Category,
        score: i64,
        notes: &str,
    ) -> Self {
        Self {
            website: Some(website.to_string()),
            category,
            donation_potential_score: score,
            notes: Some(notes.to_string()),
            ..Self::base(name, SourceTag::Seed)
        }
    }

    /// A web-search organic result (title/link/snippet).
    pub fn search_result(
        title: &str,
        link: &str,
        snippet: &str,
        location_scoped: bool,
    ) -> Self {
        Self {
            website: Some(link.to_string()).filter(|l| !l.is_empty()),
            notes: Some(truncate(snippet, 500)).filter(|n| !n.is_empty()),
            location_hint_applied: location_scoped,
            ..Self::base(truncate(title, 200), SourceTag::SerpApi)
        }
    }

    /// A geo-tiled nearby-search place, with coordinates and type tokens.
    #[allow(clippy::too_many_arguments)]
    pub fn place(
        place_id: &str,
        name: &str,
        website: Option<String>,
        category: Category,
        score: i64,
        address: Option<String>,
        latitude: Option<f64>,
        longitude: Option<f64>,
        phone: Option<String>,
        notes: String,
        primary_type: Option<String>,
        place_types: Vec<String>,
    ) -> Self {
        let (city, state, postal) = address
            .as_deref()
            .map(location::parse_city_state_zip)
            .unwrap_or((None, None, None));
        Self {
            website,
            category,
            donation_potential_score: score,
            address,
            city,
            state,
            postal_code: postal,
            latitude,
            longitude,
            phone,
            notes: Some(truncate(&notes, 1200)),
            place_id: Some(place_id.to_string()),
            primary_type: primary_type.map(|t| t.to_lowercase()),
            place_types: place_types.iter().map(|t| t.to_lowercase()).collect(),
            location_hint_applied: true,
            ..Self::base(name, SourceTag::GooglePlaces)
        }
    }

    /// A shelter-listing feed entry.
    pub fn feed_entry(title: &str, link: &str) -> Self {
        Self {
            website: Some(link.to_string()).filter(|l| !l.is_empty()),
            category: Category::Nonprofit,
            notes: Some("Petfinder-listed shelter.".to_string()),
            ..Self::base(truncate(title, 200), SourceTag::Petfinder)
        }
    }

    /// The deterministic identity used for cross-run deduplication.
    ///
    /// A provider place id is source-level identity and wins when present;
    /// otherwise the key is built from the identity-relevant content
    /// fields.
    pub fn stable_key(&self) -> String {
        if let Some(place_id) = self.place_id.as_deref().map(str::trim).filter(|p| !p.is_empty()) {
            return format!("organization|google_place|{}", place_id.to_lowercase());
        }
        stable_key_from_fields(
            &self.name,
            self.website.as_deref(),
            self.address.as_deref(),
            self.city.as_deref(),
            self.state.as_deref(),
        )
    }

    /// City/state/postal from structured fields, falling back to the
    /// `City, ST` and ZIP regexes over address and notes text. Formats the
    /// regexes do not recognize are missed, not errors.
    pub fn location_fields(&self) -> (Option<String>, Option<String>, Option<String>) {
        let mut city = self.city.clone().filter(|c| !c.trim().is_empty());
        let mut state = self
            .state
            .clone()
            .filter(|s| !s.trim().is_empty())
            .map(|s| s.to_uppercase());
        let mut postal = self.postal_code.clone().filter(|p| !p.trim().is_empty());

        let text = format!(
            "{} {}",
            self.address.as_deref().unwrap_or(""),
            self.notes.as_deref().unwrap_or("")
        );
        if (city.is_none() || state.is_none()) && !text.trim().is_empty() {
            if let Some((found_city, found_state)) = location::find_city_state(&text) {
                city = city.or(Some(found_city));
                state = state.or(Some(found_state));
            }
        }
        if postal.is_none() {
            postal = location::find_zip(&text);
        }
        (city, state, postal)
    }

    /// UI-facing row with the 0-100 display score and resolved location.
    pub fn to_record(&self) -> OrganizationRecord {
        let (city, state, postal) = self.location_fields();
        OrganizationRecord {
            record_type: "organization".to_string(),
            record_key: self.stable_key(),
            name: self.name.clone(),
            website: self.website.clone(),
            category: self.category,
            donation_potential_score: ui_score(self.donation_potential_score),
            address: self.address.clone(),
            city,
            state,
            postal_code: postal,
            latitude: self.latitude,
            longitude: self.longitude,
            email: self.email.clone(),
            phone: self.phone.clone(),
            justification: self.justification.clone(),
            additional_info: self.additional_info.clone(),
            notes: self.notes.clone(),
            preview_key: self.preview_key.clone(),
        }
    }

    /// Whether this candidate belongs to the requested discovery mode.
    pub fn matches_mode(&self, mode: DiscoveryMode) -> bool {
        let name = self.name.to_lowercase();
        let notes = self.notes.as_deref().unwrap_or("").to_lowercase();
        let has_type = |token: &str| {
            self.place_types.iter().any(|t| t == token)
                || self.primary_type.as_deref() == Some(token)
        };

        match mode {
            DiscoveryMode::All => true,
            DiscoveryMode::Foundations => {
                self.category == Category::Foundation
                    || ["foundation", "charitable trust", "endowment"]
                        .iter()
                        .any(|k| name.contains(k))
                    || (has_type("nonprofit_organization") && notes.contains("foundation"))
            }
            DiscoveryMode::Nonprofits => {
                matches!(self.category, Category::Nonprofit | Category::Foundation)
                    || has_type("nonprofit_organization")
                    || notes.contains("nonprofit")
            }
            DiscoveryMode::WealthRelated => {
                const WEALTH_TOKENS: [&str; 8] = [
                    "bank",
                    "accounting",
                    "insurance_agency",
                    "real_estate_agency",
                    "lawyer",
                    "financial",
                    "financial_planner",
                    "investment_service",
                ];
                self.category == Category::Financial
                    || self.category == Category::CorporateCsr
                    || WEALTH_TOKENS.iter().any(|t| has_type(t))
                    || ["capital", "wealth", "invest", "holdings", "advisors"]
                        .iter()
                        .any(|k| name.contains(k))
            }
            DiscoveryMode::Businesses => !matches!(
                self.category,
                Category::Foundation | Category::Nonprofit
            ),
        }
    }
}

/// Build a stable key from stored-row identity fields. Shares the exact
/// format with `OrganizationCandidate::stable_key` so in-run candidates
/// and persisted rows dedupe against each other.
pub fn stable_key_from_fields(
    name: &str,
    website: Option<&str>,
    address: Option<&str>,
    city: Option<&str>,
    state: Option<&str>,
) -> String {
    let part = |v: Option<&str>| v.unwrap_or("").trim().to_lowercase();
    format!(
        "organization|{}|{}|{}|{}|{}",
        name.trim().to_lowercase(),
        part(website),
        part(address),
        part(city),
        part(state),
    )
}

/// First-wins dedup on (lowercase name, lowercase website).
///
/// Coarser than `stable_key` on purpose: applied before filtering to cut
/// volume early; the stable key does the authoritative existing-record
/// check afterwards. Nameless candidates are dropped.
pub fn dedupe_candidates(candidates: Vec<OrganizationCandidate>) -> Vec<OrganizationCandidate> {
    let mut seen: std::collections::HashSet<(String, String)> = std::collections::HashSet::new();
    let mut unique = Vec::new();
    for candidate in candidates {
        let name = candidate.name.trim().to_lowercase();
        if name.is_empty() {
            continue;
        }
        let website = candidate
            .website
            .as_deref()
            .unwrap_or("")
            .trim()
            .to_lowercase();
        if seen.insert((name, website)) {
            unique.push(candidate);
        }
    }
    unique
}

/// UI-facing organization row, score on the 0-100 display scale.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrganizationRecord {
    pub record_type: String,
    pub record_key: String,
    pub name: String,
    pub website: Option<String>,
    pub category: Category,
    pub donation_potential_score: i64,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub justification: Option<String>,
    pub additional_info: Option<String>,
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview_key: Option<String>,
}

/// Extraction confidence for a contact candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

/// How a contact candidate was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContactProvenance {
    Apollo,
    Scraped,
    Rendered,
}

/// An unconfirmed outreach contact for one organization.
///
/// References its organization by stable key, not foreign id: the
/// organization may not be persisted yet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactCandidate {
    pub full_name: Option<String>,
    pub title: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub confidence: Confidence,
    pub justification: Option<String>,
    pub provenance: ContactProvenance,
    /// User-facing role bucket ("Giving Manager", "Executive Leader", ...).
    pub role_category: Option<String>,
    pub organization_key: Option<String>,
    pub organization_name: Option<String>,
    pub organization_website: Option<String>,
    pub organization_city: Option<String>,
    pub organization_state: Option<String>,
    pub record_key: Option<String>,
}

impl ContactCandidate {
    pub fn new(provenance: ContactProvenance) -> Self {
        Self {
            full_name: None,
            title: None,
            email: None,
            phone: None,
            confidence: Confidence::Low,
            justification: None,
            provenance,
            role_category: None,
            organization_key: None,
            organization_name: None,
            organization_website: None,
            organization_city: None,
            organization_state: None,
            record_key: None,
        }
    }

    /// A contact with neither an email nor a name is not emittable.
    pub fn has_identity(&self) -> bool {
        self.email.as_deref().is_some_and(|e| !e.trim().is_empty())
            || self.full_name.as_deref().is_some_and(|n| !n.trim().is_empty())
    }
}

/// Coarse category filter narrowing which candidates are relevant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscoveryMode {
    All,
    #[default]
    Businesses,
    Foundations,
    Nonprofits,
    WealthRelated,
}

impl DiscoveryMode {
    /// Normalize loose user input ("foundation", "wealth", "Businesses").
    pub fn parse(value: Option<&str>) -> Self {
        let normalized = value
            .unwrap_or("businesses")
            .trim()
            .to_lowercase()
            .replace('-', "_");
        match normalized.as_str() {
            "all" => DiscoveryMode::All,
            "foundation" | "foundations" => DiscoveryMode::Foundations,
            "nonprofit" | "nonprofits" => DiscoveryMode::Nonprofits,
            "wealth" | "wealth_related" | "wealthrelated" => DiscoveryMode::WealthRelated,
            _ => DiscoveryMode::Businesses,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DiscoveryMode::All => "all",
            DiscoveryMode::Businesses => "businesses",
            DiscoveryMode::Foundations => "foundations",
            DiscoveryMode::Nonprofits => "nonprofits",
            DiscoveryMode::WealthRelated => "wealth_related",
        }
    }
}

fn truncate(value: &str, max: usize) -> String {
    if value.chars().count() <= max {
        value.to_string()
    } else {
        value.chars().take(max).collect()
    }
}
