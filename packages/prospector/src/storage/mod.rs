//! Storage collaborator contract.
//!
//! The persistent store is external to this crate; discovery only needs
//! the narrow surface below. Implementations must tolerate being
//! unavailable — callers treat storage failures as per-record issues or
//! empty reads, never as run-fatal.

pub mod memory;
pub mod rest;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::score::normalize_score_10;
use crate::types::{stable_key_from_fields, Confidence, OrganizationCandidate};

pub use memory::MemoryStorage;
pub use rest::RestStorage;

/// What the storage session supports, computed once and passed along.
///
/// Replaces lazily-probed module-level schema flags: the upsert payload
/// builder consults this struct instead of probing at write time.
#[derive(Debug, Clone, Copy)]
pub struct StorageCapabilities {
    /// latitude/longitude columns exist on the organizations table.
    pub geo_columns: bool,
    /// justification/additional_info columns exist.
    pub narrative_columns: bool,
}

impl Default for StorageCapabilities {
    fn default() -> Self {
        Self {
            geo_columns: true,
            narrative_columns: true,
        }
    }
}

/// Identity fields of a stored organization, enough to compute its
/// stable key for cross-run dedup.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrgIdentity {
    pub id: Option<String>,
    #[serde(default)]
    pub name: String,
    pub website: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
}

impl OrgIdentity {
    pub fn stable_key(&self) -> String {
        stable_key_from_fields(
            &self.name,
            self.website.as_deref(),
            self.address.as_deref(),
            self.city.as_deref(),
            self.state.as_deref(),
        )
    }
}

/// A persisted organization row.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrganizationRow {
    pub id: String,
    pub name: String,
    pub website: Option<String>,
    pub category: Option<String>,
    pub donation_potential_score: Option<i64>,
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
}

/// Insert/update payload for an organization, stripped of in-run
/// metadata fields.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewOrganization {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub donation_potential_score: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub justification: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub additional_info: Option<String>,
}

/// Build an upsert payload from a candidate, honoring capabilities.
pub fn new_org_row(
    candidate: &OrganizationCandidate,
    capabilities: StorageCapabilities,
) -> NewOrganization {
    let (city, state, postal) = candidate.location_fields();
    NewOrganization {
        name: candidate.name.clone(),
        website: candidate.website.clone(),
        category: Some(candidate.category.as_str().to_string()),
        donation_potential_score: Some(normalize_score_10(candidate.donation_potential_score)),
        address: candidate.address.clone(),
        city,
        state,
        postal_code: postal,
        latitude: candidate.latitude.filter(|_| capabilities.geo_columns),
        longitude: candidate.longitude.filter(|_| capabilities.geo_columns),
        email: candidate.email.clone(),
        phone: candidate.phone.clone(),
        notes: candidate.notes.clone(),
        justification: candidate
            .justification
            .clone()
            .filter(|_| capabilities.narrative_columns),
        additional_info: candidate
            .additional_info
            .clone()
            .filter(|_| capabilities.narrative_columns),
    }
}

/// A persisted contact row.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContactRow {
    pub id: String,
    pub org_id: Option<String>,
    pub full_name: Option<String>,
    pub title: Option<String>,
    pub email: String,
    pub phone: Option<String>,
    pub justification: Option<String>,
    pub confidence: Option<Confidence>,
}

/// Insert/update payload for a contact. Email is the natural key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewContact {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub org_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub justification: Option<String>,
    pub confidence: Confidence,
}

/// Minimum storage surface the pipeline requires.
#[async_trait]
pub trait Storage: Send + Sync {
    fn capabilities(&self) -> StorageCapabilities;

    /// One page of organization identity fields, for key loading.
    async fn organization_identities(
        &self,
        page: usize,
        page_size: usize,
    ) -> anyhow::Result<Vec<OrgIdentity>>;

    /// Organizations at/above a score floor, best first.
    async fn organizations_with_min_score(
        &self,
        min_score: i64,
        limit: usize,
    ) -> anyhow::Result<Vec<OrganizationRow>>;

    /// Insert or update by (name, website).
    async fn upsert_organization(&self, row: NewOrganization) -> anyhow::Result<OrganizationRow>;

    /// One page of persisted contact emails.
    async fn contact_emails(&self, page: usize, page_size: usize) -> anyhow::Result<Vec<String>>;

    /// Insert or update by email.
    async fn upsert_contact(&self, row: NewContact) -> anyhow::Result<ContactRow>;
}

const KEY_LOAD_PAGE_SIZE: usize = 1000;
// Defensive bound on pagination; worst case one runaway table costs 50 queries.
const KEY_LOAD_MAX_PAGES: usize = 50;

/// Load stable keys of every persisted organization, paginated.
///
/// A page failure returns whatever was loaded so far — missing keys mean
/// some already-stored organizations may resurface, which is preferable
/// to failing the run.
pub async fn load_existing_org_keys(storage: &dyn Storage) -> std::collections::HashSet<String> {
    let mut keys = std::collections::HashSet::new();
    for page in 0..KEY_LOAD_MAX_PAGES {
        let rows = match storage.organization_identities(page, KEY_LOAD_PAGE_SIZE).await {
            Ok(rows) => rows,
            Err(err) => {
                tracing::warn!(error = %err, page, "organization key load stopped early");
                return keys;
            }
        };
        let page_len = rows.len();
        for row in rows {
            keys.insert(row.stable_key());
        }
        if page_len < KEY_LOAD_PAGE_SIZE {
            break;
        }
    }
    keys
}

/// Load every persisted contact email (lowercased), paginated.
pub async fn load_existing_contact_emails(
    storage: &dyn Storage,
) -> std::collections::HashSet<String> {
    let mut emails = std::collections::HashSet::new();
    for page in 0..KEY_LOAD_MAX_PAGES {
        let rows = match storage.contact_emails(page, KEY_LOAD_PAGE_SIZE).await {
            Ok(rows) => rows,
            Err(err) => {
                tracing::warn!(error = %err, page, "contact email load stopped early");
                return emails;
            }
        };
        let page_len = rows.len();
        for email in rows {
            let email = email.trim().to_lowercase();
            if !email.is_empty() {
                emails.insert(email);
            }
        }
        if page_len < KEY_LOAD_PAGE_SIZE {
            break;
        }
    }
    emails
}
