//! In-memory storage implementation for tests and keyless development.
//!
//! Not suitable for production as data is lost on drop. Upserts follow
//! the same natural keys as the real store: (name, website) for
//! organizations, email for contacts.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use uuid::Uuid;

use super::{
    ContactRow, NewContact, NewOrganization, OrgIdentity, OrganizationRow, Storage,
    StorageCapabilities,
};

pub struct MemoryStorage {
    organizations: RwLock<Vec<OrganizationRow>>,
    contacts: RwLock<HashMap<String, ContactRow>>,
    capabilities: StorageCapabilities,
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self {
            organizations: RwLock::new(Vec::new()),
            contacts: RwLock::new(HashMap::new()),
            capabilities: StorageCapabilities::default(),
        }
    }

    pub fn with_capabilities(mut self, capabilities: StorageCapabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn organization_count(&self) -> usize {
        self.organizations.read().unwrap().len()
    }

    pub fn contact_count(&self) -> usize {
        self.contacts.read().unwrap().len()
    }

    pub fn organizations(&self) -> Vec<OrganizationRow> {
        self.organizations.read().unwrap().clone()
    }

    pub fn contacts(&self) -> Vec<ContactRow> {
        self.contacts.read().unwrap().values().cloned().collect()
    }
}

fn natural_key(name: &str, website: Option<&str>) -> (String, String) {
    (
        name.trim().to_lowercase(),
        website.unwrap_or("").trim().to_lowercase(),
    )
}

#[async_trait]
impl Storage for MemoryStorage {
    fn capabilities(&self) -> StorageCapabilities {
        self.capabilities
    }

    async fn organization_identities(
        &self,
        page: usize,
        page_size: usize,
    ) -> anyhow::Result<Vec<OrgIdentity>> {
        let organizations = self.organizations.read().unwrap();
        Ok(organizations
            .iter()
            .skip(page * page_size)
            .take(page_size)
            .map(|row| OrgIdentity {
                id: Some(row.id.clone()),
                name: row.name.clone(),
                website: row.website.clone(),
                address: row.address.clone(),
                city: row.city.clone(),
                state: row.state.clone(),
            })
            .collect())
    }

    async fn organizations_with_min_score(
        &self,
        min_score: i64,
        limit: usize,
    ) -> anyhow::Result<Vec<OrganizationRow>> {
        let organizations = self.organizations.read().unwrap();
        let mut rows: Vec<OrganizationRow> = organizations
            .iter()
            .filter(|row| row.donation_potential_score.unwrap_or(0) >= min_score)
            .cloned()
            .collect();
        rows.sort_by_key(|row| std::cmp::Reverse(row.donation_potential_score.unwrap_or(0)));
        rows.truncate(limit);
        Ok(rows)
    }

    async fn upsert_organization(&self, row: NewOrganization) -> anyhow::Result<OrganizationRow> {
        let mut organizations = self.organizations.write().unwrap();
        let key = natural_key(&row.name, row.website.as_deref());
        let existing = organizations
            .iter_mut()
            .find(|r| natural_key(&r.name, r.website.as_deref()) == key);

        let id = existing
            .as_ref()
            .map(|r| r.id.clone())
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let updated = OrganizationRow {
            id: id.clone(),
            name: row.name,
            website: row.website,
            category: row.category,
            donation_potential_score: row.donation_potential_score,
            address: row.address,
            city: row.city,
            state: row.state,
            postal_code: row.postal_code,
            latitude: row.latitude,
            longitude: row.longitude,
            email: row.email,
            phone: row.phone,
            notes: row.notes,
            justification: row.justification,
            additional_info: row.additional_info,
        };
        match existing {
            Some(slot) => *slot = updated.clone(),
            None => organizations.push(updated.clone()),
        }
        Ok(updated)
    }

    async fn contact_emails(&self, page: usize, page_size: usize) -> anyhow::Result<Vec<String>> {
        let contacts = self.contacts.read().unwrap();
        let mut emails: Vec<String> = contacts.keys().cloned().collect();
        emails.sort();
        Ok(emails
            .into_iter()
            .skip(page * page_size)
            .take(page_size)
            .collect())
    }

    async fn upsert_contact(&self, row: NewContact) -> anyhow::Result<ContactRow> {
        anyhow::ensure!(!row.email.trim().is_empty(), "contact email required");
        let mut contacts = self.contacts.write().unwrap();
        let key = row.email.trim().to_lowercase();
        let id = contacts
            .get(&key)
            .map(|c| c.id.clone())
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let updated = ContactRow {
            id,
            org_id: row.org_id,
            full_name: row.full_name,
            title: row.title,
            email: key.clone(),
            phone: row.phone,
            justification: row.justification,
            confidence: Some(row.confidence),
        };
        contacts.insert(key, updated.clone());
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Confidence;

    fn org(name: &str, website: &str, score: i64) -> NewOrganization {
        NewOrganization {
            name: name.to_string(),
            website: Some(website.to_string()),
            donation_potential_score: Some(score),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_upsert_organization_by_name_website() {
        let storage = MemoryStorage::new();
        let first = storage.upsert_organization(org("Acme", "https://acme.test", 5)).await.unwrap();
        let second = storage.upsert_organization(org("acme", "HTTPS://ACME.TEST", 8)).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(storage.organization_count(), 1);
        assert_eq!(second.donation_potential_score, Some(8));
    }

    #[tokio::test]
    async fn test_min_score_query_sorted_desc() {
        let storage = MemoryStorage::new();
        for (name, score) in [("A", 3), ("B", 9), ("C", 6)] {
            storage
                .upsert_organization(org(name, &format!("https://{name}.test"), score))
                .await
                .unwrap();
        }
        let rows = storage.organizations_with_min_score(5, 10).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].name, "B");
    }

    #[tokio::test]
    async fn test_upsert_contact_by_email() {
        let storage = MemoryStorage::new();
        let contact = NewContact {
            org_id: Some("org-1".to_string()),
            full_name: Some("Jane Doe".to_string()),
            title: Some("Director".to_string()),
            email: "Jane@Org.org".to_string(),
            phone: None,
            justification: None,
            confidence: Confidence::High,
        };
        storage.upsert_contact(contact.clone()).await.unwrap();
        storage.upsert_contact(contact).await.unwrap();
        assert_eq!(storage.contact_count(), 1);

        let emails = storage.contact_emails(0, 100).await.unwrap();
        assert_eq!(emails, vec!["jane@org.org".to_string()]);
    }

    #[tokio::test]
    async fn test_upsert_contact_requires_email() {
        let storage = MemoryStorage::new();
        let result = storage
            .upsert_contact(NewContact {
                org_id: None,
                full_name: Some("No Email".to_string()),
                title: None,
                email: "  ".to_string(),
                phone: None,
                justification: None,
                confidence: Confidence::Low,
            })
            .await;
        assert!(result.is_err());
    }
}
