//! People-search enrichment via the Apollo API.
//!
//! Optional stage: search people at an organization by name/domain and
//! role titles, then attempt a best-effort match call per result to
//! resolve a verified email/phone. Match failures keep the unenriched
//! record; any stage failure degrades to no enrichment.

use apollo_client::{ApolloClient, Person};
use tracing::{debug, warn};
use url::Url;

use crate::config::Config;
use crate::types::{Confidence, ContactCandidate, ContactProvenance};

const ROLE_TITLES: [&str; 6] = [
    "ceo",
    "president",
    "executive director",
    "director of development",
    "community relations",
    "csr manager",
];
const SEARCH_LIMIT: u32 = 5;

pub struct ApolloEnricher {
    client: ApolloClient,
}

impl ApolloEnricher {
    /// Build from config; `None` when no API key is configured.
    pub fn from_config(config: &Config) -> Option<Self> {
        config
            .apollo_api_key
            .clone()
            .map(|key| Self { client: ApolloClient::new(key) })
    }

    /// Search and enrich people for one organization.
    pub async fn enrich(&self, org_name: &str, website: Option<&str>) -> Vec<ContactCandidate> {
        let domain = website.and_then(domain_of);
        let titles: Vec<String> = ROLE_TITLES.iter().map(|t| t.to_string()).collect();

        let people = match self
            .client
            .search_people(org_name, domain.as_deref(), &titles, SEARCH_LIMIT)
            .await
        {
            Ok(people) => people,
            Err(err) => {
                warn!(org_name, error = %err, "Apollo people search failed");
                return Vec::new();
            }
        };

        let mut contacts = Vec::new();
        for person in people {
            contacts.push(self.enrich_person(person, domain.as_deref()).await);
        }
        debug!(org_name, count = contacts.len(), "Apollo enrichment done");
        contacts
    }

    async fn enrich_person(&self, person: Person, domain: Option<&str>) -> ContactCandidate {
        let mut resolved = person.clone();
        if person.unlocked_email().is_none() {
            if let (Some(first), Some(last)) =
                (person.first_name.as_deref(), person.last_name.as_deref())
            {
                match self.client.match_person(first, last, domain).await {
                    Ok(Some(matched)) => resolved = matched,
                    Ok(None) => {}
                    Err(err) => {
                        debug!(first, last, error = %err, "Apollo match failed, keeping search record")
                    }
                }
            }
        }

        let full_name = resolved.name.clone().or_else(|| {
            match (&resolved.first_name, &resolved.last_name) {
                (Some(first), Some(last)) => Some(format!("{first} {last}")),
                (Some(first), None) => Some(first.clone()),
                _ => None,
            }
        });
        let email = resolved.unlocked_email().map(str::to_string);

        let mut contact = ContactCandidate::new(ContactProvenance::Apollo);
        contact.confidence = if email.is_some() {
            Confidence::High
        } else {
            Confidence::Medium
        };
        contact.full_name = full_name;
        contact.title = resolved.title.clone();
        contact.email = email;
        contact.phone = resolved.phone().map(str::to_string);
        contact.justification = Some("Found via Apollo people search by organization and role.".to_string());
        contact
    }
}

fn domain_of(website: &str) -> Option<String> {
    let candidate = if website.contains("://") {
        website.to_string()
    } else {
        format!("https://{website}")
    };
    Url::parse(&candidate)
        .ok()
        .and_then(|url| url.host_str().map(|h| h.trim_start_matches("www.").to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_of() {
        assert_eq!(domain_of("https://www.acme.test/about"), Some("acme.test".to_string()));
        assert_eq!(domain_of("acme.test"), Some("acme.test".to_string()));
        assert_eq!(domain_of("not a url"), None);
    }
}
