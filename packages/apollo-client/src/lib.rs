//! Pure Apollo.io REST API client.
//!
//! A minimal client for the Apollo people-search API. Supports searching
//! people by organization and role titles, and best-effort email/phone
//! resolution through the person match endpoint.
//!
//! # Example
//!
//! ```rust,ignore
//! use apollo_client::ApolloClient;
//!
//! let client = ApolloClient::new("your-api-key".into());
//!
//! let people = client
//!     .search_people("Acme Pet Foods", Some("acmepetfoods.com"), &["ceo".into()], 5)
//!     .await?;
//! for person in &people {
//!     println!("{:?} — {:?}", person.name, person.title);
//! }
//! ```

pub mod error;
pub mod types;

pub use error::{ApolloError, Result};
pub use types::{PeopleSearchInput, Person, PersonMatchInput};

use types::{PeopleSearchResponse, PersonMatchResponse};

const BASE_URL: &str = "https://api.apollo.io/v1";

pub struct ApolloClient {
    client: reqwest::Client,
    api_key: String,
}

impl ApolloClient {
    pub fn new(api_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
        }
    }

    /// Search people at an organization, optionally filtered by role titles.
    pub async fn search_people(
        &self,
        organization_name: &str,
        domain: Option<&str>,
        titles: &[String],
        limit: u32,
    ) -> Result<Vec<Person>> {
        let input = PeopleSearchInput {
            q_organization_name: Some(organization_name.to_string()),
            q_organization_domains: domain.map(|d| d.to_string()),
            person_titles: titles.to_vec(),
            page: 1,
            per_page: limit.clamp(1, 25),
        };

        let url = format!("{}/mixed_people/search", BASE_URL);
        let resp = self
            .client
            .post(&url)
            .header("X-Api-Key", &self.api_key)
            .json(&input)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ApolloError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let search: PeopleSearchResponse = resp.json().await?;
        let mut people = search.people;
        people.extend(search.contacts);
        tracing::debug!(organization_name, count = people.len(), "Apollo people search");
        Ok(people)
    }

    /// Resolve a verified email/phone for an exact (first, last, domain) match.
    ///
    /// Returns `Ok(None)` when Apollo has no matching person.
    pub async fn match_person(
        &self,
        first_name: &str,
        last_name: &str,
        domain: Option<&str>,
    ) -> Result<Option<Person>> {
        let input = PersonMatchInput {
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            domain: domain.map(|d| d.to_string()),
            reveal_personal_emails: false,
        };

        let url = format!("{}/people/match", BASE_URL);
        let resp = self
            .client
            .post(&url)
            .header("X-Api-Key", &self.api_key)
            .json(&input)
            .send()
            .await?;

        let status = resp.status();
        if status.as_u16() == 404 {
            return Ok(None);
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ApolloError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let matched: PersonMatchResponse = resp.json().await?;
        Ok(matched.person)
    }
}
