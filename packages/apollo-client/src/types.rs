use serde::{Deserialize, Serialize};

/// Input for the mixed people search endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct PeopleSearchInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub q_organization_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub q_organization_domains: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub person_titles: Vec<String>,
    pub page: u32,
    pub per_page: u32,
}

/// Input for the person match (email reveal) endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct PersonMatchInput {
    pub first_name: String,
    pub last_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    pub reveal_personal_emails: bool,
}

/// A person record returned by search or match.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Person {
    pub id: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub name: Option<String>,
    pub title: Option<String>,
    pub email: Option<String>,
    #[serde(default)]
    pub phone_numbers: Vec<PhoneNumber>,
    pub organization: Option<OrganizationRef>,
}

impl Person {
    /// First sanitized phone number, if any.
    pub fn phone(&self) -> Option<&str> {
        self.phone_numbers
            .iter()
            .filter_map(|p| p.sanitized_number.as_deref().or(p.raw_number.as_deref()))
            .next()
    }

    /// Email, treating Apollo's "email_not_unlocked" placeholders as absent.
    pub fn unlocked_email(&self) -> Option<&str> {
        self.email
            .as_deref()
            .filter(|e| e.contains('@') && !e.starts_with("email_not_unlocked"))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PhoneNumber {
    pub raw_number: Option<String>,
    pub sanitized_number: Option<String>,
}

/// Slim organization reference attached to a person.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrganizationRef {
    pub name: Option<String>,
    pub website_url: Option<String>,
    pub primary_domain: Option<String>,
}

/// Response envelope for people search.
#[derive(Debug, Clone, Deserialize)]
pub struct PeopleSearchResponse {
    #[serde(default)]
    pub people: Vec<Person>,
    #[serde(default)]
    pub contacts: Vec<Person>,
}

/// Response envelope for person match.
#[derive(Debug, Clone, Deserialize)]
pub struct PersonMatchResponse {
    pub person: Option<Person>,
}
