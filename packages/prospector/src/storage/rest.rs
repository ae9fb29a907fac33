//! PostgREST-style HTTP storage implementation.
//!
//! Range-paginated selects and natural-key upserts against a Supabase
//! REST endpoint. Row access is governed by the endpoint's row-level
//! policies; this client only carries the publishable key.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use super::{
    ContactRow, NewContact, NewOrganization, OrgIdentity, OrganizationRow, Storage,
    StorageCapabilities,
};
use crate::config::Config;

pub struct RestStorage {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    capabilities: StorageCapabilities,
}

impl RestStorage {
    /// Build from config; `None` when URL or key is not configured.
    pub fn from_config(config: &Config) -> Option<Self> {
        let base_url = config.storage_url.clone()?;
        let api_key = config.storage_key.clone()?;
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(15))
            .build()
            .ok()?;
        Some(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            capabilities: StorageCapabilities::default(),
        })
    }

    pub fn with_capabilities(mut self, capabilities: StorageCapabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    fn request(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        builder
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }

    async fn select(
        &self,
        table: &str,
        query: &[(&str, &str)],
        page: Option<(usize, usize)>,
    ) -> anyhow::Result<Vec<Value>> {
        let mut request = self.request(self.client.get(self.table_url(table))).query(query);
        if let Some((page, page_size)) = page {
            let from = page * page_size;
            let to = from + page_size - 1;
            request = request.header("Range", format!("{from}-{to}"));
        }
        let rows: Vec<Value> = request.send().await?.error_for_status()?.json().await?;
        Ok(rows)
    }
}

#[async_trait]
impl Storage for RestStorage {
    fn capabilities(&self) -> StorageCapabilities {
        self.capabilities
    }

    async fn organization_identities(
        &self,
        page: usize,
        page_size: usize,
    ) -> anyhow::Result<Vec<OrgIdentity>> {
        let rows = self
            .select(
                "organizations",
                &[("select", "id,name,website,address,city,state")],
                Some((page, page_size)),
            )
            .await?;
        Ok(rows
            .into_iter()
            .filter_map(|row| serde_json::from_value(row).ok())
            .collect())
    }

    async fn organizations_with_min_score(
        &self,
        min_score: i64,
        limit: usize,
    ) -> anyhow::Result<Vec<OrganizationRow>> {
        let floor = format!("gte.{min_score}");
        let limit = limit.to_string();
        let rows = self
            .select(
                "organizations",
                &[
                    ("select", "*"),
                    ("donation_potential_score", floor.as_str()),
                    ("order", "donation_potential_score.desc"),
                    ("limit", limit.as_str()),
                ],
                None,
            )
            .await?;
        Ok(rows
            .into_iter()
            .filter_map(|row| serde_json::from_value(row).ok())
            .collect())
    }

    async fn upsert_organization(&self, row: NewOrganization) -> anyhow::Result<OrganizationRow> {
        // Natural-key lookup first: (name, website) has no unique
        // constraint server-side, so on_conflict cannot do this for us.
        let name_filter = format!("eq.{}", row.name);
        let website_filter = format!("eq.{}", row.website.clone().unwrap_or_default());
        let existing = self
            .select(
                "organizations",
                &[
                    ("select", "id"),
                    ("name", name_filter.as_str()),
                    ("website", website_filter.as_str()),
                ],
                None,
            )
            .await?;

        let response = if let Some(id) = existing
            .first()
            .and_then(|r| r["id"].as_str())
            .map(str::to_string)
        {
            self.request(self.client.patch(self.table_url("organizations")))
                .query(&[("id", format!("eq.{id}"))])
                .header("Prefer", "return=representation")
                .json(&row)
                .send()
                .await?
        } else {
            self.request(self.client.post(self.table_url("organizations")))
                .header("Prefer", "return=representation")
                .json(&row)
                .send()
                .await?
        };

        let rows: Vec<OrganizationRow> = response.error_for_status()?.json().await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| anyhow::anyhow!("organization upsert returned no row"))
    }

    async fn contact_emails(&self, page: usize, page_size: usize) -> anyhow::Result<Vec<String>> {
        let rows = self
            .select("contacts", &[("select", "email")], Some((page, page_size)))
            .await?;
        Ok(rows
            .into_iter()
            .filter_map(|row| row["email"].as_str().map(str::to_string))
            .collect())
    }

    async fn upsert_contact(&self, row: NewContact) -> anyhow::Result<ContactRow> {
        let response = self
            .request(self.client.post(self.table_url("contacts")))
            .query(&[("on_conflict", "email")])
            .header("Prefer", "resolution=merge-duplicates,return=representation")
            .json(&row)
            .send()
            .await?;
        let rows: Vec<ContactRow> = response.error_for_status()?.json().await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| anyhow::anyhow!("contact upsert returned no row"))
    }
}
