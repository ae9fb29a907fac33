//! Source targeting and query planning.
//!
//! Planning fails open, never closed: a configured LLM collaborator can
//! replace the heuristic plan with a more creative one, but any request
//! failure, malformed response, or empty payload falls back to the
//! deterministic heuristic so discovery always has a usable plan.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::warn;

use crate::config::Config;
use crate::score::{normalize_score_10, ui_score};
use crate::types::{Category, ContactCandidate, DiscoveryMode, OrganizationCandidate};

/// Static query bank blended into every search-engine stage.
pub const BASE_QUERIES: [&str; 10] = [
    "pet industry company CSR charitable giving program",
    "vegan brand corporate social responsibility animal welfare donation",
    "animal welfare corporate sponsor national",
    "pet food company philanthropy grant program",
    "dog rescue corporate partner USA",
    "cat shelter corporate donor sponsor program",
    "humane society corporate partner donation",
    "ASPCA corporate sponsor program",
    "Best Friends Animal Society corporate partner",
    "Unique local companies known to be charitable",
];

/// Which planner produced the final plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlannerTag {
    Heuristic,
    Llm,
    /// LLM was configured but failed; the heuristic plan was used.
    HeuristicFallback,
}

/// A named group of related queries with a contribution mode and priority.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryFamily {
    pub family: String,
    pub contribution_mode: String,
    /// 0-10, lower runs first.
    pub priority: i64,
    pub queries: Vec<String>,
}

/// A category of sources worth approaching, with example businesses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceBucket {
    pub bucket: String,
    pub examples: Vec<String>,
    pub why_relevant: String,
}

/// The targeting plan for one discovery run. Immutable once produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourcePlan {
    pub source_types: Vec<String>,
    pub query_focus_terms: Vec<String>,
    pub contribution_modes: Vec<String>,
    pub source_buckets: Vec<SourceBucket>,
    pub role_targets: Vec<String>,
    /// Sorted by (priority, family); at most 16 retained.
    pub query_families: Vec<QueryFamily>,
    pub notes: String,
    pub planner: PlannerTag,
}

/// Criteria driving plan generation, echoed into LLM prompts.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PlanCriteria {
    pub location: Option<String>,
    pub radius_miles: Option<f64>,
    pub min_score: Option<i64>,
    pub discovery_mode: DiscoveryMode,
}

/// Optional LLM collaborator for creative planning and justifications.
///
/// Implementations send a structured prompt and return the raw JSON text
/// of the model's reply. Errors are expected and handled by falling back.
#[async_trait]
pub trait PlannerAssist: Send + Sync {
    async fn complete_json(&self, prompt: &Value) -> anyhow::Result<String>;
}

/// Chat-completions client for the planning assist.
pub struct OpenAiAssist {
    client: reqwest::Client,
    api_key: String,
    api_base: String,
    model: String,
}

impl OpenAiAssist {
    /// Build from config; `None` when no API key is configured.
    pub fn from_config(config: &Config) -> Option<Self> {
        let api_key = config.openai_api_key.clone()?;
        let client = reqwest::Client::builder()
            .connect_timeout(std::time::Duration::from_secs(5))
            .timeout(config.llm_timeout)
            .build()
            .ok()?;
        Some(Self {
            client,
            api_key,
            api_base: config.openai_api_base.trim_end_matches('/').to_string(),
            model: config.llm_model.clone(),
        })
    }
}

#[async_trait]
impl PlannerAssist for OpenAiAssist {
    async fn complete_json(&self, prompt: &Value) -> anyhow::Result<String> {
        let body = json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": "You are a fundraising prospecting assistant. Return valid JSON only."},
                {"role": "user", "content": prompt.to_string()},
            ],
            "temperature": 0.2,
            "response_format": {"type": "json_object"},
        });
        let response = self
            .client
            .post(format!("{}/chat/completions", self.api_base))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?
            .error_for_status()?;
        let payload: Value = response.json().await?;
        let content = payload["choices"][0]["message"]["content"]
            .as_str()
            .unwrap_or("")
            .trim()
            .to_string();
        anyhow::ensure!(!content.is_empty(), "empty completion");
        Ok(content)
    }
}

/// Produce the targeting plan for a run, preferring the LLM when one is
/// configured and falling back to the heuristic plan on any failure.
pub async fn plan_sources(
    assist: Option<&dyn PlannerAssist>,
    criteria: &PlanCriteria,
) -> SourcePlan {
    let fallback = heuristic_plan(criteria);
    let Some(assist) = assist else {
        return fallback;
    };

    match llm_plan(assist, criteria, &fallback).await {
        Ok(Some(plan)) => plan,
        Ok(None) => SourcePlan {
            planner: PlannerTag::Heuristic,
            ..fallback
        },
        Err(err) => {
            warn!(error = %err, "planner assist failed, using heuristic plan");
            SourcePlan {
                planner: PlannerTag::HeuristicFallback,
                ..fallback
            }
        }
    }
}

async fn llm_plan(
    assist: &dyn PlannerAssist,
    criteria: &PlanCriteria,
    fallback: &SourcePlan,
) -> anyhow::Result<Option<SourcePlan>> {
    let prompt = json!({
        "task": "Plan a diverse, creative funding-source discovery strategy for a nonprofit no-kill animal organization.",
        "criteria": {
            "location": criteria.location,
            "radius_miles": criteria.radius_miles,
            "min_score": criteria.min_score,
            "discovery_mode": criteria.discovery_mode.as_str(),
            "goal": "Find net-new potential donors and supporters likely to contribute to an animal welfare nonprofit.",
            "accepted_contribution_types": [
                "cash donations", "corporate sponsorships", "foundation grants",
                "gift cards", "gift certificates", "in-kind goods",
                "in-kind services", "event partnerships",
            ],
        },
        "output_format": {
            "source_types": ["businesses", "nonprofits", "foundations", "grants", "municipal_programs", "wealth_advisors"],
            "query_focus_terms": ["..."],
            "contribution_modes": ["cash", "gift_cards", "in_kind_goods", "in_kind_services", "sponsorships", "grants"],
            "source_buckets": [{"bucket": "gift_cards_certificates", "examples": ["restaurants"], "why_relevant": "short reason"}],
            "role_targets": ["owner", "community relations manager", "csr manager"],
            "query_families": [{"family": "gift_cards_certificates", "contribution_mode": "gift_cards", "priority": 1, "queries": ["gift cards donation local business"]}],
            "notes": "short rationale",
        },
        "constraints": [
            "Prefer practical, searchable source types.",
            "Keep query terms concise and location-relevant.",
            "Include both proven funding sources and creative local partnership ideas.",
            "At least 30% of query_families should target non-cash support (gift cards, goods, or services).",
            "Focus on actionable business/org categories rather than speculative individuals.",
            "Return JSON only.",
        ],
    });

    let content = assist.complete_json(&prompt).await?;
    let data: Value = serde_json::from_str(&content)?;

    let source_types = string_list(&data["source_types"], 12);
    let query_focus_terms = string_list(&data["query_focus_terms"], 24);
    let contribution_modes = string_list(&data["contribution_modes"], 16);
    let role_targets = string_list(&data["role_targets"], 16);
    let source_buckets = normalize_buckets(&data["source_buckets"]);
    let query_families = normalize_families(&data["query_families"]);

    // Only adopt the LLM plan when it actually contributed targeting.
    if source_types.is_empty() && query_focus_terms.is_empty() && query_families.is_empty() {
        return Ok(None);
    }

    Ok(Some(SourcePlan {
        source_types: or_fallback(source_types, &fallback.source_types),
        query_focus_terms: or_fallback(query_focus_terms, &fallback.query_focus_terms),
        contribution_modes: or_fallback(contribution_modes, &fallback.contribution_modes),
        source_buckets: if source_buckets.is_empty() {
            fallback.source_buckets.clone()
        } else {
            source_buckets
        },
        role_targets: or_fallback(role_targets, &fallback.role_targets),
        query_families: if query_families.is_empty() {
            fallback.query_families.clone()
        } else {
            query_families
        },
        notes: data["notes"]
            .as_str()
            .map(str::to_string)
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| fallback.notes.clone()),
        planner: PlannerTag::Llm,
    }))
}

/// Deterministic plan branching on discovery mode and radius.
pub fn heuristic_plan(criteria: &PlanCriteria) -> SourcePlan {
    let source_types: Vec<&str> = match criteria.discovery_mode {
        DiscoveryMode::WealthRelated => vec!["wealth_advisors", "businesses", "foundations"],
        DiscoveryMode::Nonprofits => vec!["nonprofits", "foundations", "grants", "municipal_programs"],
        DiscoveryMode::Foundations => vec!["foundations", "grants", "municipal_programs"],
        DiscoveryMode::All => vec![
            "businesses",
            "nonprofits",
            "foundations",
            "grants",
            "municipal_programs",
            "wealth_advisors",
        ],
        DiscoveryMode::Businesses => vec!["businesses", "foundations", "nonprofits", "grants"],
    };

    let mut focus = vec![
        "animal welfare corporate sponsor program",
        "charitable giving foundation grants nonprofit",
        "community outreach donations local business",
        "gift card donation fundraiser local businesses",
        "in kind donation services nonprofit animal rescue",
        "raffle prize gift certificate donation local",
    ];
    if criteria.radius_miles.unwrap_or(0.0) <= 15.0 {
        focus.push("local employer community giving");
    } else {
        focus.push("regional corporate philanthropy program");
    }

    let family = |family: &str, mode: &str, priority: i64, queries: [&str; 2]| QueryFamily {
        family: family.to_string(),
        contribution_mode: mode.to_string(),
        priority,
        queries: queries.iter().map(|q| q.to_string()).collect(),
    };
    let mut query_families = vec![
        family("sponsorships", "sponsorships", 1, [
            "local business event sponsorship nonprofit",
            "community sponsor animal rescue fundraiser",
        ]),
        family("gift_cards_certificates", "gift_cards", 2, [
            "gift card donation raffle local business",
            "gift certificate donation nonprofit fundraiser",
        ]),
        family("in_kind_goods", "in_kind_goods", 2, [
            "in kind goods donation local business nonprofit",
            "product donation animal shelter local store",
        ]),
        family("in_kind_services", "in_kind_services", 3, [
            "donated services nonprofit fundraiser local",
            "pro bono services animal rescue organization",
        ]),
        family("foundations_grants", "grants", 1, [
            "foundation grants animal welfare nonprofit",
            "community foundation grant rescue shelter",
        ]),
    ];
    query_families.sort_by(|a, b| (a.priority, &a.family).cmp(&(b.priority, &b.family)));

    let bucket = |bucket: &str, examples: &[&str], why: &str| SourceBucket {
        bucket: bucket.to_string(),
        examples: examples.iter().map(|e| e.to_string()).collect(),
        why_relevant: why.to_string(),
    };

    SourcePlan {
        source_types: source_types.iter().map(|s| s.to_string()).collect(),
        query_focus_terms: focus.iter().map(|f| f.to_string()).collect(),
        contribution_modes: ["cash", "sponsorships", "grants", "gift_cards", "in_kind_goods", "in_kind_services"]
            .iter()
            .map(|m| m.to_string())
            .collect(),
        source_buckets: vec![
            bucket(
                "corporate_sponsorships",
                &["banks", "real estate firms", "insurance agencies", "car dealerships"],
                "Local businesses with marketing budgets may support sponsorships and event underwriting.",
            ),
            bucket(
                "gift_cards_certificates",
                &["restaurants", "salons", "spas", "retail boutiques", "coffee shops"],
                "Useful for raffles, auctions, and event incentives even when cash giving is limited.",
            ),
            bucket(
                "in_kind_goods",
                &["pet supply stores", "hardware stores", "office supply stores", "grocery stores"],
                "Can provide supplies, prizes, food, and operational support items.",
            ),
            bucket(
                "in_kind_services",
                &["printers", "photographers", "marketing agencies", "landscapers", "cleaning services"],
                "Service donations reduce operating costs and support events/campaigns.",
            ),
        ],
        role_targets: [
            "owner",
            "store manager",
            "community relations manager",
            "marketing director",
            "csr manager",
        ]
        .iter()
        .map(|r| r.to_string())
        .collect(),
        query_families,
        notes: "Heuristic source targeting based on discovery mode and radius.".to_string(),
        planner: PlannerTag::Heuristic,
    }
}

/// Blend static base queries and planner output into one deduped query
/// set, capped at 22, each suffixed with the location hint when present.
pub fn build_queries(base: &[&str], plan: &SourcePlan, location_hint: Option<&str>) -> Vec<String> {
    let mut queries: Vec<String> = Vec::new();
    let mut seen: std::collections::HashSet<String> = std::collections::HashSet::new();
    let mut add = |queries: &mut Vec<String>, q: &str| {
        let q = q.trim();
        if !q.is_empty() && seen.insert(q.to_lowercase()) {
            queries.push(q.to_string());
        }
    };

    for q in base {
        add(&mut queries, q);
    }
    for focus in &plan.query_focus_terms {
        add(&mut queries, focus);
    }
    for family in &plan.query_families {
        for q in family.queries.iter().take(4) {
            add(&mut queries, q);
        }
    }
    for source_type in &plan.source_types {
        match source_type.as_str() {
            "municipal_programs" => add(&mut queries, "municipal grant animal welfare program"),
            "grants" => add(&mut queries, "foundation grant animal shelter nonprofit"),
            "wealth_advisors" => add(&mut queries, "wealth advisors community giving philanthropy"),
            "businesses" => add(&mut queries, "local businesses charitable giving sponsor program"),
            _ => {}
        }
    }
    for role in plan.role_targets.iter().take(6) {
        let lowered = role.to_lowercase();
        if ["owner", "manager", "director", "csr", "community"]
            .iter()
            .any(|token| lowered.contains(token))
        {
            add(&mut queries, &format!("{role} charitable giving local business"));
        }
    }

    queries.truncate(22);
    match location_hint.map(str::trim).filter(|h| !h.is_empty()) {
        Some(hint) => queries.iter().map(|q| format!("{q} {hint}")).collect(),
        None => queries,
    }
}

/// Heuristic justification narrative for a matched organization.
pub fn heuristic_org_justification(
    candidate: &OrganizationCandidate,
    location_label: Option<&str>,
) -> String {
    let score10 = normalize_score_10(candidate.donation_potential_score);
    let score100 = ui_score(candidate.donation_potential_score);
    let category = candidate.category.as_str().replace('_', " ");
    let location = match (&candidate.city, &candidate.state) {
        (Some(city), Some(state)) => format!("{city}, {state}"),
        (Some(city), None) => city.clone(),
        _ => location_label.unwrap_or("the search area").to_string(),
    };

    let mut reasons = Vec::new();
    if score10 >= 8 {
        reasons.push("strong donor-likelihood score based on category and entity signals");
    } else if score10 >= 5 {
        reasons.push("moderate donor-likelihood score with some capacity/alignment indicators");
    } else {
        reasons.push("lower donor-likelihood score but still a potential local outreach candidate");
    }
    match candidate.category {
        Category::Foundation | Category::Nonprofit => {
            reasons.push("category suggests structured giving or mission-driven funding potential")
        }
        Category::Financial | Category::CorporateCsr => {
            reasons.push("category suggests possible philanthropic programs or sponsorship capacity")
        }
        Category::PetIndustry => {
            reasons.push("category shows direct alignment with animal welfare mission")
        }
        _ => {}
    }

    format!(
        "{} was scored {}/100 as a {} prospect in {} because it matches the requested search criteria and shows {}.",
        candidate.name,
        score100,
        category,
        location,
        reasons.join(", and "),
    )
}

/// Heuristic additional-info narrative over the candidate's available fields.
pub fn heuristic_org_additional_info(candidate: &OrganizationCandidate) -> String {
    let mut bits = Vec::new();
    if candidate.website.is_some() {
        bits.push("Website available for further review and contact extraction");
    }
    if candidate.phone.is_some() {
        bits.push("Organization phone number is available");
    }
    if candidate.address.is_some() || candidate.city.is_some() {
        bits.push("Location details were identified from source data");
    }
    if candidate.notes.as_deref().is_some_and(|n| !n.trim().is_empty()) {
        bits.push("Source metadata was captured from discovery provider");
    }
    let joined = bits.iter().take(3).copied().collect::<Vec<_>>().join(". ");
    if joined.is_empty() {
        joined
    } else {
        format!("{joined}.")
    }
}

/// Attach justification narrative to a matched candidate, optionally via
/// the LLM assist (failing open to the heuristic text).
pub async fn justify_org(
    assist: Option<&dyn PlannerAssist>,
    llm_enabled: bool,
    candidate: &mut OrganizationCandidate,
    criteria: &PlanCriteria,
) {
    if let (Some(assist), true) = (assist, llm_enabled) {
        let prompt = json!({
            "task": "Explain why this source may be a donor prospect for an animal welfare nonprofit, based on the provided signals.",
            "criteria": criteria,
            "candidate": {
                "name": candidate.name,
                "category": candidate.category.as_str(),
                "score_10": normalize_score_10(candidate.donation_potential_score),
                "score_100": ui_score(candidate.donation_potential_score),
                "website": candidate.website,
                "city": candidate.city,
                "state": candidate.state,
                "notes": candidate.notes,
            },
            "output_format": {
                "justification": "one concise paragraph",
                "additional_info": "one concise paragraph",
            },
            "constraints": [
                "Do not fabricate facts.",
                "Base reasoning on the provided candidate signals only.",
                "Return JSON only.",
            ],
        });
        if let Ok(content) = assist.complete_json(&prompt).await {
            if let Ok(data) = serde_json::from_str::<Value>(&content) {
                let justification = data["justification"].as_str().unwrap_or("").trim().to_string();
                if !justification.is_empty() {
                    candidate.justification = Some(justification);
                    candidate.additional_info = data["additional_info"]
                        .as_str()
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty());
                    return;
                }
            }
        }
    }
    candidate.justification = Some(heuristic_org_justification(
        candidate,
        criteria.location.as_deref(),
    ));
    candidate.additional_info = Some(heuristic_org_additional_info(candidate));
}

/// One-line relevance narrative for a contact candidate.
pub fn contact_justification(contact: &ContactCandidate) -> String {
    let mut bits = Vec::new();
    if let Some(role) = contact.role_category.as_deref().filter(|r| !r.is_empty()) {
        bits.push(format!("Classified as {role}"));
    }
    match contact.title.as_deref().filter(|t| !t.trim().is_empty()) {
        Some(title) => bits.push(format!("based on title '{title}'")),
        None => bits.push("based on available contact details".to_string()),
    }
    let org = contact
        .organization_name
        .as_deref()
        .filter(|n| !n.is_empty())
        .unwrap_or("the organization");
    bits.push(format!("for {org}"));
    let confidence = serde_json::to_value(contact.confidence)
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_else(|| "low".to_string());
    bits.push(format!("(confidence: {confidence})"));
    format!(
        "{}. This contact appears relevant for donation outreach review.",
        bits.join(" ")
    )
}

fn string_list(value: &Value, max: usize) -> Vec<String> {
    value
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|item| match item {
                    Value::String(s) => Some(s.trim().to_string()),
                    other => Some(other.to_string()),
                })
                .filter(|s| !s.is_empty() && s != "null")
                .take(max)
                .collect()
        })
        .unwrap_or_default()
}

fn normalize_buckets(value: &Value) -> Vec<SourceBucket> {
    let mut buckets = Vec::new();
    for item in value.as_array().into_iter().flatten() {
        let name = item["bucket"].as_str().unwrap_or("").trim().to_string();
        if name.is_empty() {
            continue;
        }
        buckets.push(SourceBucket {
            bucket: name,
            examples: string_list(&item["examples"], 8),
            why_relevant: item["why_relevant"].as_str().unwrap_or("").trim().to_string(),
        });
        if buckets.len() >= 12 {
            break;
        }
    }
    buckets
}

fn normalize_families(value: &Value) -> Vec<QueryFamily> {
    let mut families = Vec::new();
    for item in value.as_array().into_iter().flatten() {
        let family = item["family"].as_str().unwrap_or("").trim().to_string();
        let queries = string_list(&item["queries"], 8);
        if family.is_empty() || queries.is_empty() {
            continue;
        }
        families.push(QueryFamily {
            family,
            contribution_mode: item["contribution_mode"].as_str().unwrap_or("").trim().to_string(),
            priority: item["priority"].as_i64().unwrap_or(0).clamp(0, 10),
            queries,
        });
    }
    families.sort_by(|a, b| (a.priority, &a.family).cmp(&(b.priority, &b.family)));
    families.truncate(16);
    families
}

fn or_fallback(value: Vec<String>, fallback: &[String]) -> Vec<String> {
    if value.is_empty() {
        fallback.to_vec()
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn criteria(mode: DiscoveryMode) -> PlanCriteria {
        PlanCriteria {
            location: Some("Portland, OR".to_string()),
            radius_miles: Some(10.0),
            min_score: Some(5),
            discovery_mode: mode,
        }
    }

    #[test]
    fn test_heuristic_plan_branches_on_mode() {
        let foundations = heuristic_plan(&criteria(DiscoveryMode::Foundations));
        assert_eq!(foundations.source_types[0], "foundations");
        assert_eq!(foundations.planner, PlannerTag::Heuristic);

        let wealth = heuristic_plan(&criteria(DiscoveryMode::WealthRelated));
        assert_eq!(wealth.source_types[0], "wealth_advisors");
    }

    #[test]
    fn test_heuristic_plan_radius_phrase() {
        let local = heuristic_plan(&criteria(DiscoveryMode::Businesses));
        assert!(local
            .query_focus_terms
            .iter()
            .any(|f| f.contains("local employer")));

        let mut wide = criteria(DiscoveryMode::Businesses);
        wide.radius_miles = Some(50.0);
        let regional = heuristic_plan(&wide);
        assert!(regional
            .query_focus_terms
            .iter()
            .any(|f| f.contains("regional corporate")));
    }

    #[test]
    fn test_families_sorted_by_priority_then_name() {
        let plan = heuristic_plan(&criteria(DiscoveryMode::Businesses));
        let order: Vec<(i64, &str)> = plan
            .query_families
            .iter()
            .map(|f| (f.priority, f.family.as_str()))
            .collect();
        let mut sorted = order.clone();
        sorted.sort();
        assert_eq!(order, sorted);
    }

    #[test]
    fn test_build_queries_dedup_and_cap() {
        let plan = heuristic_plan(&criteria(DiscoveryMode::All));
        let base: Vec<&str> = BASE_QUERIES.to_vec();
        let queries = build_queries(&base, &plan, Some("Portland, OR"));

        assert!(queries.len() <= 22);
        assert!(queries.iter().all(|q| q.ends_with("Portland, OR")));
        let mut seen = std::collections::HashSet::new();
        for q in &queries {
            assert!(seen.insert(q.to_lowercase()), "duplicate query {q}");
        }
    }

    #[test]
    fn test_build_queries_without_hint() {
        let plan = heuristic_plan(&criteria(DiscoveryMode::Businesses));
        let queries = build_queries(&["base query"], &plan, None);
        assert_eq!(queries[0], "base query");
    }

    #[test]
    fn test_normalize_families_clamps_and_sorts() {
        let value = json!([
            {"family": "b", "priority": 50, "queries": ["q1"]},
            {"family": "a", "priority": -2, "queries": ["q2"]},
            {"family": "", "queries": ["dropped"]},
            {"family": "no_queries", "queries": []},
        ]);
        let families = normalize_families(&value);
        assert_eq!(families.len(), 2);
        assert_eq!(families[0].family, "a");
        assert_eq!(families[0].priority, 0);
        assert_eq!(families[1].priority, 10);
    }

    #[tokio::test]
    async fn test_plan_sources_without_assist_is_heuristic() {
        let plan = plan_sources(None, &criteria(DiscoveryMode::Businesses)).await;
        assert_eq!(plan.planner, PlannerTag::Heuristic);
    }

    #[test]
    fn test_justification_mentions_score_and_category() {
        let candidate = OrganizationCandidate::seed(
            "Maddie's Fund",
            "https://m.test",
            Category::Foundation,
            10,
            "Leading funder.",
        );
        let text = heuristic_org_justification(&candidate, Some("Portland OR"));
        assert!(text.contains("100/100"));
        assert!(text.contains("foundation"));
    }

    #[test]
    fn test_contact_justification_shape() {
        let mut contact = ContactCandidate::new(crate::types::ContactProvenance::Scraped);
        contact.title = Some("Director of Development".to_string());
        contact.role_category = Some("Giving Manager".to_string());
        contact.organization_name = Some("Acme Pet Foods".to_string());
        let text = contact_justification(&contact);
        assert!(text.contains("Giving Manager"));
        assert!(text.contains("Acme Pet Foods"));
        assert!(text.contains("confidence: low"));
    }
}
