//! Discovery orchestration.
//!
//! Drives the providers under one global deadline, merges and dedupes
//! their output, applies mode/score/location filters, and either returns
//! a dry-run preview or persists matches and optionally chains into
//! contact extraction. Stages check the deadline before doing unit work
//! and degrade to partial results; a started run never fails on timeout.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};

use crate::config::Config;
use crate::contacts::ContactExtractor;
use crate::deadline::Deadline;
use crate::error::{DiscoveryError, Result};
use crate::geo::{within_radius_miles, GeoPoint};
use crate::geocode::{Geocoder, NoopGeocoder};
use crate::location::{parse_search_location, LocationFilter};
use crate::planner::{
    self, build_queries, plan_sources, PlanCriteria, PlannerAssist, SourcePlan, BASE_QUERIES,
};
use crate::progress::{ProgressEvent, ProgressSink, StopReason};
use crate::providers::places::{run_places_stage, PlacesClient};
use crate::providers::seed::seed_organizations;
use crate::providers::serp::{run_search_stage, SerpClient};
use crate::providers::{feed, places, serp};
use crate::score::{normalize_min_score, normalize_result_limit, normalize_score_10};
use crate::storage::{self, new_org_row, Storage};
use crate::types::{
    dedupe_candidates, ContactCandidate, DiscoveryMode, OrganizationCandidate, OrganizationRecord,
    SourceCounts,
};

/// Validated inputs for one discovery run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiscoveryRequest {
    /// City+state ("Portland OR") or ZIP.
    pub location: Option<String>,
    pub radius_miles: Option<f64>,
    /// Hard cap on matched records; clamped to 1..=1000, default 100.
    pub limit: Option<i64>,
    /// 1-10 scale or 0-100 scale.
    pub min_score: Option<i64>,
    #[serde(default)]
    pub discovery_mode: DiscoveryMode,
    #[serde(default)]
    pub dry_run: bool,
    #[serde(default)]
    pub extract_contacts: bool,
    pub max_runtime_seconds: Option<f64>,
    #[serde(default)]
    pub exclude_record_keys: Vec<String>,
}

impl DiscoveryRequest {
    /// Surface parameter problems synchronously, before any work starts.
    pub fn validate(&self) -> Result<()> {
        if let Some(radius) = self.radius_miles {
            if !radius.is_finite() || radius <= 0.0 {
                return Err(DiscoveryError::InvalidCriteria {
                    reason: format!("radius_miles must be a positive number, got {radius}"),
                });
            }
        }
        if let Some(runtime) = self.max_runtime_seconds {
            if !runtime.is_finite() || runtime <= 0.0 {
                return Err(DiscoveryError::InvalidCriteria {
                    reason: format!("max_runtime_seconds must be a positive number, got {runtime}"),
                });
            }
        }
        if let Some(score) = self.min_score {
            if score > 100 {
                return Err(DiscoveryError::InvalidCriteria {
                    reason: format!("min_score supports 1-10 or 0-100 scales, got {score}"),
                });
            }
        }
        Ok(())
    }
}

/// Echo of the filters a run actually applied.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FiltersApplied {
    pub location: Option<String>,
    pub radius_miles: Option<f64>,
    pub limit: usize,
    pub min_score: Option<i64>,
    pub min_score_normalized: i64,
    pub discovery_mode: DiscoveryMode,
    pub max_runtime_seconds: f64,
    pub excluded_record_keys_count: usize,
    pub source_plan: SourcePlan,
}

/// Matched vs. actually-saved counts per source.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct SourceBreakdown {
    pub matched: SourceCounts,
    pub saved: SourceCounts,
}

/// Full result payload of a discovery run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryOutcome {
    pub matched_count: usize,
    pub saved_count: usize,
    pub organizations: Vec<OrganizationRecord>,
    pub contacts: Vec<ContactCandidate>,
    pub saved_org_ids: Vec<String>,
    pub filters_applied: FiltersApplied,
    pub source_breakdown: SourceBreakdown,
    /// Per-record persistence problems; the run continued past each.
    pub issues: Vec<String>,
    pub dry_run: bool,
    pub contacts_extracted: bool,
}

/// Bundles the collaborators one discovery run needs.
pub struct DiscoveryEngine {
    config: Config,
    store: Option<Arc<dyn Storage>>,
    geocoder: Arc<dyn Geocoder>,
    assist: Option<Arc<dyn PlannerAssist>>,
    serp: Option<SerpClient>,
    places: Option<PlacesClient>,
    extractor: ContactExtractor,
}

impl DiscoveryEngine {
    /// Bare engine: seed provider only, no storage, no geocoding. The
    /// builder methods below attach collaborators.
    pub fn new(config: Config, extractor: ContactExtractor) -> Self {
        Self {
            config,
            store: None,
            geocoder: Arc::new(NoopGeocoder),
            assist: None,
            serp: None,
            places: None,
            extractor,
        }
    }

    /// Wire every collaborator the config has credentials for.
    pub fn from_config(config: Config) -> anyhow::Result<Self> {
        let extractor = ContactExtractor::from_config(&config)?;
        let mut engine = Self::new(config, extractor);
        engine.store = storage::RestStorage::from_config(&engine.config)
            .map(|s| Arc::new(s) as Arc<dyn Storage>);
        engine.geocoder = Arc::new(crate::geocode::NominatimGeocoder::new()?);
        engine.assist = planner::OpenAiAssist::from_config(&engine.config)
            .map(|a| Arc::new(a) as Arc<dyn PlannerAssist>);
        engine.serp = serp::SerpClient::from_config(&engine.config);
        engine.places = places::PlacesClient::from_config(&engine.config);
        Ok(engine)
    }

    pub fn with_storage(mut self, store: Arc<dyn Storage>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_geocoder(mut self, geocoder: Arc<dyn Geocoder>) -> Self {
        self.geocoder = geocoder;
        self
    }

    pub fn with_assist(mut self, assist: Arc<dyn PlannerAssist>) -> Self {
        self.assist = Some(assist);
        self
    }

    pub fn with_serp(mut self, client: SerpClient) -> Self {
        self.serp = Some(client);
        self
    }

    pub fn with_places(mut self, client: PlacesClient) -> Self {
        self.places = Some(client);
        self
    }

    pub fn storage(&self) -> Option<&Arc<dyn Storage>> {
        self.store.as_ref()
    }

    /// Run discovery to completion.
    ///
    /// Errors only on invalid inputs; once underway the run degrades to
    /// partial results with `stopped_early` events and `issues` entries.
    pub async fn run_discovery(
        &self,
        request: DiscoveryRequest,
        progress: ProgressSink,
    ) -> Result<DiscoveryOutcome> {
        request.validate()?;
        progress(ProgressEvent::running("starting", "Preparing discovery filters...").with_progress(2));

        let max_runtime = request
            .max_runtime_seconds
            .map(Duration::from_secs_f64)
            .unwrap_or(self.config.max_runtime)
            .max(Duration::from_secs(5));
        let deadline = Deadline::after(max_runtime);
        let limit = normalize_result_limit(request.limit);
        let min_score_10 = normalize_min_score(request.min_score);
        let mode = request.discovery_mode;
        let excluded_keys: HashSet<String> = request
            .exclude_record_keys
            .iter()
            .map(|k| k.trim().to_lowercase())
            .filter(|k| !k.is_empty())
            .collect();
        let location_filter = parse_search_location(request.location.as_deref());

        progress(
            ProgressEvent::running("geocoding", "Geocoding search origin...")
                .with_progress(5)
                .with_extra("location", json!(location_filter.query)),
        );
        let origin = match location_filter.query.as_deref() {
            Some(query) => match self.geocoder.geocode(query).await {
                Ok(origin) => origin,
                Err(err) => {
                    warn!(query, error = %err, "geocoding failed, using text matching");
                    None
                }
            },
            None => None,
        };

        let criteria = PlanCriteria {
            location: Some(location_filter.raw.clone())
                .filter(|r| !r.is_empty())
                .or_else(|| location_filter.query.clone()),
            radius_miles: request.radius_miles,
            min_score: request.min_score,
            discovery_mode: mode,
        };
        let source_plan = plan_sources(self.assist.as_deref(), &criteria).await;
        info!(
            location = ?location_filter.query,
            radius = ?request.radius_miles,
            limit,
            min_score_10,
            mode = mode.as_str(),
            geocoded = origin.is_some(),
            planner = ?source_plan.planner,
            "discovery filters ready"
        );
        progress(
            ProgressEvent::running(
                "planning",
                format!("Source targeting plan ready ({:?}).", source_plan.planner),
            )
            .with_progress(8)
            .with_extra("planner", json!(source_plan.planner))
            .with_extra("source_types", json!(source_plan.source_types)),
        );

        progress(
            ProgressEvent::running(
                "collecting_sources",
                format!("Collecting candidates for mode '{}'...", mode.as_str()),
            )
            .with_progress(10)
            .with_extra("discovery_mode", json!(mode.as_str())),
        );
        let collect_target = (limit * 8).max(120).min(1000);
        let per_query = (collect_target / BASE_QUERIES.len() + 5).clamp(10, 100);
        let candidates = self
            .collect_candidates(
                &location_filter,
                origin.as_ref(),
                request.radius_miles,
                collect_target,
                per_query,
                &source_plan,
                deadline,
                &progress,
            )
            .await;

        let existing_keys = match &self.store {
            Some(store) => storage::load_existing_org_keys(store.as_ref()).await,
            None => HashSet::new(),
        };
        if !existing_keys.is_empty() {
            progress(
                ProgressEvent::running(
                    "dedupe",
                    format!(
                        "Loaded {} existing organizations for new-source dedupe.",
                        existing_keys.len()
                    ),
                )
                .with_progress(50)
                .with_extra("existing_org_keys", json!(existing_keys.len())),
            );
        }

        progress(
            ProgressEvent::running(
                "filtering",
                format!(
                    "Filtering {} candidates by mode, score, and location...",
                    candidates.len()
                ),
            )
            .with_progress(55)
            .with_extra("candidates", json!(candidates.len()))
            .with_extra("discovery_mode", json!(mode.as_str())),
        );

        let mut matched: Vec<OrganizationCandidate> = Vec::new();
        for (idx, candidate) in candidates.into_iter().enumerate() {
            if deadline.expired() {
                progress(
                    ProgressEvent::warning(
                        "filtering",
                        "Global search time budget reached during filtering. Returning best partial results.",
                    )
                    .with_progress(62)
                    .with_stop_reason(StopReason::GlobalDeadline),
                );
                break;
            }
            // Cheapest checks first.
            if !candidate.matches_mode(mode) {
                continue;
            }
            if normalize_score_10(candidate.donation_potential_score) < min_score_10 {
                continue;
            }
            if !self.location_passes(&candidate, &location_filter, origin.as_ref(), request.radius_miles) {
                continue;
            }
            let key = candidate.stable_key();
            if existing_keys.contains(&key) || excluded_keys.contains(&key) {
                continue;
            }
            matched.push(candidate);
            if matched.len() == 1 || (idx + 1) % 5 == 0 {
                progress(
                    ProgressEvent::running(
                        "filtering",
                        format!("Matched {} organization(s) so far...", matched.len()),
                    )
                    .with_progress(60)
                    .with_extra("matched", json!(matched.len()))
                    .with_extra("source_counts", json!(SourceCounts::tally(&matched))),
                );
            }
            if matched.len() >= limit {
                info!(limit, "reached requested result limit during filtering");
                break;
            }
        }
        info!(matched = matched.len(), limit, "candidates matched filters");

        for candidate in &mut matched {
            planner::justify_org(
                self.assist.as_deref(),
                self.config.llm_justifications_enabled,
                candidate,
                &criteria,
            )
            .await;
        }
        let matched_counts = SourceCounts::tally(&matched);
        progress(
            ProgressEvent::running(
                "filtered",
                format!("{} organizations matched the search criteria.", matched.len()),
            )
            .with_progress(65)
            .with_extra("matched", json!(matched.len()))
            .with_extra("source_counts", json!(matched_counts)),
        );

        let filters_applied = FiltersApplied {
            location: Some(location_filter.raw.clone()).filter(|r| !r.is_empty()),
            radius_miles: request.radius_miles,
            limit,
            min_score: request.min_score,
            min_score_normalized: min_score_10,
            discovery_mode: mode,
            max_runtime_seconds: max_runtime.as_secs_f64(),
            excluded_record_keys_count: excluded_keys.len(),
            source_plan: source_plan.clone(),
        };

        if request.dry_run {
            self.finish_dry_run(matched, matched_counts, filters_applied, &request, deadline, &progress)
                .await
        } else {
            self.finish_wet_run(matched, matched_counts, filters_applied, &request, min_score_10, deadline, &progress)
                .await
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn collect_candidates(
        &self,
        location_filter: &LocationFilter,
        origin: Option<&GeoPoint>,
        radius_miles: Option<f64>,
        collect_target: usize,
        per_query: usize,
        source_plan: &SourcePlan,
        deadline: Deadline,
        progress: &ProgressSink,
    ) -> Vec<OrganizationCandidate> {
        let mut all: Vec<OrganizationCandidate> = Vec::new();

        // Coordinates-first: local places when the origin geocoded.
        match (&self.places, origin, radius_miles) {
            (Some(places), Some(origin), Some(radius)) => {
                let collected = run_places_stage(
                    places,
                    origin,
                    radius,
                    collect_target,
                    deadline,
                    self.config.places_stage_max,
                    self.config.places_tile_error_cap,
                    progress,
                )
                .await;
                info!(count = collected.len(), source = "google_places", "places discovery done");
                all.extend(collected);
            }
            (None, Some(_), Some(_)) => {
                info!("no Places API key; skipping nearby discovery");
            }
            _ => {}
        }

        let seeds = seed_organizations();
        info!(count = seeds.len(), source = "seed", "loading seed organizations");
        all.extend(seeds);

        if let Some(serp) = &self.serp {
            let location_query = location_filter.query.as_deref();
            let base: Vec<&str> = BASE_QUERIES.to_vec();
            let queries = build_queries(&base, source_plan, location_query);
            let collected = run_search_stage(
                serp,
                &queries,
                per_query,
                location_query.is_some(),
                deadline,
                self.config.serp_stage_max,
                self.config.serp_failure_budget,
                progress,
            )
            .await;
            info!(count = collected.len(), source = "serpapi", "search discovery done");
            all.extend(collected);
        } else {
            info!("no SerpAPI key; skipping web search");
        }

        let feed_orgs = feed::fetch_feed_candidates(&self.config.feed_url).await;
        info!(count = feed_orgs.len(), source = "petfinder", "feed import done");
        all.extend(feed_orgs);

        let deduped = dedupe_candidates(all);
        progress(
            ProgressEvent::running(
                "collecting_sources",
                format!(
                    "Collected {} unique candidates across discovery sources.",
                    deduped.len()
                ),
            )
            .with_progress(42)
            .with_extra("source_counts", json!(SourceCounts::tally(&deduped))),
        );
        deduped
    }

    /// Location filter, strongest evidence first: haversine radius when
    /// coordinates exist, then ZIP substring, then structured city/state
    /// equality, then the location-scoped-query provisional pass, then
    /// (if enabled) the raw-query-in-notes substring — a documented weak
    /// fallback that can admit false positives.
    fn location_passes(
        &self,
        candidate: &OrganizationCandidate,
        filter: &LocationFilter,
        origin: Option<&GeoPoint>,
        radius_miles: Option<f64>,
    ) -> bool {
        if filter.raw.is_empty() {
            return true;
        }
        if within_radius_miles(origin, candidate.latitude, candidate.longitude, radius_miles) {
            return true;
        }

        let (city, state, postal) = candidate.location_fields();
        if let Some(zip) = &filter.zip_code {
            let searchable = format!(
                "{} {} {}",
                postal.as_deref().unwrap_or(""),
                candidate.address.as_deref().unwrap_or(""),
                candidate.notes.as_deref().unwrap_or("")
            )
            .to_lowercase();
            return searchable.contains(&zip.to_lowercase());
        }

        if let Some(wanted_city) = filter.city.as_deref() {
            if !city
                .as_deref()
                .unwrap_or("")
                .eq_ignore_ascii_case(wanted_city)
                && city.is_some()
            {
                return false;
            }
        }
        if let Some(wanted_state) = filter.state.as_deref() {
            if !state
                .as_deref()
                .unwrap_or("")
                .eq_ignore_ascii_case(wanted_state)
                && state.is_some()
            {
                return false;
            }
        }
        if city.is_some() || state.is_some() {
            return true;
        }

        // Localized searches often return candidates without structured
        // fields in the snippet; a location-scoped query passes
        // provisionally rather than dropping all its results.
        if candidate.location_hint_applied {
            return true;
        }
        if self.config.notes_location_fallback {
            return candidate
                .notes
                .as_deref()
                .unwrap_or("")
                .to_lowercase()
                .contains(&filter.raw.to_lowercase());
        }
        false
    }

    async fn finish_dry_run(
        &self,
        mut matched: Vec<OrganizationCandidate>,
        matched_counts: SourceCounts,
        filters_applied: FiltersApplied,
        request: &DiscoveryRequest,
        deadline: Deadline,
        progress: &ProgressSink,
    ) -> Result<DiscoveryOutcome> {
        for (idx, candidate) in matched.iter_mut().enumerate() {
            candidate.preview_key = Some(format!("org-preview-{}-{}", idx, candidate.name));
        }

        let mut preview_contacts: Vec<ContactCandidate> = Vec::new();
        let mut extracted = false;
        if request.extract_contacts {
            if deadline.expired() {
                progress(
                    ProgressEvent::warning(
                        "contacts_preview",
                        "Skipped contact preview extraction (global time budget reached).",
                    )
                    .with_progress(92)
                    .with_stop_reason(StopReason::GlobalDeadline),
                );
            } else {
                progress(
                    ProgressEvent::running(
                        "contacts_preview",
                        format!("Extracting contact previews for {} organizations...", matched.len()),
                    )
                    .with_progress(80)
                    .with_extra("matched", json!(matched.len())),
                );
                // Respect remaining time by reducing org count when low.
                let low_budget = deadline
                    .remaining()
                    .is_some_and(|left| left < Duration::from_secs(30));
                let preview_orgs: &[OrganizationCandidate] = if low_budget {
                    &matched[..matched.len().min(5)]
                } else {
                    &matched
                };
                let existing_emails = match &self.store {
                    Some(store) => storage::load_existing_contact_emails(store.as_ref()).await,
                    None => HashSet::new(),
                };
                preview_contacts = self
                    .extractor
                    .preview_for_orgs(preview_orgs, &existing_emails, deadline)
                    .await;
                extracted = !preview_contacts.is_empty();
                progress(
                    ProgressEvent::running(
                        "contacts_preview",
                        format!("Extracted {} contact preview result(s).", preview_contacts.len()),
                    )
                    .with_progress(92)
                    .with_extra("preview_contacts", json!(preview_contacts.len())),
                );
            }
        }

        progress(
            ProgressEvent::completed(
                "complete",
                format!("Dry run complete with {} matched organizations.", matched.len()),
            )
            .with_progress(100)
            .with_extra("matched", json!(matched.len()))
            .with_extra("dry_run", json!(true)),
        );
        Ok(DiscoveryOutcome {
            matched_count: matched.len(),
            saved_count: 0,
            organizations: matched.iter().map(OrganizationCandidate::to_record).collect(),
            contacts: preview_contacts,
            saved_org_ids: Vec::new(),
            filters_applied,
            source_breakdown: SourceBreakdown {
                matched: matched_counts,
                saved: SourceCounts::default(),
            },
            issues: Vec::new(),
            dry_run: true,
            contacts_extracted: extracted,
        })
    }

    #[allow(clippy::too_many_arguments)]
    async fn finish_wet_run(
        &self,
        matched: Vec<OrganizationCandidate>,
        matched_counts: SourceCounts,
        filters_applied: FiltersApplied,
        request: &DiscoveryRequest,
        min_score_10: i64,
        deadline: Deadline,
        progress: &ProgressSink,
    ) -> Result<DiscoveryOutcome> {
        let mut issues: Vec<String> = Vec::new();
        let mut saved_ids: Vec<String> = Vec::new();
        let mut saved_counts = SourceCounts::default();
        let mut saved = 0usize;

        progress(
            ProgressEvent::running(
                "upserting",
                format!("Importing {} matched organizations...", matched.len()),
            )
            .with_progress(70)
            .with_extra("matched", json!(matched.len())),
        );

        match &self.store {
            Some(store) => {
                let capabilities = store.capabilities();
                for candidate in &matched {
                    match store.upsert_organization(new_org_row(candidate, capabilities)).await {
                        Ok(row) => {
                            saved += 1;
                            saved_ids.push(row.id);
                            saved_counts.increment(candidate.source);
                            let span = if request.extract_contacts { 10 } else { 20 };
                            let pct = 70 + (saved * span / matched.len().max(1)) as u8;
                            progress(
                                ProgressEvent::running(
                                    "upserting",
                                    format!("Imported {}/{} organizations...", saved, matched.len()),
                                )
                                .with_progress(pct)
                                .with_extra("saved_count", json!(saved))
                                .with_extra("source_counts", json!(saved_counts)),
                            );
                        }
                        Err(err) => {
                            warn!(name = candidate.name.as_str(), error = %err, "organization upsert failed");
                            issues.push(format!("{}: {err}", candidate.name));
                            progress(
                                ProgressEvent::warning(
                                    "upserting",
                                    format!("Issue importing {}: {err}", candidate.name),
                                )
                                .with_extra("saved_count", json!(saved)),
                            );
                        }
                    }
                }
            }
            None => {
                issues.push("storage not configured; matched organizations were not persisted".to_string());
            }
        }

        let mut contacts_extracted = false;
        if request.extract_contacts && !saved_ids.is_empty() {
            if let Some(store) = &self.store {
                progress(
                    ProgressEvent::running(
                        "contacts",
                        format!("Extracting contacts for {} discovered organizations...", saved_ids.len()),
                    )
                    .with_progress(90)
                    .with_extra("saved_count", json!(saved)),
                );
                match self
                    .extractor
                    .run_extraction(store.as_ref(), min_score_10, Some(&saved_ids), Some(saved_ids.len()), deadline)
                    .await
                {
                    Ok(_) => {
                        contacts_extracted = true;
                        progress(
                            ProgressEvent::running("contacts", "Contact extraction complete.")
                                .with_progress(97)
                                .with_extra("saved_count", json!(saved)),
                        );
                    }
                    Err(err) => {
                        warn!(error = %err, "contact extraction failed after discovery");
                        issues.push(format!("Contact extraction: {err}"));
                        progress(
                            ProgressEvent::warning(
                                "contacts",
                                format!("Contact extraction issue: {err}"),
                            )
                            .with_progress(97),
                        );
                    }
                }
            }
        }

        info!(saved, matched = matched.len(), "discovery complete");
        progress(
            ProgressEvent::completed(
                "complete",
                format!(
                    "Discovery finished. Imported {} of {} matched organizations.",
                    saved,
                    matched.len()
                ),
            )
            .with_progress(100)
            .with_extra("saved_count", json!(saved))
            .with_extra("matched", json!(matched.len())),
        );
        Ok(DiscoveryOutcome {
            matched_count: matched.len(),
            saved_count: saved,
            organizations: matched.iter().map(OrganizationCandidate::to_record).collect(),
            contacts: Vec::new(),
            saved_org_ids: saved_ids,
            filters_applied,
            source_breakdown: SourceBreakdown {
                matched: matched_counts,
                saved: saved_counts,
            },
            issues,
            dry_run: false,
            contacts_extracted,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_validation() {
        assert!(DiscoveryRequest::default().validate().is_ok());

        let bad_radius = DiscoveryRequest {
            radius_miles: Some(-5.0),
            ..Default::default()
        };
        assert!(matches!(
            bad_radius.validate(),
            Err(DiscoveryError::InvalidCriteria { .. })
        ));

        let bad_runtime = DiscoveryRequest {
            max_runtime_seconds: Some(0.0),
            ..Default::default()
        };
        assert!(bad_runtime.validate().is_err());

        let bad_score = DiscoveryRequest {
            min_score: Some(500),
            ..Default::default()
        };
        assert!(bad_score.validate().is_err());
    }
}
