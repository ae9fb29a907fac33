//! Donor-Prospect Discovery and Contact Extraction
//!
//! A budget-constrained pipeline that discovers potential donor
//! organizations for an animal shelter and enriches them with outreach
//! contacts.
//!
//! # Design Philosophy
//!
//! **Degrade, never die.**
//!
//! - Every external credential is optional; a missing key turns that
//!   provider off instead of failing the run
//! - Time budgets and failure counters stop stages early with partial
//!   results; a started run never errors on a timeout
//! - Provider failures are caught at the provider boundary and logged
//! - Per-record persistence problems are collected as issues, not raised
//!
//! # Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use prospector::{Config, ContactExtractor, DiscoveryEngine, DiscoveryRequest, JobRunner};
//! use prospector::progress::noop_sink;
//!
//! // Wire whatever collaborators the environment has credentials for.
//! let engine = Arc::new(DiscoveryEngine::from_config(Config::from_env())?);
//!
//! // Synchronous run.
//! let outcome = engine
//!     .run_discovery(
//!         DiscoveryRequest {
//!             location: Some("Portland OR".to_string()),
//!             min_score: Some(5),
//!             limit: Some(25),
//!             dry_run: true,
//!             ..Default::default()
//!         },
//!         noop_sink(),
//!     )
//!     .await?;
//!
//! // Or as a polled background job.
//! let runner = JobRunner::new(engine);
//! let job = runner.submit(DiscoveryRequest::default())?;
//! let status = runner.get(&job.id);
//! ```
//!
//! # Modules
//!
//! - [`orchestrator`] - The discovery state machine
//! - [`jobs`] - Async job surface with progress polling
//! - [`providers`] - Seed, web-search, geo-tiled places, and feed sources
//! - [`planner`] - Query planning with heuristic fallback
//! - [`contacts`] - Per-organization contact extraction
//! - [`storage`] - Storage collaborator contract and implementations
//! - [`geo`] - Haversine math and tile-grid generation
//! - [`testing`] - Mock collaborators for tests

pub mod config;
pub mod contacts;
pub mod deadline;
pub mod error;
pub mod geo;
pub mod geocode;
pub mod jobs;
pub mod location;
pub mod orchestrator;
pub mod planner;
pub mod progress;
pub mod providers;
pub mod score;
pub mod storage;
pub mod testing;
pub mod types;

// Re-export the core surface at the crate root.
pub use config::Config;
pub use contacts::ContactExtractor;
pub use deadline::Deadline;
pub use error::{DiscoveryError, Result};
pub use jobs::{DiscoveryJob, JobRunner, JobStatus};
pub use orchestrator::{DiscoveryEngine, DiscoveryOutcome, DiscoveryRequest};
pub use progress::{ProgressEvent, ProgressSink, StopReason};
pub use storage::{MemoryStorage, Storage};
pub use types::{
    ContactCandidate, DiscoveryMode, OrganizationCandidate, OrganizationRecord,
};
