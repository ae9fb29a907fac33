//! Progress events emitted by the discovery pipeline.
//!
//! Every stage reports through the same callback so callers (the async job
//! surface, a CLI, tests) can observe the run without coupling to stage
//! internals. Deadline and failure-budget trips are `warning`-severity
//! events carrying a machine-readable stop reason; they are not errors.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Severity of a progress event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    Running,
    Warning,
    Completed,
}

/// Why a stage stopped initiating new work before finishing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    GlobalDeadline,
    SerpapiStageDeadline,
    SerpapiFailureBudget,
    GooglePlacesStageDeadline,
    TooManyTileErrors,
    TargetCandidatesReached,
}

impl StopReason {
    /// Human-readable form for event messages.
    pub fn describe(&self) -> &'static str {
        match self {
            StopReason::GlobalDeadline => "global time budget reached",
            StopReason::SerpapiStageDeadline => "stage time budget reached",
            StopReason::SerpapiFailureBudget => "repeated failures/timeouts",
            StopReason::GooglePlacesStageDeadline => "stage time budget reached",
            StopReason::TooManyTileErrors => "too many tile errors",
            StopReason::TargetCandidatesReached => "target candidates reached",
        }
    }
}

/// One observable step of a discovery run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub step: String,
    pub status: EventStatus,
    pub message: String,
    /// 0-100. Absent events leave the consumer's last value in place.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<u8>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub stopped_early: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_reason: Option<StopReason>,
    /// Stage-specific counters (source counts, tiles done, matched so far).
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub extra: serde_json::Map<String, Value>,
}

impl ProgressEvent {
    pub fn running(step: &str, message: impl Into<String>) -> Self {
        Self::new(step, EventStatus::Running, message)
    }

    pub fn warning(step: &str, message: impl Into<String>) -> Self {
        Self::new(step, EventStatus::Warning, message)
    }

    pub fn completed(step: &str, message: impl Into<String>) -> Self {
        Self::new(step, EventStatus::Completed, message)
    }

    fn new(step: &str, status: EventStatus, message: impl Into<String>) -> Self {
        Self {
            step: step.to_string(),
            status,
            message: message.into(),
            progress: None,
            stopped_early: false,
            stop_reason: None,
            extra: serde_json::Map::new(),
        }
    }

    pub fn with_progress(mut self, progress: u8) -> Self {
        self.progress = Some(progress.min(100));
        self
    }

    pub fn with_stop_reason(mut self, reason: StopReason) -> Self {
        self.stopped_early = true;
        self.stop_reason = Some(reason);
        self
    }

    pub fn with_extra(mut self, key: &str, value: Value) -> Self {
        self.extra.insert(key.to_string(), value);
        self
    }
}

/// Shared progress callback handed down through the pipeline.
pub type ProgressSink = Arc<dyn Fn(ProgressEvent) + Send + Sync>;

/// A sink that discards all events.
pub fn noop_sink() -> ProgressSink {
    Arc::new(|_| {})
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stop_reason_serializes_snake_case() {
        let event = ProgressEvent::warning("serpapi", "stopped")
            .with_stop_reason(StopReason::SerpapiFailureBudget);
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["stop_reason"], "serpapi_failure_budget");
        assert_eq!(json["stopped_early"], true);
        assert_eq!(json["status"], "warning");
    }

    #[test]
    fn test_progress_caps_at_100() {
        let event = ProgressEvent::running("filtering", "...").with_progress(250);
        assert_eq!(event.progress, Some(100));
    }
}
