//! In-memory progress of submissions, polled by clients while the workflow runs.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use crate::submission::workflow::ProgressSink;

/// What a client sees for one submission.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubmissionState {
    pub processing: bool,
    pub status_text: String,
    pub redirect_to: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl SubmissionState {
    fn idle() -> Self {
        Self {
            processing: false,
            status_text: String::new(),
            redirect_to: None,
            updated_at: Utc::now(),
        }
    }

    fn is_expired(&self, now: DateTime<Utc>, retention: Duration) -> bool {
        !self.processing && now.signed_duration_since(self.updated_at) > retention
    }
}

type States = Arc<RwLock<HashMap<Uuid, SubmissionState>>>;

const DEFAULT_RETENTION_SECS: i64 = 60 * 60;

/// Finished submissions are dropped once they have been idle longer than
/// `retention`. Submissions still processing are always kept.
#[derive(Clone)]
pub struct SubmissionTracker {
    states: States,
    retention: Duration,
}

impl Default for SubmissionTracker {
    fn default() -> Self {
        Self::with_retention(Duration::seconds(DEFAULT_RETENTION_SECS))
    }
}

impl SubmissionTracker {
    pub fn with_retention(retention: Duration) -> Self {
        Self {
            states: States::default(),
            retention,
        }
    }

    /// Registers a new submission and returns the sink that updates it.
    /// Expired submissions are pruned first.
    pub fn start(&self) -> (Uuid, TrackedSubmission) {
        let id = Uuid::new_v4();
        let mut states = self.states.write().unwrap_or_else(PoisonError::into_inner);

        let now = Utc::now();
        let before = states.len();
        states.retain(|_, state| !state.is_expired(now, self.retention));
        if states.len() < before {
            debug!("Pruned {} finished submissions", before - states.len());
        }

        states.insert(id, SubmissionState::idle());
        drop(states);
        (
            id,
            TrackedSubmission {
                id,
                states: self.states.clone(),
            },
        )
    }

    pub fn get(&self, id: Uuid) -> Option<SubmissionState> {
        self.states
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .cloned()
    }
}

/// Progress sink bound to one submission.
pub struct TrackedSubmission {
    id: Uuid,
    states: States,
}

impl TrackedSubmission {
    fn update(&self, apply: impl FnOnce(&mut SubmissionState)) {
        let mut states = self.states.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(state) = states.get_mut(&self.id) {
            apply(state);
            state.updated_at = Utc::now();
        }
    }
}

impl ProgressSink for TrackedSubmission {
    fn set_processing(&self, processing: bool) {
        self.update(|s| s.processing = processing);
    }

    fn set_status(&self, text: &str) {
        self.update(|s| s.status_text = text.to_string());
    }

    fn navigate(&self, path: &str) {
        self.update(|s| s.redirect_to = Some(path.to_string()));
    }
}
