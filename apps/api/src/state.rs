use std::sync::Arc;

use crate::kv::KeyValueStore;
use crate::submission::tracker::SubmissionTracker;
use crate::submission::workflow::ResumeSubmissionWorkflow;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub workflow: Arc<ResumeSubmissionWorkflow>,
    /// Read side of the record store, used by the results endpoint.
    pub kv: Arc<dyn KeyValueStore>,
    pub submissions: SubmissionTracker,
    /// Largest accepted resume, in bytes.
    pub max_upload_bytes: usize,
}
