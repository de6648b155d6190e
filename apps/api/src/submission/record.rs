use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Key-value key under which a record is stored.
pub fn record_key(id: &str) -> String {
    format!("resume-{id}")
}

/// Navigation target of the results view for a record.
pub fn results_path(id: &str) -> String {
    format!("/resume/{id}")
}

/// The persisted submission: file handles, job details and, once analyzed, feedback.
///
/// `feedback` is `""` until the AI stage completes, then the parsed JSON value.
/// It is the only field that changes after the first write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumeRecord {
    pub id: String,
    pub resume_path: String,
    pub image_path: String,
    pub company_name: String,
    pub job_title: String,
    pub job_description: String,
    pub feedback: Value,
}

impl ResumeRecord {
    pub fn new(
        id: String,
        resume_path: String,
        image_path: String,
        company_name: String,
        job_title: String,
        job_description: String,
    ) -> Self {
        Self {
            id,
            resume_path,
            image_path,
            company_name,
            job_title,
            job_description,
            feedback: Value::String(String::new()),
        }
    }

    pub fn key(&self) -> String {
        record_key(&self.id)
    }

    pub fn has_feedback(&self) -> bool {
        !matches!(&self.feedback, Value::String(s) if s.is_empty())
    }
}
