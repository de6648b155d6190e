//! Form intake. A submission only starts when every field is present and non-empty.

use crate::storage::UploadFile;

/// Raw form fields as received. Any of them may be missing.
#[derive(Debug, Clone, Default)]
pub struct SubmissionForm {
    pub company_name: Option<String>,
    pub job_title: Option<String>,
    pub job_description: Option<String>,
    pub file: Option<UploadFile>,
}

/// A complete submission, ready for the workflow.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmissionRequest {
    pub company_name: String,
    pub job_title: String,
    pub job_description: String,
    pub file: UploadFile,
}

impl SubmissionForm {
    /// Returns `None` when the file is missing or any text field is empty.
    /// Text is taken as-is; a whitespace-only value counts as filled in.
    pub fn into_request(self) -> Option<SubmissionRequest> {
        let company_name = self.company_name.filter(|s| !s.is_empty())?;
        let job_title = self.job_title.filter(|s| !s.is_empty())?;
        let job_description = self.job_description.filter(|s| !s.is_empty())?;
        let file = self.file?;

        Some(SubmissionRequest {
            company_name,
            job_title,
            job_description,
            file,
        })
    }
}
