//! Resume Submission Workflow: drives one submission from upload to feedback.
//!
//! Flow: upload resume → render first page → upload image → persist record →
//!       request feedback → parse → persist again → navigate to `/resume/<id>`.
//!
//! Each stage consumes the previous stage's output and short-circuits on the
//! first error. Nothing is retried and earlier uploads are not rolled back.
//! `run` alone owns the processing flag: it is raised before the first stage
//! and lowered on every terminal outcome.

use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;
use tracing::{error, info};

use crate::convert::{ConversionError, PdfConverter};
use crate::ids::IdGenerator;
use crate::kv::{KeyValueStore, KvError};
use crate::llm_client::{strip_json_fences, FeedbackClient, FeedbackResponse, LlmError};
use crate::storage::{FileStore, FileStoreError, StoredFile, UploadFile};
use crate::submission::form::SubmissionRequest;
use crate::submission::prompts::prepare_instructions;
use crate::submission::record::{results_path, ResumeRecord};

pub const STATUS_UPLOADING_RESUME: &str = "Uploading your resume...";
pub const STATUS_CONVERTING: &str = "Analyzing your resume...";
pub const STATUS_UPLOADING_IMAGE: &str = "Uploading the image...";
pub const STATUS_PREPARING: &str = "Preparing data...";
pub const STATUS_ANALYZING: &str = "Analyzing...";
pub const STATUS_COMPLETE: &str = "Analysis complete! Redirecting...";

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("resume upload failed: {0}")]
    Upload(#[source] FileStoreError),

    #[error("PDF conversion failed: {0}")]
    Conversion(#[from] ConversionError),

    #[error("image upload failed: {0}")]
    ImageUpload(#[source] FileStoreError),

    #[error("saving resume record failed: {0}")]
    Persist(#[from] KvError),

    #[error("feedback request failed: {0}")]
    Feedback(#[from] LlmError),

    #[error("resume record could not be encoded: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("feedback is not valid JSON: {0}")]
    Parse(String),
}

impl WorkflowError {
    /// User-facing status text for this failure. Parse failures have none.
    pub fn status_message(&self) -> Option<&'static str> {
        match self {
            WorkflowError::Upload(_) => Some("Failed to upload file. Please try again."),
            WorkflowError::Conversion(_) => {
                Some("Failed to convert PDF to image. Please try again.")
            }
            WorkflowError::ImageUpload(_) => Some("Failed to upload image. Please try again."),
            WorkflowError::Persist(_) | WorkflowError::Encode(_) => {
                Some("Failed to save your resume. Please try again.")
            }
            WorkflowError::Feedback(_) => Some("Failed to get feedback. Please try again."),
            WorkflowError::Parse(_) => None,
        }
    }
}

/// Receives UI-visible progress: the processing flag, status text and the
/// final navigation target.
pub trait ProgressSink: Send + Sync {
    fn set_processing(&self, processing: bool);

    fn set_status(&self, text: &str);

    fn navigate(&self, path: &str);
}

/// Outcome of a successful run.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletedSubmission {
    pub record: ResumeRecord,
    pub redirect_to: String,
}

// Stage outputs.

struct UploadedResume {
    request: SubmissionRequest,
    resume: StoredFile,
}

struct RenderedResume {
    request: SubmissionRequest,
    resume: StoredFile,
    image: UploadFile,
}

struct StagedResume {
    request: SubmissionRequest,
    resume: StoredFile,
    image: StoredFile,
}

/// The capabilities a submission needs, injected at construction.
#[derive(Clone)]
pub struct ResumeSubmissionWorkflow {
    files: Arc<dyn FileStore>,
    kv: Arc<dyn KeyValueStore>,
    ai: Arc<dyn FeedbackClient>,
    converter: Arc<dyn PdfConverter>,
    ids: Arc<dyn IdGenerator>,
}

impl ResumeSubmissionWorkflow {
    pub fn new(
        files: Arc<dyn FileStore>,
        kv: Arc<dyn KeyValueStore>,
        ai: Arc<dyn FeedbackClient>,
        converter: Arc<dyn PdfConverter>,
        ids: Arc<dyn IdGenerator>,
    ) -> Self {
        Self {
            files,
            kv,
            ai,
            converter,
            ids,
        }
    }

    /// Runs a submission to completion or to its first failure.
    pub async fn run(
        &self,
        request: SubmissionRequest,
        sink: &dyn ProgressSink,
    ) -> Result<CompletedSubmission, WorkflowError> {
        sink.set_processing(true);

        let result = self.execute(request, sink).await;

        match &result {
            Ok(done) => sink.navigate(&done.redirect_to),
            Err(e) => {
                error!("Resume submission failed: {e}");
                if let Some(message) = e.status_message() {
                    sink.set_status(message);
                }
            }
        }

        sink.set_processing(false);
        result
    }

    async fn execute(
        &self,
        request: SubmissionRequest,
        sink: &dyn ProgressSink,
    ) -> Result<CompletedSubmission, WorkflowError> {
        sink.set_status(STATUS_UPLOADING_RESUME);
        let uploaded = self.upload_resume(request).await?;

        sink.set_status(STATUS_CONVERTING);
        let rendered = self.render_preview(uploaded).await?;

        sink.set_status(STATUS_UPLOADING_IMAGE);
        let staged = self.upload_preview(rendered).await?;

        sink.set_status(STATUS_PREPARING);
        let record = self.persist_record(staged).await?;

        sink.set_status(STATUS_ANALYZING);
        let record = self.analyze(record).await?;

        sink.set_status(STATUS_COMPLETE);
        info!(
            "Resume {} analyzed for {} at {}: {}",
            record.id,
            record.job_title,
            record.company_name,
            serde_json::to_string(&record).unwrap_or_default()
        );

        let redirect_to = results_path(&record.id);
        Ok(CompletedSubmission {
            record,
            redirect_to,
        })
    }

    async fn upload_resume(
        &self,
        request: SubmissionRequest,
    ) -> Result<UploadedResume, WorkflowError> {
        let resume = self
            .files
            .upload(&request.file)
            .await
            .map_err(WorkflowError::Upload)?;
        Ok(UploadedResume { request, resume })
    }

    async fn render_preview(
        &self,
        uploaded: UploadedResume,
    ) -> Result<RenderedResume, WorkflowError> {
        let image = self
            .converter
            .convert_to_image(&uploaded.request.file)
            .await?;
        Ok(RenderedResume {
            request: uploaded.request,
            resume: uploaded.resume,
            image,
        })
    }

    async fn upload_preview(
        &self,
        rendered: RenderedResume,
    ) -> Result<StagedResume, WorkflowError> {
        let image = self
            .files
            .upload(&rendered.image)
            .await
            .map_err(WorkflowError::ImageUpload)?;
        Ok(StagedResume {
            request: rendered.request,
            resume: rendered.resume,
            image,
        })
    }

    /// Builds the record with empty feedback and writes it once.
    async fn persist_record(&self, staged: StagedResume) -> Result<ResumeRecord, WorkflowError> {
        let SubmissionRequest {
            company_name,
            job_title,
            job_description,
            ..
        } = staged.request;

        let record = ResumeRecord::new(
            self.ids.generate(),
            staged.resume.path,
            staged.image.path,
            company_name,
            job_title,
            job_description,
        );
        self.save(&record).await?;
        Ok(record)
    }

    /// Requests feedback, stores the parsed value on the record and writes it again.
    async fn analyze(&self, mut record: ResumeRecord) -> Result<ResumeRecord, WorkflowError> {
        let instructions = prepare_instructions(&record.job_title, &record.job_description);
        let response = self
            .ai
            .feedback(&record.resume_path, &instructions)
            .await?;

        record.feedback = parse_feedback(&response)?;
        self.save(&record).await?;
        Ok(record)
    }

    async fn save(&self, record: &ResumeRecord) -> Result<(), WorkflowError> {
        let value = serde_json::to_string(record).map_err(WorkflowError::Encode)?;
        self.kv.set(&record.key(), &value).await?;
        Ok(())
    }
}

/// Extracts the response text and parses it as JSON. No schema is enforced.
pub fn parse_feedback(response: &FeedbackResponse) -> Result<Value, WorkflowError> {
    let text = response
        .text()
        .ok_or_else(|| WorkflowError::Parse("response has no text content".to_string()))?;
    serde_json::from_str(strip_json_fences(text)).map_err(|e| WorkflowError::Parse(e.to_string()))
}
