//! Axum route handlers for resume submission and results.

use axum::{
    extract::{multipart::Field, Multipart, Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use tracing::{debug, info};
use uuid::Uuid;

use crate::errors::AppError;
use crate::state::AppState;
use crate::storage::UploadFile;
use crate::submission::form::SubmissionForm;
use crate::submission::record::{record_key, ResumeRecord};
use crate::submission::tracker::SubmissionState;

const PDF_CONTENT_TYPE: &str = "application/pdf";
const PDF_MAGIC: &[u8] = b"%PDF-";

#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub submission_id: Uuid,
    pub status_url: String,
}

/// POST /api/v1/resumes
///
/// Multipart fields: `company-name`, `job-title`, `job-description`, `file`.
/// Starts the workflow in the background; progress is polled via `status_url`.
pub async fn handle_submit(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<SubmitResponse>), AppError> {
    let form = read_form(&mut multipart).await?;

    let request = form.into_request().ok_or_else(|| {
        AppError::Validation(
            "company-name, job-title, job-description and file are required".to_string(),
        )
    })?;
    check_resume_file(&request.file, state.max_upload_bytes)?;

    let (submission_id, sink) = state.submissions.start();
    let workflow = state.workflow.clone();
    tokio::spawn(async move {
        if let Ok(done) = workflow.run(request, &sink).await {
            info!("Submission {submission_id} complete → {}", done.redirect_to);
        }
    });

    Ok((
        StatusCode::ACCEPTED,
        Json(SubmitResponse {
            submission_id,
            status_url: format!("/api/v1/submissions/{submission_id}"),
        }),
    ))
}

/// GET /api/v1/submissions/:id
pub async fn handle_get_submission(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SubmissionState>, AppError> {
    state
        .submissions
        .get(id)
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Submission {id} not found")))
}

/// GET /api/v1/resumes/:id and /resume/:id
pub async fn handle_get_resume(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ResumeRecord>, AppError> {
    let raw = state
        .kv
        .get(&record_key(&id))
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Resume {id} not found")))?;

    let record = serde_json::from_str::<ResumeRecord>(&raw)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Stored resume {id} is corrupt: {e}")))?;
    debug!("Serving resume {id} (feedback ready: {})", record.has_feedback());
    Ok(Json(record))
}

async fn read_form(multipart: &mut Multipart) -> Result<SubmissionForm, AppError> {
    let mut form = SubmissionForm::default();

    while let Some(field) = multipart.next_field().await.map_err(invalid_body)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "company-name" => form.company_name = Some(field.text().await.map_err(invalid_body)?),
            "job-title" => form.job_title = Some(field.text().await.map_err(invalid_body)?),
            "job-description" => {
                form.job_description = Some(field.text().await.map_err(invalid_body)?)
            }
            "file" => form.file = read_file(field).await?,
            other => debug!("Ignoring unknown form field '{other}'"),
        }
    }

    Ok(form)
}

/// An empty file part (no file picked) counts as no file.
async fn read_file(field: Field<'_>) -> Result<Option<UploadFile>, AppError> {
    let name = field.file_name().unwrap_or("resume.pdf").to_string();
    let content_type = field
        .content_type()
        .unwrap_or("application/octet-stream")
        .to_string();
    let bytes = field.bytes().await.map_err(invalid_body)?;

    if bytes.is_empty() {
        return Ok(None);
    }
    Ok(Some(UploadFile::new(name, content_type, bytes)))
}

fn check_resume_file(file: &UploadFile, max_bytes: usize) -> Result<(), AppError> {
    if file.bytes.len() > max_bytes {
        return Err(AppError::Validation(format!(
            "Resume is {} bytes; the limit is {max_bytes}",
            file.bytes.len()
        )));
    }
    if file.content_type != PDF_CONTENT_TYPE && !file.bytes.starts_with(PDF_MAGIC) {
        return Err(AppError::Validation("Resume must be a PDF".to_string()));
    }
    Ok(())
}

fn invalid_body(e: axum::extract::multipart::MultipartError) -> AppError {
    AppError::Validation(format!("Invalid multipart body: {e}"))
}
