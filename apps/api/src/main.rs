mod config;
mod convert;
mod errors;
mod ids;
mod kv;
mod llm_client;
mod routes;
mod state;
mod storage;
mod submission;
#[cfg(test)]
mod testing;

use anyhow::{Context, Result};
use std::net::SocketAddr;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use std::sync::Arc;

use crate::config::{Config, FileStoreConfig};
use crate::convert::PdfiumConverter;
use crate::ids::UuidGenerator;
use crate::kv::RedisKvStore;
use crate::llm_client::{AnthropicFeedbackClient, LlmClient};
use crate::routes::build_router;
use crate::state::AppState;
use crate::storage::{FileStore, LocalFileStore, S3FileStore};
use crate::submission::tracker::SubmissionTracker;
use crate::submission::workflow::ResumeSubmissionWorkflow;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={}",
                env!("CARGO_PKG_NAME").replace('-', "_"),
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Resume Analyzer API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize file store (S3 / MinIO or local directory)
    let files = build_file_store(&config.file_store).await;

    // Initialize Redis
    let redis = redis::Client::open(config.redis_url.clone())?;
    let kv = Arc::new(RedisKvStore::new(redis));
    info!("Redis client initialized");

    // Initialize LLM client
    let llm = LlmClient::new(config.anthropic_api_key.clone());
    let ai = Arc::new(AnthropicFeedbackClient::new(llm, files.clone()));
    info!("LLM client initialized (model: {})", llm_client::MODEL);

    // PDFium is bound once for the whole process; a missing library stops startup
    let converter = Arc::new(
        PdfiumConverter::start(config.pdfium_library_path.clone(), config.render_scale)
            .await
            .context("Failed to load the PDFium library")?,
    );
    info!(
        "PDF converter initialized (scale {}, library {})",
        config.render_scale,
        config.pdfium_library_path.as_deref().unwrap_or("system")
    );

    let workflow = ResumeSubmissionWorkflow::new(
        files,
        kv.clone(),
        ai,
        converter,
        Arc::new(UuidGenerator),
    );

    // Build app state
    let state = AppState {
        workflow: Arc::new(workflow),
        kv,
        submissions: SubmissionTracker::with_retention(config.submission_retention),
        max_upload_bytes: config.max_upload_bytes,
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn build_file_store(config: &FileStoreConfig) -> Arc<dyn FileStore> {
    match config {
        FileStoreConfig::S3 {
            bucket,
            endpoint,
            region,
            access_key_id,
            secret_access_key,
        } => {
            let store = S3FileStore::connect(
                endpoint,
                region,
                access_key_id,
                secret_access_key,
                bucket.clone(),
            )
            .await;
            info!("S3 file store initialized (bucket {bucket})");
            Arc::new(store)
        }
        FileStoreConfig::Local { root } => {
            info!("Local file store initialized at {}", root.display());
            Arc::new(LocalFileStore::new(root.clone()))
        }
    }
}
