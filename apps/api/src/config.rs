use std::path::PathBuf;

use anyhow::{bail, Context, Result};

const DEFAULT_MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;
const DEFAULT_RENDER_SCALE: f32 = 4.0;
const DEFAULT_SUBMISSION_RETENTION_SECS: i64 = 60 * 60;

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub redis_url: String,
    pub file_store: FileStoreConfig,
    pub anthropic_api_key: String,
    /// Directory holding the PDFium shared library. `None` binds the system library.
    pub pdfium_library_path: Option<String>,
    pub render_scale: f32,
    pub max_upload_bytes: usize,
    /// How long a finished submission's progress stays pollable.
    pub submission_retention: chrono::Duration,
    pub port: u16,
    pub rust_log: String,
}

/// Where uploaded resumes and rendered images are written.
#[derive(Debug, Clone)]
pub enum FileStoreConfig {
    S3 {
        bucket: String,
        endpoint: String,
        region: String,
        access_key_id: String,
        secret_access_key: String,
    },
    Local {
        root: PathBuf,
    },
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            redis_url: require_env("REDIS_URL")?,
            file_store: FileStoreConfig::from_env()?,
            anthropic_api_key: require_env("ANTHROPIC_API_KEY")?,
            pdfium_library_path: std::env::var("PDFIUM_LIBRARY_PATH").ok(),
            render_scale: parse_env("RENDER_SCALE", DEFAULT_RENDER_SCALE)?,
            max_upload_bytes: parse_env("MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES)?,
            submission_retention: chrono::Duration::seconds(parse_env(
                "SUBMISSION_RETENTION_SECS",
                DEFAULT_SUBMISSION_RETENTION_SECS,
            )?),
            port: parse_env("PORT", 8080)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

impl FileStoreConfig {
    fn from_env() -> Result<Self> {
        let backend = std::env::var("FILE_STORE").unwrap_or_else(|_| "s3".to_string());
        match backend.as_str() {
            "s3" => Ok(FileStoreConfig::S3 {
                bucket: require_env("S3_BUCKET")?,
                endpoint: require_env("S3_ENDPOINT")?,
                region: std::env::var("S3_REGION").unwrap_or_else(|_| "us-east-1".to_string()),
                access_key_id: require_env("AWS_ACCESS_KEY_ID")?,
                secret_access_key: require_env("AWS_SECRET_ACCESS_KEY")?,
            }),
            "local" => Ok(FileStoreConfig::Local {
                root: std::env::var("LOCAL_STORE_DIR")
                    .map(PathBuf::from)
                    .unwrap_or_else(|_| PathBuf::from("./uploads")),
            }),
            other => bail!("FILE_STORE must be 's3' or 'local', got '{other}'"),
        }
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .with_context(|| format!("{key} has an invalid value '{raw}'")),
        Err(_) => Ok(default),
    }
}
