use async_trait::async_trait;
use aws_config::Region;
use aws_sdk_s3::config::Credentials;
use aws_sdk_s3::primitives::ByteStream;
use bytes::Bytes;
use tracing::info;

use super::{object_key, FileStore, FileStoreError, StoredFile, UploadFile};

/// S3 / MinIO backed file store.
#[derive(Clone)]
pub struct S3FileStore {
    client: aws_sdk_s3::Client,
    bucket: String,
}

impl S3FileStore {
    pub fn new(client: aws_sdk_s3::Client, bucket: String) -> Self {
        Self { client, bucket }
    }

    /// Constructs an S3 client configured for MinIO (local) or AWS (production).
    pub async fn connect(
        endpoint: &str,
        region: &str,
        access_key_id: &str,
        secret_access_key: &str,
        bucket: String,
    ) -> Self {
        let credentials = Credentials::new(
            access_key_id,
            secret_access_key,
            None,
            None,
            "resume-analyzer-static",
        );

        let s3_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(Region::new(region.to_string()))
            .credentials_provider(credentials)
            .endpoint_url(endpoint)
            .load()
            .await;

        let client = aws_sdk_s3::Client::from_conf(
            aws_sdk_s3::config::Builder::from(&s3_config)
                .force_path_style(true)
                .build(),
        );

        Self::new(client, bucket)
    }
}

#[async_trait]
impl FileStore for S3FileStore {
    async fn upload(&self, file: &UploadFile) -> Result<StoredFile, FileStoreError> {
        let key = object_key(&file.name);

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .body(ByteStream::from(file.bytes.clone()))
            .content_type(&file.content_type)
            .send()
            .await
            .map_err(|e| FileStoreError::S3(format!("upload of {key} failed: {e}")))?;

        info!("Uploaded {} to s3://{}/{}", file.name, self.bucket, key);

        Ok(StoredFile {
            path: key,
            name: file.name.clone(),
            size: file.bytes.len() as u64,
        })
    }

    async fn read(&self, path: &str) -> Result<Bytes, FileStoreError> {
        let output = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(path)
            .send()
            .await
            .map_err(|e| {
                if e.as_service_error().map(|se| se.is_no_such_key()) == Some(true) {
                    FileStoreError::NotFound(path.to_string())
                } else {
                    FileStoreError::S3(format!("download of {path} failed: {e}"))
                }
            })?;

        let data = output
            .body
            .collect()
            .await
            .map_err(|e| FileStoreError::S3(format!("reading body of {path} failed: {e}")))?;

        Ok(data.into_bytes())
    }
}
