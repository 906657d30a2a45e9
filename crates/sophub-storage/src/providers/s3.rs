//! S3-compatible blob store (requires the `s3` feature).

use std::time::Duration;

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::{Credentials, Region};
use aws_sdk_s3::presigning::{PresignedRequest, PresigningConfig};
use aws_sdk_s3::Client;
use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use sophub_core::config::S3StorageConfig;
use sophub_core::error::{AppError, ErrorKind};
use sophub_core::result::AppResult;
use sophub_core::traits::{BlobObject, BlobStore, HttpMethod, PresignedUrl};

/// Blob store backed by an S3 bucket. URLs are SigV4 presigned requests.
#[derive(Debug, Clone)]
pub struct S3BlobStore {
    client: Client,
    bucket: String,
}

impl S3BlobStore {
    /// Build a client from configuration. Static credentials are used when
    /// both keys are set; otherwise the default AWS provider chain applies.
    pub async fn new(config: &S3StorageConfig) -> AppResult<Self> {
        info!(
            endpoint = %config.endpoint,
            region = %config.region,
            bucket = %config.bucket,
            "Initializing S3 blob store"
        );

        let mut loader =
            aws_config::defaults(BehaviorVersion::latest()).region(Region::new(config.region.clone()));
        if !config.access_key.is_empty() && !config.secret_key.is_empty() {
            loader = loader.credentials_provider(Credentials::new(
                config.access_key.clone(),
                config.secret_key.clone(),
                None,
                None,
                "sophub-config",
            ));
        }
        let shared = loader.load().await;

        let mut builder =
            aws_sdk_s3::config::Builder::from(&shared).force_path_style(config.force_path_style);
        if !config.endpoint.is_empty() {
            builder = builder.endpoint_url(config.endpoint.clone());
        }

        Ok(Self {
            client: Client::from_conf(builder.build()),
            bucket: config.bucket.clone(),
        })
    }

    fn presigning(ttl: Duration) -> AppResult<PresigningConfig> {
        PresigningConfig::expires_in(ttl).map_err(|e| {
            AppError::with_source(ErrorKind::Storage, "Invalid presign lifetime", e)
        })
    }
}

fn to_presigned_url(request: &PresignedRequest, method: HttpMethod, ttl: Duration) -> PresignedUrl {
    request
        .headers()
        .fold(PresignedUrl::new(request.uri().to_string(), method, ttl), |url, (name, value)| {
            url.with_header(name, value)
        })
}

fn has_header(url: &PresignedUrl, name: &str) -> bool {
    url.headers.iter().any(|(n, _)| n.eq_ignore_ascii_case(name))
}

#[async_trait]
impl BlobStore for S3BlobStore {
    fn provider_type(&self) -> &str {
        "s3"
    }

    async fn health_check(&self) -> AppResult<bool> {
        match self.client.head_bucket().bucket(&self.bucket).send().await {
            Ok(_) => Ok(true),
            Err(e) => {
                warn!(bucket = %self.bucket, error = %e, "S3 bucket unreachable");
                Ok(false)
            }
        }
    }

    async fn issue_write_url(
        &self,
        key: &str,
        ttl: Duration,
        content_type: &str,
    ) -> AppResult<PresignedUrl> {
        let request = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .if_none_match("*")
            .presigned(Self::presigning(ttl)?)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Storage, "Failed to presign S3 upload", e)
            })?;

        debug!(key, "Presigned S3 upload");
        let mut url = to_presigned_url(&request, HttpMethod::Put, ttl);
        if !has_header(&url, "content-type") {
            url = url.with_header("Content-Type", content_type);
        }
        // Single-shot write: S3 refuses the PUT once the key exists.
        if !has_header(&url, "if-none-match") {
            url = url.with_header("If-None-Match", "*");
        }
        Ok(url)
    }

    async fn issue_read_url(
        &self,
        key: &str,
        ttl: Duration,
        inline_filename: Option<&str>,
    ) -> AppResult<PresignedUrl> {
        let mut op = self.client.get_object().bucket(&self.bucket).key(key);
        if let Some(name) = inline_filename {
            op = op.response_content_disposition(format!(
                "inline; filename=\"{}\"",
                name.replace('"', "")
            ));
        }
        let request = op.presigned(Self::presigning(ttl)?).await.map_err(|e| {
            AppError::with_source(ErrorKind::Storage, "Failed to presign S3 download", e)
        })?;
        Ok(to_presigned_url(&request, HttpMethod::Get, ttl))
    }

    async fn fetch(&self, key: &str) -> AppResult<Option<BlobObject>> {
        let output = match self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(output) => output,
            Err(e) if e.as_service_error().is_some_and(|se| se.is_no_such_key()) => {
                return Ok(None);
            }
            Err(e) => {
                return Err(AppError::with_source(
                    ErrorKind::Storage,
                    format!("Failed to fetch S3 object: {key}"),
                    e,
                ));
            }
        };

        let content_type = output.content_type().map(str::to_string);
        let last_modified = output
            .last_modified()
            .and_then(|t| DateTime::<Utc>::from_timestamp(t.secs(), t.subsec_nanos()));
        let data = output
            .body
            .collect()
            .await
            .map_err(|e| {
                AppError::with_source(
                    ErrorKind::Storage,
                    format!("Failed to read S3 object body: {key}"),
                    e,
                )
            })?
            .into_bytes();

        Ok(Some(BlobObject {
            key: key.to_string(),
            data,
            content_type,
            last_modified,
        }))
    }

    async fn delete(&self, key: &str) -> AppResult<bool> {
        // S3 deletes are idempotent, so existence is checked first.
        match self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(_) => {}
            Err(e) if e.as_service_error().is_some_and(|se| se.is_not_found()) => {
                return Ok(false);
            }
            Err(e) => {
                return Err(AppError::with_source(
                    ErrorKind::Storage,
                    format!("Failed to stat S3 object: {key}"),
                    e,
                ));
            }
        }

        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                AppError::with_source(
                    ErrorKind::Storage,
                    format!("Failed to delete S3 object: {key}"),
                    e,
                )
            })?;
        debug!(key, "Deleted S3 object");
        Ok(true)
    }
}
