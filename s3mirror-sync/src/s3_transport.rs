//! S3 listing and download operations.
//!
//! Implements [`ObjectLister`] over the ListObjectsV2 paginator and
//! [`ObjectFetcher`] by streaming GetObject bodies straight to disk.

use crate::config::MirrorConfig;
use crate::error::{SyncError, SyncResult};
use crate::remote::{ObjectFetcher, ObjectLister, RemoteObject};
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::Client as S3Client;
use std::path::Path;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

/// S3 client bound to one bucket.
pub struct S3Transport {
    client: S3Client,
    bucket: String,
}

impl S3Transport {
    /// Wraps an already configured client.
    pub fn new(client: S3Client, bucket: String) -> Self {
        Self { client, bucket }
    }

    /// Builds a client from mirror configuration.
    ///
    /// Static credentials are used when both key variables are set, otherwise
    /// the AWS default provider chain (profile, IMDS, web identity, ...).
    pub async fn from_config(config: &MirrorConfig) -> SyncResult<Self> {
        let region = aws_types::region::Region::new(config.region.clone());

        let mut config_builder = match config.static_credentials() {
            Some((access_key_id, secret_access_key)) => {
                let credentials = aws_credential_types::Credentials::new(
                    access_key_id,
                    secret_access_key,
                    None,
                    None,
                    "s3mirror-env",
                );
                aws_sdk_s3::Config::builder()
                    .region(region)
                    .credentials_provider(credentials)
                    .behavior_version_latest()
            }
            None => {
                let shared = aws_config::defaults(BehaviorVersion::latest())
                    .region(region)
                    .load()
                    .await;
                aws_sdk_s3::config::Builder::from(&shared)
            }
        };

        if let Some(ref endpoint) = config.endpoint_override {
            config_builder = config_builder
                .endpoint_url(endpoint)
                .force_path_style(true);
        }

        debug!(
            "built S3 client for bucket {} in {}",
            config.bucket, config.region
        );
        Ok(Self::new(
            S3Client::from_conf(config_builder.build()),
            config.bucket.clone(),
        ))
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }
}

#[async_trait]
impl ObjectLister for S3Transport {
    async fn list(&self, prefix: &str) -> SyncResult<Vec<RemoteObject>> {
        let mut pages = self
            .client
            .list_objects_v2()
            .bucket(&self.bucket)
            .prefix(prefix)
            .into_paginator()
            .send();

        let mut objects = Vec::new();
        let mut page_count = 0usize;
        while let Some(page) = pages.next().await {
            let page = page.map_err(|e| {
                SyncError::Listing(format!(
                    "page {} of s3://{}/{prefix}: {e}",
                    page_count + 1,
                    self.bucket
                ))
            })?;
            page_count += 1;

            for obj in page.contents() {
                let Some(key) = obj.key() else { continue };
                objects.push(RemoteObject {
                    key: key.to_string(),
                    fingerprint: obj.e_tag().unwrap_or_default().to_string(),
                    modified_at: obj.last_modified().map(|t| t.secs()).unwrap_or(0),
                    size: obj.size(),
                });
            }
        }

        info!(
            "listed {} objects under s3://{}/{prefix} ({page_count} pages)",
            objects.len(),
            self.bucket
        );
        Ok(objects)
    }
}

#[async_trait]
impl ObjectFetcher for S3Transport {
    async fn fetch(&self, key: &str, dest: &Path) -> SyncResult<u64> {
        let resp = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| SyncError::fetch(key, format!("get object: {e}")))?;

        let mut file = tokio::fs::File::create(dest)
            .await
            .map_err(|e| SyncError::fetch(key, format!("create {}: {e}", dest.display())))?;

        let mut body = resp.body;
        let mut written = 0u64;
        while let Some(chunk) = body
            .try_next()
            .await
            .map_err(|e| SyncError::fetch(key, format!("read body: {e}")))?
        {
            file.write_all(&chunk)
                .await
                .map_err(|e| SyncError::fetch(key, format!("write {}: {e}", dest.display())))?;
            written += chunk.len() as u64;
        }
        file.flush()
            .await
            .map_err(|e| SyncError::fetch(key, format!("flush {}: {e}", dest.display())))?;

        debug!(
            "downloaded s3://{}/{key} ({written} bytes) to {}",
            self.bucket,
            dest.display()
        );
        Ok(written)
    }
}
