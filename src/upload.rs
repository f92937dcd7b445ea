//! Uploads written partitions and the run summary to an object store.

use std::path::Path;

use anyhow::{Context, Result};
use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use serde::Serialize;
use tracing::{debug, info};

use crate::output::{WrittenPartition, partition_file_name};

/// Abstraction over a bucket-style object store.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put(&self, key: &str, body: Vec<u8>, content_type: &str) -> Result<()>;
}

/// An [`ObjectStore`] backed by an S3 bucket.
///
/// Credentials come from the ambient AWS configuration loaded by
/// `aws_config::load_from_env`.
pub struct S3Store {
    client: aws_sdk_s3::Client,
    bucket: String,
}

impl S3Store {
    pub fn new(config: &aws_config::SdkConfig, bucket: impl Into<String>) -> Self {
        Self {
            client: aws_sdk_s3::Client::new(config),
            bucket: bucket.into(),
        }
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn put(&self, key: &str, body: Vec<u8>, content_type: &str) -> Result<()> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(body))
            .content_type(content_type)
            .send()
            .await
            .with_context(|| format!("S3 PutObject failed for '{}/{}'", self.bucket, key))?;
        Ok(())
    }
}

/// Object key for a partition under `prefix`.
pub fn partition_key(prefix: &str, partition: &WrittenPartition) -> String {
    let gzip = partition.path.extension().and_then(|e| e.to_str()) == Some("gz");
    join_key(prefix, &partition_file_name(partition.date, gzip))
}

fn join_key(prefix: &str, name: &str) -> String {
    let prefix = prefix.trim_matches('/');
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}/{name}")
    }
}

/// Serializes a value to JSON and stores it with `application/json` content type.
pub async fn write_json<S: ObjectStore + ?Sized>(
    store: &S,
    key: &str,
    value: &impl Serialize,
) -> Result<()> {
    let body = serde_json::to_vec(value)?;
    store.put(key, body, "application/json").await
}

/// Uploads every partition file, then `summary` as `<prefix>/summary.json`.
///
/// Returns the number of partitions uploaded.
#[tracing::instrument(skip(store, partitions, summary), fields(partitions = partitions.len()))]
pub async fn upload_partitions<S: ObjectStore + ?Sized>(
    store: &S,
    prefix: &str,
    partitions: &[WrittenPartition],
    summary: &impl Serialize,
) -> Result<usize> {
    let mut upload_count = 0;

    for partition in partitions {
        let key = partition_key(prefix, partition);
        let body = read_partition(&partition.path).await?;
        let content_type = if key.ends_with(".gz") {
            "application/gzip"
        } else {
            "text/csv"
        };

        store.put(&key, body, content_type).await?;
        debug!(key = %key, records = partition.records, "Partition uploaded");
        upload_count += 1;
    }

    write_json(store, &join_key(prefix, "summary.json"), summary).await?;

    info!(upload_count, prefix, "Upload complete");
    Ok(upload_count)
}

async fn read_partition(path: &Path) -> Result<Vec<u8>> {
    tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read partition {}", path.display()))
}
