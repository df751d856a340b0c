use std::path::{Path, PathBuf};

use aws_config::BehaviorVersion;
use aws_sdk_s3::{config::Region, error::DisplayErrorContext, primitives::ByteStreamError};
use tokio::io::AsyncWriteExt as _;
use tracing::debug;

use crate::job;

pub struct Client {
    client: aws_sdk_s3::Client,
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Failed to list objects in {bucket}: {error}")]
    List { bucket: String, error: String },
    #[error("Failed to get object {bucket}/{key}: {error}")]
    Get {
        bucket: String,
        key: String,
        error: String,
    },
    #[error("Failed to read object body: {0}")]
    Body(ByteStreamError),
    #[error("Failed to write {path}: {error}")]
    Write {
        path: PathBuf,
        error: std::io::Error,
    },
}

/// Static credentials. Without them the default provider chain applies.
pub struct Credentials<'a> {
    pub access_key_id: &'a str,
    pub secret_access_key: &'a str,
}

impl Client {
    pub async fn new(
        endpoint: Option<&str>,
        region: &str,
        credentials: Option<Credentials<'_>>,
        force_path_style: bool,
    ) -> Self {
        let mut loader =
            aws_config::defaults(BehaviorVersion::latest()).region(Region::new(region.to_owned()));
        if let Some(credentials) = credentials {
            loader = loader.credentials_provider(aws_sdk_s3::config::Credentials::new(
                credentials.access_key_id,
                credentials.secret_access_key,
                None,
                None,
                "static",
            ));
        }
        let shared = loader.load().await;
        let mut builder = aws_sdk_s3::config::Builder::from(&shared);
        if let Some(endpoint) = endpoint {
            builder = builder.endpoint_url(endpoint);
        }
        builder = builder.force_path_style(force_path_style);
        Self {
            client: aws_sdk_s3::Client::from_conf(builder.build()),
        }
    }
}

impl job::storage::objstore::Client for Client {
    type Error = Error;

    async fn list_keys(&self, bucket: &str, prefix: &str) -> Result<Vec<String>, Self::Error> {
        let mut pages = self
            .client
            .list_objects_v2()
            .bucket(bucket)
            .prefix(prefix)
            .into_paginator()
            .send();
        let mut keys = Vec::new();
        while let Some(page) = pages.next().await {
            let page = page.map_err(|error| Error::List {
                bucket: bucket.to_owned(),
                error: DisplayErrorContext(&error).to_string(),
            })?;
            keys.extend(
                page.contents()
                    .iter()
                    .filter_map(|object| object.key().map(str::to_owned)),
            );
        }
        Ok(keys)
    }

    async fn download(&self, bucket: &str, key: &str, dest: &Path) -> Result<(), Self::Error> {
        let mut object = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|error| Error::Get {
                bucket: bucket.to_owned(),
                key: key.to_owned(),
                error: DisplayErrorContext(&error).to_string(),
            })?;
        let write_error = |error| Error::Write {
            path: dest.to_owned(),
            error,
        };
        let mut file = tokio::fs::File::create(dest).await.map_err(write_error)?;
        let mut size = 0;
        while let Some(chunk) = object.body.try_next().await.map_err(Error::Body)? {
            size += chunk.len();
            file.write_all(&chunk).await.map_err(write_error)?;
        }
        file.flush().await.map_err(write_error)?;
        debug!(bucket, key, size, "downloaded object");
        Ok(())
    }
}
