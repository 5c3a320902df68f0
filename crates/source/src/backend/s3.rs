//! S3-compatible object storage source (`json_s3` driver).
//!
//! Works against AWS S3 and S3-compatible services (Backblaze B2, Tigris,
//! MinIO, ...) by pointing the client at a custom endpoint.
//!
//! # Credentials
//!
//! Credentials come straight from the connection string. There is no
//! credential chain lookup; if none are configured the client is built
//! without a provider and the request fails at fetch time.

use crate::backend::FlagSource;
use crate::envelope::{Envelope, MAX_ENVELOPE_BYTES};
use crate::error::{ErrorKind, Result};
use crate::location::S3Location;
use async_trait::async_trait;
use aws_sdk_s3::{
    Client,
    config::{BehaviorVersion, Credentials, Region, retry::RetryConfig},
    error::DisplayErrorContext,
};
use exn::ResultExt;
use flagcache_entity::Flag;
use std::time::Duration;
use tracing::instrument;

/// Fetches an envelope with a single `GetObject` call.
///
/// # Examples
///
/// ```no_run
/// use flagcache_source::S3Location;
/// use flagcache_source::backend::S3Source;
/// use std::time::Duration;
///
/// let location: S3Location = "region=us-west-004 bucket=flags key=prod.json \
///     endpoint=https://s3.us-west-004.backblazeb2.com access_key_id=id secret_access_key=secret"
///     .parse()
///     .unwrap();
/// let source = S3Source::new(location, Duration::from_secs(30));
/// ```
#[derive(Debug, Clone)]
pub struct S3Source {
    client: Client,
    location: S3Location,
    timeout: Duration,
}
impl S3Source {
    pub fn new(location: S3Location, timeout: Duration) -> Self {
        let mut config_builder = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(location.region.clone()))
            // Configure retry policy with exponential backoff (1 initial + 2 retries),
            // all of which still has to fit inside the timeout.
            .retry_config(RetryConfig::standard().with_max_attempts(3))
            // Use path-style addressing for better compatibility with
            // S3-compatible services (Backblaze, MinIO, etc.)
            .force_path_style(true);
        if let (Some(key_id), Some(key_secret)) = (&location.access_key_id, &location.secret_access_key) {
            let credentials = Credentials::new(key_id, key_secret, None, None, "flagcache-config");
            config_builder = config_builder.credentials_provider(credentials);
        }
        // Set custom endpoint for non-AWS services
        if let Some(endpoint_url) = &location.endpoint {
            config_builder = config_builder.endpoint_url(endpoint_url);
        }
        let client = Client::from_conf(config_builder.build());
        Self { client, location, timeout }
    }

    pub fn location(&self) -> &S3Location {
        &self.location
    }

    async fn download(&self) -> Result<Vec<u8>> {
        let output = self
            .client
            .get_object()
            .bucket(&self.location.bucket)
            .key(&self.location.key)
            .send()
            .await
            .map_err(|e| ErrorKind::Network(DisplayErrorContext(&e).to_string()))?;
        if let Some(length) = output.content_length()
            && length > 0
            && length as u64 > MAX_ENVELOPE_BYTES
        {
            exn::bail!(ErrorKind::TooLarge(MAX_ENVELOPE_BYTES));
        }
        let body = output
            .body
            .collect()
            .await
            .or_raise(|| ErrorKind::Network(format!("reading s3://{}/{}", self.location.bucket, self.location.key)))?;
        Ok(body.into_bytes().to_vec())
    }
}

#[async_trait]
impl FlagSource for S3Source {
    fn name(&self) -> &str {
        "json_s3"
    }

    #[instrument(
        name = "fetch_s3",
        skip(self),
        fields(bucket = %self.location.bucket, key = %self.location.key, region = %self.location.region)
    )]
    async fn fetch(&self) -> Result<Vec<Flag>> {
        let bytes = tokio::time::timeout(self.timeout, self.download())
            .await
            .or_raise(|| ErrorKind::Timeout(self.timeout))??;
        let envelope = Envelope::from_slice(&bytes)?;
        tracing::debug!(flags = envelope.flags.len(), bytes = bytes.len(), "Read envelope from object storage");
        Ok(envelope.into_flags())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn location() -> S3Location {
        "region=us-east-1 bucket=flags key=prod/flags.json endpoint=http://127.0.0.1:9 access_key_id=id secret_access_key=secret"
            .parse()
            .unwrap()
    }

    #[test]
    fn test_new_keeps_location() {
        let source = S3Source::new(location(), Duration::from_secs(1));
        assert_eq!(source.name(), "json_s3");
        assert_eq!(source.location().bucket, "flags");
        assert_eq!(source.location().key, "prod/flags.json");
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_fails() {
        let source = S3Source::new(location(), Duration::from_secs(5));
        let err = source.fetch().await.unwrap_err();
        assert!(matches!(*err, ErrorKind::Network(_) | ErrorKind::Timeout(_)), "unexpected error: {err:?}");
    }
}
