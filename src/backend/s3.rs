//! Amazon S3 Backend
//!
//! [`ObjectStore`] over the AWS SDK. Works against AWS itself and against
//! S3-compatible services (MinIO, moto, LocalStack) through an endpoint
//! override, which also switches the client to path-style addressing.
//!
//! Object tags map one-to-one onto S3 object tagging. `put_object` sends the
//! tag set as the URL-encoded `x-amz-tagging` query string so body and tags
//! land in a single request.

use super::{BackendError, BackendResult, ObjectStore, Tag};
use crate::config::Options;
use async_trait::async_trait;
use aws_sdk_s3::error::{ProvideErrorMetadata, SdkError};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{BucketLocationConstraint, CreateBucketConfiguration, Tagging};
use aws_sdk_s3::Client;
use bytes::Bytes;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use tracing::debug;

/// Characters left as-is in a tagging query string.
const TAGGING: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// S3-backed object store.
#[derive(Debug, Clone)]
pub struct S3Backend {
    client: Client,
}

impl S3Backend {
    /// Builds an SDK client for `options.region`, honouring the endpoint override.
    ///
    /// Credentials come from the default AWS provider chain.
    pub async fn connect(options: &Options) -> Self {
        let sdk_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(aws_sdk_s3::config::Region::new(options.region.clone()))
            .load()
            .await;

        let mut builder = aws_sdk_s3::config::Builder::from(&sdk_config);
        if let Some(endpoint) = &options.endpoint {
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }

        debug!(region = %options.region, endpoint = ?options.endpoint, "S3 client configured");
        Self::from_client(Client::from_conf(builder.build()))
    }

    /// Wraps an existing SDK client.
    pub fn from_client(client: Client) -> Self {
        Self { client }
    }

    /// The underlying SDK client.
    pub fn client(&self) -> &Client {
        &self.client
    }
}

/// Encodes a tag set as `k1=v1&k2=v2` with every component percent-encoded.
fn tagging_query(tags: &[Tag]) -> String {
    tags.iter()
        .map(|tag| {
            format!(
                "{}={}",
                utf8_percent_encode(&tag.key, TAGGING),
                utf8_percent_encode(&tag.value, TAGGING)
            )
        })
        .collect::<Vec<_>>()
        .join("&")
}

fn request_error<E>(operation: &'static str, err: SdkError<E>) -> BackendError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
{
    let message = match err.as_service_error() {
        Some(service) => format!(
            "{}: {}",
            service.code().unwrap_or("Unknown"),
            service.message().unwrap_or_default()
        ),
        None => err.to_string(),
    };
    BackendError::Request { operation, message }
}

fn is_no_such_key<E: ProvideErrorMetadata>(err: &SdkError<E>) -> bool {
    err.as_service_error().is_some_and(has_no_such_key_code)
}

/// `GetObjectTagging` has no modeled "not found" variant, so the error code
/// is the only signal.
fn has_no_such_key_code<E: ProvideErrorMetadata>(err: &E) -> bool {
    err.code() == Some("NoSuchKey")
}

#[async_trait]
impl ObjectStore for S3Backend {
    async fn list_buckets(&self) -> BackendResult<Vec<String>> {
        let output = self
            .client
            .list_buckets()
            .send()
            .await
            .map_err(|e| request_error("list_buckets", e))?;

        Ok(output
            .buckets()
            .iter()
            .filter_map(|bucket| bucket.name().map(str::to_string))
            .collect())
    }

    async fn create_bucket(&self, bucket: &str, region: &str) -> BackendResult<()> {
        let configuration = CreateBucketConfiguration::builder()
            .location_constraint(BucketLocationConstraint::from(region))
            .build();

        self.client
            .create_bucket()
            .bucket(bucket)
            .create_bucket_configuration(configuration)
            .send()
            .await
            .map_err(|e| request_error("create_bucket", e))?;
        Ok(())
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Bytes,
        tags: Vec<Tag>,
    ) -> BackendResult<()> {
        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(ByteStream::from(body))
            .tagging(tagging_query(&tags))
            .send()
            .await
            .map_err(|e| request_error("put_object", e))?;
        Ok(())
    }

    async fn get_object(&self, bucket: &str, key: &str) -> BackendResult<Bytes> {
        let output = match self.client.get_object().bucket(bucket).key(key).send().await {
            Ok(output) => output,
            Err(err) if is_no_such_key(&err) => {
                return Err(BackendError::NoSuchKey {
                    bucket: bucket.to_string(),
                    key: key.to_string(),
                })
            }
            Err(err) => return Err(request_error("get_object", err)),
        };

        let body = output
            .body
            .collect()
            .await
            .map_err(|e| BackendError::Request {
                operation: "get_object",
                message: e.to_string(),
            })?;
        Ok(body.into_bytes())
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> BackendResult<()> {
        self.client
            .delete_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| request_error("delete_object", e))?;
        Ok(())
    }

    async fn get_object_tags(&self, bucket: &str, key: &str) -> BackendResult<Option<Vec<Tag>>> {
        let output = match self
            .client
            .get_object_tagging()
            .bucket(bucket)
            .key(key)
            .send()
            .await
        {
            Ok(output) => output,
            Err(err) if is_no_such_key(&err) => return Ok(None),
            Err(err) => return Err(request_error("get_object_tagging", err)),
        };

        Ok(Some(
            output
                .tag_set()
                .iter()
                .map(|tag| Tag::new(tag.key(), tag.value()))
                .collect(),
        ))
    }

    async fn put_object_tags(&self, bucket: &str, key: &str, tags: Vec<Tag>) -> BackendResult<()> {
        let tag_set = tags
            .into_iter()
            .map(|tag| {
                aws_sdk_s3::types::Tag::builder()
                    .key(tag.key)
                    .value(tag.value)
                    .build()
            })
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| BackendError::Request {
                operation: "put_object_tagging",
                message: e.to_string(),
            })?;

        let tagging = Tagging::builder()
            .set_tag_set(Some(tag_set))
            .build()
            .map_err(|e| BackendError::Request {
                operation: "put_object_tagging",
                message: e.to_string(),
            })?;

        self.client
            .put_object_tagging()
            .bucket(bucket)
            .key(key)
            .tagging(tagging)
            .send()
            .await
            .map_err(|e| request_error("put_object_tagging", e))?;
        Ok(())
    }
}
