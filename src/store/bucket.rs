//! Deadline-bound access to the configured bucket.

use crate::backend::{with_deadline, ObjectStore, Tag};
use crate::codec::{from_tags, KeyMetadata};
use crate::error::Result;
use bytes::Bytes;
use std::sync::Arc;
use std::time::Duration;
use tracing::trace;

/// One bucket of one backend, every call under the configured timeout.
#[derive(Clone)]
pub(crate) struct Bucket {
    backend: Arc<dyn ObjectStore>,
    name: String,
    timeout: Duration,
}

impl std::fmt::Debug for Bucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bucket")
            .field("name", &self.name)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl Bucket {
    pub(crate) fn new(backend: Arc<dyn ObjectStore>, name: &str, timeout: Duration) -> Self {
        Self {
            backend,
            name: name.to_string(),
            timeout,
        }
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    /// Whether the backend lists this bucket.
    pub(crate) async fn exists(&self) -> Result<bool> {
        let names = with_deadline("list_buckets", self.timeout, self.backend.list_buckets()).await?;
        Ok(names.iter().any(|name| *name == self.name))
    }

    pub(crate) async fn create(&self, region: &str) -> Result<()> {
        with_deadline(
            "create_bucket",
            self.timeout,
            self.backend.create_bucket(&self.name, region),
        )
        .await?;
        Ok(())
    }

    /// Raw tag set, `None` if the object does not exist.
    pub(crate) async fn read_tags(&self, key: &str) -> Result<Option<Vec<Tag>>> {
        let tags = with_deadline(
            "get_object_tagging",
            self.timeout,
            self.backend.get_object_tags(&self.name, key),
        )
        .await?;
        trace!(key, found = tags.is_some(), "read tags");
        Ok(tags)
    }

    /// Decoded metadata. A missing object yields the absent (all-zero) record.
    pub(crate) async fn read_metadata(&self, key: &str) -> Result<KeyMetadata> {
        match self.read_tags(key).await? {
            Some(tags) => Ok(from_tags(&tags)?),
            None => Ok(KeyMetadata::default()),
        }
    }

    pub(crate) async fn write_tags(&self, key: &str, tags: Vec<Tag>) -> Result<()> {
        with_deadline(
            "put_object_tagging",
            self.timeout,
            self.backend.put_object_tags(&self.name, key, tags),
        )
        .await?;
        Ok(())
    }

    pub(crate) async fn put(&self, key: &str, body: Bytes, tags: Vec<Tag>) -> Result<()> {
        with_deadline(
            "put_object",
            self.timeout,
            self.backend.put_object(&self.name, key, body, tags),
        )
        .await?;
        Ok(())
    }

    pub(crate) async fn get(&self, key: &str) -> Result<Bytes> {
        let body = with_deadline(
            "get_object",
            self.timeout,
            self.backend.get_object(&self.name, key),
        )
        .await?;
        Ok(body)
    }

    pub(crate) async fn delete(&self, key: &str) -> Result<()> {
        with_deadline(
            "delete_object",
            self.timeout,
            self.backend.delete_object(&self.name, key),
        )
        .await?;
        Ok(())
    }
}
