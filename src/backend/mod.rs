//! Object Store Backends
//!
//! The key store never talks to a storage service directly. It goes through
//! the [`ObjectStore`] trait, which exposes exactly what a blob store with
//! per-object tag sets offers: buckets, whole-object put/get/delete, and
//! tag-set read/replace.
//!
//! ## Implementations
//!
//! - [`MemoryBackend`]: in-process, sharded, used by tests and benches
//! - `S3Backend` (feature `s3`): Amazon S3 or any S3-compatible endpoint
//!
//! ## Deadlines
//!
//! Backends are not responsible for timeouts. Callers wrap each call with
//! [`with_deadline`], which cancels the in-flight future when the configured
//! timeout elapses.

pub mod memory;
#[cfg(feature = "s3")]
pub mod s3;

pub use memory::MemoryBackend;
#[cfg(feature = "s3")]
pub use s3::S3Backend;

use async_trait::async_trait;
use bytes::Bytes;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

/// A single string tag attached to a stored object.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Tag {
    pub key: String,
    pub value: String,
}

impl Tag {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Failures reported by an object store.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum BackendError {
    /// The call did not complete before its deadline and was cancelled.
    #[error("{operation} timed out after {after:?}")]
    Timeout {
        operation: &'static str,
        after: Duration,
    },

    /// The object does not exist.
    #[error("no such key: {bucket}/{key}")]
    NoSuchKey { bucket: String, key: String },

    /// The bucket does not exist.
    #[error("no such bucket: {0}")]
    NoSuchBucket(String),

    /// Any other failure (transport, auth, throttling, ...).
    #[error("{operation} failed: {message}")]
    Request {
        operation: &'static str,
        message: String,
    },
}

/// Result type for backend calls.
pub type BackendResult<T> = Result<T, BackendError>;

/// Capabilities the key store needs from a blob store.
///
/// Implementations must be thread-safe; a single backend is typically shared
/// by several clients behind an `Arc`.
#[async_trait]
pub trait ObjectStore: Send + Sync + 'static {
    /// Names of all buckets visible to the caller.
    async fn list_buckets(&self) -> BackendResult<Vec<String>>;

    /// Creates `bucket` with `region` as its location constraint.
    async fn create_bucket(&self, bucket: &str, region: &str) -> BackendResult<()>;

    /// Writes the object body and its complete tag set in one call.
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Bytes,
        tags: Vec<Tag>,
    ) -> BackendResult<()>;

    /// Reads the object body. Fails with [`BackendError::NoSuchKey`] if absent.
    async fn get_object(&self, bucket: &str, key: &str) -> BackendResult<Bytes>;

    /// Removes the object together with its tags. Deleting a missing object succeeds.
    async fn delete_object(&self, bucket: &str, key: &str) -> BackendResult<()>;

    /// Reads the object's tag set. `Ok(None)` means the object does not exist.
    async fn get_object_tags(&self, bucket: &str, key: &str) -> BackendResult<Option<Vec<Tag>>>;

    /// Replaces the object's whole tag set.
    async fn put_object_tags(&self, bucket: &str, key: &str, tags: Vec<Tag>) -> BackendResult<()>;
}

/// Runs `call` under `timeout`. A zero timeout means no deadline.
pub async fn with_deadline<T, F>(
    operation: &'static str,
    timeout: Duration,
    call: F,
) -> BackendResult<T>
where
    F: Future<Output = BackendResult<T>>,
{
    if timeout.is_zero() {
        return call.await;
    }

    match tokio::time::timeout(timeout, call).await {
        Ok(result) => result,
        Err(_) => Err(BackendError::Timeout {
            operation,
            after: timeout,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_deadline_passes_result_through() {
        let result = with_deadline("op", Duration::from_secs(1), async { Ok(7) }).await;
        assert_eq!(result, Ok(7));
    }

    #[tokio::test]
    async fn test_deadline_expires() {
        let result: BackendResult<()> = with_deadline("slow", Duration::from_millis(20), async {
            tokio::time::sleep(Duration::from_millis(500)).await;
            Ok(())
        })
        .await;

        assert_eq!(
            result,
            Err(BackendError::Timeout {
                operation: "slow",
                after: Duration::from_millis(20),
            })
        );
    }

    #[tokio::test]
    async fn test_zero_timeout_waits() {
        let result = with_deadline("op", Duration::ZERO, async {
            tokio::time::sleep(Duration::from_millis(30)).await;
            Ok("done")
        })
        .await;
        assert_eq!(result, Ok("done"));
    }
}
