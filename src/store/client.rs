//! Key Store Client
//!
//! [`Client`] gives Get/Set/Del/Lock/Unlock over a bucket. Every operation
//! resolves the key's metadata (a tag read) before it touches the value
//! body.
//!
//! ## Consistency
//!
//! With `enforce_consistency` set, `set` and `del` take the advisory lock
//! before writing. Each client has a random id that it records in the
//! `LockOwner` tag when it locks a key. A lock carrying the client's own id
//! does not block that client's `set` or `del`; any other lock gets
//! [`Error::AlreadyLocked`]. Ownership is read from the backend on every
//! call, so a lock that was cleared and retaken by someone else is not
//! mistaken for ours. A successful `set` rewrites the whole tag set with
//! `Locked=false` and so releases the lock.
//!
//! Side effects are not rolled back. If `set` takes the lock and the write
//! then fails, the key stays locked until the caller retries or unlocks.

use super::bucket::Bucket;
use super::expiry::{self, Liveness};
use super::lock::LockManager;
use crate::backend::{BackendError, ObjectStore};
use crate::codec::{to_tags, KeyMetadata, ValueCodec};
use crate::config::Options;
use crate::error::{Error, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// A value read back together with its metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct Stored<T> {
    pub metadata: KeyMetadata,
    pub value: T,
}

/// Outcome of a read that keeps the metadata even when the read fails.
#[derive(Debug)]
pub struct Lookup<T> {
    /// Metadata as resolved before the body was read. All zero if the tag
    /// read itself failed.
    pub metadata: KeyMetadata,
    pub value: Result<T>,
}

impl<T> Lookup<T> {
    pub fn into_result(self) -> Result<Stored<T>> {
        let metadata = self.metadata;
        self.value.map(|value| Stored { metadata, value })
    }
}

struct Inner {
    options: Options,
    bucket: Bucket,
    codec: ValueCodec,
    /// Written as `LockOwner` on the keys this client locks.
    id: String,
}

/// Key-value client over one bucket. Cheap to clone.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use tagkv::{backend::MemoryBackend, Client, Options};
///
/// # tokio_test::block_on(async {
/// let backend = Arc::new(MemoryBackend::new());
/// let options = Options::new("cache", "eu-west-1").with_auto_create_bucket(true);
/// let client = Client::connect(options, backend).await.unwrap();
///
/// client.set("greeting", &"hello".to_string(), 0).await.unwrap();
/// let stored = client.get::<String>("greeting").await.unwrap();
/// assert_eq!(stored.value, "hello");
/// assert_eq!(stored.metadata.expire_time, 0);
/// # });
/// ```
#[derive(Clone)]
pub struct Client {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("options", &self.inner.options)
            .field("id", &self.inner.id)
            .finish()
    }
}

impl Client {
    /// Connects with the built-in value shapes only.
    pub async fn connect<B: ObjectStore>(options: Options, backend: Arc<B>) -> Result<Self> {
        Self::connect_with_codec(options, backend, ValueCodec::new()).await
    }

    /// Validates `options`, makes sure the bucket exists, and returns a ready client.
    pub async fn connect_with_codec<B: ObjectStore>(
        options: Options,
        backend: Arc<B>,
        codec: ValueCodec,
    ) -> Result<Self> {
        options.validate()?;

        let bucket = Bucket::new(backend, &options.bucket, options.timeout);
        ensure_bucket(&bucket, &options).await?;

        debug!(
            bucket = %options.bucket,
            enforce_consistency = options.enforce_consistency,
            timeout_ms = options.timeout.as_millis() as u64,
            "client connected"
        );

        Ok(Self {
            inner: Arc::new(Inner {
                options,
                bucket,
                codec,
                id: Uuid::new_v4().to_string(),
            }),
        })
    }

    pub fn options(&self) -> &Options {
        &self.inner.options
    }

    pub fn codec(&self) -> &ValueCodec {
        &self.inner.codec
    }

    /// Lock owner id this client writes.
    pub fn id(&self) -> &str {
        &self.inner.id
    }

    /// Whether `key` is currently locked by this client.
    pub async fn holds_lock(&self, key: &str) -> Result<bool> {
        self.locks().holds(key).await
    }

    /// Checks that the bucket is still there.
    pub async fn ping(&self) -> Result<()> {
        if self.inner.bucket.exists().await? {
            Ok(())
        } else {
            Err(Error::BucketUnavailable {
                bucket: self.inner.bucket.name().to_string(),
                source: None,
            })
        }
    }

    /// Stores `value` under `key`. A `ttl_secs` of `0` never expires.
    pub async fn set<T>(&self, key: &str, value: &T, ttl_secs: u64) -> Result<()>
    where
        T: Serialize + 'static,
    {
        let now = expiry::now_unix();
        let metadata = KeyMetadata {
            value_type: self.inner.codec.shape_of::<T>()?.to_string(),
            locked: false,
            expire_time: expiry::expire_time(now, ttl_secs),
            last_update: now,
        };

        if self.inner.options.enforce_consistency {
            self.acquire(key, now).await?;
        }

        let encoded = self.inner.codec.encode(value)?;
        self.inner
            .bucket
            .put(key, encoded.bytes, to_tags(&metadata))
            .await?;

        debug!(key, value_type = %metadata.value_type, expire_time = metadata.expire_time, "set");
        Ok(())
    }

    /// Reads `key` as a `T`.
    pub async fn get<T>(&self, key: &str) -> Result<Stored<T>>
    where
        T: DeserializeOwned + 'static,
    {
        self.lookup(key).await.into_result()
    }

    /// Reads `key` as a `T`, returning the resolved metadata on every path.
    pub async fn lookup<T>(&self, key: &str) -> Lookup<T>
    where
        T: DeserializeOwned + 'static,
    {
        let metadata = match self.metadata(key).await {
            Ok(metadata) => metadata,
            Err(err) => {
                return Lookup {
                    metadata: KeyMetadata::default(),
                    value: Err(err),
                }
            }
        };

        let value = self.read_value(key, &metadata).await;
        Lookup { metadata, value }
    }

    /// Raw metadata for `key`. Does not apply expiry.
    pub async fn metadata(&self, key: &str) -> Result<KeyMetadata> {
        self.inner.bucket.read_metadata(key).await
    }

    /// Deletes `key` together with its metadata.
    pub async fn del(&self, key: &str) -> Result<()> {
        if self.inner.options.enforce_consistency {
            self.acquire(key, expiry::now_unix()).await?;
        }

        self.inner.bucket.delete(key).await?;

        debug!(key, "deleted");
        Ok(())
    }

    /// Sets the advisory lock on `key`.
    ///
    /// Locking a key that does not exist succeeds and does nothing. Locking a
    /// key that is already locked fails, even if this client holds it.
    pub async fn lock(&self, key: &str) -> Result<()> {
        self.locks().lock(key, expiry::now_unix()).await?;
        Ok(())
    }

    /// Clears the advisory lock on `key`, whoever set it.
    pub async fn unlock(&self, key: &str) -> Result<()> {
        self.locks().unlock(key).await?;
        Ok(())
    }

    async fn read_value<T>(&self, key: &str, metadata: &KeyMetadata) -> Result<T>
    where
        T: DeserializeOwned + 'static,
    {
        match expiry::classify(metadata, expiry::now_unix()) {
            Liveness::Absent => return Err(not_found(key)),
            Liveness::Expired => {
                warn!(key, expire_time = metadata.expire_time, "purging expired key");
                // A delete refused by someone else's lock wins over "not found".
                self.del(key).await?;
                return Err(not_found(key));
            }
            Liveness::Live => {}
        }

        let body = match self.inner.bucket.get(key).await {
            Ok(body) => body,
            // Deleted between the tag read and the body read.
            Err(Error::Backend(BackendError::NoSuchKey { .. })) => return Err(not_found(key)),
            Err(err) => return Err(err),
        };

        Ok(self.inner.codec.decode(&metadata.value_type, &body)?)
    }

    /// Takes the lock for a mutation unless this client's lock is still on the key.
    async fn acquire(&self, key: &str, now: i64) -> Result<()> {
        self.locks().acquire(key, now).await?;
        Ok(())
    }

    fn locks(&self) -> LockManager<'_> {
        LockManager::new(&self.inner.bucket, &self.inner.id)
    }
}

fn not_found(key: &str) -> Error {
    Error::KeyNotFound {
        key: key.to_string(),
    }
}

async fn ensure_bucket(bucket: &Bucket, options: &Options) -> Result<()> {
    if bucket.exists().await? {
        return Ok(());
    }

    if !options.auto_create_bucket {
        return Err(Error::BucketUnavailable {
            bucket: options.bucket.clone(),
            source: None,
        });
    }

    match bucket.create(&options.region).await {
        Ok(()) => {
            info!(bucket = %options.bucket, region = %options.region, "bucket created");
            Ok(())
        }
        Err(Error::Backend(source)) => Err(Error::BucketUnavailable {
            bucket: options.bucket.clone(),
            source: Some(source),
        }),
        Err(err) => Err(err),
    }
}
