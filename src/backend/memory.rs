//! In-Memory Object Store
//!
//! A thread-safe, in-process implementation of [`ObjectStore`]. It behaves
//! like a real blob store where it matters to the key store:
//!
//! - `put_object` writes body and tags together
//! - `put_object_tags` replaces the whole tag set
//! - `get_object_tags` on a missing object reports "no such key" as `None`
//! - `delete_object` is idempotent
//!
//! ## Layout
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                      MemoryBackend                           │
//! │   buckets: RwLock<HashMap<name, Arc<MemoryBucket>>>          │
//! │                                                              │
//! │   MemoryBucket                                               │
//! │  ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐             │
//! │  │ Shard 0 │ │ Shard 1 │ │ Shard 2 │ │ Shard N │             │
//! │  │ RwLock  │ │ RwLock  │ │ RwLock  │ │ RwLock  │             │
//! │  │ HashMap │ │ HashMap │ │ HashMap │ │ HashMap │             │
//! │  └─────────┘ └─────────┘ └─────────┘ └─────────┘             │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Objects are distributed across shards by key hash, so concurrent clients
//! working on different keys do not contend on a single lock.
//!
//! An optional per-call latency makes deadline handling testable.

use super::{BackendError, BackendResult, ObjectStore, Tag};
use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::hash::{DefaultHasher, Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Number of shards per bucket.
const NUM_SHARDS: usize = 16;

/// A stored object: body plus tag set.
#[derive(Debug, Clone)]
struct StoredObject {
    body: Bytes,
    tags: Vec<Tag>,
}

#[derive(Debug)]
struct Shard {
    objects: RwLock<HashMap<String, StoredObject>>,
}

impl Shard {
    fn new() -> Self {
        Self {
            objects: RwLock::new(HashMap::new()),
        }
    }
}

#[derive(Debug)]
struct MemoryBucket {
    region: String,
    shards: Vec<Shard>,
}

impl MemoryBucket {
    fn new(region: &str) -> Self {
        Self {
            region: region.to_string(),
            shards: (0..NUM_SHARDS).map(|_| Shard::new()).collect(),
        }
    }

    #[inline]
    fn shard(&self, key: &str) -> &Shard {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        &self.shards[(hasher.finish() as usize) % NUM_SHARDS]
    }

    fn len(&self) -> usize {
        self.shards.iter().map(|s| s.objects.read().len()).sum()
    }
}

/// Counters for calls made against a [`MemoryBackend`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BackendStats {
    pub puts: u64,
    pub gets: u64,
    pub deletes: u64,
    pub tag_reads: u64,
    pub tag_writes: u64,
}

/// An in-process object store.
///
/// # Example
///
/// ```
/// use tagkv::backend::{MemoryBackend, ObjectStore};
///
/// # tokio_test::block_on(async {
/// let backend = MemoryBackend::with_bucket("cache", "eu-west-1");
/// assert_eq!(backend.list_buckets().await.unwrap(), vec!["cache".to_string()]);
/// # });
/// ```
#[derive(Default)]
pub struct MemoryBackend {
    buckets: RwLock<HashMap<String, Arc<MemoryBucket>>>,
    latency: Duration,

    put_count: AtomicU64,
    get_count: AtomicU64,
    delete_count: AtomicU64,
    tag_read_count: AtomicU64,
    tag_write_count: AtomicU64,
}

impl std::fmt::Debug for MemoryBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryBackend")
            .field("buckets", &self.buckets.read().len())
            .field("latency", &self.latency)
            .finish()
    }
}

impl MemoryBackend {
    /// Creates an empty backend with no buckets.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a backend that already holds `bucket`.
    pub fn with_bucket(bucket: &str, region: &str) -> Self {
        let backend = Self::new();
        backend
            .buckets
            .write()
            .insert(bucket.to_string(), Arc::new(MemoryBucket::new(region)));
        backend
    }

    /// Delays every call by `latency` before it touches any data.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Removes `bucket` and everything in it. Returns whether it existed.
    pub fn drop_bucket(&self, bucket: &str) -> bool {
        self.buckets.write().remove(bucket).is_some()
    }

    /// Number of objects in `bucket` (0 if the bucket does not exist).
    pub fn len(&self, bucket: &str) -> usize {
        self.buckets.read().get(bucket).map_or(0, |b| b.len())
    }

    /// Returns true if `bucket` holds no objects.
    pub fn is_empty(&self, bucket: &str) -> bool {
        self.len(bucket) == 0
    }

    /// Returns true if the object exists.
    pub fn contains(&self, bucket: &str, key: &str) -> bool {
        let Ok(bucket) = self.bucket(bucket) else {
            return false;
        };
        let found = bucket.shard(key).objects.read().contains_key(key);
        found
    }

    /// Region the bucket was created with.
    pub fn region(&self, bucket: &str) -> Option<String> {
        self.buckets.read().get(bucket).map(|b| b.region.clone())
    }

    /// Call counters.
    pub fn stats(&self) -> BackendStats {
        BackendStats {
            puts: self.put_count.load(Ordering::Relaxed),
            gets: self.get_count.load(Ordering::Relaxed),
            deletes: self.delete_count.load(Ordering::Relaxed),
            tag_reads: self.tag_read_count.load(Ordering::Relaxed),
            tag_writes: self.tag_write_count.load(Ordering::Relaxed),
        }
    }

    fn bucket(&self, bucket: &str) -> BackendResult<Arc<MemoryBucket>> {
        self.buckets
            .read()
            .get(bucket)
            .cloned()
            .ok_or_else(|| BackendError::NoSuchBucket(bucket.to_string()))
    }

    async fn delay(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }
}

#[async_trait]
impl ObjectStore for MemoryBackend {
    async fn list_buckets(&self) -> BackendResult<Vec<String>> {
        self.delay().await;
        let mut names: Vec<String> = self.buckets.read().keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    async fn create_bucket(&self, bucket: &str, region: &str) -> BackendResult<()> {
        self.delay().await;
        let mut buckets = self.buckets.write();
        if buckets.contains_key(bucket) {
            return Err(BackendError::Request {
                operation: "create_bucket",
                message: format!("bucket already exists: {bucket}"),
            });
        }
        buckets.insert(bucket.to_string(), Arc::new(MemoryBucket::new(region)));
        Ok(())
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Bytes,
        tags: Vec<Tag>,
    ) -> BackendResult<()> {
        self.delay().await;
        self.put_count.fetch_add(1, Ordering::Relaxed);

        let bucket = self.bucket(bucket)?;
        bucket
            .shard(key)
            .objects
            .write()
            .insert(key.to_string(), StoredObject { body, tags });
        Ok(())
    }

    async fn get_object(&self, bucket: &str, key: &str) -> BackendResult<Bytes> {
        self.delay().await;
        self.get_count.fetch_add(1, Ordering::Relaxed);

        let stored = self.bucket(bucket)?;
        let body = stored
            .shard(key)
            .objects
            .read()
            .get(key)
            .map(|object| object.body.clone());
        body.ok_or_else(|| BackendError::NoSuchKey {
            bucket: bucket.to_string(),
            key: key.to_string(),
        })
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> BackendResult<()> {
        self.delay().await;
        self.delete_count.fetch_add(1, Ordering::Relaxed);

        let bucket = self.bucket(bucket)?;
        bucket.shard(key).objects.write().remove(key);
        Ok(())
    }

    async fn get_object_tags(&self, bucket: &str, key: &str) -> BackendResult<Option<Vec<Tag>>> {
        self.delay().await;
        self.tag_read_count.fetch_add(1, Ordering::Relaxed);

        let bucket = self.bucket(bucket)?;
        let tags = bucket
            .shard(key)
            .objects
            .read()
            .get(key)
            .map(|object| object.tags.clone());
        Ok(tags)
    }

    async fn put_object_tags(&self, bucket: &str, key: &str, tags: Vec<Tag>) -> BackendResult<()> {
        self.delay().await;
        self.tag_write_count.fetch_add(1, Ordering::Relaxed);

        let stored = self.bucket(bucket)?;
        let mut objects = stored.shard(key).objects.write();
        match objects.get_mut(key) {
            Some(object) => {
                object.tags = tags;
                Ok(())
            }
            None => Err(BackendError::NoSuchKey {
                bucket: bucket.to_string(),
                key: key.to_string(),
            }),
        }
    }
}
