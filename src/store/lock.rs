//! Advisory Key Locks
//!
//! The lock is the `Locked` tag on the key's object, with the locking
//! client's id in `LockOwner`; nothing is held in memory. Acquiring it is a
//! tag read followed by a tag write:
//!
//! ```text
//!   read tags ──> absent? ───────────────> no-op
//!       │
//!       ├──> locked by us (acquire only)? ─> held, no write
//!       │
//!       ├──> locked and not expired? ────> AlreadyLocked
//!       │
//!       └──> write tags with Locked=true ─> acquired
//! ```
//!
//! The backend has no conditional tag write, so two callers can both read
//! `Locked=false` and both write `Locked=true`. The lock narrows the window
//! for concurrent modification; it does not provide mutual exclusion, and it
//! only constrains callers that check it.
//!
//! Object stores replace the whole tag set on write, so the flag is written
//! back together with every other tag exactly as it was read.

use super::bucket::Bucket;
use crate::backend::Tag;
use crate::codec::from_tags;
use crate::codec::metadata::{lock_owner, with_lock};
use crate::error::{Error, Result};
use tracing::{debug, warn};

/// Result of a lock attempt that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockOutcome {
    /// `Locked=true` was written.
    Acquired,
    /// The caller's own lock was still on the key. Nothing was written.
    Held,
    /// The key does not exist; there was nothing to lock.
    Absent,
}

pub(crate) struct LockManager<'a> {
    bucket: &'a Bucket,
    owner: &'a str,
}

impl<'a> LockManager<'a> {
    pub(crate) fn new(bucket: &'a Bucket, owner: &'a str) -> Self {
        Self { bucket, owner }
    }

    /// Takes the lock. Fails on any live lock, including one `owner` set.
    pub(crate) async fn lock(&self, key: &str, now: i64) -> Result<LockOutcome> {
        self.take(key, now, false).await
    }

    /// Takes the lock for a mutation. A lock that `owner` set and that is
    /// still recorded on the key counts as taken.
    pub(crate) async fn acquire(&self, key: &str, now: i64) -> Result<LockOutcome> {
        self.take(key, now, true).await
    }

    async fn take(&self, key: &str, now: i64, reuse_own: bool) -> Result<LockOutcome> {
        let Some(tags) = self.bucket.read_tags(key).await? else {
            return Ok(LockOutcome::Absent);
        };
        let metadata = from_tags(&tags)?;

        if metadata.is_absent() {
            return Ok(LockOutcome::Absent);
        }

        if metadata.locked {
            if reuse_own && self.owns(&tags) {
                return Ok(LockOutcome::Held);
            }
            if !metadata.is_expired(now) {
                debug!(key, owner = lock_owner(&tags), "lock contended");
                return Err(Error::AlreadyLocked {
                    key: key.to_string(),
                });
            }
            warn!(key, expire_time = metadata.expire_time, "taking over stale lock on expired key");
        }

        self.bucket
            .write_tags(key, with_lock(&tags, Some(self.owner)))
            .await?;
        debug!(key, owner = self.owner, "lock acquired");
        Ok(LockOutcome::Acquired)
    }

    /// Clears the flag if set, whoever set it. Returns whether anything was written.
    pub(crate) async fn unlock(&self, key: &str) -> Result<bool> {
        let Some(tags) = self.bucket.read_tags(key).await? else {
            return Ok(false);
        };

        if !from_tags(&tags)?.locked {
            return Ok(false);
        }

        self.bucket.write_tags(key, with_lock(&tags, None)).await?;
        debug!(key, "lock released");
        Ok(true)
    }

    /// Whether the key is locked and the lock is `owner`'s.
    pub(crate) async fn holds(&self, key: &str) -> Result<bool> {
        match self.bucket.read_tags(key).await? {
            Some(tags) => Ok(from_tags(&tags)?.locked && self.owns(&tags)),
            None => Ok(false),
        }
    }

    fn owns(&self, tags: &[Tag]) -> bool {
        lock_owner(tags) == Some(self.owner)
    }
}
