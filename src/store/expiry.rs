//! Lazy Expiration
//!
//! Keys are never swept in the background. Every read resolves metadata
//! first and classifies the key; an expired key is deleted by the read that
//! notices it.
//!
//! ```text
//!   LastUpdate == 0                       ──> Absent   (not found)
//!   ExpireTime != 0 && ExpireTime < now   ──> Expired  (purge, not found)
//!   otherwise                             ──> Live     (read the body)
//! ```

use crate::codec::KeyMetadata;
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Liveness {
    Absent,
    Expired,
    Live,
}

pub fn classify(metadata: &KeyMetadata, now: i64) -> Liveness {
    if metadata.is_absent() {
        Liveness::Absent
    } else if metadata.is_expired(now) {
        Liveness::Expired
    } else {
        Liveness::Live
    }
}

/// Absolute expiry for a TTL in seconds starting at `now`. `0` never expires.
pub fn expire_time(now: i64, ttl_secs: u64) -> i64 {
    if ttl_secs == 0 {
        return 0;
    }
    now.saturating_add(i64::try_from(ttl_secs).unwrap_or(i64::MAX))
}

/// Current unix time in seconds.
pub fn now_unix() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}
