//! Client Options
//!
//! Options are supplied once, when a [`Client`](crate::Client) is connected,
//! and validated there.
//!
//! ```
//! use tagkv::Options;
//!
//! let options = Options::new("cache", "eu-west-1")
//!     .with_timeout_secs(5)
//!     .with_enforce_consistency(true);
//! assert!(options.validate().is_ok());
//! ```

use crate::error::{Error, Result};
use std::time::Duration;

/// Configuration for a key store client.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Options {
    /// Bucket used as the key store's persistent storage. Required.
    pub bucket: String,

    /// Region the bucket lives in. Required.
    pub region: String,

    /// Endpoint override for S3-compatible services.
    pub endpoint: Option<String>,

    /// Deadline for each backend call. `Duration::ZERO` means no deadline.
    pub timeout: Duration,

    /// Create the bucket at connect time if it does not exist.
    pub auto_create_bucket: bool,

    /// Take the advisory lock before every `set` and `del`.
    ///
    /// Costs an extra tag read and write per mutation.
    pub enforce_consistency: bool,

    /// Reserved. Not consulted by any operation yet.
    pub read_only: bool,
}

impl Options {
    pub fn new(bucket: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            region: region.into(),
            ..Default::default()
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_timeout_secs(self, secs: u64) -> Self {
        self.with_timeout(Duration::from_secs(secs))
    }

    pub fn with_auto_create_bucket(mut self, enabled: bool) -> Self {
        self.auto_create_bucket = enabled;
        self
    }

    pub fn with_enforce_consistency(mut self, enabled: bool) -> Self {
        self.enforce_consistency = enabled;
        self
    }

    pub fn with_read_only(mut self, enabled: bool) -> Self {
        self.read_only = enabled;
        self
    }

    /// Checks that the required fields are present.
    pub fn validate(&self) -> Result<()> {
        if self.bucket.is_empty() {
            return Err(Error::Config("no bucket specified in options".into()));
        }
        if self.region.is_empty() {
            return Err(Error::Config("no region specified in options".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_bucket() {
        let err = Options::default().validate().unwrap_err();
        assert_eq!(err.to_string(), "client: no bucket specified in options");
    }

    #[test]
    fn test_missing_region() {
        let err = Options::new("redis3-test", "").validate().unwrap_err();
        assert_eq!(err.to_string(), "client: no region specified in options");
    }

    #[test]
    fn test_builder() {
        let options = Options::new("b", "r")
            .with_endpoint("http://127.0.0.1:5001")
            .with_timeout_secs(3)
            .with_auto_create_bucket(true)
            .with_enforce_consistency(true);

        assert!(options.validate().is_ok());
        assert_eq!(options.endpoint.as_deref(), Some("http://127.0.0.1:5001"));
        assert_eq!(options.timeout, Duration::from_secs(3));
        assert!(options.auto_create_bucket);
        assert!(options.enforce_consistency);
        assert!(!options.read_only);
    }
}
