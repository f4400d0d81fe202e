//! Error Types
//!
//! Every public operation returns [`Result`], whose error side is the
//! [`Error`] enum below. Backend, encoding and decoding failures keep their
//! own enums so callers can match on the exact cause.
//!
//! ## Taxonomy
//!
//! | Variant            | Raised by                      | Recoverable |
//! |--------------------|--------------------------------|-------------|
//! | `Config`           | `Client::connect`              | no          |
//! | `BucketUnavailable`| `Client::connect`, `ping`      | no          |
//! | `KeyNotFound`      | `get`, `lookup`                | yes         |
//! | `AlreadyLocked`    | `lock`, enforced `set`/`del`   | yes         |
//! | `Encode`/`Decode`  | value and tag codecs           | yes         |
//! | `Backend`          | any object store call          | yes         |

use crate::backend::BackendError;
use crate::codec::{DecodeError, EncodeError};
use thiserror::Error;

/// Errors returned by the key store.
#[derive(Debug, Error)]
pub enum Error {
    /// The client options are incomplete.
    #[error("client: {0}")]
    Config(String),

    /// The configured bucket is missing and could not (or may not) be created.
    #[error("client: specified bucket does not exist")]
    BucketUnavailable {
        bucket: String,
        #[source]
        source: Option<BackendError>,
    },

    /// The key was never set, was deleted, or has expired.
    #[error("key not found")]
    KeyNotFound { key: String },

    /// The key carries an unexpired advisory lock.
    #[error("key already locked")]
    AlreadyLocked { key: String },

    #[error(transparent)]
    Encode(#[from] EncodeError),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Backend(#[from] BackendError),
}

impl Error {
    /// Returns `true` for [`Error::KeyNotFound`].
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::KeyNotFound { .. })
    }

    /// Returns `true` for [`Error::AlreadyLocked`].
    pub fn is_locked(&self) -> bool {
        matches!(self, Error::AlreadyLocked { .. })
    }
}

/// Result type for key store operations.
pub type Result<T> = std::result::Result<T, Error>;
