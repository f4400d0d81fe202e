//! # tagkv - Key-Value Semantics over Object Storage
//!
//! tagkv gives Redis-like Get/Set/Del/Lock/Unlock over a blob store such as
//! Amazon S3. Each key is one object: the body holds the encoded value and
//! the object's tag set carries the key's metadata (value type, expiry, last
//! update, lock flag).
//!
//! ## Features
//!
//! - **Typed values**: any `serde` type registered with the value codec
//! - **TTL Support**: keys expire lazily, on the first read after their deadline
//! - **Advisory locks**: a tag-based lock that cooperating clients honour
//! - **Deadlines**: every backend call runs under the configured timeout
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                tagkv                                    │
//! │                                                                         │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────┐                  │
//! │  │   Client    │───>│ LockManager │───>│ KeyMetadata │<──> tag set      │
//! │  │ (store)     │    │  + expiry   │    │   codec     │                  │
//! │  └──────┬──────┘    └─────────────┘    └─────────────┘                  │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  ┌─────────────┐    ┌──────────────────────────────────────────────┐    │
//! │  │ ValueCodec  │    │             dyn ObjectStore                  │    │
//! │  │ MessagePack │    │   MemoryBackend  |  S3Backend (feature s3)   │    │
//! │  └─────────────┘    └──────────────────────────────────────────────┘    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```
//! use std::sync::Arc;
//! use tagkv::{backend::MemoryBackend, Client, Options};
//!
//! # tokio_test::block_on(async {
//! let backend = Arc::new(MemoryBackend::with_bucket("cache", "eu-west-1"));
//! let options = Options::new("cache", "eu-west-1").with_enforce_consistency(true);
//! let client = Client::connect(options, backend).await.unwrap();
//!
//! client.set("visits", &41u64, 60).await.unwrap();
//! client.lock("visits").await.unwrap();
//! client.set("visits", &42u64, 60).await.unwrap(); // also releases the lock
//!
//! let stored = client.get::<u64>("visits").await.unwrap();
//! assert_eq!(stored.value, 42);
//! assert!(!stored.metadata.locked);
//! # });
//! ```
//!
//! ## Module Overview
//!
//! - [`backend`]: the object store trait and its implementations
//! - [`codec`]: value encoding and metadata tag encoding
//! - [`store`]: the client, lock protocol and lazy expiry
//! - [`config`]: client options
//!
//! ## Design Highlights
//!
//! ### Metadata in Tags
//!
//! Reads resolve metadata with one tag read before fetching the body, so
//! missing and expired keys never cost a body download.
//!
//! ### Advisory Locking
//!
//! Locking is a tag read followed by a tag write. Object stores offer no
//! compare-and-swap on tags, so two clients can still both acquire the lock
//! in a narrow window. The lock reduces conflicting writes; it does not
//! exclude them.

pub mod backend;
pub mod codec;
pub mod config;
pub mod error;
pub mod store;

// Re-export commonly used types for convenience
pub use backend::{MemoryBackend, ObjectStore};
pub use codec::{KeyMetadata, ValueCodec};
pub use config::Options;
pub use error::{Error, Result};
pub use store::{Client, Lookup, Stored};

/// Version of tagkv
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
