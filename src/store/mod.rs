//! Key Store
//!
//! The orchestration layer: composes the codecs, the lock protocol and lazy
//! expiry into the public [`Client`] operations.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                          Client                             │
//! │     set     get/lookup     del     lock/unlock     ping     │
//! └──────┬──────────┬──────────┬───────────┬────────────────────┘
//!        │          │          │           │
//!        │    ┌─────▼─────┐    │     ┌─────▼───────┐
//!        │    │  expiry   │────┴────>│ LockManager │
//!        │    └───────────┘          └─────┬───────┘
//!        │                                 │
//! ┌──────▼─────────────────────────────────▼────────────────────┐
//! │                Bucket (per-call deadlines)                  │
//! └──────────────────────────────┬──────────────────────────────┘
//!                                ▼
//!                       dyn ObjectStore
//! ```

mod bucket;
pub mod client;
pub mod expiry;
pub mod lock;

pub use client::{Client, Lookup, Stored};
pub use lock::LockOutcome;
