//! Value and Metadata Codecs
//!
//! A stored key is one object: the body carries the encoded value, the tag
//! set carries the [`KeyMetadata`].
//!
//! ```text
//! ┌──────────────────────── object "user:42" ────────────────────────┐
//! │ body:  MessagePack(value)                        (ValueCodec)    │
//! │ tags:  ValueType=<base64> ExpireTime=<n>                         │
//! │        LastUpdate=<n>     Locked=true|false      (metadata)      │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - `value`: shape registry plus MessagePack encoding of values
//! - `metadata`: `KeyMetadata` to and from a tag set

pub mod metadata;
pub mod value;

pub use metadata::{from_tags, to_tags, KeyMetadata};
pub use value::{Encoded, ShapeRegistry, ValueCodec};

use thiserror::Error;

/// A value could not be encoded.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EncodeError {
    /// The value's type was never registered with the codec.
    #[error("unregistered value shape: {type_name}")]
    UnregisteredShape { type_name: &'static str },

    /// A shape name or type is already bound to something else.
    #[error("shape conflict: {0}")]
    ShapeConflict(String),

    /// The serializer rejected the value.
    #[error("encode failed: {0}")]
    Serialize(String),
}

/// A value or metadata tag could not be decoded.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DecodeError {
    /// The key was stored with a different shape than the one requested.
    #[error("value type mismatch: stored {stored:?}, requested {requested:?}")]
    TypeMismatch { stored: String, requested: String },

    /// The bytes are well formed but do not fit the destination shape.
    #[error("wrong value shape: {0}")]
    WrongShape(String),

    /// The bytes are truncated or garbled.
    #[error("corrupt value: {0}")]
    Corrupt(String),

    /// A metadata tag holds an unparseable value.
    #[error("malformed tag {name}={value:?}: {reason}")]
    MalformedTag {
        name: String,
        value: String,
        reason: String,
    },
}
