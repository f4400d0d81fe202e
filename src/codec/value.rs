//! Value Encoding
//!
//! Values are serialized with MessagePack (struct fields by name, so the
//! encoding describes itself). Every Rust type that may be stored must first
//! be registered under a stable shape name; that name travels with the key as
//! its `ValueType` tag, and decoding refuses to read a key into a type whose
//! name differs from the stored one.
//!
//! The registry belongs to the codec instance. Two clients in one process can
//! register different shapes without seeing each other.
//!
//! ```
//! use serde::{Deserialize, Serialize};
//! use tagkv::codec::ValueCodec;
//!
//! #[derive(Debug, PartialEq, Serialize, Deserialize)]
//! struct Session {
//!     user: String,
//!     hits: u32,
//! }
//!
//! let mut codec = ValueCodec::new();
//! codec.register::<Session>("session").unwrap();
//!
//! let session = Session { user: "ariz".into(), hits: 3 };
//! let encoded = codec.encode(&session).unwrap();
//! assert_eq!(encoded.value_type, "session");
//!
//! let decoded: Session = codec.decode(&encoded.value_type, &encoded.bytes).unwrap();
//! assert_eq!(decoded, session);
//! ```

use super::{DecodeError, EncodeError};
use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::any::{type_name, TypeId};
use std::collections::HashMap;

/// Bidirectional map between Rust types and shape names.
#[derive(Debug, Clone, Default)]
pub struct ShapeRegistry {
    names: HashMap<TypeId, String>,
    types: HashMap<String, TypeId>,
}

impl ShapeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `T` to `name`.
    ///
    /// Registering the same pair twice is a no-op. Reusing either side of an
    /// existing binding with a different partner fails.
    pub fn register<T: 'static>(&mut self, name: &str) -> Result<(), EncodeError> {
        let id = TypeId::of::<T>();

        match (self.names.get(&id), self.types.get(name)) {
            (Some(existing), _) if existing == name => Ok(()),
            (Some(existing), _) => Err(EncodeError::ShapeConflict(format!(
                "{} is already registered as {:?}",
                type_name::<T>(),
                existing
            ))),
            (None, Some(_)) => Err(EncodeError::ShapeConflict(format!(
                "{:?} is already bound to another type",
                name
            ))),
            (None, None) => {
                self.bind::<T>(name);
                Ok(())
            }
        }
    }

    /// Inserts the binding without conflict checks.
    fn bind<T: 'static>(&mut self, name: &str) {
        let id = TypeId::of::<T>();
        self.names.insert(id, name.to_string());
        self.types.insert(name.to_string(), id);
    }

    /// Shape name registered for `T`.
    pub fn name_of<T: 'static>(&self) -> Option<&str> {
        self.names.get(&TypeId::of::<T>()).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// An encoded value together with its shape name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Encoded {
    pub value_type: String,
    pub bytes: Bytes,
}

/// Encodes and decodes values of registered shapes.
#[derive(Debug, Clone)]
pub struct ValueCodec {
    registry: ShapeRegistry,
}

impl Default for ValueCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl ValueCodec {
    /// A codec with the built-in primitive shapes registered.
    ///
    /// | shape    | type      |
    /// |----------|-----------|
    /// | `string` | `String`  |
    /// | `bool`   | `bool`    |
    /// | `i32`    | `i32`     |
    /// | `i64`    | `i64`     |
    /// | `u32`    | `u32`     |
    /// | `u64`    | `u64`     |
    /// | `f32`    | `f32`     |
    /// | `f64`    | `f64`     |
    /// | `bytes`  | `Vec<u8>` |
    pub fn new() -> Self {
        let mut registry = ShapeRegistry::new();
        registry.bind::<String>("string");
        registry.bind::<bool>("bool");
        registry.bind::<i32>("i32");
        registry.bind::<i64>("i64");
        registry.bind::<u32>("u32");
        registry.bind::<u64>("u64");
        registry.bind::<f32>("f32");
        registry.bind::<f64>("f64");
        registry.bind::<Vec<u8>>("bytes");
        Self { registry }
    }

    /// A codec with nothing registered.
    pub fn empty() -> Self {
        Self {
            registry: ShapeRegistry::new(),
        }
    }

    /// Registers `T` under `name`. See [`ShapeRegistry::register`].
    pub fn register<T>(&mut self, name: &str) -> Result<(), EncodeError>
    where
        T: Serialize + DeserializeOwned + 'static,
    {
        self.registry.register::<T>(name)
    }

    pub fn registry(&self) -> &ShapeRegistry {
        &self.registry
    }

    /// Shape name for `T`, or `UnregisteredShape`.
    pub fn shape_of<T: 'static>(&self) -> Result<&str, EncodeError> {
        self.registry
            .name_of::<T>()
            .ok_or(EncodeError::UnregisteredShape {
                type_name: type_name::<T>(),
            })
    }

    pub fn encode<T>(&self, value: &T) -> Result<Encoded, EncodeError>
    where
        T: Serialize + 'static,
    {
        let value_type = self.shape_of::<T>()?.to_string();
        let bytes =
            rmp_serde::to_vec_named(value).map_err(|e| EncodeError::Serialize(e.to_string()))?;

        Ok(Encoded {
            value_type,
            bytes: Bytes::from(bytes),
        })
    }

    /// Decodes `bytes`, which were stored under the shape name `stored_type`, as a `T`.
    pub fn decode<T>(&self, stored_type: &str, bytes: &[u8]) -> Result<T, DecodeError>
    where
        T: DeserializeOwned + 'static,
    {
        let requested = self
            .registry
            .name_of::<T>()
            .ok_or_else(|| DecodeError::TypeMismatch {
                stored: stored_type.to_string(),
                requested: type_name::<T>().to_string(),
            })?;

        if requested != stored_type {
            return Err(DecodeError::TypeMismatch {
                stored: stored_type.to_string(),
                requested: requested.to_string(),
            });
        }

        rmp_serde::from_slice(bytes).map_err(classify)
    }
}

/// Splits MessagePack failures into "does not fit the target" and "broken bytes".
fn classify(err: rmp_serde::decode::Error) -> DecodeError {
    use rmp_serde::decode::Error as E;

    match err {
        E::TypeMismatch(_) | E::LengthMismatch(_) | E::OutOfRange | E::Syntax(_) => {
            DecodeError::WrongShape(err.to_string())
        }
        other => DecodeError::Corrupt(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::collections::BTreeMap;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Profile {
        name: String,
        age: u8,
        tags: Vec<String>,
        scores: BTreeMap<String, f64>,
        parent: Option<Box<Profile>>,
    }

    fn profile() -> Profile {
        Profile {
            name: "ariz".into(),
            age: 31,
            tags: vec!["admin".into(), "ops".into()],
            scores: BTreeMap::from([("q1".into(), 0.5), ("q2".into(), 1.25)]),
            parent: Some(Box::new(Profile {
                name: "root".into(),
                age: 99,
                tags: vec![],
                scores: BTreeMap::new(),
                parent: None,
            })),
        }
    }

    #[test]
    fn test_builtin_shapes() {
        let codec = ValueCodec::new();
        assert_eq!(codec.shape_of::<String>().unwrap(), "string");
        assert_eq!(codec.shape_of::<Vec<u8>>().unwrap(), "bytes");
        assert_eq!(codec.registry().len(), 9);
        for name in ["string", "bool", "i32", "i64", "u32", "u64", "f32", "f64", "bytes"] {
            assert!(codec.registry().contains(name), "{name}");
        }

        // Builtins take part in conflict checks like any other binding.
        let mut codec = codec;
        codec.register::<String>("string").unwrap();
        assert!(matches!(
            codec.register::<String>("text"),
            Err(EncodeError::ShapeConflict(_))
        ));
        assert!(matches!(
            codec.register::<u16>("u64"),
            Err(EncodeError::ShapeConflict(_))
        ));
    }

    #[test]
    fn test_primitives_survive() {
        let codec = ValueCodec::new();

        let e = codec.encode(&"key2 value".to_string()).unwrap();
        assert_eq!(codec.decode::<String>(&e.value_type, &e.bytes).unwrap(), "key2 value");

        let e = codec.encode(&-42i64).unwrap();
        assert_eq!(codec.decode::<i64>(&e.value_type, &e.bytes).unwrap(), -42);

        let e = codec.encode(&true).unwrap();
        assert!(codec.decode::<bool>(&e.value_type, &e.bytes).unwrap());

        let e = codec.encode(&vec![0u8, 255, 7]).unwrap();
        assert_eq!(
            codec.decode::<Vec<u8>>(&e.value_type, &e.bytes).unwrap(),
            vec![0u8, 255, 7]
        );
    }

    #[test]
    fn test_record_survives_repeated_trips() {
        let mut codec = ValueCodec::new();
        codec.register::<Profile>("profile").unwrap();

        let original = profile();
        let mut current = original.clone();
        for _ in 0..3 {
            let e = codec.encode(&current).unwrap();
            current = codec.decode(&e.value_type, &e.bytes).unwrap();
        }
        assert_eq!(current, original);
    }

    #[test]
    fn test_unregistered_shape() {
        let codec = ValueCodec::new();
        let err = codec.encode(&profile()).unwrap_err();
        assert!(matches!(err, EncodeError::UnregisteredShape { .. }));
    }

    #[test]
    fn test_registration_conflicts() {
        let mut codec = ValueCodec::empty();
        codec.register::<Profile>("profile").unwrap();
        codec.register::<Profile>("profile").unwrap();

        assert!(matches!(
            codec.register::<Profile>("other"),
            Err(EncodeError::ShapeConflict(_))
        ));
        assert!(matches!(
            codec.register::<String>("profile"),
            Err(EncodeError::ShapeConflict(_))
        ));
    }

    #[test]
    fn test_registries_are_independent() {
        let mut a = ValueCodec::empty();
        let b = ValueCodec::empty();
        a.register::<Profile>("profile").unwrap();

        assert!(a.registry().contains("profile"));
        assert!(!b.registry().contains("profile"));
    }

    #[test]
    fn test_type_mismatch() {
        let codec = ValueCodec::new();
        let e = codec.encode(&"text".to_string()).unwrap();

        let err = codec.decode::<i64>(&e.value_type, &e.bytes).unwrap_err();
        assert_eq!(
            err,
            DecodeError::TypeMismatch {
                stored: "string".into(),
                requested: "i64".into(),
            }
        );
    }

    #[test]
    fn test_wrong_shape_after_schema_change() {
        #[derive(Serialize, Deserialize)]
        struct V1 {
            id: u32,
        }
        #[derive(Debug, Deserialize, Serialize)]
        struct V2 {
            id: u32,
            email: String,
        }

        let mut writer = ValueCodec::empty();
        writer.register::<V1>("account").unwrap();
        let mut reader = ValueCodec::empty();
        reader.register::<V2>("account").unwrap();

        let e = writer.encode(&V1 { id: 1 }).unwrap();
        let err = reader.decode::<V2>(&e.value_type, &e.bytes).unwrap_err();
        assert!(matches!(err, DecodeError::WrongShape(_)), "{err:?}");
    }

    #[test]
    fn test_truncated_bytes_are_corrupt() {
        let mut codec = ValueCodec::new();
        codec.register::<Profile>("profile").unwrap();
        let e = codec.encode(&profile()).unwrap();

        let cut = &e.bytes[..e.bytes.len() / 2];
        let err = codec.decode::<Profile>("profile", cut).unwrap_err();
        assert!(matches!(err, DecodeError::Corrupt(_)), "{err:?}");

        let err = codec.decode::<String>("string", &[]).unwrap_err();
        assert!(matches!(err, DecodeError::Corrupt(_)), "{err:?}");
    }
}
