//! Key Metadata and its Tag Encoding
//!
//! Metadata rides alongside the value as exactly four object tags:
//!
//! | tag          | value                                   |
//! |--------------|-----------------------------------------|
//! | `ValueType`  | shape name, unpadded standard base64    |
//! | `ExpireTime` | unix seconds, decimal (`0` = never)     |
//! | `LastUpdate` | unix seconds, decimal (`0` = absent)    |
//! | `Locked`     | `true` / `false`                        |
//!
//! While a key is locked its tag set also carries `LockOwner`, the id of the
//! client that took the lock. Writing the four tags drops it again.
//!
//! Base64 keeps arbitrary shape names inside the character set object stores
//! allow for tag values.

use super::DecodeError;
use crate::backend::Tag;
use base64::engine::general_purpose::STANDARD_NO_PAD;
use base64::Engine;

pub const VALUE_TYPE: &str = "ValueType";
pub const EXPIRE_TIME: &str = "ExpireTime";
pub const LAST_UPDATE: &str = "LastUpdate";
pub const LOCKED: &str = "Locked";
pub const LOCK_OWNER: &str = "LockOwner";

/// Out-of-band information stored with every key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyMetadata {
    /// Shape name of the stored value.
    pub value_type: String,
    /// Advisory write lock.
    pub locked: bool,
    /// Unix seconds after which the key is gone. `0` never expires.
    pub expire_time: i64,
    /// Unix seconds of the last `set`. `0` means the key does not exist.
    pub last_update: i64,
}

impl KeyMetadata {
    /// True when no stored object backs this metadata.
    #[inline]
    pub fn is_absent(&self) -> bool {
        self.last_update == 0
    }

    /// True when the key has a deadline that lies before `now`.
    #[inline]
    pub fn is_expired(&self, now: i64) -> bool {
        self.expire_time != 0 && self.expire_time < now
    }
}

/// Encodes metadata as a full tag set.
///
/// `Locked` is always written as `false`: writing a fresh tag set is how a
/// `set` releases the lock.
pub fn to_tags(metadata: &KeyMetadata) -> Vec<Tag> {
    vec![
        Tag::new(VALUE_TYPE, STANDARD_NO_PAD.encode(metadata.value_type.as_bytes())),
        Tag::new(EXPIRE_TIME, metadata.expire_time.to_string()),
        Tag::new(LAST_UPDATE, metadata.last_update.to_string()),
        Tag::new(LOCKED, "false"),
    ]
}

/// Decodes a tag set. Unknown tags are skipped; missing ones keep their zero value.
pub fn from_tags(tags: &[Tag]) -> Result<KeyMetadata, DecodeError> {
    let mut metadata = KeyMetadata::default();

    for tag in tags {
        match tag.key.as_str() {
            VALUE_TYPE => {
                let raw = STANDARD_NO_PAD
                    .decode(&tag.value)
                    .map_err(|e| malformed(tag, e))?;
                metadata.value_type = String::from_utf8(raw).map_err(|e| malformed(tag, e))?;
            }
            EXPIRE_TIME => {
                metadata.expire_time = tag.value.parse::<i64>().map_err(|e| malformed(tag, e))?;
            }
            LAST_UPDATE => {
                metadata.last_update = tag.value.parse::<i64>().map_err(|e| malformed(tag, e))?;
            }
            LOCKED => metadata.locked = parse_bool(tag)?,
            _ => {}
        }
    }

    Ok(metadata)
}

/// Returns `tags` locked by `owner`, or unlocked for `None`. Every other tag
/// is kept as it was.
pub(crate) fn with_lock(tags: &[Tag], owner: Option<&str>) -> Vec<Tag> {
    let mut out: Vec<Tag> = tags
        .iter()
        .filter(|t| t.key != LOCKED && t.key != LOCK_OWNER)
        .cloned()
        .collect();

    match owner {
        Some(owner) => {
            out.push(Tag::new(LOCKED, "true"));
            out.push(Tag::new(LOCK_OWNER, owner));
        }
        None => out.push(Tag::new(LOCKED, "false")),
    }
    out
}

/// Id of the client that locked the key, if recorded.
pub(crate) fn lock_owner(tags: &[Tag]) -> Option<&str> {
    tags.iter()
        .find(|t| t.key == LOCK_OWNER)
        .map(|t| t.value.as_str())
}

fn parse_bool(tag: &Tag) -> Result<bool, DecodeError> {
    match tag.value.as_str() {
        "1" | "t" | "T" | "true" | "TRUE" | "True" => Ok(true),
        "0" | "f" | "F" | "false" | "FALSE" | "False" => Ok(false),
        _ => Err(malformed(tag, "not a boolean")),
    }
}

fn malformed(tag: &Tag, reason: impl std::fmt::Display) -> DecodeError {
    DecodeError::MalformedTag {
        name: tag.key.clone(),
        value: tag.value.clone(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> KeyMetadata {
        KeyMetadata {
            value_type: "map[string]*main.Foo".into(),
            locked: true,
            expire_time: 1_700_000_100,
            last_update: 1_700_000_000,
        }
    }

    #[test]
    fn test_exactly_four_tags() {
        let tags = to_tags(&sample());
        let names: Vec<&str> = tags.iter().map(|t| t.key.as_str()).collect();
        assert_eq!(names, vec![VALUE_TYPE, EXPIRE_TIME, LAST_UPDATE, LOCKED]);
    }

    #[test]
    fn test_lock_always_released() {
        let tags = to_tags(&sample());
        assert_eq!(tags[3], Tag::new(LOCKED, "false"));

        let decoded = from_tags(&tags).unwrap();
        assert_eq!(
            decoded,
            KeyMetadata {
                locked: false,
                ..sample()
            }
        );
    }

    #[test]
    fn test_value_type_is_unpadded_base64() {
        let tags = to_tags(&KeyMetadata {
            value_type: "string".into(),
            ..Default::default()
        });
        assert_eq!(tags[0].value, "c3RyaW5n");

        let tags = to_tags(&KeyMetadata {
            value_type: "i64".into(),
            ..Default::default()
        });
        assert!(!tags[0].value.contains('='));
    }

    #[test]
    fn test_no_known_tags_means_absent() {
        let metadata = from_tags(&[Tag::new("Owner", "ops")]).unwrap();
        assert_eq!(metadata, KeyMetadata::default());
        assert!(metadata.is_absent());

        assert!(from_tags(&[]).unwrap().is_absent());
    }

    #[test]
    fn test_malformed_tags() {
        for tag in [
            Tag::new(EXPIRE_TIME, "soon"),
            Tag::new(LAST_UPDATE, "12.5"),
            Tag::new(LOCKED, "yes"),
            Tag::new(VALUE_TYPE, "%%%"),
        ] {
            let err = from_tags(&[tag.clone()]).unwrap_err();
            assert!(
                matches!(&err, DecodeError::MalformedTag { name, .. } if *name == tag.key),
                "{err:?}"
            );
        }
    }

    #[test]
    fn test_lone_lock_tag() {
        let metadata = from_tags(&[Tag::new(LOCKED, "true")]).unwrap();
        assert!(metadata.locked);
        assert!(metadata.is_absent());
    }

    #[test]
    fn test_with_lock_keeps_other_tags() {
        let mut tags = to_tags(&sample());
        tags.push(Tag::new("Owner", "ops"));

        let locked = with_lock(&tags, Some("client-a"));
        assert_eq!(locked.len(), 6);
        assert_eq!(lock_owner(&locked), Some("client-a"));
        assert_eq!(from_tags(&locked).unwrap(), sample());

        // Relocking replaces the owner rather than adding a second one.
        let relocked = with_lock(&locked, Some("client-b"));
        assert_eq!(relocked.len(), 6);
        assert_eq!(lock_owner(&relocked), Some("client-b"));

        let unlocked = with_lock(&relocked, None);
        assert_eq!(unlocked.len(), 5);
        assert_eq!(lock_owner(&unlocked), None);
        let decoded = from_tags(&unlocked).unwrap();
        assert!(!decoded.locked);
        assert_eq!(decoded.last_update, sample().last_update);
        assert!(unlocked.contains(&Tag::new("Owner", "ops")));
    }

    #[test]
    fn test_set_drops_lock_owner() {
        let locked = with_lock(&to_tags(&sample()), Some("client-a"));
        let rewritten = to_tags(&from_tags(&locked).unwrap());
        assert_eq!(lock_owner(&rewritten), None);
    }

    #[test]
    fn test_expiry_predicate() {
        let mut metadata = sample();
        assert!(!metadata.is_expired(1_700_000_100));
        assert!(metadata.is_expired(1_700_000_101));

        metadata.expire_time = 0;
        assert!(!metadata.is_expired(i64::MAX));
    }
}
