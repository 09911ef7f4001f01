//! Content hashing for chain records.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// A SHA-256 digest rendered as lowercase hex.
///
/// Two records with the same field values produce the same `ContentHash`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentHash(pub String);

impl ContentHash {
    /// A builder for incrementally computing content hashes.
    pub fn builder() -> ContentHashBuilder {
        ContentHashBuilder {
            hasher: Sha256::new(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ContentHash {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl PartialEq<str> for ContentHash {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

/// Incremental content hash builder.
///
/// Feeds named fields in a stable order. Each field is framed as
/// `name:len:value\n`, so a value containing the separator cannot be
/// confused with the start of the next field.
pub struct ContentHashBuilder {
    hasher: Sha256,
}

impl ContentHashBuilder {
    /// Feed a string field into the hash.
    pub fn field(mut self, name: &str, value: &str) -> Self {
        self.hasher.update(name.as_bytes());
        self.hasher.update(b":");
        self.hasher.update(value.len().to_string().as_bytes());
        self.hasher.update(b":");
        self.hasher.update(value.as_bytes());
        self.hasher.update(b"\n");
        self
    }

    /// Feed an unsigned integer field into the hash.
    pub fn field_u64(self, name: &str, value: u64) -> Self {
        self.field(name, &value.to_string())
    }

    /// Feed a JSON value in its compact serde_json form.
    ///
    /// Object keys come out sorted (serde_json's default map), so equal
    /// values always produce equal bytes.
    pub fn field_json(self, name: &str, value: &serde_json::Value) -> Self {
        self.field(name, &value.to_string())
    }

    /// Finalize and produce the content hash.
    pub fn finish(self) -> ContentHash {
        let hash = self.hasher.finalize();
        ContentHash(format!("{hash:x}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn builder_is_deterministic() {
        let a = ContentHash::builder().field("a", "1").field_u64("b", 2).finish();
        let b = ContentHash::builder().field("a", "1").field_u64("b", 2).finish();
        assert_eq!(a, b);
        assert_eq!(a.as_str().len(), 64);
    }

    #[test]
    fn framing_separates_adjacent_fields() {
        let joined = ContentHash::builder().field("a", "x\nb:1:y").finish();
        let split = ContentHash::builder().field("a", "x").field("b", "y").finish();
        assert_ne!(joined, split);
    }

    #[test]
    fn json_field_ignores_key_insertion_order() {
        let mut left = serde_json::Map::new();
        left.insert("z".to_string(), json!(1));
        left.insert("a".to_string(), json!(2));
        let right = json!({"a": 2, "z": 1});

        let l = ContentHash::builder()
            .field_json("p", &serde_json::Value::Object(left))
            .finish();
        let r = ContentHash::builder().field_json("p", &right).finish();
        assert_eq!(l, r);
    }
}
