/// Domain-separated BLAKE3 hasher.
///
/// Each hasher carries a domain tag (e.g. `"tally-audit-v1"`) that is
/// prepended to every hash computation, so an audit entry and a state digest
/// over identical bytes never collide.
pub struct ContentHasher {
    domain: &'static str,
}

impl ContentHasher {
    /// Hasher for audit chain entries.
    pub const AUDIT: Self = Self {
        domain: "tally-audit-v1",
    };
    /// Hasher for record-collection state digests.
    pub const STATE: Self = Self {
        domain: "tally-state-v1",
    };

    /// Hash raw bytes with domain separation.
    pub fn hash(&self, data: &[u8]) -> [u8; 32] {
        let mut hasher = self.start();
        hasher.update(data);
        *hasher.finalize().as_bytes()
    }

    /// Hash a sequence of fields. Each field is length-prefixed, so
    /// `["ab", "c"]` and `["a", "bc"]` hash differently.
    pub fn hash_fields(&self, fields: &[&[u8]]) -> [u8; 32] {
        let mut hasher = self.start();
        for field in fields {
            hasher.update(&(field.len() as u64).to_le_bytes());
            hasher.update(field);
        }
        *hasher.finalize().as_bytes()
    }

    /// Hash a serializable value as JSON with domain separation.
    pub fn hash_json<T: serde::Serialize>(&self, value: &T) -> Result<[u8; 32], HasherError> {
        let data =
            serde_json::to_vec(value).map_err(|e| HasherError::Serialization(e.to_string()))?;
        Ok(self.hash(&data))
    }

    fn start(&self) -> blake3::Hasher {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.domain.as_bytes());
        hasher.update(b":");
        hasher
    }
}

/// Errors from hashing operations.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum HasherError {
    #[error("serialization error: {0}")]
    Serialization(String),
}
