//! Content-derived contact identities.
//!
//! A server root is identified by `H(server_name)` and every channel or user
//! under it by `H(H(server_name) ++ label)`. Reconnecting to the same network
//! and seeing the same names therefore always yields the same digests.

use crate::error::DigestError;
use crate::types::Digest;

/// Hash arbitrary bytes into a [`Digest`].
pub fn hash_bytes(value: &[u8]) -> Result<Digest, DigestError> {
    if value.is_empty() {
        return Err(DigestError::EmptyInput);
    }
    Ok(Digest(*blake3::hash(value).as_bytes()))
}

/// `H(name)`, used for server roots.
pub fn hash_name(name: &str) -> Result<Digest, DigestError> {
    hash_bytes(name.as_bytes())
}

/// `H(parent ++ label)`, used for channels and users under a server.
pub fn derive_child(parent: &Digest, label: &str) -> Result<Digest, DigestError> {
    if label.is_empty() {
        return Err(DigestError::EmptyInput);
    }
    let mut hasher = blake3::Hasher::new();
    hasher.update(parent.as_bytes());
    hasher.update(label.as_bytes());
    Ok(Digest(*hasher.finalize().as_bytes()))
}

/// Cached identity of one server connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerIdentity {
    name: String,
    digest: Digest,
}

impl ServerIdentity {
    pub fn new(name: &str) -> Result<Self, DigestError> {
        Ok(Self {
            name: name.to_string(),
            digest: hash_name(name)?,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Digest of the server root contact.
    pub fn digest(&self) -> Digest {
        self.digest
    }

    /// Digest of a channel or user contact on this server.
    pub fn child(&self, label: &str) -> Result<Digest, DigestError> {
        derive_child(&self.digest, label)
    }
}
