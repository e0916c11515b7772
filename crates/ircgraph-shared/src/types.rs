use serde::{Deserialize, Serialize};

use crate::constants::DIGEST_SIZE;

// Contact identity = BLAKE3 digest (32 bytes)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Digest(pub [u8; DIGEST_SIZE]);

impl Digest {
    pub fn as_bytes(&self) -> &[u8; DIGEST_SIZE] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let mut arr = [0u8; DIGEST_SIZE];
        hex::decode_to_slice(s, &mut arr)?;
        Ok(Self(arr))
    }

    pub fn short(&self) -> String {
        self.to_hex()[..8].to_string()
    }
}

impl std::fmt::Display for Digest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// Reachability of a contact as seen from the local endpoint.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    /// The local endpoint itself (server root and self).
    Direct,
    /// Reachable transitively through the server connection.
    Cloud,
    /// Known but currently unreachable.
    Disconnected,
}
