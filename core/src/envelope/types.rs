// Envelope data model — the persisted artifact and its identifiers

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::crypto::primitives::NONCE_SIZE;
use crate::EnvelopeError;

/// Envelope format version this crate produces and accepts.
pub const ENVELOPE_VERSION: u32 = 1;

/// AEAD algorithm identifier carried in every envelope.
pub const AEAD_ALGORITHM: &str = "xchacha20poly1305-ietf";

/// Associated-data prefix binding an envelope to its asset.
/// Project convention; changing it orphans every persisted envelope.
pub const AD_PREFIX: &str = "mint:";

/// A recipient identity: a base58-encoded 32-byte Ed25519 public key.
///
/// Holds both the verbatim string (keyring entries are keyed by it, byte for
/// byte) and the decoded key bytes. Curve validity is checked later, at the
/// X25519 conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipientId {
    text: String,
    bytes: [u8; 32],
}

impl RecipientId {
    /// Parse and validate a base58 identity string.
    pub fn new(text: &str) -> Result<Self, EnvelopeError> {
        let decoded = bs58::decode(text).into_vec().map_err(|_| {
            EnvelopeError::InvalidParameter("recipient id is not valid base58".into())
        })?;
        let bytes: [u8; 32] = decoded.as_slice().try_into().map_err(|_| {
            EnvelopeError::InvalidParameter("recipient id must decode to 32 bytes".into())
        })?;
        Ok(Self {
            text: text.to_owned(),
            bytes,
        })
    }

    /// Build an identity from raw Ed25519 public key bytes.
    pub fn from_public_key_bytes(bytes: &[u8; 32]) -> Self {
        Self {
            text: bs58::encode(bytes).into_string(),
            bytes: *bytes,
        }
    }

    /// The verbatim base58 form — the keyring key.
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// The decoded 32-byte Ed25519 public key.
    pub fn public_key_bytes(&self) -> &[u8; 32] {
        &self.bytes
    }
}

impl FromStr for RecipientId {
    type Err = EnvelopeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl fmt::Display for RecipientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// An asset identifier: a base58-encoded 32-byte value.
///
/// Opaque to this crate; its only job is to appear verbatim inside the
/// associated-data string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetId {
    text: String,
}

impl AssetId {
    /// Parse and validate a base58 asset string.
    pub fn new(text: &str) -> Result<Self, EnvelopeError> {
        let decoded = bs58::decode(text)
            .into_vec()
            .map_err(|_| EnvelopeError::InvalidParameter("asset id is not valid base58".into()))?;
        if decoded.len() != 32 {
            return Err(EnvelopeError::InvalidParameter(
                "asset id must decode to 32 bytes".into(),
            ));
        }
        Ok(Self {
            text: text.to_owned(),
        })
    }

    /// Build an asset id from raw 32-byte value.
    pub fn from_bytes(bytes: &[u8; 32]) -> Self {
        Self {
            text: bs58::encode(bytes).into_string(),
        }
    }

    /// The verbatim base58 form.
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// The full associated-data string this asset binds to.
    pub fn associated_data(&self) -> String {
        format!("{AD_PREFIX}{}", self.text)
    }
}

impl FromStr for AssetId {
    type Err = EnvelopeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// The persisted ciphertext artifact.
///
/// Immutable once produced; recipient-set changes go through a full
/// rotation. Fields are public so callers and tests can inspect them — the
/// codec revalidates everything on parse, and the engine revalidates on
/// open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    /// Format version; only `ENVELOPE_VERSION` is accepted on open.
    pub ver: u32,
    /// AEAD algorithm identifier; only `AEAD_ALGORITHM` is accepted.
    pub aead: String,
    /// Associated data, `"mint:" ++ <asset base58>`. Authenticated, never
    /// encrypted.
    pub ad: String,
    /// XChaCha20-Poly1305 nonce; unique per envelope.
    pub nonce: [u8; NONCE_SIZE],
    /// AEAD output, Poly1305 tag included.
    pub ciphertext: Vec<u8>,
    /// Sealed content key per recipient, keyed by the verbatim base58 id.
    pub keyring: BTreeMap<String, Vec<u8>>,
}

impl Envelope {
    /// Parse the asset this envelope is bound to back out of `ad`.
    pub fn asset_id(&self) -> Result<AssetId, EnvelopeError> {
        let rest = self.ad.strip_prefix(AD_PREFIX).ok_or_else(|| {
            EnvelopeError::InvalidParameter(
                "associated data does not carry the mint prefix".into(),
            )
        })?;
        AssetId::new(rest)
    }
}
