// Mintseal Core — secure envelope layer for agent configurations
//
// A holder of a verified on-chain asset authors an agent configuration
// (names, personality, capability plugins, runtime policy). That document
// has to live on an untrusted permanent store while staying readable only
// by the holder and the protocol operator. This crate seals the document
// into an envelope: XChaCha20-Poly1305 over the canonical configuration
// bytes, bound to the asset's mint address through associated data, with
// the content key sealed once per recipient in a multi-recipient keyring.
//
// The crate performs no I/O. Upload, on-chain reference, and wallet
// custody all live above this boundary.

pub mod crypto;
pub mod envelope;

use thiserror::Error;

pub use crypto::keys::SecretMaterial;
pub use envelope::codec::{parse, serialize};
pub use envelope::engine::{open, rotate, seal};
pub use envelope::types::{AssetId, Envelope, RecipientId};

// ============================================================================
// ERROR TYPES
// ============================================================================

/// Errors surfaced by envelope operations.
///
/// Messages are deliberately flat: no plaintext fragments, no key material,
/// and no hint about which keyring entry was involved. Callers branch on the
/// variant, not the text.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EnvelopeError {
    /// An input failed a structural check. Recoverable by fixing the input.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    /// Ed25519 → X25519 conversion rejected the key material.
    #[error("recipient key conversion failed")]
    KeyDerivationFailure,
    /// A cipher primitive returned an unexpected error.
    #[error("encryption primitive failed")]
    EncryptionFailure,
    /// AEAD tag or sealed-box authentication did not validate.
    #[error("authentication failed")]
    AuthenticationFailure,
    /// The recipient has no entry in the keyring.
    #[error("recipient is not authorized for this envelope")]
    NotAuthorized,
    /// The envelope is bound to a different asset than the caller expected.
    #[error("envelope is bound to a different asset")]
    AssociatedDataMismatch,
    /// Envelope version or algorithm outside the accepted set.
    #[error("unsupported envelope version or algorithm")]
    UnsupportedEnvelope,
    /// CSPRNG outage or another unexpected condition.
    #[error("internal error")]
    InternalError,
}
