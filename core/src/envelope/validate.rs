// Input bounds and defence-in-depth checks

use std::collections::HashSet;

use crate::crypto::primitives::TAG_SIZE;
use crate::envelope::types::{Envelope, RecipientId};
use crate::EnvelopeError;

/// Maximum canonical configuration size: 10 MiB.
/// An agent configuration is prose, plugin lists, and policy — anything
/// bigger is a runaway caller, not a document.
pub const MAX_CONFIG_SIZE: usize = 10 * 1024 * 1024;

/// Maximum ciphertext size: the plaintext bound plus the Poly1305 tag.
pub const MAX_CIPHERTEXT_SIZE: usize = MAX_CONFIG_SIZE + TAG_SIZE;

/// Maximum serialized envelope size. Base64 expands the ciphertext by 4/3;
/// metadata and keyring get a fixed allowance on top.
pub const MAX_ENVELOPE_SIZE: usize = MAX_CIPHERTEXT_SIZE / 3 * 4 + 64 * 1024;

/// Markers whose presence in envelope metadata suggests a credential leaked
/// out of the encrypted payload. A hit is an upstream bug, not a parse
/// error: log and carry on.
const SENSITIVE_MARKERS: &[&str] = &[
    "-----begin",
    "private key",
    "password",
    "api_key",
    "apikey",
    "secret_key",
    "bearer ",
];

/// Reject configurations over the plaintext bound.
pub fn check_payload_size(len: usize) -> Result<(), EnvelopeError> {
    if len > MAX_CONFIG_SIZE {
        return Err(EnvelopeError::InvalidParameter(
            "configuration exceeds the size bound".into(),
        ));
    }
    Ok(())
}

/// Reject ciphertexts over the matching bound.
pub fn check_ciphertext_size(len: usize) -> Result<(), EnvelopeError> {
    if len > MAX_CIPHERTEXT_SIZE {
        return Err(EnvelopeError::InvalidParameter(
            "ciphertext exceeds the size bound".into(),
        ));
    }
    Ok(())
}

/// Reject empty recipient sets and duplicate identities.
pub fn check_recipients(recipients: &[RecipientId]) -> Result<(), EnvelopeError> {
    if recipients.is_empty() {
        return Err(EnvelopeError::InvalidParameter(
            "recipient set must not be empty".into(),
        ));
    }
    let mut seen = HashSet::new();
    for recipient in recipients {
        if !seen.insert(recipient.as_str()) {
            return Err(EnvelopeError::InvalidParameter(
                "duplicate recipient id".into(),
            ));
        }
    }
    Ok(())
}

/// Post-seal heuristic over the envelope metadata fields.
///
/// Scans `aead` and `ad` — never the keyring, never any plaintext — for
/// strings that look like credentials. Metadata is persisted in the clear,
/// so a hit means some caller put a secret where ciphertext should be.
pub fn scan_envelope_metadata(envelope: &Envelope) {
    for field in [envelope.aead.as_str(), envelope.ad.as_str()] {
        let lowered = field.to_lowercase();
        for marker in SENSITIVE_MARKERS {
            if lowered.contains(marker) {
                tracing::warn!(
                    marker = *marker,
                    "envelope metadata contains a credential-like marker; audit the sealing caller"
                );
            }
        }
    }
}
