// Envelope codec — the persisted JSON form, strict in both directions
//
// Wire format (bit-exact): a JSON object with the exact field names `ver`,
// `aead`, `ad`, `nonce`, `ciphertext`, `keyring`. `nonce`, `ciphertext`,
// and every keyring value carry the literal prefix `base64:` followed by
// standard base64 without line breaks. Keyring keys are verbatim base58
// strings with no prefix. Any deviation is a breaking wire incompatibility.

use std::collections::BTreeMap;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::crypto::primitives::NONCE_SIZE;
use crate::envelope::types::{Envelope, AD_PREFIX, AEAD_ALGORITHM, ENVELOPE_VERSION};
use crate::envelope::validate::MAX_ENVELOPE_SIZE;
use crate::EnvelopeError;

/// Literal prefix carried by every base64 field value.
const BASE64_PREFIX: &str = "base64:";

/// The wire shape. Kept private: callers hold `Envelope` with decoded bytes
/// and never see the prefixed string form.
#[derive(Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct WireEnvelope {
    ver: u32,
    aead: String,
    ad: String,
    nonce: String,
    ciphertext: String,
    keyring: BTreeMap<String, String>,
}

/// Serialize an envelope to its persisted JSON bytes.
pub fn serialize(envelope: &Envelope) -> Result<Vec<u8>, EnvelopeError> {
    let wire = WireEnvelope {
        ver: envelope.ver,
        aead: envelope.aead.clone(),
        ad: envelope.ad.clone(),
        nonce: encode_binary(&envelope.nonce),
        ciphertext: encode_binary(&envelope.ciphertext),
        keyring: envelope
            .keyring
            .iter()
            .map(|(id, sealed)| (id.clone(), encode_binary(sealed)))
            .collect(),
    };
    serde_json::to_vec(&wire).map_err(|_| EnvelopeError::InternalError)
}

/// Parse persisted bytes back into an envelope, enforcing every structural
/// invariant. Unknown versions and algorithms are refused here, before any
/// cryptographic work can happen downstream.
pub fn parse(bytes: &[u8]) -> Result<Envelope, EnvelopeError> {
    if bytes.len() > MAX_ENVELOPE_SIZE {
        return Err(EnvelopeError::InvalidParameter(
            "serialized envelope exceeds the size bound".into(),
        ));
    }

    let wire: WireEnvelope = serde_json::from_slice(bytes).map_err(|_| {
        EnvelopeError::InvalidParameter("envelope is not a well-formed object".into())
    })?;

    if wire.ver != ENVELOPE_VERSION {
        return Err(EnvelopeError::UnsupportedEnvelope);
    }
    if wire.aead != AEAD_ALGORITHM {
        return Err(EnvelopeError::UnsupportedEnvelope);
    }
    if !wire.ad.starts_with(AD_PREFIX) {
        return Err(EnvelopeError::InvalidParameter(
            "associated data does not carry the mint prefix".into(),
        ));
    }

    let nonce_bytes = decode_binary(&wire.nonce)?;
    let nonce: [u8; NONCE_SIZE] = nonce_bytes.as_slice().try_into().map_err(|_| {
        EnvelopeError::InvalidParameter("nonce must decode to 24 bytes".into())
    })?;

    let ciphertext = decode_binary(&wire.ciphertext)?;

    if wire.keyring.is_empty() {
        return Err(EnvelopeError::InvalidParameter(
            "keyring must contain at least one recipient".into(),
        ));
    }
    // Recipient ids pass through verbatim — no normalization, no reencoding.
    let mut keyring = BTreeMap::new();
    for (id, value) in &wire.keyring {
        keyring.insert(id.clone(), decode_binary(value)?);
    }

    Ok(Envelope {
        ver: wire.ver,
        aead: wire.aead,
        ad: wire.ad,
        nonce,
        ciphertext,
        keyring,
    })
}

fn encode_binary(bytes: &[u8]) -> String {
    format!("{BASE64_PREFIX}{}", BASE64.encode(bytes))
}

fn decode_binary(field: &str) -> Result<Vec<u8>, EnvelopeError> {
    let encoded = field.strip_prefix(BASE64_PREFIX).ok_or_else(|| {
        EnvelopeError::InvalidParameter("binary field is missing the base64 prefix".into())
    })?;
    BASE64
        .decode(encoded)
        .map_err(|_| EnvelopeError::InvalidParameter("binary field is not valid base64".into()))
}
