// Envelope engine — seal, open, rotate
//
// Flow for seal:
// 1. Canonical config bytes (JSON)
// 2. Fresh 32-byte content key + fresh 24-byte nonce from the CSPRNG
// 3. ad = "mint:" ++ asset base58, authenticated alongside the ciphertext
// 4. XChaCha20-Poly1305(content_key, nonce, config, ad)
// 5. Per recipient: Ed25519 → X25519, seal the content key into the keyring
// 6. Wipe the content key
//
// Open reverses it: structural checks first, then the keyring lookup, then
// sealed-box and AEAD authentication, and only then is the plaintext
// interpreted. Rotation is strictly open-then-seal — the prior content key
// and nonce never survive into the new envelope.

use serde::de::DeserializeOwned;
use serde::Serialize;
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

use crate::crypto::{keys, primitives};
use crate::crypto::keys::SecretMaterial;
use crate::crypto::primitives::{CONTENT_KEY_SIZE, NONCE_SIZE};
use crate::envelope::types::{AssetId, Envelope, RecipientId, AEAD_ALGORITHM, ENVELOPE_VERSION};
use crate::envelope::validate;
use crate::EnvelopeError;

/// Seal a configuration document for a set of recipients, bound to an asset.
///
/// Every call draws a fresh content key and nonce, so identical inputs
/// produce structurally different envelopes. Failure of any step aborts the
/// whole operation; no partial envelope escapes.
pub fn seal<C: Serialize>(
    config: &C,
    recipients: &[RecipientId],
    asset_id: &AssetId,
) -> Result<Envelope, EnvelopeError> {
    let plaintext = Zeroizing::new(serde_json::to_vec(config).map_err(|_| {
        EnvelopeError::InvalidParameter("configuration is not serializable".into())
    })?);
    seal_bytes(&plaintext, recipients, asset_id)
}

/// Open an envelope as the given recipient and deserialize the document.
///
/// When `expected_asset_id` is provided, the envelope's associated data must
/// match it exactly before any cryptographic work happens.
pub fn open<C: DeserializeOwned>(
    envelope: &Envelope,
    secret: &SecretMaterial,
    public: &RecipientId,
    expected_asset_id: Option<&AssetId>,
) -> Result<C, EnvelopeError> {
    let plaintext = open_bytes(envelope, secret, public, expected_asset_id)?;
    serde_json::from_slice(&plaintext).map_err(|_| {
        EnvelopeError::InvalidParameter("decrypted configuration is not a well-formed document".into())
    })
}

/// Re-seal an envelope for a new recipient set.
///
/// The asset binding is carried over verbatim from the old envelope's
/// associated data. A fresh content key and nonce are drawn; recipients of
/// the old envelope keep no access unless explicitly listed again. The old
/// envelope is left untouched.
pub fn rotate(
    envelope: &Envelope,
    old_secret: &SecretMaterial,
    old_public: &RecipientId,
    new_recipients: &[RecipientId],
) -> Result<Envelope, EnvelopeError> {
    let asset_id = envelope.asset_id()?;
    let plaintext = open_bytes(envelope, old_secret, old_public, None)?;
    let rotated = seal_bytes(&plaintext, new_recipients, &asset_id)?;
    tracing::debug!(
        recipients = new_recipients.len(),
        "rotated envelope to a new recipient set"
    );
    Ok(rotated)
}

fn seal_bytes(
    plaintext: &[u8],
    recipients: &[RecipientId],
    asset_id: &AssetId,
) -> Result<Envelope, EnvelopeError> {
    validate::check_payload_size(plaintext.len())?;
    validate::check_recipients(recipients)?;

    // Owned exclusively by this call; wiped on every exit path below.
    let mut content_key = Zeroizing::new([0u8; CONTENT_KEY_SIZE]);
    primitives::random_bytes(content_key.as_mut())?;

    let mut nonce = [0u8; NONCE_SIZE];
    primitives::random_bytes(&mut nonce)?;

    let ad = asset_id.associated_data();
    let ciphertext = primitives::aead_seal(plaintext, &content_key, &nonce, ad.as_bytes())?;

    let mut keyring = std::collections::BTreeMap::new();
    for recipient in recipients {
        let x25519_public = keys::ed25519_pub_to_x25519(recipient.public_key_bytes())?;
        let sealed = primitives::seal_for_x25519(content_key.as_ref(), &x25519_public)?;
        keyring.insert(recipient.as_str().to_owned(), sealed);
    }

    let envelope = Envelope {
        ver: ENVELOPE_VERSION,
        aead: AEAD_ALGORITHM.to_owned(),
        ad,
        nonce,
        ciphertext,
        keyring,
    };

    validate::scan_envelope_metadata(&envelope);
    tracing::debug!(recipients = recipients.len(), "sealed configuration envelope");

    Ok(envelope)
}

fn open_bytes(
    envelope: &Envelope,
    secret: &SecretMaterial,
    public: &RecipientId,
    expected_asset_id: Option<&AssetId>,
) -> Result<Zeroizing<Vec<u8>>, EnvelopeError> {
    // Structural checks precede cryptographic checks; cryptographic checks
    // precede any plaintext interpretation.
    if envelope.ver != ENVELOPE_VERSION {
        return Err(EnvelopeError::UnsupportedEnvelope);
    }
    if envelope.aead != AEAD_ALGORITHM {
        return Err(EnvelopeError::UnsupportedEnvelope);
    }
    validate::check_ciphertext_size(envelope.ciphertext.len())?;

    if let Some(asset_id) = expected_asset_id {
        if envelope.ad != asset_id.associated_data() {
            return Err(EnvelopeError::AssociatedDataMismatch);
        }
    }

    let sealed = lookup_keyring(envelope, public).ok_or(EnvelopeError::NotAuthorized)?;

    let x25519_secret = keys::ed25519_sec_to_x25519(secret)?;
    let x25519_public = keys::ed25519_pub_to_x25519(public.public_key_bytes())?;

    let recovered = Zeroizing::new(primitives::open_sealed_x25519(
        sealed,
        &x25519_secret,
        &x25519_public,
    )?);
    if recovered.len() != CONTENT_KEY_SIZE {
        return Err(EnvelopeError::AuthenticationFailure);
    }
    let mut content_key = Zeroizing::new([0u8; CONTENT_KEY_SIZE]);
    content_key.copy_from_slice(&recovered);

    let plaintext = primitives::aead_open(
        &envelope.ciphertext,
        &content_key,
        &envelope.nonce,
        envelope.ad.as_bytes(),
    )?;

    tracing::debug!("opened configuration envelope");
    Ok(Zeroizing::new(plaintext))
}

/// Find the caller's keyring entry without early exit.
///
/// Every entry is compared with a constant-time equality check and the scan
/// always walks the full keyring, so timing reveals only the keyring size —
/// which the envelope already states in the clear.
fn lookup_keyring<'a>(envelope: &'a Envelope, recipient: &RecipientId) -> Option<&'a [u8]> {
    let wanted = recipient.as_str().as_bytes();
    let mut found: Option<&'a [u8]> = None;
    for (id, sealed) in &envelope.keyring {
        let id = id.as_bytes();
        if id.len() == wanted.len() && bool::from(id.ct_eq(wanted)) {
            found = Some(sealed.as_slice());
        }
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::SigningKey;
    use serde_json::json;

    fn seed(k: u8) -> [u8; 32] {
        let mut s = [0u8; 32];
        s[0] = k;
        s
    }

    fn recipient(k: u8) -> (SecretMaterial, RecipientId) {
        let signing = SigningKey::from_bytes(&seed(k));
        (
            SecretMaterial::Seed(seed(k)),
            RecipientId::from_public_key_bytes(signing.verifying_key().as_bytes()),
        )
    }

    fn asset() -> AssetId {
        AssetId::from_bytes(&[0x11u8; 32])
    }

    #[test]
    fn test_seal_open_roundtrip() {
        let (secret, public) = recipient(1);
        let config = json!({"name": "x", "value": 42});

        let envelope = seal(&config, &[public.clone()], &asset()).unwrap();
        let recovered: serde_json::Value = open(&envelope, &secret, &public, None).unwrap();

        assert_eq!(recovered, config);
    }

    #[test]
    fn test_each_recipient_can_open() {
        let (user_secret, user) = recipient(1);
        let (operator_secret, operator) = recipient(2);
        let config = json!({"plugins": ["alpha", "beta"]});

        let envelope = seal(&config, &[user.clone(), operator.clone()], &asset()).unwrap();

        let via_user: serde_json::Value = open(&envelope, &user_secret, &user, None).unwrap();
        let via_operator: serde_json::Value =
            open(&envelope, &operator_secret, &operator, None).unwrap();

        assert_eq!(via_user, config);
        assert_eq!(via_operator, config);
    }

    #[test]
    fn test_unauthorized_recipient_rejected() {
        let (_, user) = recipient(1);
        let (outsider_secret, outsider) = recipient(3);

        let envelope = seal(&json!({"k": 1}), &[user], &asset()).unwrap();
        let result: Result<serde_json::Value, _> =
            open(&envelope, &outsider_secret, &outsider, None);

        assert_eq!(result.unwrap_err(), EnvelopeError::NotAuthorized);
    }

    #[test]
    fn test_wrong_secret_for_listed_identity_fails_authentication() {
        // The identity is in the keyring but the supplied secret belongs to
        // someone else: the sealed box must refuse, and the failure must be
        // authentication, not membership.
        let (_, user) = recipient(1);
        let (other_secret, _) = recipient(2);

        let envelope = seal(&json!({"k": 1}), &[user.clone()], &asset()).unwrap();
        let result: Result<serde_json::Value, _> = open(&envelope, &other_secret, &user, None);

        assert_eq!(result.unwrap_err(), EnvelopeError::AuthenticationFailure);
    }

    #[test]
    fn test_fresh_key_and_nonce_every_seal() {
        let (_, user) = recipient(1);
        let config = json!({"same": "input"});

        let a = seal(&config, &[user.clone()], &asset()).unwrap();
        let b = seal(&config, &[user], &asset()).unwrap();

        assert_ne!(a.nonce, b.nonce);
        assert_ne!(a.ciphertext, b.ciphertext);
    }

    #[test]
    fn test_empty_recipient_set_rejected() {
        let result = seal(&json!({}), &[], &asset());
        assert!(matches!(result, Err(EnvelopeError::InvalidParameter(_))));
    }

    #[test]
    fn test_duplicate_recipients_rejected() {
        let (_, user) = recipient(1);
        let result = seal(&json!({}), &[user.clone(), user], &asset());
        assert!(matches!(result, Err(EnvelopeError::InvalidParameter(_))));
    }

    #[test]
    fn test_expected_asset_mismatch() {
        let (secret, user) = recipient(1);
        let other_asset = AssetId::from_bytes(&[0x22u8; 32]);

        let envelope = seal(&json!({"k": 1}), &[user.clone()], &asset()).unwrap();
        let result: Result<serde_json::Value, _> =
            open(&envelope, &secret, &user, Some(&other_asset));

        assert_eq!(result.unwrap_err(), EnvelopeError::AssociatedDataMismatch);
    }

    #[test]
    fn test_expected_asset_match_accepted() {
        let (secret, user) = recipient(1);

        let envelope = seal(&json!({"k": 1}), &[user.clone()], &asset()).unwrap();
        let recovered: serde_json::Value =
            open(&envelope, &secret, &user, Some(&asset())).unwrap();

        assert_eq!(recovered, json!({"k": 1}));
    }

    #[test]
    fn test_version_checked_before_crypto() {
        let (secret, user) = recipient(1);

        let mut envelope = seal(&json!({"k": 1}), &[user.clone()], &asset()).unwrap();
        envelope.ver = 99;
        // Garbage the keyring: if version refusal really comes first, the
        // broken entry is never touched.
        for sealed in envelope.keyring.values_mut() {
            sealed.clear();
        }

        let result: Result<serde_json::Value, _> = open(&envelope, &secret, &user, None);
        assert_eq!(result.unwrap_err(), EnvelopeError::UnsupportedEnvelope);
    }

    #[test]
    fn test_tampered_ciphertext_rejected() {
        let (secret, user) = recipient(1);

        let mut envelope = seal(&json!({"k": 1}), &[user.clone()], &asset()).unwrap();
        envelope.ciphertext[0] ^= 0x01;

        let result: Result<serde_json::Value, _> = open(&envelope, &secret, &user, None);
        assert_eq!(result.unwrap_err(), EnvelopeError::AuthenticationFailure);
    }

    #[test]
    fn test_rotation_replaces_recipient_set() {
        let (old_secret, old_user) = recipient(1);
        let (new_secret, new_user) = recipient(3);
        let config = json!({"name": "x"});

        let envelope = seal(&config, &[old_user.clone()], &asset()).unwrap();
        let rotated = rotate(&envelope, &old_secret, &old_user, &[new_user.clone()]).unwrap();

        // Fresh nonce, fresh ciphertext, same asset binding.
        assert_ne!(rotated.nonce, envelope.nonce);
        assert_ne!(rotated.ciphertext, envelope.ciphertext);
        assert_eq!(rotated.ad, envelope.ad);

        let stale: Result<serde_json::Value, _> = open(&rotated, &old_secret, &old_user, None);
        assert_eq!(stale.unwrap_err(), EnvelopeError::NotAuthorized);

        let fresh: serde_json::Value = open(&rotated, &new_secret, &new_user, None).unwrap();
        assert_eq!(fresh, config);
    }

    #[test]
    fn test_open_accepts_expanded_secret() {
        let (seed_secret, user) = recipient(1);
        let signing = SigningKey::from_bytes(&seed(1));
        let mut full = [0u8; 64];
        full[..32].copy_from_slice(&seed(1));
        full[32..].copy_from_slice(signing.verifying_key().as_bytes());
        let expanded_secret = SecretMaterial::Expanded(full);

        let envelope = seal(&json!({"k": 1}), &[user.clone()], &asset()).unwrap();

        let via_seed: serde_json::Value = open(&envelope, &seed_secret, &user, None).unwrap();
        let via_expanded: serde_json::Value =
            open(&envelope, &expanded_secret, &user, None).unwrap();

        assert_eq!(via_seed, via_expanded);
    }
}
