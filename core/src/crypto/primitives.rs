// Cipher primitives — the only five operations the crate performs
//
// Everything above this module works with byte buffers and error kinds;
// nothing above it touches a cipher type directly.
//
// Sealed-box construction (anonymous, per-recipient):
// 1. Generate ephemeral X25519 keypair
// 2. ECDH: ephemeral_secret × recipient_public → shared_secret
// 3. KDF: Blake3::derive_key(shared ‖ ephemeral_pk ‖ recipient_pk) → key
// 4. Encrypt: XChaCha20-Poly1305(key, random_nonce, plaintext)
// 5. Output: ephemeral_pk(32) ‖ nonce(24) ‖ ciphertext
//
// Binding the recipient public key into the derivation means a caller who
// supplies a secret that does not belong to the claimed identity fails
// authentication instead of silently decrypting with a mismatched key.

use chacha20poly1305::{
    aead::{Aead, KeyInit, Payload},
    XChaCha20Poly1305, XNonce,
};
use rand::{rngs::OsRng, RngCore};
use x25519_dalek::{EphemeralSecret, PublicKey as X25519PublicKey, StaticSecret};
use zeroize::Zeroize;

use crate::EnvelopeError;

/// Content key size for XChaCha20-Poly1305 (bytes).
pub const CONTENT_KEY_SIZE: usize = 32;

/// XChaCha20-Poly1305 nonce size (bytes).
pub const NONCE_SIZE: usize = 24;

/// Poly1305 authentication tag size (bytes).
pub const TAG_SIZE: usize = 16;

/// Fixed overhead of a sealed box over its plaintext:
/// ephemeral public key + nonce + Poly1305 tag.
pub const SEALED_OVERHEAD: usize = 32 + NONCE_SIZE + TAG_SIZE;

/// KDF context string for deriving sealed-box keys from ECDH shared secrets.
/// Changing this breaks every keyring ever written.
const SEAL_KDF_CONTEXT: &str = "mintseal v1 keyring seal 2026-05-12";

/// Encrypt `plaintext` under `key`/`nonce`, authenticating `ad` alongside it.
pub fn aead_seal(
    plaintext: &[u8],
    key: &[u8; CONTENT_KEY_SIZE],
    nonce: &[u8; NONCE_SIZE],
    ad: &[u8],
) -> Result<Vec<u8>, EnvelopeError> {
    let cipher =
        XChaCha20Poly1305::new_from_slice(key).map_err(|_| EnvelopeError::EncryptionFailure)?;
    cipher
        .encrypt(XNonce::from_slice(nonce), Payload { msg: plaintext, aad: ad })
        .map_err(|_| EnvelopeError::EncryptionFailure)
}

/// Decrypt and authenticate. Returns nothing but the error kind on a tag or
/// associated-data mismatch — no partial plaintext, no detail.
pub fn aead_open(
    ciphertext: &[u8],
    key: &[u8; CONTENT_KEY_SIZE],
    nonce: &[u8; NONCE_SIZE],
    ad: &[u8],
) -> Result<Vec<u8>, EnvelopeError> {
    let cipher = XChaCha20Poly1305::new_from_slice(key)
        .map_err(|_| EnvelopeError::AuthenticationFailure)?;
    cipher
        .decrypt(XNonce::from_slice(nonce), Payload { msg: ciphertext, aad: ad })
        .map_err(|_| EnvelopeError::AuthenticationFailure)
}

/// Seal a short payload to a recipient's X25519 public key.
///
/// The sender has no stable identity: a fresh ephemeral keypair is generated
/// per call and its public half travels inside the sealed bytes.
pub fn seal_for_x25519(
    plaintext: &[u8],
    recipient: &X25519PublicKey,
) -> Result<Vec<u8>, EnvelopeError> {
    let ephemeral_secret = EphemeralSecret::random_from_rng(OsRng);
    let ephemeral_public = X25519PublicKey::from(&ephemeral_secret);

    let shared = ephemeral_secret.diffie_hellman(recipient);
    if !shared.was_contributory() {
        return Err(EnvelopeError::InvalidParameter(
            "recipient key is a degenerate curve point".into(),
        ));
    }

    let mut key = derive_seal_key(
        shared.as_bytes(),
        ephemeral_public.as_bytes(),
        recipient.as_bytes(),
    );

    let mut nonce = [0u8; NONCE_SIZE];
    random_bytes(&mut nonce)?;

    let cipher =
        XChaCha20Poly1305::new_from_slice(&key).map_err(|_| EnvelopeError::EncryptionFailure)?;
    let ciphertext = cipher
        .encrypt(XNonce::from_slice(&nonce), plaintext)
        .map_err(|_| EnvelopeError::EncryptionFailure)?;

    key.zeroize();

    let mut out = Vec::with_capacity(SEALED_OVERHEAD + plaintext.len());
    out.extend_from_slice(ephemeral_public.as_bytes());
    out.extend_from_slice(&nonce);
    out.extend_from_slice(&ciphertext);
    Ok(out)
}

/// Open a sealed box with the recipient's X25519 keypair.
///
/// Any malformation — truncation, wrong secret, wrong public, flipped bits —
/// collapses into the same `AuthenticationFailure`.
pub fn open_sealed_x25519(
    sealed: &[u8],
    secret: &StaticSecret,
    public: &X25519PublicKey,
) -> Result<Vec<u8>, EnvelopeError> {
    if sealed.len() < SEALED_OVERHEAD {
        return Err(EnvelopeError::AuthenticationFailure);
    }

    let mut epk_bytes = [0u8; 32];
    epk_bytes.copy_from_slice(&sealed[..32]);
    let mut nonce = [0u8; NONCE_SIZE];
    nonce.copy_from_slice(&sealed[32..32 + NONCE_SIZE]);
    let ciphertext = &sealed[32 + NONCE_SIZE..];

    let ephemeral_public = X25519PublicKey::from(epk_bytes);
    let shared = secret.diffie_hellman(&ephemeral_public);
    if !shared.was_contributory() {
        return Err(EnvelopeError::AuthenticationFailure);
    }

    let mut key = derive_seal_key(shared.as_bytes(), &epk_bytes, public.as_bytes());

    let cipher = XChaCha20Poly1305::new_from_slice(&key)
        .map_err(|_| EnvelopeError::AuthenticationFailure)?;
    let plaintext = cipher
        .decrypt(XNonce::from_slice(&nonce), ciphertext)
        .map_err(|_| EnvelopeError::AuthenticationFailure)?;

    key.zeroize();

    Ok(plaintext)
}

/// Fill `buf` from the OS CSPRNG.
pub fn random_bytes(buf: &mut [u8]) -> Result<(), EnvelopeError> {
    OsRng
        .try_fill_bytes(buf)
        .map_err(|_| EnvelopeError::InternalError)
}

/// Derive the sealed-box symmetric key. The ephemeral and recipient public
/// keys are mixed into the input so the key is bound to this exact exchange.
fn derive_seal_key(
    shared: &[u8; 32],
    ephemeral_pk: &[u8; 32],
    recipient_pk: &[u8; 32],
) -> [u8; CONTENT_KEY_SIZE] {
    let mut ikm = [0u8; 96];
    ikm[..32].copy_from_slice(shared);
    ikm[32..64].copy_from_slice(ephemeral_pk);
    ikm[64..].copy_from_slice(recipient_pk);
    let key = blake3::derive_key(SEAL_KDF_CONTEXT, &ikm);
    ikm.zeroize();
    key
}
