// Ed25519 → X25519 key conversion
//
// Wallets hold Ed25519 signing keys; sealed boxes need X25519 agreement
// keys. Both live on Curve25519 — Ed25519 in twisted Edwards form, X25519
// in Montgomery form — so the conversion is the standard birational map
// (RFC 8032 §5.1.5 / RFC 7748 §4.1). Keeping the conversion in one place
// means nothing above this module ever sees key material on the wrong
// curve.

use curve25519_dalek::edwards::CompressedEdwardsY;
use ed25519_dalek::SigningKey;
use sha2::Digest;
use x25519_dalek::{PublicKey as X25519PublicKey, StaticSecret};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::EnvelopeError;

/// Ed25519 seed length (bytes).
pub const SEED_LEN: usize = 32;

/// Expanded secret length: seed followed by the public key (bytes).
pub const EXPANDED_LEN: usize = 64;

/// Recipient secret key material in either accepted shape.
///
/// Wallet exports disagree about what a "secret key" is: some hand over the
/// 32-byte Ed25519 seed, others the 64-byte `seed ‖ public` form. Both are
/// accepted and collapse to the same X25519 secret. Wiped on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub enum SecretMaterial {
    /// 32-byte Ed25519 seed.
    Seed([u8; SEED_LEN]),
    /// 64-byte expanded form: seed followed by the derived public key.
    Expanded([u8; EXPANDED_LEN]),
}

impl SecretMaterial {
    /// Accepts exactly 32 or 64 bytes; refuses every other length.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, EnvelopeError> {
        match bytes.len() {
            SEED_LEN => {
                let mut seed = [0u8; SEED_LEN];
                seed.copy_from_slice(bytes);
                Ok(Self::Seed(seed))
            }
            EXPANDED_LEN => {
                let mut full = [0u8; EXPANDED_LEN];
                full.copy_from_slice(bytes);
                Ok(Self::Expanded(full))
            }
            _ => Err(EnvelopeError::InvalidParameter(
                "secret key must be 32 or 64 bytes".into(),
            )),
        }
    }
}

/// Convert an Ed25519 public key to an X25519 public key.
///
/// Decompresses the Edwards point and maps it to Montgomery form:
/// u = (1 + y) / (1 - y) mod p. Rejection on decompression failure is the
/// curve-validity check for recipient identities.
pub fn ed25519_pub_to_x25519(pk: &[u8; 32]) -> Result<X25519PublicKey, EnvelopeError> {
    let compressed =
        CompressedEdwardsY::from_slice(pk).map_err(|_| EnvelopeError::KeyDerivationFailure)?;
    let point = compressed
        .decompress()
        .ok_or(EnvelopeError::KeyDerivationFailure)?;
    Ok(X25519PublicKey::from(point.to_montgomery().to_bytes()))
}

/// Convert recipient secret material to an X25519 static secret.
///
/// Ed25519's secret scalar is SHA-512(seed)[0..32], clamped. `StaticSecret`
/// expects the raw 32 bytes and does its own clamping. The 64-byte form is
/// checked for internal consistency: its trailing half must be the public
/// key the seed actually derives.
pub fn ed25519_sec_to_x25519(sec: &SecretMaterial) -> Result<StaticSecret, EnvelopeError> {
    let mut seed = [0u8; SEED_LEN];
    match sec {
        SecretMaterial::Seed(s) => seed.copy_from_slice(s),
        SecretMaterial::Expanded(full) => {
            seed.copy_from_slice(&full[..SEED_LEN]);
            let derived = SigningKey::from_bytes(&seed).verifying_key();
            if derived.as_bytes()[..] != full[SEED_LEN..] {
                seed.zeroize();
                return Err(EnvelopeError::KeyDerivationFailure);
            }
        }
    }

    let mut hash = <sha2::Sha512 as Digest>::digest(seed);
    let mut secret_bytes = [0u8; 32];
    secret_bytes.copy_from_slice(&hash[..32]);

    let secret = StaticSecret::from(secret_bytes);

    // Zeroize intermediates
    secret_bytes.zeroize();
    hash.as_mut_slice().zeroize();
    seed.zeroize();

    Ok(secret)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seed(k: u8) -> [u8; SEED_LEN] {
        let mut s = [0u8; SEED_LEN];
        s[0] = k;
        s
    }

    fn expanded(k: u8) -> [u8; EXPANDED_LEN] {
        let signing = SigningKey::from_bytes(&seed(k));
        let mut full = [0u8; EXPANDED_LEN];
        full[..SEED_LEN].copy_from_slice(&seed(k));
        full[SEED_LEN..].copy_from_slice(signing.verifying_key().as_bytes());
        full
    }

    #[test]
    fn test_seed_and_expanded_agree() {
        let from_seed = ed25519_sec_to_x25519(&SecretMaterial::Seed(seed(1))).unwrap();
        let from_expanded =
            ed25519_sec_to_x25519(&SecretMaterial::Expanded(expanded(1))).unwrap();

        assert_eq!(
            X25519PublicKey::from(&from_seed).as_bytes(),
            X25519PublicKey::from(&from_expanded).as_bytes()
        );
    }

    #[test]
    fn test_public_and_secret_conversions_agree() {
        // The Montgomery point of the converted secret must equal the
        // conversion of the corresponding Ed25519 public key.
        let signing = SigningKey::from_bytes(&seed(2));

        let x_secret = ed25519_sec_to_x25519(&SecretMaterial::Seed(seed(2))).unwrap();
        let from_secret = X25519PublicKey::from(&x_secret);
        let from_public = ed25519_pub_to_x25519(signing.verifying_key().as_bytes()).unwrap();

        assert_eq!(from_secret.as_bytes(), from_public.as_bytes());
    }

    #[test]
    fn test_inconsistent_expanded_rejected() {
        let mut full = expanded(3);
        full[SEED_LEN] ^= 0xFF; // corrupt the embedded public key

        let result = ed25519_sec_to_x25519(&SecretMaterial::Expanded(full));
        assert!(matches!(result, Err(EnvelopeError::KeyDerivationFailure)));
    }

    #[test]
    fn test_wrong_length_rejected() {
        assert!(SecretMaterial::from_bytes(&[0u8; 31]).is_err());
        assert!(SecretMaterial::from_bytes(&[0u8; 33]).is_err());
        assert!(SecretMaterial::from_bytes(&[0u8; 63]).is_err());
        assert!(SecretMaterial::from_bytes(&[0u8; 32]).is_ok());
        assert!(SecretMaterial::from_bytes(&[0u8; 64]).is_ok());
    }

    #[test]
    fn test_invalid_public_key_rejected() {
        // Not every 32-byte string is a valid compressed Edwards point.
        let mut bad = [0xFFu8; 32];
        bad[31] = 0xFF;
        let result = ed25519_pub_to_x25519(&bad);
        assert_eq!(result, Err(EnvelopeError::KeyDerivationFailure));
    }
}
