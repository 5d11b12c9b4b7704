// Cryptography module — AEAD, sealed boxes, and key conversion

pub mod keys;
pub mod primitives;

pub use keys::{ed25519_pub_to_x25519, ed25519_sec_to_x25519, SecretMaterial};
pub use primitives::{aead_open, aead_seal, open_sealed_x25519, random_bytes, seal_for_x25519};
