//! A thin wrapper around `blst`'s `min-pk` BLS12-381 implementation.
//!
//! This crate deliberately does not implement any curve arithmetic itself
//! (`spec.md`'s non-goals) — it exists only to give the rest of the
//! workspace ergonomic, fixed-size newtypes (`SecretKey`, `PublicKey`,
//! `Signature`) instead of raw byte slices and `blst::BLST_ERROR` values.

use blst::min_pk as blst_core;
use blst::BLST_ERROR;
use rand::RngCore;
use std::fmt;
use zeroize::Zeroize;

pub const SECRET_KEY_BYTES_LEN: usize = 32;
pub const PUBLIC_KEY_BYTES_LEN: usize = 48;
pub const SIGNATURE_BYTES_LEN: usize = 96;

/// Domain separation tag used for all signing roots in this service.
/// Matches the consensus-spec BLS signature scheme (`POP` variant of the
/// hash-to-curve suite).
pub const DST: &[u8] = b"BLS_SIG_BLS12381G2_XMD:SHA-256_SSWU_RO_POP_";

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid secret key bytes")]
    InvalidSecretKeyBytes,
    #[error("invalid public key bytes")]
    InvalidPublicKeyBytes,
    #[error("invalid signature bytes")]
    InvalidSignatureBytes,
    #[error("key generation failed")]
    KeyGenFailed,
}

/// A BLS12-381 secret key. Zeroized on drop.
pub struct SecretKey(blst_core::SecretKey);

impl SecretKey {
    /// Generates a new secret key from operating-system randomness.
    ///
    /// `blst` requires at least 32 bytes of key material (`ikm`); we supply
    /// 32 random bytes, which satisfies `key_gen`'s minimum.
    pub fn random() -> Self {
        let mut ikm = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut ikm);
        let sk = blst_core::SecretKey::key_gen(&ikm, &[]).expect("32 bytes of ikm is sufficient");
        ikm.zeroize();
        SecretKey(sk)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        blst_core::SecretKey::from_bytes(bytes)
            .map(SecretKey)
            .map_err(|_| Error::InvalidSecretKeyBytes)
    }

    pub fn to_bytes(&self) -> [u8; SECRET_KEY_BYTES_LEN] {
        self.0.to_bytes()
    }

    pub fn public_key(&self) -> PublicKey {
        PublicKey(self.0.sk_to_pk())
    }

    /// Signs a pre-hashed 32-byte message (a signing root). The consensus
    /// spec hashes the signing root to a curve point internally via `DST`;
    /// callers never need to hash twice.
    pub fn sign(&self, message: &[u8]) -> Signature {
        Signature(self.0.sign(message, DST, &[]))
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretKey(..)")
    }
}

impl Drop for SecretKey {
    fn drop(&mut self) {
        // `blst::min_pk::SecretKey` has no zeroizing drop of its own;
        // wipe its backing bytes in place so key material doesn't linger
        // in freed memory.
        let ptr = &mut self.0 as *mut blst_core::SecretKey as *mut u8;
        let len = std::mem::size_of::<blst_core::SecretKey>();
        unsafe { std::ptr::write_bytes(ptr, 0, len) };
    }
}

/// A BLS12-381 public key, held in its 48-byte compressed form.
#[derive(Clone)]
pub struct PublicKey(blst_core::PublicKey);

impl PartialEq for PublicKey {
    fn eq(&self, other: &Self) -> bool {
        self.to_bytes() == other.to_bytes()
    }
}

impl Eq for PublicKey {}

impl PublicKey {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        blst_core::PublicKey::from_bytes(bytes)
            .map(PublicKey)
            .map_err(|_| Error::InvalidPublicKeyBytes)
    }

    pub fn to_bytes(&self) -> [u8; PUBLIC_KEY_BYTES_LEN] {
        self.0.compress()
    }

    pub fn to_0x_hex(&self) -> String {
        format!("0x{}", hex::encode(self.to_bytes()))
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", self.to_0x_hex())
    }
}

/// A BLS12-381 signature, held in its 96-byte compressed form.
#[derive(Clone)]
pub struct Signature(blst_core::Signature);

impl PartialEq for Signature {
    fn eq(&self, other: &Self) -> bool {
        self.to_bytes() == other.to_bytes()
    }
}

impl Eq for Signature {}

impl Signature {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        blst_core::Signature::from_bytes(bytes)
            .map(Signature)
            .map_err(|_| Error::InvalidSignatureBytes)
    }

    pub fn to_bytes(&self) -> [u8; SIGNATURE_BYTES_LEN] {
        self.0.compress()
    }

    pub fn to_0x_hex(&self) -> String {
        format!("0x{}", hex::encode(self.to_bytes()))
    }

    pub fn verify(&self, message: &[u8], public_key: &PublicKey) -> bool {
        let err = self
            .0
            .verify(true, message, DST, &[], &public_key.0, true);
        err == BLST_ERROR::BLST_SUCCESS
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({})", self.to_0x_hex())
    }
}

/// A secret/public key pair, as produced by key generation or keystore
/// decryption.
pub struct Keypair {
    pub sk: SecretKey,
    pub pk: PublicKey,
}

impl Keypair {
    pub fn random() -> Self {
        let sk = SecretKey::random();
        let pk = sk.public_key();
        Keypair { sk, pk }
    }

    pub fn from_secret_bytes(bytes: &[u8]) -> Result<Self, Error> {
        let sk = SecretKey::from_bytes(bytes)?;
        let pk = sk.public_key();
        Ok(Keypair { sk, pk })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_and_verify_round_trip() {
        let kp = Keypair::random();
        let message = [7u8; 32];
        let sig = kp.sk.sign(&message);
        assert!(sig.verify(&message, &kp.pk));
    }

    #[test]
    fn wrong_message_fails_verification() {
        let kp = Keypair::random();
        let sig = kp.sk.sign(&[1u8; 32]);
        assert!(!sig.verify(&[2u8; 32], &kp.pk));
    }

    #[test]
    fn secret_key_byte_round_trip() {
        let kp = Keypair::random();
        let bytes = kp.sk.to_bytes();
        let sk2 = SecretKey::from_bytes(&bytes).unwrap();
        assert_eq!(sk2.public_key(), kp.pk);
    }
}
