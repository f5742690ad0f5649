//! EIP-2335 encrypted keystore support.
//!
//! Every on-disk key in this service — consensus keys loaded from a
//! `file-keystore` metadata entry, Commit-Boost proxy keys, keys managed
//! through the key-manager API — is stored in this format: a JSON document
//! carrying a KDF, a cipher and a checksum, from which the raw secret key
//! material can be recovered given the password.
//!
//! This crate does not implement BLS or secp256k1 itself (`spec.md`'s
//! non-goals); it only handles the envelope around the secret key bytes.

mod json_keystore;

use aes::cipher::{KeyIvInit, StreamCipher};
use hmac::Hmac;
use json_keystore::{ChecksumModule, Cipher, CipherModule, JsonKeystore, Kdf, KdfModule};
use pbkdf2::pbkdf2;
use sha2::{Digest, Sha256};
use std::path::Path;
use uuid::Uuid;
use zeroize::Zeroize;

pub use json_keystore::KeystoreCryptoError;

type Aes128Ctr = ctr::Ctr128BE<aes::Aes128>;

const PBKDF2_ITERATIONS: u32 = 262_144;
const SALT_LEN: usize = 32;
const IV_LEN: usize = 16;
const DKLEN: u32 = 32;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("incorrect password")]
    IncorrectPassword,
    #[error("invalid keystore: {0}")]
    InvalidKeystore(String),
}

/// A decrypted EIP-2335 keystore, parsed and verified but not yet
/// decrypted. Call [`Keystore::decrypt`] with the password to recover the
/// secret key bytes.
#[derive(Debug, Clone)]
pub struct Keystore {
    json: JsonKeystore,
}

impl Keystore {
    pub fn from_json_reader<R: std::io::Read>(reader: R) -> Result<Self, Error> {
        let json: JsonKeystore = serde_json::from_reader(reader)?;
        Ok(Keystore { json })
    }

    pub fn from_json_str(s: &str) -> Result<Self, Error> {
        let json: JsonKeystore = serde_json::from_str(s)?;
        Ok(Keystore { json })
    }

    pub fn from_file(path: &Path) -> Result<Self, Error> {
        let file = std::fs::File::open(path)?;
        Self::from_json_reader(file)
    }

    pub fn to_json_string(&self) -> Result<String, Error> {
        Ok(serde_json::to_string_pretty(&self.json)?)
    }

    pub fn uuid(&self) -> &Uuid {
        &self.json.uuid
    }

    /// Recovers the derivation key, verifies the checksum, then decrypts
    /// the secret key bytes. Rejects on checksum mismatch (wrong password)
    /// rather than returning garbage key material.
    pub fn decrypt(&self, password: &[u8]) -> Result<Vec<u8>, Error> {
        let crypto = &self.json.crypto;
        let dk = derive_key(&crypto.kdf, password);

        let mut checksum_input = Vec::with_capacity(16 + crypto.cipher.message.len());
        checksum_input.extend_from_slice(&dk[16..32]);
        checksum_input.extend_from_slice(&crypto.cipher.message);
        let checksum = Sha256::digest(&checksum_input);
        if checksum.as_slice() != crypto.checksum.message.as_slice() {
            return Err(Error::IncorrectPassword);
        }

        let mut plaintext = crypto.cipher.message.clone();
        match crypto.cipher.function {
            Cipher::Aes128Ctr => {
                let iv = &crypto.cipher.params.iv;
                let mut cipher = Aes128Ctr::new(dk[0..16].into(), iv.as_slice().into());
                cipher.apply_keystream(&mut plaintext);
            }
        }
        Ok(plaintext)
    }

    pub fn public_key_hex(&self) -> Option<&str> {
        self.json.pubkey.as_deref()
    }

    pub fn path(&self) -> Option<&str> {
        self.json.path.as_deref()
    }
}

/// Builds a new EIP-2335 keystore for a freshly generated (or imported)
/// secret key.
pub struct KeystoreBuilder<'a> {
    secret: &'a [u8],
    password: &'a [u8],
    pubkey_hex: Option<String>,
    path: String,
}

impl<'a> KeystoreBuilder<'a> {
    pub fn new(secret: &'a [u8], password: &'a [u8]) -> Self {
        KeystoreBuilder {
            secret,
            password,
            pubkey_hex: None,
            path: String::new(),
        }
    }

    pub fn pubkey_hex(mut self, pubkey_hex: String) -> Self {
        self.pubkey_hex = Some(pubkey_hex);
        self
    }

    pub fn path(mut self, path: String) -> Self {
        self.path = path;
        self
    }

    pub fn build(self) -> Result<Keystore, Error> {
        let mut salt = [0u8; SALT_LEN];
        rand::RngCore::fill_bytes(&mut rand::thread_rng(), &mut salt);
        let mut iv = [0u8; IV_LEN];
        rand::RngCore::fill_bytes(&mut rand::thread_rng(), &mut iv);

        let kdf = Kdf {
            function: KdfModule::Pbkdf2,
            params: json_keystore::KdfParams {
                dklen: DKLEN,
                c: PBKDF2_ITERATIONS,
                prf: "hmac-sha256".to_string(),
                salt: salt.to_vec(),
            },
        };
        let dk = derive_key(&kdf, self.password);

        let mut message = self.secret.to_vec();
        {
            let mut cipher = Aes128Ctr::new(dk[0..16].into(), iv.as_slice().into());
            cipher.apply_keystream(&mut message);
        }

        let mut checksum_input = Vec::with_capacity(16 + message.len());
        checksum_input.extend_from_slice(&dk[16..32]);
        checksum_input.extend_from_slice(&message);
        let checksum = Sha256::digest(&checksum_input).to_vec();

        let json = JsonKeystore {
            crypto: json_keystore::Crypto {
                kdf,
                checksum: json_keystore::Checksum {
                    function: ChecksumModule::Sha256,
                    message: checksum,
                },
                cipher: CipherModule {
                    function: Cipher::Aes128Ctr,
                    params: json_keystore::CipherParams { iv: iv.to_vec() },
                    message,
                },
            },
            uuid: Uuid::new_v4(),
            pubkey: self.pubkey_hex,
            path: Some(self.path),
            version: 4,
        };

        Ok(Keystore { json })
    }
}

fn derive_key(kdf: &Kdf, password: &[u8]) -> [u8; 32] {
    let mut out = [0u8; 32];
    match kdf.function {
        KdfModule::Pbkdf2 => {
            pbkdf2::<Hmac<Sha256>>(password, &kdf.params.salt, kdf.params.c, &mut out)
                .expect("32-byte output is a valid pbkdf2-hmac-sha256 length");
        }
    }
    out
}

/// Reads the password file used for a keystore (or shared by a whole
/// Commit-Boost proxy directory), trimming the single trailing newline a
/// human-edited password file commonly carries but never other whitespace.
pub fn read_password_file(path: &Path) -> Result<Vec<u8>, Error> {
    let mut raw = std::fs::read(path)?;
    if raw.last() == Some(&b'\n') {
        raw.pop();
        if raw.last() == Some(&b'\r') {
            raw.pop();
        }
    }
    Ok(raw)
}

impl Drop for Keystore {
    fn drop(&mut self) {
        self.json.crypto.cipher.message.zeroize();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_then_decrypt_round_trip() {
        let secret = [42u8; 32];
        let password = b"correct horse battery staple";
        let keystore = KeystoreBuilder::new(&secret, password)
            .pubkey_hex("0xabc".to_string())
            .build()
            .unwrap();

        let decrypted = keystore.decrypt(password).unwrap();
        assert_eq!(decrypted, secret.to_vec());
    }

    #[test]
    fn wrong_password_is_rejected() {
        let secret = [1u8; 32];
        let keystore = KeystoreBuilder::new(&secret, b"right").build().unwrap();
        let err = keystore.decrypt(b"wrong").unwrap_err();
        assert!(matches!(err, Error::IncorrectPassword));
    }

    #[test]
    fn json_round_trip_preserves_decryptability() {
        let secret = [9u8; 32];
        let password = b"hunter2";
        let keystore = KeystoreBuilder::new(&secret, password).build().unwrap();
        let json = keystore.to_json_string().unwrap();
        let reparsed = Keystore::from_json_str(&json).unwrap();
        assert_eq!(reparsed.decrypt(password).unwrap(), secret.to_vec());
    }
}
