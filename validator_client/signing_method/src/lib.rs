//! Signer variants and signature encodings (`spec.md` §4.1, §4.2, §9).
//!
//! A [`Signer`] is a capability — "produce an [`ArtifactSignature`] for
//! `(identifier, message)`" — not a class hierarchy. The Commit-Boost
//! "K256" artifact is the same secp256k1 algorithm as an `eth_sign`
//! signature, just encoded differently (compact `R‖S`, no recovery byte,
//! canonicalised `s`); the encoding is a property of the request, carried
//! in [`Encoding`], not of the signer.

mod aws_kms;
mod azure_key_vault;
mod recovery;

pub use aws_kms::AwsKmsSigner;
pub use azure_key_vault::AzureKeyVaultSigner;

use async_trait::async_trait;
use k256::ecdsa::{signature::hazmat::PrehashSigner, RecoveryId, Signature as K256Signature, SigningKey, VerifyingKey};
use sha3::{Digest, Keccak256};
use types::{Identifier, KeyType};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("backend unavailable: {0}")]
    BackendUnavailable(String),
    #[error("signing failed: {0}")]
    SigningFailed(String),
    #[error("could not recover a matching recovery id for this signature")]
    RecoveryIdNotFound,
    #[error("invalid key material: {0}")]
    InvalidKeyMaterial(String),
}

/// How a secp256k1 signature over a digest is to be encoded. BLS artifacts
/// have only one encoding and don't need this distinction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    /// 65 bytes, `R(32) ‖ S(32) ‖ V(1)`, `V = recId + 27 (+ 2*chain_id)`.
    EthSign { chain_id: Option<u64> },
    /// 64 bytes, `R(32) ‖ S(32)`, canonical `s ≤ n/2`, no recovery byte.
    K256Compact,
}

/// The result of a sign operation, already in the byte layout the HTTP
/// layer hex-encodes verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactSignature {
    Bls([u8; 96]),
    EthSign { r: [u8; 32], s: [u8; 32], v: u8 },
    K256Compact { r: [u8; 32], s: [u8; 32] },
}

impl ArtifactSignature {
    pub fn to_0x_hex(&self) -> String {
        match self {
            ArtifactSignature::Bls(bytes) => format!("0x{}", hex::encode(bytes)),
            ArtifactSignature::EthSign { r, s, v } => {
                let mut bytes = Vec::with_capacity(65);
                bytes.extend_from_slice(r);
                bytes.extend_from_slice(s);
                bytes.push(*v);
                format!("0x{}", hex::encode(bytes))
            }
            ArtifactSignature::K256Compact { r, s } => {
                let mut bytes = Vec::with_capacity(64);
                bytes.extend_from_slice(r);
                bytes.extend_from_slice(s);
                format!("0x{}", hex::encode(bytes))
            }
        }
    }
}

/// `keccak256("\x19Ethereum Signed Message:\n" ++ len(msg) ++ msg)`
/// (`spec.md` §4.2's "eth_sign prehash").
pub fn eth_sign_prehash(message: &[u8]) -> [u8; 32] {
    let prefix = format!("\x19Ethereum Signed Message:\n{}", message.len());
    let mut hasher = Keccak256::new();
    hasher.update(prefix.as_bytes());
    hasher.update(message);
    hasher.finalize().into()
}

/// A signer capable of producing an [`ArtifactSignature`] over a
/// pre-computed message: a signing root for BLS, a digest for secp256k1.
#[async_trait]
pub trait Signer: Send + Sync {
    fn key_type(&self) -> KeyType;
    fn identifier(&self) -> Identifier;

    /// The Ethereum address this signer answers to for `eth_sign`/
    /// `eth_accounts` (`spec.md` §4.3's "ethereum-address-form
    /// identifiers") — distinct from [`Signer::identifier`], which is the
    /// raw public key used for registry/keystore lookups. Only
    /// secp256k1 signers have one.
    fn ethereum_address(&self) -> Option<Identifier> {
        None
    }

    /// Signs a 32-byte BLS signing root. Only meaningful when
    /// `key_type() == KeyType::Bls`.
    async fn sign_bls(&self, signing_root: &[u8; 32]) -> Result<ArtifactSignature, Error> {
        let _ = signing_root;
        Err(Error::SigningFailed(
            "signer does not support BLS signing".to_string(),
        ))
    }

    /// Signs a 32-byte digest with secp256k1 and encodes per `encoding`.
    /// Only meaningful when `key_type() == KeyType::Secp256k1`.
    async fn sign_secp256k1(
        &self,
        digest: &[u8; 32],
        encoding: Encoding,
    ) -> Result<ArtifactSignature, Error> {
        let _ = (digest, encoding);
        Err(Error::SigningFailed(
            "signer does not support secp256k1 signing".to_string(),
        ))
    }
}

/// A BLS signer backed by an in-process keypair (loaded from a local
/// keystore or a raw-private-key metadata entry).
pub struct BlsLocalSigner {
    identifier: Identifier,
    keypair: bls::Keypair,
}

impl BlsLocalSigner {
    pub fn new(keypair: bls::Keypair) -> Self {
        let identifier = Identifier::from_public_key_bytes(&keypair.pk.to_bytes());
        BlsLocalSigner { identifier, keypair }
    }

    pub fn public_key(&self) -> &bls::PublicKey {
        &self.keypair.pk
    }
}

#[async_trait]
impl Signer for BlsLocalSigner {
    fn key_type(&self) -> KeyType {
        KeyType::Bls
    }

    fn identifier(&self) -> Identifier {
        self.identifier.clone()
    }

    async fn sign_bls(&self, signing_root: &[u8; 32]) -> Result<ArtifactSignature, Error> {
        let sig = self.keypair.sk.sign(signing_root);
        Ok(ArtifactSignature::Bls(sig.to_bytes()))
    }
}

/// A secp256k1 signer backed by an in-process private key — used both for
/// `eth_sign`/`file-raw`/`file-keystore` Ethereum accounts and for
/// Commit-Boost K256 proxy keys (the same key material, signed with
/// whichever [`Encoding`] the caller asks for).
pub struct SecpLocalSigner {
    identifier: Identifier,
    signing_key: SigningKey,
}

impl SecpLocalSigner {
    pub fn new(signing_key: SigningKey) -> Self {
        let verifying_key = signing_key.verifying_key();
        let identifier =
            Identifier::from_public_key_bytes(verifying_key.to_encoded_point(true).as_bytes());
        SecpLocalSigner {
            identifier,
            signing_key,
        }
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        let signing_key = SigningKey::from_slice(bytes)
            .map_err(|e| Error::InvalidKeyMaterial(e.to_string()))?;
        Ok(Self::new(signing_key))
    }

    pub fn verifying_key(&self) -> VerifyingKey {
        *self.signing_key.verifying_key()
    }
}

#[async_trait]
impl Signer for SecpLocalSigner {
    fn key_type(&self) -> KeyType {
        KeyType::Secp256k1
    }

    fn identifier(&self) -> Identifier {
        self.identifier.clone()
    }

    fn ethereum_address(&self) -> Option<Identifier> {
        let encoded = self.signing_key.verifying_key().to_encoded_point(false);
        // Strip the 0x04 uncompressed-point prefix before hashing.
        let hash = Keccak256::digest(&encoded.as_bytes()[1..]);
        Some(Identifier::from_public_key_bytes(&hash[12..]))
    }

    async fn sign_secp256k1(
        &self,
        digest: &[u8; 32],
        encoding: Encoding,
    ) -> Result<ArtifactSignature, Error> {
        let (sig, recid): (K256Signature, RecoveryId) = self
            .signing_key
            .sign_prehash_recoverable(digest)
            .map_err(|e| Error::SigningFailed(e.to_string()))?;
        encode(sig, Some(recid), encoding)
    }
}

/// Encodes a low-level k256 signature per the requested [`Encoding`],
/// canonicalising `s` for [`Encoding::K256Compact`] (`spec.md` §4.2).
pub(crate) fn encode(
    sig: K256Signature,
    recid: Option<RecoveryId>,
    encoding: Encoding,
) -> Result<ArtifactSignature, Error> {
    match encoding {
        Encoding::EthSign { chain_id } => {
            let recid = recid.ok_or(Error::RecoveryIdNotFound)?;
            let bytes = sig.to_bytes();
            let mut r = [0u8; 32];
            let mut s = [0u8; 32];
            r.copy_from_slice(&bytes[0..32]);
            s.copy_from_slice(&bytes[32..64]);
            let v = match chain_id {
                None => recid.to_byte() + 27,
                Some(chain_id) => recid.to_byte() + 27 + 2 * (chain_id as u8),
            };
            Ok(ArtifactSignature::EthSign { r, s, v })
        }
        Encoding::K256Compact => {
            let normalized = sig.normalize_s().unwrap_or(sig);
            let bytes = normalized.to_bytes();
            let mut r = [0u8; 32];
            let mut s = [0u8; 32];
            r.copy_from_slice(&bytes[0..32]);
            s.copy_from_slice(&bytes[32..64]);
            Ok(ArtifactSignature::K256Compact { r, s })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn bls_local_signer_round_trips() {
        let keypair = bls::Keypair::random();
        let signer = BlsLocalSigner::new(keypair);
        let root = [3u8; 32];
        let sig = signer.sign_bls(&root).await.unwrap();
        match sig {
            ArtifactSignature::Bls(bytes) => assert_eq!(bytes.len(), 96),
            _ => panic!("expected BLS signature"),
        }
    }

    #[tokio::test]
    async fn eth_sign_encoding_is_132_hex_chars() {
        let signing_key = SigningKey::random(&mut rand::thread_rng());
        let signer = SecpLocalSigner::new(signing_key);
        let digest = eth_sign_prehash(b"hello world");
        let sig = signer
            .sign_secp256k1(&digest, Encoding::EthSign { chain_id: None })
            .await
            .unwrap();
        assert_eq!(sig.to_0x_hex().len(), 132);
    }

    #[tokio::test]
    async fn k256_compact_signature_is_canonical() {
        let signing_key = SigningKey::random(&mut rand::thread_rng());
        let signer = SecpLocalSigner::new(signing_key);
        let digest = [9u8; 32];
        let sig = signer
            .sign_secp256k1(&digest, Encoding::K256Compact)
            .await
            .unwrap();
        match sig {
            ArtifactSignature::K256Compact { r, s } => {
                let mut bytes = [0u8; 64];
                bytes[0..32].copy_from_slice(&r);
                bytes[32..64].copy_from_slice(&s);
                let reconstructed = K256Signature::from_slice(&bytes).unwrap();
                // already low-S, so re-normalizing is a no-op
                assert!(reconstructed.normalize_s().is_none());
            }
            _ => panic!("expected K256 signature"),
        }
    }
}
