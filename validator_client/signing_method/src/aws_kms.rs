//! AWS KMS-backed secp256k1 signer.
//!
//! As with Azure Key Vault, the wire protocol (SigV4, the exact KMS JSON
//! shapes) is out of scope (`spec.md` §1) — the contract modelled here is
//! "sign a digest by key id", returning a DER-encoded ECDSA signature with
//! no recovery id, which this signer then recovers against the known
//! public key (`spec.md` §4.2).

use crate::{recovery, ArtifactSignature, Encoding, Error, Signer};
use async_trait::async_trait;
use k256::ecdsa::VerifyingKey;
use serde::Deserialize;
use sha3::{Digest, Keccak256};
use types::{Identifier, KeyType};

pub struct AwsKmsSigner {
    identifier: Identifier,
    verifying_key: VerifyingKey,
    client: reqwest::Client,
    region: String,
    key_id: String,
    endpoint_override: Option<String>,
}

impl AwsKmsSigner {
    pub fn new(
        verifying_key: VerifyingKey,
        client: reqwest::Client,
        region: String,
        key_id: String,
        endpoint_override: Option<String>,
    ) -> Self {
        let identifier =
            Identifier::from_public_key_bytes(verifying_key.to_encoded_point(true).as_bytes());
        AwsKmsSigner {
            identifier,
            verifying_key,
            client,
            region,
            key_id,
            endpoint_override,
        }
    }

    fn endpoint(&self) -> String {
        self.endpoint_override
            .clone()
            .unwrap_or_else(|| format!("https://kms.{}.amazonaws.com/", self.region))
    }

    async fn sign_digest_der(&self, digest: &[u8; 32]) -> Result<Vec<u8>, Error> {
        #[derive(Deserialize)]
        struct KmsSignResponse {
            #[serde(rename = "Signature")]
            signature: String,
        }

        let response = self
            .client
            .post(self.endpoint())
            .header("X-Amz-Target", "TrentService.Sign")
            .header("Content-Type", "application/x-amz-json-1.1")
            .json(&serde_json::json!({
                "KeyId": self.key_id,
                "Message": base64::Engine::encode(&base64::engine::general_purpose::STANDARD, digest),
                "MessageType": "DIGEST",
                "SigningAlgorithm": "ECDSA_SHA_256",
            }))
            .send()
            .await
            .map_err(|e| Error::BackendUnavailable(e.to_string()))?;

        let body: KmsSignResponse = response
            .json()
            .await
            .map_err(|e| Error::BackendUnavailable(e.to_string()))?;
        base64::Engine::decode(&base64::engine::general_purpose::STANDARD, body.signature)
            .map_err(|e| Error::SigningFailed(e.to_string()))
    }
}

#[async_trait]
impl Signer for AwsKmsSigner {
    fn key_type(&self) -> KeyType {
        KeyType::Secp256k1
    }

    fn identifier(&self) -> Identifier {
        self.identifier.clone()
    }

    fn ethereum_address(&self) -> Option<Identifier> {
        let encoded = self.verifying_key.to_encoded_point(false);
        let hash = Keccak256::digest(&encoded.as_bytes()[1..]);
        Some(Identifier::from_public_key_bytes(&hash[12..]))
    }

    async fn sign_secp256k1(
        &self,
        digest: &[u8; 32],
        encoding: Encoding,
    ) -> Result<ArtifactSignature, Error> {
        let der = self.sign_digest_der(digest).await?;
        let sig = recovery::from_der(&der)?;
        let (sig, recid) = recovery::find_recovery_id(sig, digest, &self.verifying_key)?;
        crate::encode(sig, Some(recid), encoding)
    }
}
