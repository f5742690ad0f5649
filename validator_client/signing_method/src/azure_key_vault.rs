//! Azure Key Vault-backed secp256k1 signer.
//!
//! The wire protocol of Azure's REST API is explicitly out of scope
//! (`spec.md` §1) — only the capability matters: "sign a digest by key
//! id", authenticated with a bearer token obtained from Azure AD. This
//! struct models exactly that contract over `reqwest`, not the full Key
//! Vault SDK surface.

use crate::{recovery, ArtifactSignature, Encoding, Error, Signer};
use async_trait::async_trait;
use k256::ecdsa::VerifyingKey;
use serde::Deserialize;
use sha3::{Digest, Keccak256};
use types::{Identifier, KeyType};

pub struct AzureKeyVaultSigner {
    identifier: Identifier,
    verifying_key: VerifyingKey,
    client: reqwest::Client,
    vault_name: String,
    key_name: String,
    tenant_id: String,
    client_id: String,
    client_secret: String,
}

impl AzureKeyVaultSigner {
    pub fn new(
        verifying_key: VerifyingKey,
        client: reqwest::Client,
        vault_name: String,
        key_name: String,
        tenant_id: String,
        client_id: String,
        client_secret: String,
    ) -> Self {
        let identifier =
            Identifier::from_public_key_bytes(verifying_key.to_encoded_point(true).as_bytes());
        AzureKeyVaultSigner {
            identifier,
            verifying_key,
            client,
            vault_name,
            key_name,
            tenant_id,
            client_id,
            client_secret,
        }
    }

    async fn bearer_token(&self) -> Result<String, Error> {
        #[derive(Deserialize)]
        struct TokenResponse {
            access_token: String,
        }

        let url = format!(
            "https://login.microsoftonline.com/{}/oauth2/v2.0/token",
            self.tenant_id
        );
        let response = self
            .client
            .post(url)
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("scope", "https://vault.azure.net/.default"),
            ])
            .send()
            .await
            .map_err(|e| Error::BackendUnavailable(e.to_string()))?;

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| Error::BackendUnavailable(e.to_string()))?;
        Ok(token.access_token)
    }

    async fn sign_digest_der(&self, digest: &[u8; 32]) -> Result<Vec<u8>, Error> {
        #[derive(Deserialize)]
        struct SignResponse {
            value: String,
        }

        let token = self.bearer_token().await?;
        let url = format!(
            "https://{}.vault.azure.net/keys/{}/sign?api-version=7.4",
            self.vault_name, self.key_name
        );
        let response = self
            .client
            .post(url)
            .bearer_auth(token)
            .json(&serde_json::json!({
                "alg": "ES256K",
                "value": base64_url_encode(digest),
            }))
            .send()
            .await
            .map_err(|e| Error::BackendUnavailable(e.to_string()))?;

        let body: SignResponse = response
            .json()
            .await
            .map_err(|e| Error::BackendUnavailable(e.to_string()))?;
        base64_url_decode(&body.value)
    }
}

#[async_trait]
impl Signer for AzureKeyVaultSigner {
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
        let raw = self.sign_digest_der(digest).await?;
        // Key Vault's `sign` returns raw fixed-width R||S, not DER, for
        // ES256K; fall back to DER parsing if a longer body is returned.
        let sig = if raw.len() == 64 {
            k256::ecdsa::Signature::from_slice(&raw)
                .map_err(|e| Error::SigningFailed(e.to_string()))?
        } else {
            recovery::from_der(&raw)?
        };
        let (sig, recid) = recovery::find_recovery_id(sig, digest, &self.verifying_key)?;
        crate::encode(sig, Some(recid), encoding)
    }
}

fn base64_url_encode(bytes: &[u8]) -> String {
    use base64::Engine;
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

fn base64_url_decode(s: &str) -> Result<Vec<u8>, Error> {
    use base64::Engine;
    base64::engine::general_purpose::URL_SAFE_NO_PAD
        .decode(s)
        .map_err(|e| Error::SigningFailed(e.to_string()))
}
