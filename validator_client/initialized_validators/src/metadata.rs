//! Per-key YAML metadata (`spec.md` §6 "Metadata file format"): one
//! `<key-store-path>/<filename>.yaml` per signer, discriminated by `type`.

use serde::{Deserialize, Serialize};
use types::KeyType;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SigningDefinition {
    #[serde(rename = "file-raw")]
    FileRaw {
        #[serde(rename = "privateKey")]
        private_key: String,
        #[serde(rename = "keyType")]
        key_type: KeyType,
    },
    #[serde(rename = "file-keystore")]
    FileKeystore {
        #[serde(rename = "keystoreFile")]
        keystore_file: String,
        #[serde(rename = "keystorePasswordFile")]
        keystore_password_file: String,
        #[serde(rename = "keyType")]
        key_type: KeyType,
    },
    #[serde(rename = "hashicorp")]
    Hashicorp {
        #[serde(rename = "serverHost")]
        server_host: String,
        #[serde(rename = "serverPort")]
        server_port: Option<u16>,
        timeout: Option<u64>,
        #[serde(rename = "keyPath")]
        key_path: String,
        #[serde(rename = "keyName")]
        key_name: Option<String>,
        token: String,
        #[serde(rename = "tlsEnabled")]
        tls_enabled: Option<bool>,
        #[serde(rename = "tlsKnownServerFile")]
        tls_known_server_file: Option<String>,
        #[serde(rename = "keyType")]
        key_type: KeyType,
    },
    #[serde(rename = "azure-secret")]
    AzureSecret {
        #[serde(rename = "clientId")]
        client_id: String,
        #[serde(rename = "clientSecret")]
        client_secret: String,
        #[serde(rename = "tenantId")]
        tenant_id: String,
        #[serde(rename = "vaultName")]
        vault_name: String,
        #[serde(rename = "secretName")]
        secret_name: String,
        #[serde(rename = "keyType")]
        key_type: KeyType,
    },
    #[serde(rename = "azure-key")]
    AzureKey {
        #[serde(rename = "clientId")]
        client_id: String,
        #[serde(rename = "clientSecret")]
        client_secret: String,
        #[serde(rename = "tenantId")]
        tenant_id: String,
        #[serde(rename = "vaultName")]
        vault_name: String,
        #[serde(rename = "secretName")]
        secret_name: String,
        #[serde(rename = "keyName")]
        key_name: String,
        #[serde(rename = "keyType")]
        key_type: KeyType,
    },
    #[serde(rename = "aws-secret")]
    AwsSecret {
        #[serde(rename = "authenticationMode")]
        authentication_mode: String,
        region: String,
        #[serde(rename = "accessKeyId")]
        access_key_id: Option<String>,
        #[serde(rename = "secretAccessKey")]
        secret_access_key: Option<String>,
        #[serde(rename = "secretName")]
        secret_name: String,
        #[serde(rename = "keyType")]
        key_type: KeyType,
    },
    #[serde(rename = "aws-kms")]
    AwsKms {
        #[serde(rename = "authenticationMode")]
        authentication_mode: String,
        region: String,
        #[serde(rename = "accessKeyId")]
        access_key_id: Option<String>,
        #[serde(rename = "secretAccessKey")]
        secret_access_key: Option<String>,
        #[serde(rename = "kmsKeyId")]
        kms_key_id: String,
        #[serde(rename = "endpointOverride")]
        endpoint_override: Option<String>,
    },
}

impl SigningDefinition {
    pub fn key_type(&self) -> KeyType {
        match self {
            SigningDefinition::FileRaw { key_type, .. }
            | SigningDefinition::FileKeystore { key_type, .. }
            | SigningDefinition::Hashicorp { key_type, .. }
            | SigningDefinition::AzureSecret { key_type, .. }
            | SigningDefinition::AzureKey { key_type, .. }
            | SigningDefinition::AwsSecret { key_type, .. } => *key_type,
            // AWS KMS only ever backs secp256k1 Ethereum-account keys.
            SigningDefinition::AwsKms { .. } => KeyType::Secp256k1,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum MetadataError {
    #[error("io error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid yaml in {path}: {source}")]
    Yaml {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
}

pub fn parse_metadata_file(path: &std::path::Path) -> Result<SigningDefinition, MetadataError> {
    let contents = std::fs::read_to_string(path).map_err(|source| MetadataError::Io {
        path: path.display().to_string(),
        source,
    })?;
    serde_yaml::from_str(&contents).map_err(|source| MetadataError::Yaml {
        path: path.display().to_string(),
        source,
    })
}

/// Writes a metadata definition back to disk, the inverse of
/// [`parse_metadata_file`] — used when `validator_manager::add_validator`
/// (`spec.md` §4.8) creates the on-disk triple for a newly imported key.
pub fn write_metadata_file(
    path: &std::path::Path,
    definition: &SigningDefinition,
) -> Result<(), MetadataError> {
    let yaml = serde_yaml::to_string(definition).map_err(|source| MetadataError::Yaml {
        path: path.display().to_string(),
        source,
    })?;
    std::fs::write(path, yaml).map_err(|source| MetadataError::Io {
        path: path.display().to_string(),
        source,
    })
}
