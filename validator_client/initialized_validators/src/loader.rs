//! Metadata loading: turns parsed YAML [`SigningDefinition`]s and bulk
//! cloud-vault listings into concrete [`Signer`]s (`spec.md` §4, "Metadata
//! loader").

use crate::metadata::{parse_metadata_file, MetadataError, SigningDefinition};
use k256::ecdsa::SigningKey;
use signing_method::Signer;
use slog::{debug, warn, Logger};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("metadata error: {0}")]
    Metadata(#[from] MetadataError),
    #[error("keystore error: {0}")]
    Keystore(#[from] eth2_keystore::Error),
    #[error("bls error: {0}")]
    Bls(#[from] bls::Error),
    #[error("invalid secp256k1 private key: {0}")]
    InvalidSecpKey(String),
    #[error("hex decode error: {0}")]
    Hex(#[from] hex::FromHexError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("backend unavailable: {0}")]
    BackendUnavailable(String),
}

/// The result of a bulk load: the signers that parsed successfully plus a
/// count of the ones that didn't (`spec.md` §4.1 "MappedResults").
/// Per-key failures never abort the whole load — they're reported, not
/// fatal (`spec.md` §7).
pub struct MappedResults {
    pub values: Vec<Arc<dyn Signer>>,
    pub error_count: usize,
}

/// Builds one signer from a parsed metadata definition. `key_store_path`
/// anchors any relative file paths the definition references.
pub async fn build_signer(
    definition: &SigningDefinition,
    key_store_path: &Path,
    _http_client: &reqwest::Client,
) -> Result<Arc<dyn Signer>, LoadError> {
    match definition {
        SigningDefinition::FileRaw {
            private_key,
            key_type,
        } => build_local_signer(private_key, *key_type),

        SigningDefinition::FileKeystore {
            keystore_file,
            keystore_password_file,
            key_type,
        } => {
            let keystore_path = resolve(key_store_path, keystore_file);
            let password_path = resolve(key_store_path, keystore_password_file);
            let keystore = eth2_keystore::Keystore::from_file(&keystore_path)?;
            let password = eth2_keystore::read_password_file(&password_path)?;
            let secret_bytes = keystore.decrypt(&password)?;
            build_local_signer(&hex::encode(secret_bytes), *key_type)
        }

        SigningDefinition::Hashicorp { .. } => Err(LoadError::BackendUnavailable(
            "hashicorp vault fetch is a deployment-time integration, not modelled here"
                .to_string(),
        )),

        SigningDefinition::AzureSecret { .. } | SigningDefinition::AwsSecret { .. } => {
            Err(LoadError::BackendUnavailable(
                "cloud secret-manager fetch is a deployment-time integration, not modelled here"
                    .to_string(),
            ))
        }

        SigningDefinition::AzureKey {
            client_id,
            client_secret,
            tenant_id,
            vault_name,
            key_name,
            ..
        } => {
            // A real deployment fetches the public key via Key Vault's
            // `GET /keys/{name}` first; omitted here since only the
            // "sign a digest by key id" contract is in scope (`spec.md`
            // §1). Callers that need an operable signer construct one
            // directly with `AzureKeyVaultSigner::new` once they have the
            // verifying key from the vault.
            let _ = (client_id, client_secret, tenant_id, vault_name, key_name);
            Err(LoadError::BackendUnavailable(
                "azure-key requires a verifying key fetched from the vault at load time"
                    .to_string(),
            ))
        }

        SigningDefinition::AwsKms { .. } => Err(LoadError::BackendUnavailable(
            "aws-kms requires a verifying key fetched via GetPublicKey at load time".to_string(),
        )),
    }
}

fn build_local_signer(
    private_key_hex: &str,
    key_type: types::KeyType,
) -> Result<Arc<dyn Signer>, LoadError> {
    signer_from_hex_private_key(private_key_hex, key_type)
}

/// Builds an in-process local signer directly from hex-encoded private
/// key material — the common tail end of both per-key YAML loading
/// (`file-raw`) and bulk cloud-vault loading, where the backend hands
/// back raw secret bytes rather than a keystore file.
pub(crate) fn signer_from_hex_private_key(
    private_key_hex: &str,
    key_type: types::KeyType,
) -> Result<Arc<dyn Signer>, LoadError> {
    let stripped = private_key_hex.strip_prefix("0x").unwrap_or(private_key_hex);
    let bytes = hex::decode(stripped)?;
    match key_type {
        types::KeyType::Bls => {
            let keypair = bls::Keypair::from_secret_bytes(&bytes)?;
            Ok(Arc::new(signing_method::BlsLocalSigner::new(keypair)))
        }
        types::KeyType::Secp256k1 => {
            let signing_key = SigningKey::from_slice(&bytes)
                .map_err(|e| LoadError::InvalidSecpKey(e.to_string()))?;
            Ok(Arc::new(signing_method::SecpLocalSigner::new(signing_key)))
        }
    }
}

fn resolve(base: &Path, maybe_relative: &str) -> PathBuf {
    let candidate = Path::new(maybe_relative);
    if candidate.is_absolute() {
        candidate.to_path_buf()
    } else {
        base.join(candidate)
    }
}

/// Loads every `*.yaml` metadata file directly under `dir` (no
/// recursion), applying the directory-backed loading rules of `spec.md`
/// §4.1: case-insensitive extension match, hidden files skipped, parser
/// failures counted as errors rather than aborting the load.
pub async fn load_directory(
    dir: &Path,
    http_client: &reqwest::Client,
    log: &Logger,
) -> Result<MappedResults, std::io::Error> {
    let mut values = Vec::new();
    let mut error_count = 0usize;

    let mut entries = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let file_name = match path.file_name().and_then(|n| n.to_str()) {
            Some(name) => name,
            None => continue,
        };
        if file_name.starts_with('.') {
            continue;
        }
        let is_yaml = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case("yaml") || e.eq_ignore_ascii_case("yml"))
            .unwrap_or(false);
        if !is_yaml {
            continue;
        }

        match parse_metadata_file(&path) {
            Ok(definition) => match build_signer(&definition, dir, http_client).await {
                Ok(signer) => {
                    debug!(log, "loaded signer from metadata file"; "file" => file_name);
                    values.push(signer);
                }
                Err(e) => {
                    warn!(log, "failed to build signer"; "file" => file_name, "error" => %e);
                    error_count += 1;
                }
            },
            Err(e) => {
                warn!(log, "failed to parse metadata file"; "file" => file_name, "error" => %e);
                error_count += 1;
            }
        }
    }

    Ok(MappedResults {
        values,
        error_count,
    })
}
