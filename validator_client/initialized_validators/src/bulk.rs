//! Bulk cloud-vault loaders (`spec.md` §4.1 "Metadata loader ... bulk
//! loaders (Azure/AWS/GCP)").
//!
//! The wire protocol of each vault is explicitly out of scope (`spec.md`
//! §1) — only the capability matters: enumerate every secret in a given
//! vault/container and hand back key material. [`BulkSecretSource`]
//! models exactly that contract; a real deployment supplies one
//! implementation per backend over that backend's SDK.

use async_trait::async_trait;
use slog::{warn, Logger};
use std::sync::Arc;
use types::KeyType;

use crate::loader::MappedResults;

#[derive(Debug, thiserror::Error)]
pub enum BulkLoadError {
    #[error("backend unavailable: {0}")]
    BackendUnavailable(String),
}

/// One secret as enumerated by a bulk loader: its hex-encoded raw private
/// key material and the scheme it belongs to.
pub struct BulkSecret {
    pub name: String,
    pub private_key_hex: String,
    pub key_type: KeyType,
}

/// "Enumerate every secret reachable from this backend instance" — the
/// only capability the slashing-protection-relevant parts of this service
/// need from Azure Secrets/Key Vault, AWS Secrets Manager/KMS, or GCP
/// Secret Manager (`spec.md` §1).
#[async_trait]
pub trait BulkSecretSource: Send + Sync {
    /// A stable name for this backend instance, used as the healthcheck
    /// id, e.g. `"azure-bulk-loading"` (`spec.md` §6).
    fn backend_id(&self) -> &str;

    async fn list_secrets(&self) -> Result<Vec<BulkSecret>, BulkLoadError>;
}

/// Status surfaced under `GET /healthcheck`'s
/// `checks[id=keys-check].checks[id=<backend>-bulk-loading]` (`spec.md`
/// §6, `SPEC_FULL.md` §6 "Healthcheck detail").
#[derive(Debug, Clone)]
pub struct BulkLoadStatus {
    pub backend_id: String,
    pub error_count: usize,
    pub loaded_count: usize,
}

/// Runs one bulk loader to completion, turning its enumerated secrets
/// into signers. Per-secret failures are counted, never fatal (`spec.md`
/// §7); a backend-unavailable failure counts the whole source as one
/// error so the healthcheck still reflects it instead of silently
/// reporting zero keys.
pub async fn load_bulk_source(
    source: &dyn BulkSecretSource,
    log: &Logger,
) -> (MappedResults, BulkLoadStatus) {
    let secrets = match source.list_secrets().await {
        Ok(secrets) => secrets,
        Err(e) => {
            warn!(log, "bulk loader backend unavailable"; "backend" => source.backend_id(), "error" => %e);
            return (
                MappedResults {
                    values: Vec::new(),
                    error_count: 1,
                },
                BulkLoadStatus {
                    backend_id: source.backend_id().to_string(),
                    error_count: 1,
                    loaded_count: 0,
                },
            );
        }
    };

    let mut values = Vec::new();
    let mut error_count = 0usize;

    for secret in secrets {
        match build_from_bulk_secret(&secret) {
            Ok(signer) => values.push(signer),
            Err(e) => {
                warn!(log, "failed to build signer from bulk secret";
                    "backend" => source.backend_id(), "name" => &secret.name, "error" => %e);
                error_count += 1;
            }
        }
    }

    let status = BulkLoadStatus {
        backend_id: source.backend_id().to_string(),
        error_count,
        loaded_count: values.len(),
    };
    (MappedResults { values, error_count }, status)
}

fn build_from_bulk_secret(
    secret: &BulkSecret,
) -> Result<Arc<dyn signing_method::Signer>, crate::loader::LoadError> {
    crate::loader::signer_from_hex_private_key(&secret.private_key_hex, secret.key_type)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingSource;

    #[async_trait]
    impl BulkSecretSource for FailingSource {
        fn backend_id(&self) -> &str {
            "azure-bulk-loading"
        }

        async fn list_secrets(&self) -> Result<Vec<BulkSecret>, BulkLoadError> {
            Err(BulkLoadError::BackendUnavailable("network down".to_string()))
        }
    }

    #[tokio::test]
    async fn unavailable_backend_counts_as_one_error() {
        let (results, status) = load_bulk_source(&FailingSource, &logging::null_logger()).await;
        assert_eq!(results.error_count, 1);
        assert_eq!(status.error_count, 1);
        assert_eq!(status.backend_id, "azure-bulk-loading");
    }
}
