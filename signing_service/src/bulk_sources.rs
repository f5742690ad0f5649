//! Cloud-vault bulk loaders wired up from CLI flags. The wire protocol of
//! each backend is a deployment-time integration outside this workspace's
//! scope (`spec.md` §1) — enabling one here still gives a named healthcheck
//! entry and an honest `BackendUnavailable` error rather than silently
//! reporting zero keys.

use async_trait::async_trait;
use initialized_validators::{BulkLoadError, BulkSecret, BulkSecretSource};

pub struct AzureVaultSource;

#[async_trait]
impl BulkSecretSource for AzureVaultSource {
    fn backend_id(&self) -> &str {
        "azure-bulk-loading"
    }

    async fn list_secrets(&self) -> Result<Vec<BulkSecret>, BulkLoadError> {
        Err(BulkLoadError::BackendUnavailable(
            "azure key vault bulk listing is a deployment-time integration, not modelled here"
                .to_string(),
        ))
    }
}

pub struct AwsSecretsSource;

#[async_trait]
impl BulkSecretSource for AwsSecretsSource {
    fn backend_id(&self) -> &str {
        "aws-bulk-loading"
    }

    async fn list_secrets(&self) -> Result<Vec<BulkSecret>, BulkLoadError> {
        Err(BulkLoadError::BackendUnavailable(
            "aws secrets manager bulk listing is a deployment-time integration, not modelled here"
                .to_string(),
        ))
    }
}
