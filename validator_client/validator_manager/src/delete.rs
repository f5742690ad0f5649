//! The coordinated delete flow (`spec.md` §4.5, §4.8): removes a validator
//! from the registry, disables it in the slashing store, deletes its
//! keystore files, and exports its slashing-protection history — the
//! key-manager API's `DELETE /eth/v1/keystores` operation.

use slog::{error, info, warn, Logger};
use types::Identifier;
use validator_dir::KeystoreFiles;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteStatus {
    Deleted,
    NotActive,
    NotFound,
    Error(String),
}

/// Result of a single-key delete: the per-key status, plus the EIP-3076
/// interchange document for that key when the delete succeeded (`spec.md`
/// §4.5 step 6).
pub struct DeleteOutcome {
    pub status: DeleteStatus,
    pub interchange: Option<Vec<u8>>,
}

/// Runs the delete flow for one validator (`spec.md` §4.5):
///
/// 1. Look the signer up; absent with slashing history → `NotActive`,
///    absent with none → `NotFound`.
/// 2. Remove it from the registry.
/// 3. Disable it in the slashing store.
/// 4. Delete its keystore files.
/// 5. On failure in 2–4, restore the pre-call enabled flag in one more
///    totally-ordered update.
/// 6. On success, export the interchange data for this one key.
/// 7. An export failure does not revert the disable — the delete itself
///    already succeeded.
pub async fn delete_validator(
    registry: &initialized_validators::SignerRegistry,
    slashing_db: &slashing_protection::SlashingDatabase,
    keystore_files: &KeystoreFiles,
    identifier: &Identifier,
    log: &Logger,
) -> DeleteOutcome {
    let signer = registry.get(identifier);
    if signer.is_none() {
        return match slashing_db.has_any_history(identifier.as_str()) {
            Ok(true) => DeleteOutcome {
                status: DeleteStatus::NotActive,
                interchange: None,
            },
            Ok(false) => DeleteOutcome {
                status: DeleteStatus::NotFound,
                interchange: None,
            },
            Err(e) => DeleteOutcome {
                status: DeleteStatus::Error(e.to_string()),
                interchange: None,
            },
        };
    }

    let previous_enabled = slashing_db
        .is_enabled(identifier.as_str())
        .unwrap_or(None)
        .unwrap_or(true);

    registry.remove(identifier).await;

    if let Err(e) = slashing_db.set_enabled(identifier.as_str(), false) {
        error!(log, "failed to disable validator during delete"; "identifier" => identifier.as_str(), "error" => %e);
        restore_enabled(slashing_db, identifier, previous_enabled, log);
        return DeleteOutcome {
            status: DeleteStatus::Error(e.to_string()),
            interchange: None,
        };
    }

    if let Err(e) = keystore_files.delete(log) {
        error!(log, "failed to delete keystore files"; "identifier" => identifier.as_str(), "error" => %e);
        restore_enabled(slashing_db, identifier, previous_enabled, log);
        return DeleteOutcome {
            status: DeleteStatus::Error(e.to_string()),
            interchange: None,
        };
    }

    info!(log, "validator deleted"; "identifier" => identifier.as_str());

    let mut buf = Vec::new();
    let interchange = match slashing_db
        .export_interchange_for(&[identifier.as_str().to_string()], &mut buf)
    {
        Ok(_) => Some(buf),
        Err(e) => {
            warn!(log, "slashing-protection export failed after delete, flag stays disabled";
                "identifier" => identifier.as_str(), "error" => %e);
            None
        }
    };

    DeleteOutcome {
        status: DeleteStatus::Deleted,
        interchange,
    }
}

fn restore_enabled(
    slashing_db: &slashing_protection::SlashingDatabase,
    identifier: &Identifier,
    previous_enabled: bool,
    log: &Logger,
) {
    if let Err(e) = slashing_db.set_enabled(identifier.as_str(), previous_enabled) {
        error!(log, "failed to restore enabled flag after aborted delete";
            "identifier" => identifier.as_str(), "error" => %e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Arc;
    use tempfile::tempdir;
    use types::KeyType;

    struct DummySigner(Identifier);

    #[async_trait]
    impl signing_method::Signer for DummySigner {
        fn key_type(&self) -> KeyType {
            KeyType::Bls
        }
        fn identifier(&self) -> Identifier {
            self.0.clone()
        }
    }

    #[tokio::test]
    async fn delete_unknown_validator_with_no_history_is_not_found() {
        let registry = initialized_validators::SignerRegistry::spawn(logging::null_logger());
        let db = slashing_protection::SlashingDatabase::in_memory().unwrap();
        let dir = tempdir().unwrap();
        let files = KeystoreFiles::conventional(dir.path(), "0xabc");

        let outcome = delete_validator(
            &registry,
            &db,
            &files,
            &Identifier::normalise("0xabc"),
            &logging::null_logger(),
        )
        .await;

        assert_eq!(outcome.status, DeleteStatus::NotFound);
    }

    #[tokio::test]
    async fn delete_unknown_validator_with_history_is_not_active() {
        let registry = initialized_validators::SignerRegistry::spawn(logging::null_logger());
        let db = slashing_protection::SlashingDatabase::in_memory().unwrap();
        db.register_validator("0xabc").unwrap();
        let dir = tempdir().unwrap();
        let files = KeystoreFiles::conventional(dir.path(), "0xabc");

        let outcome = delete_validator(
            &registry,
            &db,
            &files,
            &Identifier::normalise("0xabc"),
            &logging::null_logger(),
        )
        .await;

        assert_eq!(outcome.status, DeleteStatus::NotActive);
    }

    #[tokio::test]
    async fn delete_registered_validator_removes_it_and_exports() {
        let registry = initialized_validators::SignerRegistry::spawn(logging::null_logger());
        let db = slashing_protection::SlashingDatabase::in_memory().unwrap();
        let identifier = Identifier::normalise("0xabc");

        db.register_validator(identifier.as_str()).unwrap();
        db.set_enabled(identifier.as_str(), true).unwrap();
        registry
            .add(Arc::new(DummySigner(identifier.clone())))
            .await;

        let dir = tempdir().unwrap();
        let files = KeystoreFiles::conventional(dir.path(), identifier.as_str());
        std::fs::write(&files.keystore_path, b"{}").unwrap();

        let outcome = delete_validator(&registry, &db, &files, &identifier, &logging::null_logger())
            .await;

        assert_eq!(outcome.status, DeleteStatus::Deleted);
        assert!(outcome.interchange.is_some());
        assert!(registry.get(&identifier).is_none());
        assert_eq!(db.is_enabled(identifier.as_str()).unwrap(), Some(false));
        assert!(!files.keystore_path.exists());
    }
}
