//! `add_validator` (`spec.md` §4.8): writes the keystore/password/metadata
//! triple, registers the validator row (enabled), and loads the signer into
//! the registry — the key-manager API's `POST /eth/v1/keystores` operation.

use eth2_keystore::Keystore;
use initialized_validators::{write_metadata_file, SigningDefinition};
use signing_method::{BlsLocalSigner, SecpLocalSigner, Signer};
use slog::{info, Logger};
use std::path::PathBuf;
use std::sync::Arc;
use types::KeyType;
use validator_dir::KeystoreFiles;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Keystore(#[from] eth2_keystore::Error),
    #[error(transparent)]
    Files(#[from] validator_dir::Error),
    #[error(transparent)]
    Metadata(#[from] initialized_validators::MetadataError),
    #[error(transparent)]
    Slashing(#[from] slashing_protection::Error),
    #[error("invalid secp256k1 key material: {0}")]
    InvalidSecpKey(String),
}

pub struct AddValidatorRequest {
    pub keystore: Keystore,
    /// The keystore's decryption password; also persisted as the
    /// validator's password file so a future reload can decrypt it again.
    pub password: Vec<u8>,
    pub key_type: KeyType,
    pub key_store_path: PathBuf,
}

/// Writes `request`'s keystore + password + metadata triple under
/// `key_store_path`, upserts the validator row as enabled, and loads the
/// resulting signer into `registry` (`spec.md` §4.8).
pub async fn add_validator(
    registry: &initialized_validators::SignerRegistry,
    slashing_db: &slashing_protection::SlashingDatabase,
    request: AddValidatorRequest,
    log: &Logger,
) -> Result<Arc<dyn Signer>, Error> {
    let secret = request.keystore.decrypt(&request.password)?;

    let signer: Arc<dyn Signer> = match request.key_type {
        KeyType::Bls => {
            let keypair = bls::Keypair::from_secret_bytes(&secret)
                .map_err(|e| Error::InvalidSecpKey(e.to_string()))?;
            Arc::new(BlsLocalSigner::new(keypair))
        }
        KeyType::Secp256k1 => {
            let signing_key = k256::ecdsa::SigningKey::from_slice(&secret)
                .map_err(|e| Error::InvalidSecpKey(e.to_string()))?;
            Arc::new(SecpLocalSigner::new(signing_key))
        }
    };

    let identifier = signer.identifier();
    let files = KeystoreFiles::conventional(&request.key_store_path, identifier.as_str());

    validator_dir::write_keystore_fsync(&files.keystore_path, &request.keystore)?;
    std::fs::write(
        files.password_path.as_ref().expect("conventional() sets it"),
        &request.password,
    )
    .map_err(validator_dir::Error::IOError)?;
    write_metadata_file(
        files.metadata_path.as_ref().expect("conventional() sets it"),
        &SigningDefinition::FileKeystore {
            keystore_file: files.keystore_path.display().to_string(),
            keystore_password_file: files
                .password_path
                .as_ref()
                .expect("conventional() sets it")
                .display()
                .to_string(),
            key_type: request.key_type,
        },
    )?;

    slashing_db.register_validator(identifier.as_str())?;
    slashing_db.set_enabled(identifier.as_str(), true)?;
    registry.add(signer.clone()).await;

    info!(log, "validator added"; "identifier" => identifier.as_str());
    Ok(signer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use eth2_keystore::KeystoreBuilder;
    use tempfile::tempdir;

    #[tokio::test]
    async fn adds_a_bls_validator() {
        let dir = tempdir().unwrap();
        let registry = initialized_validators::SignerRegistry::spawn(logging::null_logger());
        let db = slashing_protection::SlashingDatabase::in_memory().unwrap();

        let secret = [11u8; 32];
        let keystore = KeystoreBuilder::new(&secret, b"pw").build().unwrap();

        let signer = add_validator(
            &registry,
            &db,
            AddValidatorRequest {
                keystore,
                password: b"pw".to_vec(),
                key_type: KeyType::Bls,
                key_store_path: dir.path().to_path_buf(),
            },
            &logging::null_logger(),
        )
        .await
        .unwrap();

        assert!(registry.get(&signer.identifier()).is_some());
        assert_eq!(
            db.is_enabled(signer.identifier().as_str()).unwrap(),
            Some(true)
        );

        let files = KeystoreFiles::conventional(dir.path(), signer.identifier().as_str());
        assert!(files.keystore_path.exists());
        assert!(files.password_path.unwrap().exists());
        assert!(files.metadata_path.unwrap().exists());
    }
}
