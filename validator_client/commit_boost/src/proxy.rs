//! The proxy-key generator (`spec.md` §4.4): creates a fresh BLS or K256
//! key, writes an encrypted keystore under the Commit-Boost directory, and
//! registers it as a proxy of a consensus key.

use crate::message::{self, ProxyKeyMessage};
use bls::Keypair as BlsKeypair;
use eth2_keystore::{read_password_file, KeystoreBuilder};
use initialized_validators::SignerRegistry;
use k256::ecdsa::SigningKey;
use signing_method::{BlsLocalSigner, SecpLocalSigner, Signer};
use slog::{info, Logger};
use std::path::Path;
use std::sync::Arc;
use types::{compute_domain, domain_type, ForkVersion, GenesisValidatorsRoot, Identifier, KeyType};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("consensus identifier is not registered")]
    NotFound,
    #[error("only a BLS consensus key may delegate a proxy key")]
    UnsupportedConsensusKeyType,
    #[error(transparent)]
    Keystore(#[from] eth2_keystore::Error),
    #[error(transparent)]
    Io(#[from] validator_dir::Error),
    #[error(transparent)]
    Signing(#[from] signing_method::Error),
}

/// `{ message, signature }` handed back to the Commit-Boost client
/// (`spec.md` §4.4 step 6).
#[derive(Debug, Clone)]
pub struct ProxyKeyResult {
    pub message: ProxyKeyMessage,
    pub signature_hex: String,
}

/// Generates and registers a fresh proxy key for `consensus_id`, signing
/// its delegation message with the consensus key itself (`spec.md` §4.4).
#[allow(clippy::too_many_arguments)]
pub async fn generate_proxy(
    registry: &SignerRegistry,
    consensus_id: &Identifier,
    scheme: KeyType,
    proxy_root: &Path,
    shared_password_path: &Path,
    fork_version: ForkVersion,
    genesis_validators_root: GenesisValidatorsRoot,
    log: &Logger,
) -> Result<ProxyKeyResult, Error> {
    let consensus_signer = registry.get(consensus_id).ok_or(Error::NotFound)?;
    if consensus_signer.key_type() != KeyType::Bls {
        return Err(Error::UnsupportedConsensusKeyType);
    }

    let password = read_password_file(shared_password_path)?;

    let (proxy_signer, proxy_pubkey_bytes): (Arc<dyn Signer>, Vec<u8>) = match scheme {
        KeyType::Bls => {
            let keypair = BlsKeypair::random();
            let pubkey_bytes = keypair.pk.to_bytes().to_vec();
            let secret_bytes = keypair.sk.to_bytes();
            write_proxy_keystore(
                proxy_root,
                consensus_id,
                scheme,
                &pubkey_bytes,
                &secret_bytes,
                &password,
            )?;
            (Arc::new(BlsLocalSigner::new(keypair)), pubkey_bytes)
        }
        KeyType::Secp256k1 => {
            let signing_key = SigningKey::random(&mut rand::thread_rng());
            let pubkey_bytes = signing_key
                .verifying_key()
                .to_encoded_point(true)
                .as_bytes()
                .to_vec();
            let secret_bytes = signing_key.to_bytes().to_vec();
            write_proxy_keystore(
                proxy_root,
                consensus_id,
                scheme,
                &pubkey_bytes,
                &secret_bytes,
                &password,
            )?;
            (
                Arc::new(SecpLocalSigner::new(signing_key)),
                pubkey_bytes,
            )
        }
    };

    registry.add_proxy(proxy_signer, consensus_id).await;
    info!(log, "commit-boost proxy key generated";
        "consensus" => consensus_id.as_str(), "scheme" => %scheme,
        "proxy" => format!("0x{}", hex::encode(&proxy_pubkey_bytes)));

    let delegator_bytes = hex::decode(consensus_id.strip_0x()).unwrap_or_default();
    let message = ProxyKeyMessage {
        delegator: delegator_bytes,
        proxy: proxy_pubkey_bytes,
    };

    let domain = compute_domain(
        domain_type::COMMIT_BOOST_PROXY,
        fork_version,
        genesis_validators_root,
    );
    let root = message::signing_root(&message, domain);
    let signature = consensus_signer.sign_bls(&root).await?;

    Ok(ProxyKeyResult {
        message,
        signature_hex: signature.to_0x_hex(),
    })
}

/// `<proxy_root>/<consensus>/<BLS|SECP256K1>/<new_pub>.json` (`spec.md`
/// §4.4 step 3, §4.1 "directory-backed loading rules").
fn write_proxy_keystore(
    proxy_root: &Path,
    consensus_id: &Identifier,
    scheme: KeyType,
    pubkey_bytes: &[u8],
    secret_bytes: &[u8],
    password: &[u8],
) -> Result<(), Error> {
    let dir = proxy_root
        .join(consensus_id.strip_0x())
        .join(scheme.directory_name());
    let path = dir.join(format!("{}.json", hex::encode(pubkey_bytes)));

    let keystore = KeystoreBuilder::new(secret_bytes, password)
        .pubkey_hex(format!("0x{}", hex::encode(pubkey_bytes)))
        .path(path.display().to_string())
        .build()?;
    validator_dir::write_keystore_fsync(&path, &keystore)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::io::Write;
    use tempfile::tempdir;

    struct FixedBlsSigner {
        identifier: Identifier,
        keypair: BlsKeypair,
    }

    #[async_trait]
    impl Signer for FixedBlsSigner {
        fn key_type(&self) -> KeyType {
            KeyType::Bls
        }
        fn identifier(&self) -> Identifier {
            self.identifier.clone()
        }
        async fn sign_bls(
            &self,
            signing_root: &[u8; 32],
        ) -> Result<signing_method::ArtifactSignature, signing_method::Error> {
            let sig = self.keypair.sk.sign(signing_root);
            Ok(signing_method::ArtifactSignature::Bls(sig.to_bytes()))
        }
    }

    #[tokio::test]
    async fn generates_and_registers_a_bls_proxy() {
        let dir = tempdir().unwrap();
        let password_path = dir.path().join("pw.txt");
        std::fs::File::create(&password_path)
            .unwrap()
            .write_all(b"hunter2")
            .unwrap();

        let registry = SignerRegistry::spawn(logging::null_logger());
        let consensus_keypair = BlsKeypair::random();
        let consensus_id = Identifier::from_public_key_bytes(&consensus_keypair.pk.to_bytes());
        let consensus_signer: Arc<dyn Signer> = Arc::new(FixedBlsSigner {
            identifier: consensus_id.clone(),
            keypair: consensus_keypair,
        });
        registry.add(consensus_signer).await;

        let result = generate_proxy(
            &registry,
            &consensus_id,
            KeyType::Bls,
            dir.path(),
            &password_path,
            ForkVersion([0u8; 4]),
            GenesisValidatorsRoot([0u8; 32]),
            &logging::null_logger(),
        )
        .await
        .unwrap();

        assert_eq!(result.message.delegator.len(), 48);
        assert_eq!(result.message.proxy.len(), 48);
        assert_eq!(result.signature_hex.len(), 2 + 96 * 2);

        let proxies = registry.proxy_ids(&consensus_id);
        assert_eq!(proxies[&KeyType::Bls].len(), 1);
    }

    #[tokio::test]
    async fn unregistered_consensus_key_is_not_found() {
        let dir = tempdir().unwrap();
        let password_path = dir.path().join("pw.txt");
        std::fs::write(&password_path, b"pw").unwrap();
        let registry = SignerRegistry::spawn(logging::null_logger());

        let err = generate_proxy(
            &registry,
            &Identifier::normalise("0xdeadbeef"),
            KeyType::Bls,
            dir.path(),
            &password_path,
            ForkVersion([0u8; 4]),
            GenesisValidatorsRoot([0u8; 32]),
            &logging::null_logger(),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, Error::NotFound));
    }
}
