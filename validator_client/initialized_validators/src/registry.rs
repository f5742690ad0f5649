//! The signer registry (`spec.md` §4.1): a process-wide, reloadable map
//! from identifier to signer, plus per-consensus-key proxy signer sets.
//!
//! Mutations are serialised on a single background worker consuming a
//! channel of commands (`SPEC_FULL.md` §4.1.A), so the maps have a total
//! FIFO order of modifications. Readers take a lock-free snapshot off an
//! `ArcSwap` and never block on the writer.

use arc_swap::ArcSwap;
use slog::{info, warn, Logger};
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use types::{Identifier, KeyType};

use crate::loader::MappedResults;
use signing_method::Signer;

/// A boxed, one-shot async supplier invoked by the worker while holding
/// exclusive access to the registry's write side — used by `load`/`reload`
/// to enumerate metadata files and bulk-loaders without the registry
/// itself knowing anything about YAML or cloud vaults.
pub type LoadSupplier =
    Box<dyn FnOnce() -> Pin<Box<dyn Future<Output = MappedResults> + Send>> + Send>;

/// `(loaded count, stale identifiers)` — handed to the post-load callback
/// the same way the source's reload hook receives them (`spec.md` §4.1
/// "Load algorithm").
#[derive(Debug, Clone)]
pub struct LoadSummary {
    pub loaded: usize,
    pub error_count: usize,
    pub stale: Vec<Identifier>,
}

#[derive(Clone, Default)]
struct RegistryState {
    signers: HashMap<String, Arc<dyn Signer>>,
    proxy_signers: HashMap<String, Arc<dyn Signer>>,
    /// consensus identifier -> key type -> set of proxy identifiers.
    consensus_proxies: HashMap<String, HashMap<KeyType, HashSet<String>>>,
}

enum Command {
    Add(Arc<dyn Signer>, oneshot::Sender<()>),
    Remove(Identifier, oneshot::Sender<()>),
    AddProxy(Arc<dyn Signer>, Identifier, oneshot::Sender<()>),
    RemoveProxySet(Identifier, oneshot::Sender<()>),
    Load(LoadSupplier, bool, oneshot::Sender<LoadSummary>),
}

/// Handle to the registry. Cloning is cheap (an `mpsc::Sender` and an
/// `Arc<ArcSwap<..>>`); every clone talks to the same worker task.
#[derive(Clone)]
pub struct SignerRegistry {
    commands: mpsc::Sender<Command>,
    state: Arc<ArcSwap<RegistryState>>,
}

impl SignerRegistry {
    /// Spawns the worker task and returns a handle to it. The task runs
    /// for the lifetime of the returned handle's channel (it exits once
    /// every clone of the sender is dropped).
    pub fn spawn(log: Logger) -> Self {
        let (tx, mut rx) = mpsc::channel::<Command>(256);
        let state = Arc::new(ArcSwap::from_pointee(RegistryState::default()));
        let worker_state = state.clone();

        tokio::spawn(async move {
            while let Some(command) = rx.recv().await {
                match command {
                    Command::Add(signer, reply) => {
                        let mut next = (**worker_state.load()).clone();
                        let id = signer.identifier().as_str().to_string();
                        next.signers.insert(id.clone(), signer);
                        worker_state.store(Arc::new(next));
                        info!(log, "signer added to registry"; "identifier" => id);
                        let _ = reply.send(());
                    }
                    Command::Remove(id, reply) => {
                        let mut next = (**worker_state.load()).clone();
                        next.signers.remove(id.as_str());
                        // Removing a consensus key tears down its whole
                        // proxy set (`spec.md` §3 "destroyed when the
                        // consensus identifier is removed").
                        if let Some(proxies) = next.consensus_proxies.remove(id.as_str()) {
                            for set in proxies.values() {
                                for proxy_id in set {
                                    next.proxy_signers.remove(proxy_id);
                                }
                            }
                        }
                        worker_state.store(Arc::new(next));
                        info!(log, "signer removed from registry"; "identifier" => id.as_str());
                        let _ = reply.send(());
                    }
                    Command::AddProxy(signer, consensus_id, reply) => {
                        let mut next = (**worker_state.load()).clone();
                        let proxy_id = signer.identifier().as_str().to_string();
                        let key_type = signer.key_type();
                        next.proxy_signers.insert(proxy_id.clone(), signer);
                        next.consensus_proxies
                            .entry(consensus_id.as_str().to_string())
                            .or_default()
                            .entry(key_type)
                            .or_default()
                            .insert(proxy_id.clone());
                        worker_state.store(Arc::new(next));
                        info!(log, "proxy signer added"; "consensus" => consensus_id.as_str(), "proxy" => proxy_id);
                        let _ = reply.send(());
                    }
                    Command::RemoveProxySet(consensus_id, reply) => {
                        let mut next = (**worker_state.load()).clone();
                        if let Some(proxies) = next.consensus_proxies.remove(consensus_id.as_str())
                        {
                            for set in proxies.values() {
                                for proxy_id in set {
                                    next.proxy_signers.remove(proxy_id);
                                }
                            }
                        }
                        worker_state.store(Arc::new(next));
                        let _ = reply.send(());
                    }
                    Command::Load(supplier, keep_stale, reply) => {
                        let before = worker_state.load();
                        let old_keys: HashSet<String> = before.signers.keys().cloned().collect();

                        let results = supplier().await;

                        let mut next = if keep_stale {
                            (**before).clone()
                        } else {
                            RegistryState::default()
                        };
                        let mut new_keys = HashSet::new();
                        for signer in results.values {
                            let id = signer.identifier().as_str().to_string();
                            if new_keys.contains(&id) {
                                // Duplicate identifier across loaded
                                // files: keep the first encountered
                                // (`spec.md` §4.1).
                                warn!(log, "duplicate identifier during load, keeping first"; "identifier" => &id);
                                continue;
                            }
                            new_keys.insert(id.clone());
                            next.signers.insert(id, signer);
                        }

                        let stale: Vec<Identifier> = old_keys
                            .difference(&new_keys)
                            .map(|s| Identifier::normalise(s))
                            .collect();

                        // When `!keep_stale`, `next` already started from
                        // `RegistryState::default()` above, so it never
                        // held a stale entry to begin with — nothing left
                        // to remove here.

                        info!(log, "registry load complete";
                            "loaded" => new_keys.len(), "stale" => stale.len(), "errors" => results.error_count);

                        worker_state.store(Arc::new(next));
                        let _ = reply.send(LoadSummary {
                            loaded: new_keys.len(),
                            error_count: results.error_count,
                            stale,
                        });
                    }
                }
            }
        });

        SignerRegistry {
            commands: tx,
            state,
        }
    }

    /// Replaces the whole signer set: loads afresh, dropping any identifier
    /// not present in the new load (`spec.md` §4.1 `reload()` default).
    pub async fn load(&self, supplier: LoadSupplier) -> LoadSummary {
        self.reload(supplier, false).await
    }

    /// Reloads the signer set, keeping previously loaded signers whose
    /// identifier is absent from the new load if `keep_stale` is set
    /// (`spec.md` §4.1 `reload()` "keeps stale entries if configured").
    pub async fn reload(&self, supplier: LoadSupplier, keep_stale: bool) -> LoadSummary {
        let (reply_tx, reply_rx) = oneshot::channel();
        let _ = self
            .commands
            .send(Command::Load(supplier, keep_stale, reply_tx))
            .await;
        reply_rx
            .await
            .expect("registry worker task does not exit while a handle is live")
    }

    pub async fn add(&self, signer: Arc<dyn Signer>) {
        let (reply_tx, reply_rx) = oneshot::channel();
        let _ = self.commands.send(Command::Add(signer, reply_tx)).await;
        let _ = reply_rx.await;
    }

    pub async fn remove(&self, id: &Identifier) {
        let (reply_tx, reply_rx) = oneshot::channel();
        let _ = self
            .commands
            .send(Command::Remove(id.clone(), reply_tx))
            .await;
        let _ = reply_rx.await;
    }

    pub async fn add_proxy(&self, signer: Arc<dyn Signer>, consensus_id: &Identifier) {
        let (reply_tx, reply_rx) = oneshot::channel();
        let _ = self
            .commands
            .send(Command::AddProxy(signer, consensus_id.clone(), reply_tx))
            .await;
        let _ = reply_rx.await;
    }

    pub async fn remove_proxy_set(&self, consensus_id: &Identifier) {
        let (reply_tx, reply_rx) = oneshot::channel();
        let _ = self
            .commands
            .send(Command::RemoveProxySet(consensus_id.clone(), reply_tx))
            .await;
        let _ = reply_rx.await;
    }

    /// Lock-free read: looks up a primary (non-proxy) signer by
    /// normalised identifier.
    pub fn get(&self, id: &Identifier) -> Option<Arc<dyn Signer>> {
        self.state.load().signers.get(id.as_str()).cloned()
    }

    pub fn get_proxy(&self, proxy_id: &Identifier) -> Option<Arc<dyn Signer>> {
        self.state.load().proxy_signers.get(proxy_id.as_str()).cloned()
    }

    pub fn available(&self) -> Vec<Identifier> {
        self.state
            .load()
            .signers
            .keys()
            .map(|s| Identifier::normalise(s))
            .collect()
    }

    /// `key-type -> set of proxy ids` for a given consensus identifier
    /// (`spec.md` §4.1 `proxy_ids(consensus)`).
    pub fn proxy_ids(&self, consensus_id: &Identifier) -> HashMap<KeyType, HashSet<Identifier>> {
        self.state
            .load()
            .consensus_proxies
            .get(consensus_id.as_str())
            .map(|by_type| {
                by_type
                    .iter()
                    .map(|(k, v)| {
                        (
                            *k,
                            v.iter().map(|s| Identifier::normalise(s)).collect(),
                        )
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct DummySigner(Identifier, KeyType);

    #[async_trait]
    impl Signer for DummySigner {
        fn key_type(&self) -> KeyType {
            self.1
        }
        fn identifier(&self) -> Identifier {
            self.0.clone()
        }
    }

    #[tokio::test]
    async fn add_then_get_then_remove() {
        let registry = SignerRegistry::spawn(logging::null_logger());
        let id = Identifier::normalise("0xABCDEF");
        let signer: Arc<dyn Signer> = Arc::new(DummySigner(id.clone(), KeyType::Bls));
        registry.add(signer).await;

        assert!(registry.get(&Identifier::normalise("abcdef")).is_some());

        registry.remove(&id).await;
        assert!(registry.get(&id).is_none());
    }

    #[tokio::test]
    async fn proxy_set_is_torn_down_with_consensus_key() {
        let registry = SignerRegistry::spawn(logging::null_logger());
        let consensus = Identifier::normalise("0xC0FFEE");
        let proxy_id = Identifier::normalise("0xDEAD");
        let proxy: Arc<dyn Signer> = Arc::new(DummySigner(proxy_id.clone(), KeyType::Bls));

        registry.add_proxy(proxy, &consensus).await;
        assert!(registry.get_proxy(&proxy_id).is_some());
        assert_eq!(registry.proxy_ids(&consensus)[&KeyType::Bls].len(), 1);

        registry.remove(&consensus).await;
        assert!(registry.get_proxy(&proxy_id).is_none());
    }
}
