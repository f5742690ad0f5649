//! SSZ-ish hashing for the Commit-Boost proxy delegation message
//! (`spec.md` §4.4, `SPEC_FULL.md` §4.4.A).
//!
//! This is the same `hash_tree_root`/`compute_signing_root` construction
//! used throughout the consensus spec for blocks and attestations,
//! specialised to the two-field `ProxyKeyMessage` container so this crate
//! does not need a general SSZ library for a single fixed-shape message.

use sha2::{Digest, Sha256};
use types::{Domain, Hash256};

/// `delegator` is always a 48-byte BLS consensus public key; `proxy` is the
/// freshly generated proxy public key, 48 bytes for a BLS proxy or 33 bytes
/// (compressed) for a secp256k1/K256 proxy.
#[derive(Debug, Clone)]
pub struct ProxyKeyMessage {
    pub delegator: Vec<u8>,
    pub proxy: Vec<u8>,
}

/// `hash_tree_root` of a fixed-length byte vector: chunk into 32-byte
/// leaves (zero-padding the final chunk), pad the leaf count up to the
/// next power of two with zero chunks, then merkleize pairwise with
/// sha256. For the  <=32-byte case (every key type this service proxies)
/// this degenerates to "zero-pad to 32 bytes".
fn hash_tree_root_bytes(bytes: &[u8]) -> [u8; 32] {
    if bytes.len() <= 32 {
        let mut leaf = [0u8; 32];
        leaf[..bytes.len()].copy_from_slice(bytes);
        return leaf;
    }

    let mut leaves: Vec<[u8; 32]> = bytes
        .chunks(32)
        .map(|chunk| {
            let mut leaf = [0u8; 32];
            leaf[..chunk.len()].copy_from_slice(chunk);
            leaf
        })
        .collect();

    let padded_len = leaves.len().next_power_of_two();
    leaves.resize(padded_len, [0u8; 32]);
    merkleize(&leaves)
}

fn merkleize(leaves: &[[u8; 32]]) -> [u8; 32] {
    if leaves.len() == 1 {
        return leaves[0];
    }
    let mut level = leaves.to_vec();
    while level.len() > 1 {
        level = level
            .chunks(2)
            .map(|pair| hash_pair(&pair[0], &pair[1]))
            .collect();
    }
    level[0]
}

fn hash_pair(a: &[u8; 32], b: &[u8; 32]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(a);
    hasher.update(b);
    hasher.finalize().into()
}

impl ProxyKeyMessage {
    /// `hash_tree_root` of the two-field container: the merkleization of
    /// the two fields' individual roots (a container with N fields
    /// merkleizes its field roots the same way a vector of N chunks does).
    pub fn hash_tree_root(&self) -> [u8; 32] {
        let delegator_root = hash_tree_root_bytes(&self.delegator);
        let proxy_root = hash_tree_root_bytes(&self.proxy);
        hash_pair(&delegator_root, &proxy_root)
    }
}

/// `compute_signing_root(message, domain) = hash_tree_root(SigningData {
/// object_root: hash_tree_root(message), domain })` — the standard
/// consensus-spec construction, generalised here to `ProxyKeyMessage`
/// (`SPEC_FULL.md` §4.4.A). Shares `types::compute_signing_root` with every
/// other signing root this service builds.
pub fn signing_root(message: &ProxyKeyMessage, domain: Domain) -> [u8; 32] {
    let object_root = Hash256(message.hash_tree_root());
    types::compute_signing_root(object_root, domain).0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signing_root_is_deterministic_and_domain_sensitive() {
        let message = ProxyKeyMessage {
            delegator: vec![1u8; 48],
            proxy: vec![2u8; 48],
        };
        let root_a = signing_root(&message, [0u8; 32]);
        let root_b = signing_root(&message, [0u8; 32]);
        assert_eq!(root_a, root_b);

        let root_c = signing_root(&message, [1u8; 32]);
        assert_ne!(root_a, root_c);
    }

    #[test]
    fn different_proxy_changes_root() {
        let base = ProxyKeyMessage {
            delegator: vec![1u8; 48],
            proxy: vec![2u8; 48],
        };
        let other = ProxyKeyMessage {
            delegator: vec![1u8; 48],
            proxy: vec![3u8; 48],
        };
        assert_ne!(
            signing_root(&base, [0u8; 32]),
            signing_root(&other, [0u8; 32])
        );
    }
}
