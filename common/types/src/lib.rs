//! Primitive types shared by every crate in the signing service.
//!
//! These mirror the handful of Ethereum consensus primitives a remote signer
//! actually needs (slots, epochs, domains, hashes) without pulling in a full
//! beacon-state type system — this service never processes blocks, it only
//! signs over their roots.

mod epoch;
mod fork;
mod hash256;
mod identifier;
mod slot;

pub use epoch::Epoch;
pub use fork::{ForkVersion, GenesisValidatorsRoot};
pub use hash256::Hash256;
pub use identifier::{Identifier, KeyType};
pub use slot::Slot;

/// Domain separator used when mixing a fork version and genesis validators
/// root into a signing root (`compute_domain` in the consensus spec).
pub type Domain = [u8; 32];

/// `DomainType` values relevant to this service. Only the ones a signer
/// actually needs to compute are listed; the full consensus spec has more.
pub mod domain_type {
    pub const BEACON_PROPOSER: [u8; 4] = [0x00, 0x00, 0x00, 0x00];
    pub const BEACON_ATTESTER: [u8; 4] = [0x01, 0x00, 0x00, 0x00];
    pub const RANDAO: [u8; 4] = [0x02, 0x00, 0x00, 0x00];
    pub const VOLUNTARY_EXIT: [u8; 4] = [0x04, 0x00, 0x00, 0x00];
    pub const SYNC_COMMITTEE: [u8; 4] = [0x07, 0x00, 0x00, 0x00];
    pub const APPLICATION_MASK: [u8; 4] = [0x00, 0x00, 0x00, 0x01];
    /// Commit-Boost proxy delegation domain mask, `"mmoC"` little-endian.
    pub const COMMIT_BOOST_PROXY: [u8; 4] = [0x6d, 0x6d, 0x6f, 0x43];
}

/// `compute_domain(domain_type, fork_version, genesis_validators_root)`.
///
/// Mirrors the consensus-spec helper of the same name: the low 4 bytes are
/// the domain type, the high 28 bytes are the first 28 bytes of
/// `sha256(fork_version ++ genesis_validators_root)`.
pub fn compute_domain(
    domain_type: [u8; 4],
    fork_version: ForkVersion,
    genesis_validators_root: GenesisValidatorsRoot,
) -> Domain {
    use sha2::{Digest, Sha256};

    let mut hasher = Sha256::new();
    hasher.update(fork_version.0);
    hasher.update(genesis_validators_root.0);
    let fork_data_root = hasher.finalize();

    let mut domain = [0u8; 32];
    domain[0..4].copy_from_slice(&domain_type);
    domain[4..32].copy_from_slice(&fork_data_root[0..28]);
    domain
}

/// `compute_signing_root(object_root, domain) = hash_tree_root(SigningData {
/// object_root, domain })`. `SigningData` is a two-field SSZ container, so
/// its root is just `sha256(object_root ++ domain)` — the same
/// construction every consensus-spec signing root (blocks, attestations,
/// Commit-Boost delegations) shares; callers only ever differ in how they
/// produced `object_root`.
pub fn compute_signing_root(object_root: Hash256, domain: Domain) -> Hash256 {
    use sha2::{Digest, Sha256};

    let mut hasher = Sha256::new();
    hasher.update(object_root.0);
    hasher.update(domain);
    let mut out = [0u8; 32];
    out.copy_from_slice(&hasher.finalize());
    Hash256(out)
}
