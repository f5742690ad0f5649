//! The sign dispatcher (`spec.md` §4.2): identifier normalisation,
//! registry lookup, slashing check (consensus only), signing root
//! computation, signature encoding. Every HTTP/JSON-RPC sign handler
//! funnels through here.

use crate::context::Context;
use crate::error::Error;
use signing_method::ArtifactSignature;
use slashing_protection::{AttestationRequest, BlockRequest, SigningResult};
use types::{domain_type, Epoch, ForkVersion, Hash256, Identifier, Slot};

/// The domain-specific part of an eth2 sign request: which slashing rule
/// (if any) applies, and which `DomainType` mixes into the signing root.
#[derive(Debug, Clone)]
pub enum Eth2SignDomain {
    Block { slot: Slot },
    Attestation { source_epoch: Epoch, target_epoch: Epoch },
    /// Every other eth2 message type (randao reveal, voluntary exit,
    /// sync-committee artifacts, validator registrations, ...): no
    /// slashing-protection rule applies to them.
    Unprotected { domain_type: [u8; 4] },
}

impl Eth2SignDomain {
    fn domain_type(&self) -> [u8; 4] {
        match self {
            Eth2SignDomain::Block { .. } => domain_type::BEACON_PROPOSER,
            Eth2SignDomain::Attestation { .. } => domain_type::BEACON_ATTESTER,
            Eth2SignDomain::Unprotected { domain_type } => *domain_type,
        }
    }
}

/// Runs the §4.2 dispatcher for a consensus (BLS) sign: looks the
/// identifier up in the registry (primary signers only — proxies are
/// reached through the Commit-Boost endpoint, not this one), applies the
/// slashing rule matching `domain`, then invokes the signer.
pub async fn dispatch_eth2_sign(
    ctx: &Context,
    identifier: &Identifier,
    object_root: Hash256,
    fork_version: ForkVersion,
    domain: Eth2SignDomain,
) -> Result<ArtifactSignature, Error> {
    let signer = ctx.registry.get(identifier).ok_or(Error::NotFound)?;

    let domain_bytes = types::compute_domain(
        domain.domain_type(),
        fork_version,
        ctx.genesis_validators_root,
    );
    let signing_root = types::compute_signing_root(object_root, domain_bytes);

    match domain {
        Eth2SignDomain::Block { slot } => {
            let result = ctx.slashing_db.check_and_sign_block(
                &BlockRequest {
                    public_key: identifier.as_str().to_string(),
                    slot,
                    signing_root,
                },
                ctx.genesis_validators_root,
            )?;
            reject_if_denied(result)?;
        }
        Eth2SignDomain::Attestation {
            source_epoch,
            target_epoch,
        } => {
            let result = ctx.slashing_db.check_and_sign_attestation(
                &AttestationRequest {
                    public_key: identifier.as_str().to_string(),
                    source_epoch,
                    target_epoch,
                    signing_root,
                },
                ctx.genesis_validators_root,
            )?;
            reject_if_denied(result)?;
        }
        Eth2SignDomain::Unprotected { .. } => {}
    }

    signer
        .sign_bls(signing_root.as_bytes())
        .await
        .map_err(Error::from)
}

/// Dispatches a Commit-Boost `request_signature`: the identifier may be
/// either a consensus key or a previously issued proxy, per
/// `spec.md` §4.4/§4.8's "sign with proxy id succeeds". No slashing rule
/// applies to a Commit-Boost artifact.
pub async fn dispatch_commit_boost_sign(
    ctx: &Context,
    identifier: &Identifier,
    signing_root: Hash256,
) -> Result<ArtifactSignature, Error> {
    let signer = ctx
        .registry
        .get(identifier)
        .or_else(|| ctx.registry.get_proxy(identifier))
        .ok_or(Error::NotFound)?;

    match signer.key_type() {
        types::KeyType::Bls => signer
            .sign_bls(signing_root.as_bytes())
            .await
            .map_err(Error::from),
        types::KeyType::Secp256k1 => signer
            .sign_secp256k1(signing_root.as_bytes(), signing_method::Encoding::K256Compact)
            .await
            .map_err(Error::from),
    }
}

fn reject_if_denied(result: SigningResult) -> Result<(), Error> {
    match result {
        SigningResult::Accept => Ok(()),
        SigningResult::Reject(reason) => Err(Error::SlashingRejected(reason)),
    }
}
