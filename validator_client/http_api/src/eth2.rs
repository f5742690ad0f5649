//! `POST /api/v1/eth2/sign/{identifier}` and `GET
//! /api/v1/eth2/publicKeys` (`spec.md` §6).

use crate::context::Context;
use crate::dispatch::{dispatch_eth2_sign, Eth2SignDomain};
use crate::error::{reject, Error};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use types::{domain_type, Epoch, ForkVersion, Hash256, Identifier, Slot};

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Eth2SignType {
    Block,
    BlockV2,
    Attestation,
    /// Every message type without a dedicated slashing rule: aggregate and
    /// proofs, randao reveals, voluntary exits, sync-committee artifacts,
    /// validator registrations.
    #[serde(other)]
    Unprotected,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForkInfo {
    pub fork: Fork,
    pub genesis_validators_root: Hash256,
}

#[derive(Debug, Deserialize)]
pub struct Fork {
    pub current_version: String,
}

#[derive(Debug, Deserialize)]
pub struct BlockFields {
    #[serde(deserialize_with = "deserialize_u64_string")]
    pub slot: u64,
}

#[derive(Debug, Deserialize)]
pub struct AttestationFields {
    pub source: Checkpoint,
    pub target: Checkpoint,
}

#[derive(Debug, Deserialize)]
pub struct Checkpoint {
    #[serde(deserialize_with = "deserialize_u64_string")]
    pub epoch: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Eth2SignRequest {
    #[serde(rename = "type")]
    pub type_: Eth2SignType,
    pub fork_info: ForkInfo,
    /// The `hash_tree_root` of the SSZ message being signed, supplied by
    /// the caller — this service mixes it with the domain to produce the
    /// final signing root rather than re-deriving it from a full beacon
    /// block/attestation type system (out of this service's scope; see
    /// `spec.md` §1 Non-goals).
    pub signing_root: Hash256,
    pub block: Option<BlockFields>,
    pub attestation: Option<AttestationFields>,
}

fn deserialize_u64_string<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrU64 {
        String(String),
        U64(u64),
    }
    match StringOrU64::deserialize(deserializer)? {
        StringOrU64::String(s) => s.parse().map_err(serde::de::Error::custom),
        StringOrU64::U64(n) => Ok(n),
    }
}

#[derive(Serialize)]
struct SignResponse {
    signature: String,
}

pub async fn sign(
    identifier: String,
    body: Eth2SignRequest,
    ctx: Context,
) -> Result<impl warp::Reply, warp::Rejection> {
    let identifier = Identifier::normalise(&identifier);

    if body.fork_info.genesis_validators_root != ctx.genesis_validators_root {
        return Err(reject(Error::BadRequest(
            "genesis_validators_root does not match this service's configured network".into(),
        )));
    }
    let fork_version = ForkVersion::from_hex(&body.fork_info.fork.current_version)
        .map_err(|e| reject(Error::BadRequest(e.to_string())))?;

    let domain = match body.type_ {
        Eth2SignType::Block | Eth2SignType::BlockV2 => {
            let slot = body
                .block
                .ok_or_else(|| reject(Error::BadRequest("missing \"block\" field".into())))?
                .slot;
            Eth2SignDomain::Block { slot: Slot(slot) }
        }
        Eth2SignType::Attestation => {
            let attestation = body.attestation.ok_or_else(|| {
                reject(Error::BadRequest("missing \"attestation\" field".into()))
            })?;
            Eth2SignDomain::Attestation {
                source_epoch: Epoch(attestation.source.epoch),
                target_epoch: Epoch(attestation.target.epoch),
            }
        }
        Eth2SignType::Unprotected => Eth2SignDomain::Unprotected {
            domain_type: domain_type::APPLICATION_MASK,
        },
    };

    let signature = dispatch_eth2_sign(&ctx, &identifier, body.signing_root, fork_version, domain)
        .await
        .map_err(reject)?;

    Ok(warp::reply::json(&SignResponse {
        signature: signature.to_0x_hex(),
    }))
}

pub async fn public_keys(ctx: Context) -> Result<impl warp::Reply, Infallible> {
    let mut keys: Vec<String> = ctx
        .registry
        .available()
        .into_iter()
        .map(|id| id.as_str().to_string())
        .collect();
    keys.sort();
    Ok(warp::reply::json(&keys))
}
