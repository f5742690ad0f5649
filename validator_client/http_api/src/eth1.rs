//! `POST /api/v1/eth1/sign/{identifier}` and `GET
//! /api/v1/eth1/publicKeys` (`spec.md` §6).

use crate::context::Context;
use crate::error::{reject, Error};
use serde::Deserialize;
use signing_method::{eth_sign_prehash, Encoding};
use std::convert::Infallible;
use types::Identifier;

#[derive(Debug, Deserialize)]
pub struct Eth1SignRequest {
    pub data: String,
}

/// Looks a signer up by Ethereum address rather than by its registry
/// identifier (the raw public key) — the two differ for secp256k1 keys
/// (`spec.md` §4.3).
pub(crate) fn find_by_address(
    ctx: &Context,
    address: &Identifier,
) -> Option<std::sync::Arc<dyn signing_method::Signer>> {
    ctx.registry.available().into_iter().find_map(|id| {
        let signer = ctx.registry.get(&id)?;
        if signer.ethereum_address().as_ref() == Some(address) {
            Some(signer)
        } else {
            None
        }
    })
}

pub async fn sign(
    identifier: String,
    body: Eth1SignRequest,
    ctx: Context,
) -> Result<impl warp::Reply, warp::Rejection> {
    let address = Identifier::normalise(&identifier);
    let message = decode_message(&body.data).map_err(|e| reject(Error::BadRequest(e)))?;

    let signer = find_by_address(&ctx, &address).ok_or(Error::NotFound).map_err(reject)?;
    let digest = eth_sign_prehash(&message);
    let signature = signer
        .sign_secp256k1(&digest, Encoding::EthSign { chain_id: ctx.chain_id })
        .await
        .map_err(|e| reject(Error::from(e)))?;

    Ok(warp::reply::with_header(
        signature.to_0x_hex(),
        "content-type",
        "text/plain",
    ))
}

/// `data` must be `0x`-hex or plain UTF-8 (`spec.md` §4.3).
pub(crate) fn decode_message(data: &str) -> Result<Vec<u8>, String> {
    if let Some(stripped) = data.strip_prefix("0x").or_else(|| data.strip_prefix("0X")) {
        hex::decode(stripped).map_err(|e| format!("invalid hex message: {e}"))
    } else {
        Ok(data.as_bytes().to_vec())
    }
}

pub async fn public_keys(ctx: Context) -> Result<impl warp::Reply, Infallible> {
    let mut addresses: Vec<String> = ctx
        .registry
        .available()
        .into_iter()
        .filter_map(|id| ctx.registry.get(&id))
        .filter_map(|signer| signer.ethereum_address())
        .map(|addr| addr.as_str().to_string())
        .collect();
    addresses.sort();
    addresses.dedup();
    Ok(warp::reply::json(&addresses))
}
