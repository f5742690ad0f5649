//! Commit-Boost endpoints: `POST /signer/v1/request_signature`,
//! `POST /signer/v1/generate_proxy_key` (`spec.md` §4.4, §6).

use crate::context::Context;
use crate::dispatch::dispatch_commit_boost_sign;
use crate::error::{reject, Error};
use commit_boost::generate_proxy;
use serde::{Deserialize, Serialize};
use types::{Hash256, Identifier, KeyType};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProxyScheme {
    Bls,
    Ecdsa,
}

impl From<ProxyScheme> for KeyType {
    fn from(scheme: ProxyScheme) -> Self {
        match scheme {
            ProxyScheme::Bls => KeyType::Bls,
            ProxyScheme::Ecdsa => KeyType::Secp256k1,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct GenerateProxyKeyRequest {
    pub consensus_pubkey: String,
    pub scheme: ProxyScheme,
}

#[derive(Serialize)]
struct ProxyMessageBody {
    delegator: String,
    proxy: String,
}

#[derive(Serialize)]
struct GenerateProxyKeyResponse {
    message: ProxyMessageBody,
    signature: String,
}

pub async fn generate_proxy_key(
    request: GenerateProxyKeyRequest,
    ctx: Context,
) -> Result<impl warp::Reply, warp::Rejection> {
    if !ctx.commit_boost_api_enabled {
        return Err(reject(Error::NotFound));
    }
    let proxy_root = ctx
        .proxy_root
        .as_deref()
        .ok_or_else(|| reject(Error::BadRequest("commit-boost proxy root not configured".into())))?;
    let proxy_password_path = ctx.proxy_password_path.as_deref().ok_or_else(|| {
        reject(Error::BadRequest(
            "commit-boost proxy password file not configured".into(),
        ))
    })?;

    let consensus_id = Identifier::normalise(&request.consensus_pubkey);
    let result = generate_proxy(
        &ctx.registry,
        &consensus_id,
        request.scheme.into(),
        proxy_root,
        proxy_password_path,
        ctx.fork_version,
        ctx.genesis_validators_root,
        &ctx.log,
    )
    .await
    .map_err(reject)?;

    Ok(warp::reply::json(&GenerateProxyKeyResponse {
        message: ProxyMessageBody {
            delegator: format!("0x{}", hex::encode(&result.message.delegator)),
            proxy: format!("0x{}", hex::encode(&result.message.proxy)),
        },
        signature: result.signature_hex,
    }))
}

#[derive(Debug, Deserialize)]
pub struct RequestSignatureRequest {
    pub pubkey: String,
    /// The pre-computed signing root for this artifact (`spec.md` §4.4 —
    /// the Commit-Boost client builds the message and domain; this
    /// service only needs the final root and the identity to sign with).
    pub object_root: Hash256,
}

#[derive(Serialize)]
struct RequestSignatureResponse {
    signature: String,
}

pub async fn request_signature(
    request: RequestSignatureRequest,
    ctx: Context,
) -> Result<impl warp::Reply, warp::Rejection> {
    if !ctx.commit_boost_api_enabled {
        return Err(reject(Error::NotFound));
    }
    let identifier = Identifier::normalise(&request.pubkey);
    let signature = dispatch_commit_boost_sign(&ctx, &identifier, request.object_root)
        .await
        .map_err(reject)?;

    Ok(warp::reply::json(&RequestSignatureResponse {
        signature: signature.to_0x_hex(),
    }))
}
