//! Eth1 JSON-RPC result providers: `eth_sign`, `eth_accounts`
//! (`spec.md` §4.3). A single `POST /` endpoint dispatching on `method`,
//! the way every JSON-RPC 1.0-shaped node endpoint works.

use crate::context::Context;
use crate::eth1::{decode_message, find_by_address};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use signing_method::{eth_sign_prehash, Encoding};
use std::convert::Infallible;
use types::Identifier;

const INVALID_PARAMS: i64 = -32602;
const METHOD_NOT_FOUND: i64 = -32601;
/// web3signer's convention for "known method, but the request can't be
/// serviced" (e.g. the `from` address isn't a registered signer).
const SIGNING_FROM_IS_NOT_AN_UNLOCKED_ACCOUNT: i64 = -32000;

#[derive(Debug, Deserialize)]
pub struct JsonRpcRequest {
    #[serde(default)]
    pub id: Value,
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

#[derive(Debug, Serialize)]
pub struct JsonRpcResponse {
    jsonrpc: &'static str,
    id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<JsonRpcError>,
}

#[derive(Debug, Serialize)]
struct JsonRpcError {
    code: i64,
    message: String,
}

impl JsonRpcResponse {
    fn ok(id: Value, result: Value) -> Self {
        JsonRpcResponse {
            jsonrpc: "2.0",
            id,
            result: Some(result),
            error: None,
        }
    }

    fn err(id: Value, code: i64, message: impl Into<String>) -> Self {
        JsonRpcResponse {
            jsonrpc: "2.0",
            id,
            result: None,
            error: Some(JsonRpcError {
                code,
                message: message.into(),
            }),
        }
    }
}

pub async fn handle(request: JsonRpcRequest, ctx: Context) -> Result<impl warp::Reply, Infallible> {
    let response = match request.method.as_str() {
        "eth_sign" => eth_sign(&request, &ctx).await,
        "eth_accounts" => eth_accounts(&request, &ctx),
        other => JsonRpcResponse::err(
            request.id.clone(),
            METHOD_NOT_FOUND,
            format!("method not found: {other}"),
        ),
    };
    Ok(warp::reply::json(&response))
}

async fn eth_sign(request: &JsonRpcRequest, ctx: &Context) -> JsonRpcResponse {
    let params = match request.params.as_array() {
        Some(params) if params.len() == 2 => params,
        _ => {
            return JsonRpcResponse::err(
                request.id.clone(),
                INVALID_PARAMS,
                "eth_sign expects params [address, message]",
            )
        }
    };
    let (address, message) = match (params[0].as_str(), params[1].as_str()) {
        (Some(address), Some(message)) => (address, message),
        _ => {
            return JsonRpcResponse::err(
                request.id.clone(),
                INVALID_PARAMS,
                "eth_sign params must both be strings",
            )
        }
    };
    let message_bytes = match decode_message(message) {
        Ok(bytes) => bytes,
        Err(e) => return JsonRpcResponse::err(request.id.clone(), INVALID_PARAMS, e),
    };

    let identifier = Identifier::normalise(address);
    let signer = match find_by_address(ctx, &identifier) {
        Some(signer) => signer,
        None => {
            return JsonRpcResponse::err(
                request.id.clone(),
                SIGNING_FROM_IS_NOT_AN_UNLOCKED_ACCOUNT,
                format!("{address} is not an unlocked account"),
            )
        }
    };

    let digest = eth_sign_prehash(&message_bytes);
    match signer
        .sign_secp256k1(&digest, Encoding::EthSign { chain_id: ctx.chain_id })
        .await
    {
        Ok(signature) => {
            JsonRpcResponse::ok(request.id.clone(), Value::String(signature.to_0x_hex()))
        }
        Err(e) => JsonRpcResponse::err(request.id.clone(), INVALID_PARAMS, e.to_string()),
    }
}

fn eth_accounts(request: &JsonRpcRequest, ctx: &Context) -> JsonRpcResponse {
    let params_ok = match &request.params {
        Value::Null => true,
        Value::Array(items) => items.is_empty(),
        _ => false,
    };
    if !params_ok {
        return JsonRpcResponse::err(
            request.id.clone(),
            INVALID_PARAMS,
            "eth_accounts takes no parameters",
        );
    }

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

    JsonRpcResponse::ok(
        request.id.clone(),
        Value::Array(addresses.into_iter().map(Value::String).collect()),
    )
}
