//! The Ethereum key-manager API, `/eth/v1/keystores` and
//! `/eth/v1/remotekeys` (`spec.md` §6, §4.8).

use crate::context::Context;
use crate::error::{reject, Error};
use eth2_keystore::Keystore;
use serde::{Deserialize, Serialize};
use types::{Identifier, KeyType};
use validator_manager::{add_validator, delete_validator, AddValidatorRequest, DeleteStatus};

#[derive(Serialize)]
struct ListedKeystore {
    validating_pubkey: String,
    derivation_path: String,
    readonly: bool,
}

#[derive(Serialize)]
struct ListKeystoresResponse {
    data: Vec<ListedKeystore>,
}

pub async fn list(ctx: Context) -> Result<impl warp::Reply, warp::Rejection> {
    if !ctx.key_manager_api_enabled {
        return Err(reject(Error::NotFound));
    }
    let mut data: Vec<ListedKeystore> = ctx
        .registry
        .available()
        .into_iter()
        .map(|id| ListedKeystore {
            validating_pubkey: id.as_str().to_string(),
            derivation_path: String::new(),
            readonly: false,
        })
        .collect();
    data.sort_by(|a, b| a.validating_pubkey.cmp(&b.validating_pubkey));
    Ok(warp::reply::json(&ListKeystoresResponse { data }))
}

#[derive(Deserialize)]
pub struct ImportRequest {
    keystores: Vec<String>,
    passwords: Vec<String>,
}

#[derive(Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
enum ImportStatus {
    Imported,
    Duplicate,
    Error,
}

#[derive(Serialize)]
struct ImportResultItem {
    status: ImportStatus,
    message: String,
}

#[derive(Serialize)]
struct ImportResponse {
    data: Vec<ImportResultItem>,
}

pub async fn import(
    request: ImportRequest,
    ctx: Context,
) -> Result<impl warp::Reply, warp::Rejection> {
    if !ctx.key_manager_api_enabled {
        return Err(reject(Error::NotFound));
    }
    if request.keystores.len() != request.passwords.len() {
        return Err(reject(Error::BadRequest(
            "keystores and passwords must have the same length".into(),
        )));
    }

    let mut data = Vec::with_capacity(request.keystores.len());
    for (keystore_json, password) in request.keystores.iter().zip(request.passwords.iter()) {
        let item = import_one(&ctx, keystore_json, password).await;
        data.push(item);
    }

    Ok(warp::reply::json(&ImportResponse { data }))
}

async fn import_one(ctx: &Context, keystore_json: &str, password: &str) -> ImportResultItem {
    let keystore: Keystore = match Keystore::from_json_str(keystore_json) {
        Ok(keystore) => keystore,
        Err(e) => {
            return ImportResultItem {
                status: ImportStatus::Error,
                message: e.to_string(),
            }
        }
    };

    if let Some(pubkey) = keystore.public_key_hex() {
        if ctx.registry.get(&Identifier::normalise(pubkey)).is_some() {
            return ImportResultItem {
                status: ImportStatus::Duplicate,
                message: "validator already loaded".to_string(),
            };
        }
    }

    let outcome = add_validator(
        &ctx.registry,
        &ctx.slashing_db,
        AddValidatorRequest {
            keystore,
            password: password.as_bytes().to_vec(),
            key_type: KeyType::Bls,
            key_store_path: ctx.key_store_path.clone(),
        },
        &ctx.log,
    )
    .await;

    match outcome {
        Ok(_) => ImportResultItem {
            status: ImportStatus::Imported,
            message: String::new(),
        },
        Err(e) => ImportResultItem {
            status: ImportStatus::Error,
            message: e.to_string(),
        },
    }
}

#[derive(Deserialize)]
pub struct DeleteRequest {
    pubkeys: Vec<String>,
}

#[derive(Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
enum DeleteStatusBody {
    Deleted,
    NotActive,
    NotFound,
    Error,
}

impl From<&DeleteStatus> for DeleteStatusBody {
    fn from(status: &DeleteStatus) -> Self {
        match status {
            DeleteStatus::Deleted => DeleteStatusBody::Deleted,
            DeleteStatus::NotActive => DeleteStatusBody::NotActive,
            DeleteStatus::NotFound => DeleteStatusBody::NotFound,
            DeleteStatus::Error(_) => DeleteStatusBody::Error,
        }
    }
}

#[derive(Serialize)]
struct DeleteResultItem {
    status: DeleteStatusBody,
    message: String,
}

#[derive(Serialize)]
struct DeleteResponse {
    data: Vec<DeleteResultItem>,
    /// The streamed EIP-3076 interchange document covering every
    /// successfully deleted key in this call (`spec.md` §6).
    slashing_protection: String,
}

pub async fn delete(
    request: DeleteRequest,
    ctx: Context,
) -> Result<impl warp::Reply, warp::Rejection> {
    if !ctx.key_manager_api_enabled {
        return Err(reject(Error::NotFound));
    }
    let mut data = Vec::with_capacity(request.pubkeys.len());
    let mut deleted_keys = Vec::new();

    for pubkey in &request.pubkeys {
        let identifier = Identifier::normalise(pubkey);
        let files =
            validator_dir::KeystoreFiles::conventional(&ctx.key_store_path, identifier.as_str());
        let outcome =
            delete_validator(&ctx.registry, &ctx.slashing_db, &files, &identifier, &ctx.log).await;

        let message = match &outcome.status {
            DeleteStatus::Error(msg) => msg.clone(),
            _ => String::new(),
        };
        data.push(DeleteResultItem {
            status: (&outcome.status).into(),
            message,
        });
        if outcome.status == DeleteStatus::Deleted {
            deleted_keys.push(pubkey.clone());
        }
    }

    let mut buf = Vec::new();
    let slashing_protection = if deleted_keys.is_empty() {
        String::new()
    } else {
        match ctx.slashing_db.export_interchange_for(&deleted_keys, &mut buf) {
            Ok(_) => String::from_utf8(buf).unwrap_or_default(),
            Err(_) => String::new(),
        }
    };

    Ok(warp::reply::json(&DeleteResponse {
        data,
        slashing_protection,
    }))
}
