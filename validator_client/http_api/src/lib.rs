//! The HTTP/JSON-RPC surface (`spec.md` §6): route plumbing and request
//! parsing around the sign dispatcher, the registry, and the
//! slashing-protection store. Route wiring and the web framework itself
//! are explicitly out of this system's core scope (`spec.md` §1); this
//! crate is the thin translation layer between `warp` and the
//! `validator_manager`/`commit_boost`/`slashing_protection` engine.

mod commit_boost_routes;
pub mod context;
mod dispatch;
mod eth1;
mod eth2;
pub mod error;
mod health;
mod jsonrpc;
mod keymanager;
mod reload;

pub use context::{Context, LoadHealth, ReloadFactory};

use context::with_context;
use warp::Filter;

fn json_body<T: serde::de::DeserializeOwned + Send>(
) -> impl Filter<Extract = (T,), Error = warp::Rejection> + Clone {
    warp::body::content_length_limit(1024 * 1024).and(warp::body::json())
}

/// Builds the full route tree, wrapped in the shared rejection-recovery
/// filter (`SPEC_FULL.md` §7). The per-request wall-clock timeout
/// (`spec.md` §5) is applied by the binary crate around the `hyper`
/// service this filter compiles down to, not here.
pub fn routes(
    ctx: Context,
) -> impl Filter<Extract = (impl warp::Reply,), Error = std::convert::Infallible> + Clone {
    let ctx_filter = with_context(ctx);

    let eth2_sign = warp::path!("api" / "v1" / "eth2" / "sign" / String)
        .and(warp::post())
        .and(json_body())
        .and(ctx_filter.clone())
        .and_then(eth2::sign);

    let eth2_public_keys = warp::path!("api" / "v1" / "eth2" / "publicKeys")
        .and(warp::get())
        .and(ctx_filter.clone())
        .and_then(eth2::public_keys);

    let eth1_sign = warp::path!("api" / "v1" / "eth1" / "sign" / String)
        .and(warp::post())
        .and(json_body())
        .and(ctx_filter.clone())
        .and_then(eth1::sign);

    let eth1_public_keys = warp::path!("api" / "v1" / "eth1" / "publicKeys")
        .and(warp::get())
        .and(ctx_filter.clone())
        .and_then(eth1::public_keys);

    let jsonrpc = warp::path::end()
        .and(warp::post())
        .and(json_body())
        .and(ctx_filter.clone())
        .and_then(jsonrpc::handle);

    let reload = warp::path("reload")
        .and(warp::post())
        .and(ctx_filter.clone())
        .and_then(reload::reload);

    let upcheck = warp::path("upcheck")
        .and(warp::get())
        .and_then(health::upcheck);

    let healthcheck = warp::path("healthcheck")
        .and(warp::get())
        .and(ctx_filter.clone())
        .and_then(health::healthcheck);

    let keystores_list = warp::path!("eth" / "v1" / "keystores")
        .and(warp::get())
        .and(ctx_filter.clone())
        .and_then(keymanager::list);
    let keystores_import = warp::path!("eth" / "v1" / "keystores")
        .and(warp::post())
        .and(json_body())
        .and(ctx_filter.clone())
        .and_then(keymanager::import);
    let keystores_delete = warp::path!("eth" / "v1" / "keystores")
        .and(warp::delete())
        .and(json_body())
        .and(ctx_filter.clone())
        .and_then(keymanager::delete);
    let remotekeys_list = warp::path!("eth" / "v1" / "remotekeys")
        .and(warp::get())
        .and(ctx_filter.clone())
        .and_then(keymanager::list);

    let request_signature = warp::path!("signer" / "v1" / "request_signature")
        .and(warp::post())
        .and(json_body())
        .and(ctx_filter.clone())
        .and_then(commit_boost_routes::request_signature);
    let generate_proxy_key = warp::path!("signer" / "v1" / "generate_proxy_key")
        .and(warp::post())
        .and(json_body())
        .and(ctx_filter)
        .and_then(commit_boost_routes::generate_proxy_key);

    eth2_sign
        .or(eth2_public_keys)
        .or(eth1_sign)
        .or(eth1_public_keys)
        .or(reload)
        .or(upcheck)
        .or(healthcheck)
        .or(keystores_list)
        .or(keystores_import)
        .or(keystores_delete)
        .or(remotekeys_list)
        .or(request_signature)
        .or(generate_proxy_key)
        .or(jsonrpc)
        .recover(error::recover)
        .with(warp::log("http_api"))
}
