//! `POST /reload` (`spec.md` §6): re-triggers the registry's load
//! algorithm against the sources the process was configured with.

use crate::context::Context;
use serde::Serialize;
use std::convert::Infallible;

#[derive(Serialize)]
struct ReloadResponse {
    loaded: usize,
    errors: usize,
    stale: usize,
}

pub async fn reload(ctx: Context) -> Result<impl warp::Reply, Infallible> {
    let supplier = (ctx.reload_factory)();
    let summary = ctx.registry.load(supplier).await;
    ctx.record_load(&summary);

    Ok(warp::reply::json(&ReloadResponse {
        loaded: summary.loaded,
        errors: summary.error_count,
        stale: summary.stale.len(),
    }))
}
