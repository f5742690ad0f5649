//! Binds and serves the HTTP API, wrapping the compiled `warp` filter in a
//! per-request wall-clock timeout (`SPEC_FULL.md` §5, §7: "applied by the
//! binary crate around the hyper service this filter compiles down to, not
//! here") using `tower`'s `TimeoutLayer`, the same layering idiom
//! `tower-http` gateways reach for around an otherwise framework-agnostic
//! service.

use crate::error::Error;
use http_api::Context;
use slog::{info, Logger};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::time::Duration;
use tower::ServiceBuilder;

/// Serves `http_api::routes(ctx)` on `addr` until the process is killed.
/// Every request that doesn't complete within `timeout` gets a `504`
/// (`tower::timeout`'s default error response), independent of whatever
/// the route handler itself was doing.
pub async fn serve(
    ctx: Context,
    addr: SocketAddr,
    timeout: Duration,
    log: Logger,
) -> Result<(), Error> {
    let routes = http_api::routes(ctx);
    let warp_service = warp::service(routes);

    let service = ServiceBuilder::new()
        .timeout(timeout)
        .service(warp_service);

    let make_service = hyper::service::make_service_fn(move |_conn| {
        let service = service.clone();
        async move { Ok::<_, Infallible>(service.clone()) }
    });

    info!(log, "signing service listening"; "address" => %addr, "request_timeout_secs" => timeout.as_secs());

    hyper::Server::bind(&addr)
        .serve(make_service)
        .await
        .map_err(|e| Error::Server(e.to_string()))
}
