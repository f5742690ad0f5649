//! `GET /upcheck`, `GET /healthcheck` (`spec.md` §6, §7).

use crate::context::Context;
use serde::Serialize;
use std::convert::Infallible;

pub async fn upcheck() -> Result<impl warp::Reply, Infallible> {
    Ok(warp::reply::with_status("OK", warp::http::StatusCode::OK))
}

#[derive(Serialize)]
struct CheckData {
    error_count: usize,
    last_reload_count: usize,
}

#[derive(Serialize)]
struct Check {
    id: String,
    status: &'static str,
    data: CheckData,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    checks: Vec<Check>,
}

#[derive(Serialize)]
struct HealthcheckResponse {
    status: &'static str,
    checks: Vec<Check>,
}

/// Reports the registry's most recent load outcome as a `keys-check`
/// entry, nesting each bulk loader's own error count as a child check so
/// it lands at `checks[id=keys-check].checks[id=azure-bulk-loading].data`
/// (`spec.md` §6).
pub async fn healthcheck(ctx: Context) -> Result<impl warp::Reply, Infallible> {
    let last_load = ctx.last_load.lock().expect("load-health mutex poisoned").clone();
    let bulk_statuses = ctx.bulk_checks.lock().expect("bulk-health mutex poisoned").clone();
    let status = if last_load.error_count == 0 { "UP" } else { "DOWN" };

    let bulk_checks: Vec<Check> = bulk_statuses
        .into_iter()
        .map(|bulk| {
            let bulk_status = if bulk.error_count == 0 { "UP" } else { "DOWN" };
            Check {
                id: bulk.backend_id,
                status: bulk_status,
                data: CheckData {
                    error_count: bulk.error_count,
                    last_reload_count: bulk.loaded_count,
                },
                checks: Vec::new(),
            }
        })
        .collect();

    Ok(warp::reply::json(&HealthcheckResponse {
        status,
        checks: vec![Check {
            id: "keys-check".to_string(),
            status,
            data: CheckData {
                error_count: last_load.error_count,
                last_reload_count: last_load.loaded,
            },
            checks: bulk_checks,
        }],
    }))
}
