use crate::shared::ingest::Pipeline;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::{convert::Infallible, net::SocketAddr};
use utoipa::IntoParams;
use warp::{self, http::Method, Filter};

/// Optional window size for list routes.
/// Ex: /api/sensors/history?limit=48
#[derive(Debug, Default, Serialize, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct WindowQuery {
    pub limit: Option<usize>,
}

pub fn with_pipeline(
    pipeline: Pipeline,
) -> impl Filter<Extract = (Pipeline,), Error = Infallible> + Clone {
    warp::any().map(move || pipeline.clone())
}

/// Resolves `?limit=` against the route's default window.
pub fn with_window(
    default: usize,
) -> impl Filter<Extract = (usize,), Error = warp::Rejection> + Clone {
    warp::query::<WindowQuery>().map(move |query: WindowQuery| query.limit.unwrap_or(default))
}

/// Network address of the caller, used when a device omits its id.
pub fn with_sender() -> impl Filter<Extract = (String,), Error = Infallible> + Clone {
    warp::addr::remote().map(|addr: Option<SocketAddr>| {
        addr.map(|addr| addr.ip().to_string())
            .unwrap_or_else(|| "unknown".to_string())
    })
}

/// Raw request body. Not decoded as JSON here: free-text dumps are accepted too.
pub fn with_raw_body(
    limit: u64,
) -> impl Filter<Extract = (Bytes,), Error = warp::Rejection> + Clone {
    warp::body::content_length_limit(limit).and(warp::body::bytes())
}

pub fn with_cors(origin: Option<&str>) -> warp::filters::cors::Builder {
    let cors = warp::cors()
        .allow_headers(vec!["Content-Type"])
        .allow_methods(vec![Method::GET, Method::POST]);

    match origin {
        Some(origin) => cors.allow_origin(origin),
        None => cors.allow_any_origin(),
    }
}
