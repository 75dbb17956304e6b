use crate::{
    modules::api::{
        filters::{with_pipeline, with_raw_body, with_sender, with_window},
        handlers::{
            health_handler, history_handler, ingest_handler, latest_handler, recent_handler,
            status_handler,
        },
    },
    shared::{config::StoreConfig, ingest::Pipeline},
};
use warp::Filter;

pub fn sensors_routes(
    pipeline: Pipeline,
    store: &StoreConfig,
    body_limit: u64,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    let ingest = warp::path!("sensors")
        .and(warp::post())
        .and(with_sender())
        .and(with_raw_body(body_limit))
        .and(with_pipeline(pipeline.clone()))
        .and_then(ingest_handler);

    let latest = warp::path!("sensors" / "latest")
        .and(warp::get())
        .and(with_pipeline(pipeline.clone()))
        .and_then(latest_handler);

    let history = warp::path!("sensors" / "history")
        .and(warp::get())
        .and(with_window(store.history_window))
        .and(with_pipeline(pipeline.clone()))
        .and_then(history_handler);

    let recent = warp::path!("sensors" / "recent")
        .and(warp::get())
        .and(with_window(store.recent_window))
        .and(with_pipeline(pipeline))
        .and_then(recent_handler);

    ingest.or(latest).or(history).or(recent)
}

pub fn monitor_routes(
    pipeline: Pipeline,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    let health = warp::path!("health")
        .and(warp::get())
        .and(with_pipeline(pipeline.clone()))
        .and_then(health_handler);

    let status = warp::path!("test")
        .and(warp::get())
        .and(with_pipeline(pipeline))
        .and_then(status_handler);

    health.or(status)
}
