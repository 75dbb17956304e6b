use crate::{
    modules::api::filters::WindowQuery,
    shared::{
        errors::{AppError, ErrorMessage, ErrorType},
        ingest::Pipeline,
        models::{
            CanonicalReading, Channel, ChartPoint, IngestAck, LatestReading, LivenessReport,
            ServerStatus,
        },
    },
};
use bytes::Bytes;
use chrono::Utc;

#[utoipa::path(
        post,
        path = "/sensors",
        request_body(
            content = String,
            description = "JSON object or free-text sensor dump",
            content_type = "application/json"
        ),
        responses(
            (status = 200, description = "Reading accepted and scored", body = IngestAck),
            (status = 413, description = "Body exceeds the configured limit", body = ErrorMessage),
        )
    )
]
pub async fn ingest_handler(
    sender: String,
    body: Bytes,
    pipeline: Pipeline,
) -> Result<impl warp::Reply, warp::Rejection> {
    let reading = pipeline.ingest_bytes(&body, Channel::Http, &sender).await;

    Ok(warp::reply::json(&IngestAck::from(&reading)))
}

#[utoipa::path(
        get,
        path = "/sensors/latest",
        responses(
            (status = 200, description = "Most recent reading", body = LatestReading),
            (status = 404, description = "No reading ingested yet", body = ErrorMessage),
        )
    )
]
pub async fn latest_handler(pipeline: Pipeline) -> Result<impl warp::Reply, warp::Rejection> {
    let latest = pipeline.latest().await.ok_or_else(|| {
        warp::reject::custom(AppError::new(
            "No sensor data available",
            ErrorType::NotFound,
        ))
    })?;

    Ok(warp::reply::json(&LatestReading::from(latest)))
}

#[utoipa::path(
        get,
        path = "/sensors/history",
        params(WindowQuery),
        responses(
            (status = 200, description = "Chart series, oldest first", body = Vec<ChartPoint>),
            (status = 400, description = "Invalid limit", body = ErrorMessage),
        )
    )
]
pub async fn history_handler(
    window: usize,
    pipeline: Pipeline,
) -> Result<impl warp::Reply, warp::Rejection> {
    let points: Vec<ChartPoint> = pipeline
        .history(window)
        .await
        .iter()
        .map(ChartPoint::from)
        .collect();

    Ok(warp::reply::json(&points))
}

#[utoipa::path(
        get,
        path = "/sensors/recent",
        params(WindowQuery),
        responses(
            (status = 200, description = "Raw stored readings, oldest first", body = Vec<CanonicalReading>),
            (status = 400, description = "Invalid limit", body = ErrorMessage),
        )
    )
]
pub async fn recent_handler(
    window: usize,
    pipeline: Pipeline,
) -> Result<impl warp::Reply, warp::Rejection> {
    let readings = pipeline.recent(window).await;
    log::debug!("Serving {} recent readings", readings.len());

    Ok(warp::reply::json(&readings))
}

#[utoipa::path(
        get,
        path = "/health",
        responses(
            (status = 200, description = "Device connectivity", body = LivenessReport),
        )
    )
]
pub async fn health_handler(pipeline: Pipeline) -> Result<impl warp::Reply, warp::Rejection> {
    Ok(warp::reply::json(&pipeline.liveness().await))
}

#[utoipa::path(
        get,
        path = "/test",
        responses(
            (status = 200, description = "Server is running", body = ServerStatus),
        )
    )
]
pub async fn status_handler(pipeline: Pipeline) -> Result<impl warp::Reply, warp::Rejection> {
    let status = ServerStatus {
        message: String::from("Backend server is running!"),
        timestamp: Utc::now(),
        total_readings: pipeline.total_readings().await,
    };

    Ok(warp::reply::json(&status))
}
