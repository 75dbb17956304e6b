mod filters;
mod handlers;
mod routes;
mod swagger;

use crate::shared::config::{ApiConfig, StoreConfig};
use crate::shared::errors::handle_rejection;
use crate::shared::ingest::Pipeline;
use std::net::{IpAddr, SocketAddr};
use tokio::task::JoinHandle;
use utoipa::OpenApi;
use warp::Filter;

#[derive(OpenApi)]
#[openapi(paths(
    handlers::ingest_handler,
    handlers::latest_handler,
    handlers::history_handler,
    handlers::recent_handler,
    handlers::health_handler,
    handlers::status_handler
))]
pub struct HealthMonitorApi;

pub fn api_routes(
    pipeline: Pipeline,
    config: &ApiConfig,
    store: &StoreConfig,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    let api_doc = warp::path("api-doc.json")
        .and(warp::path::end())
        .and(warp::get())
        .map(|| warp::reply::json(&swagger::HealthMonitorDoc::openapi()));

    warp::path!("api" / ..)
        .and(
            api_doc
                .or(routes::sensors_routes(pipeline.clone(), store, config.body_limit))
                .or(routes::monitor_routes(pipeline)),
        )
        .recover(handle_rejection)
        .with(filters::with_cors(config.cors_origin.as_deref()))
}

/// Binds the HTTP listener before spawning it, so a taken port or a bad
/// CORS origin is reported to the caller instead of panicking in the task.
pub async fn start_api(
    pipeline: Pipeline,
    config: ApiConfig,
    store: StoreConfig,
) -> Result<(SocketAddr, JoinHandle<()>), Box<dyn std::error::Error>> {
    config.validate()?;
    let ip: IpAddr = config.host.parse()?;
    let addr = SocketAddr::new(ip, config.port);

    let routes = api_routes(pipeline, &config, &store);
    let (bound, server) = warp::serve(routes).try_bind_ephemeral(addr)?;

    log::info!("Starting API on {}...", bound);
    log::info!("Devices should POST to http://{}/api/sensors", bound);

    Ok((bound, tokio::spawn(server)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::ingest::LivenessEvaluator;
    use serde_json::Value;
    use warp::http::StatusCode;

    fn setup() -> (
        Pipeline,
        impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone,
    ) {
        let pipeline = Pipeline::new(100, LivenessEvaluator::default(), Some(5)).unwrap();
        let routes = api_routes(
            pipeline.clone(),
            &ApiConfig::default(),
            &StoreConfig::default(),
        );
        (pipeline, routes)
    }

    fn json(body: &[u8]) -> Value {
        serde_json::from_slice(body).unwrap()
    }

    #[tokio::test]
    async fn latest_is_404_when_empty() {
        let (_, routes) = setup();

        let res = warp::test::request()
            .method("GET")
            .path("/api/sensors/latest")
            .reply(&routes)
            .await;

        assert_eq!(res.status(), StatusCode::NOT_FOUND);
        assert_eq!(json(res.body())["error"], "No sensor data available");
    }

    #[tokio::test]
    async fn post_then_read_latest() {
        let (_, routes) = setup();

        let res = warp::test::request()
            .method("POST")
            .path("/api/sensors")
            .remote_addr("192.168.0.20:5555".parse().unwrap())
            .body(r#"{"pm25":15,"co2":450,"voc":0.5,"temperature":30,"humidity":65}"#)
            .reply(&routes)
            .await;

        assert_eq!(res.status(), StatusCode::OK);
        let ack = json(res.body());
        assert_eq!(ack["success"], true);
        assert_eq!(ack["healthScore"], 61);

        let res = warp::test::request()
            .method("GET")
            .path("/api/sensors/latest")
            .reply(&routes)
            .await;
        let latest = json(res.body());

        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(latest["deviceId"], "192.168.0.20");
        assert_eq!(latest["source"], "STRUCTURED");
        assert_eq!(latest["healthStatus"], "Good");
        assert_eq!(latest["airQuality"], "Moderate");
    }

    #[tokio::test]
    async fn free_text_body_is_accepted() {
        let (pipeline, routes) = setup();

        let res = warp::test::request()
            .method("POST")
            .path("/api/sensors")
            .body("adc reading: 20, co2: (ppm) 12, temp: 28.28, humidity: 54.25")
            .reply(&routes)
            .await;

        assert_eq!(res.status(), StatusCode::OK);
        let latest = pipeline.latest().await.unwrap();
        assert_eq!(latest.temperature, 28.28);
        assert_eq!(latest.device_id, "unknown");
    }

    #[tokio::test]
    async fn history_honours_default_and_limit() {
        let (pipeline, routes) = setup();
        for i in 0..30 {
            let body = format!(r#"{{"co2":{}}}"#, 400 + i);
            pipeline
                .ingest_bytes(body.as_bytes(), crate::shared::models::Channel::Http, "t")
                .await;
        }

        let res = warp::test::request()
            .path("/api/sensors/history")
            .reply(&routes)
            .await;
        let points = json(res.body());
        assert_eq!(points.as_array().unwrap().len(), 24);
        assert_eq!(points[0]["co2"], 406.0);
        assert!(points[0]["time"].is_string());

        let res = warp::test::request()
            .path("/api/sensors/history?limit=3")
            .reply(&routes)
            .await;
        assert_eq!(json(res.body()).as_array().unwrap().len(), 3);

        let res = warp::test::request()
            .path("/api/sensors/recent")
            .reply(&routes)
            .await;
        let recent = json(res.body());
        assert_eq!(recent.as_array().unwrap().len(), 5);
        assert_eq!(recent[4]["co2"], 429.0);
    }

    #[tokio::test]
    async fn invalid_limit_is_bad_request() {
        let (_, routes) = setup();

        let res = warp::test::request()
            .path("/api/sensors/history?limit=lots")
            .reply(&routes)
            .await;

        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn health_and_status() {
        let (pipeline, routes) = setup();

        let res = warp::test::request().path("/api/health").reply(&routes).await;
        let health = json(res.body());
        assert_eq!(health["status"], "disconnected");
        assert!(health["lastUpdate"].is_null());

        pipeline
            .ingest_bytes(b"{}", crate::shared::models::Channel::Http, "t")
            .await;

        let res = warp::test::request().path("/api/health").reply(&routes).await;
        assert_eq!(json(res.body())["status"], "connected");

        let res = warp::test::request().path("/api/test").reply(&routes).await;
        let status = json(res.body());
        assert_eq!(status["totalReadings"], 1);
        assert_eq!(status["message"], "Backend server is running!");
    }

    #[tokio::test]
    async fn oversized_body_is_rejected() {
        let (pipeline, routes) = setup();
        let body = "x".repeat(1024 * 17);

        let res = warp::test::request()
            .method("POST")
            .path("/api/sensors")
            .body(body)
            .reply(&routes)
            .await;

        assert_eq!(res.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(pipeline.total_readings().await, 0);
    }

    #[tokio::test]
    async fn start_api_serves_on_a_free_port() {
        let pipeline = Pipeline::new(10, LivenessEvaluator::default(), Some(1)).unwrap();
        let config = ApiConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            ..ApiConfig::default()
        };

        let (addr, task) = start_api(pipeline, config, StoreConfig::default())
            .await
            .unwrap();

        assert_ne!(addr.port(), 0);
        task.abort();
    }

    #[tokio::test]
    async fn start_api_fails_when_port_is_taken() {
        let taken = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = taken.local_addr().unwrap().port();
        let pipeline = Pipeline::new(10, LivenessEvaluator::default(), Some(1)).unwrap();
        let config = ApiConfig {
            host: "127.0.0.1".to_string(),
            port,
            ..ApiConfig::default()
        };

        let result = start_api(pipeline, config, StoreConfig::default()).await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn start_api_rejects_malformed_cors_origin() {
        let pipeline = Pipeline::new(10, LivenessEvaluator::default(), Some(1)).unwrap();
        let config = ApiConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            cors_origin: Some("localhost:3000".to_string()),
            ..ApiConfig::default()
        };

        let result = start_api(pipeline, config, StoreConfig::default()).await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn unknown_route_is_404() {
        let (_, routes) = setup();

        let res = warp::test::request().path("/api/nope").reply(&routes).await;

        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }
}
