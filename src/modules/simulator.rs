//! Development feed: keeps the dashboard populated when no device reports.

use crate::shared::{
    config::SimulatorConfig,
    ingest::{Pipeline, RawPayload},
    models::Channel,
};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde_json::{json, Map, Value};
use std::time::Duration;
use tokio::{task::JoinHandle, time::interval};

pub const SIMULATED_DEVICE: &str = "TEST_DEVICE";

pub fn start_simulator(pipeline: Pipeline, config: SimulatorConfig) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut rng = StdRng::from_entropy();
        let mut ticker = interval(Duration::from_secs(config.interval_secs.max(1)));
        let stale_after = ChronoDuration::milliseconds(config.stale_after_secs.saturating_mul(1000));

        log::warn!(
            "Simulator enabled: fake readings every {}s while devices are silent",
            config.interval_secs
        );

        loop {
            ticker.tick().await;

            let last = pipeline.latest().await.map(|r| r.timestamp);
            if !needs_data(last, Utc::now(), stale_after) {
                continue;
            }

            log::info!("Adding fake data for testing...");
            pipeline
                .ingest(fake_payload(&mut rng), Channel::Simulator, SIMULATED_DEVICE)
                .await;
        }
    })
}

fn needs_data(last: Option<DateTime<Utc>>, now: DateTime<Utc>, stale_after: ChronoDuration) -> bool {
    match last {
        Some(at) => now - at > stale_after,
        None => true,
    }
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

pub fn fake_payload<R: Rng + ?Sized>(rng: &mut R) -> RawPayload {
    let fields = json!({
        "pm25": round_to(rng.gen_range(10.0..30.0), 1),
        "co2": round_to(rng.gen_range(400.0..600.0), 0),
        "voc": round_to(rng.gen_range(0.0..2.0), 2),
        "temperature": round_to(rng.gen_range(18.0..26.0), 1),
        "humidity": round_to(rng.gen_range(35.0..65.0), 0),
        "deviceId": SIMULATED_DEVICE,
    });

    match fields {
        Value::Object(map) => RawPayload::Structured(map),
        _ => RawPayload::Structured(Map::new()),
    }
}
