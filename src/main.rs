mod logger;
mod modules;
mod shared;

use modules::{api::start_api, mqtt::start_mqtt, simulator::start_simulator, udp::start_udp};
use shared::{
    config::Configs,
    ingest::{LivenessEvaluator, Pipeline},
};

#[tokio::main]
async fn main() {
    let config_path = Configs::resolve_path();
    let config_found = config_path.exists();

    let configs = if config_found {
        match Configs::load_from_file(&config_path) {
            Ok(c) => c,
            Err(e) => {
                logger::start_log("info");
                log::error!(
                    "Failed to load configurations from '{}': {}",
                    config_path.display(),
                    e
                );
                std::process::exit(1);
            }
        }
    } else {
        Configs::default()
    };

    logger::start_log(&configs.log_level);
    if config_found {
        log::info!("Configurations loaded from '{}'", config_path.display());
    } else {
        log::warn!(
            "Config file '{}' not found, using defaults",
            config_path.display()
        );
    }

    let pipeline = match Pipeline::new(
        configs.store.capacity,
        LivenessEvaluator::from(&configs.liveness),
        configs.random_seed,
    ) {
        Ok(p) => p,
        Err(e) => {
            log::error!("Failed to build ingestion pipeline: {}", e);
            std::process::exit(1);
        }
    };

    let mut tasks = Vec::new();

    match start_api(pipeline.clone(), configs.api.clone(), configs.store.clone()).await {
        Ok((_, task)) => tasks.push(task),
        Err(e) => {
            log::error!(
                "Failed to start API on {}:{}: {}",
                configs.api.host,
                configs.api.port,
                e
            );
            std::process::exit(1);
        }
    }

    if configs.udp.enabled {
        match start_udp(pipeline.clone(), configs.udp.clone()).await {
            Ok(task) => tasks.push(task),
            Err(e) => {
                log::error!("Failed to bind UDP port {}: {}", configs.udp.port, e);
                std::process::exit(1);
            }
        }
    }

    if let Some(mqtt) = configs.mqtt.clone() {
        tasks.push(start_mqtt(pipeline.clone(), mqtt).await);
    }

    if configs.simulator.enabled {
        tasks.push(start_simulator(pipeline.clone(), configs.simulator.clone()));
    }

    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            log::info!("Shutting down...");
            for task in tasks {
                task.abort();
            }
        }
        Err(e) => {
            log::error!("Unable to listen for shutdown signal: {}", e);
            for task in tasks {
                if let Err(e) = task.await {
                    log::error!("Task ended abnormally: {}", e);
                }
            }
        }
    }
}
