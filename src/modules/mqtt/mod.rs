mod handlers;
mod mqtt_client;

use crate::shared::{config::MqttConfig, ingest::Pipeline};
use mqtt_client::MqttClient;
use tokio::task::JoinHandle;

pub async fn start_mqtt(pipeline: Pipeline, config: MqttConfig) -> JoinHandle<()> {
    tokio::spawn(async move {
        let topic = config.topic.clone();
        let ack_topic_prefix = config.ack_topic_prefix.clone();

        let mqtt = MqttClient::new(config).await;
        log::info!("Mqtt started...");

        match handlers::device_readings::handler(&mqtt, pipeline, &topic, ack_topic_prefix).await {
            Ok(_) => log::info!("Subscribed to sensor readings on '{}'", topic),
            Err(err) => log::error!("Error subscribing to {} err: {:#?}", topic, err),
        }

        std::future::pending::<()>().await;
    })
}
