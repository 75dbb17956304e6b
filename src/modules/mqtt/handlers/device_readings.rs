use crate::{
    modules::mqtt::mqtt_client::MqttClient,
    shared::{
        ingest::Pipeline,
        models::{CanonicalReading, Channel, IngestAck},
    },
};
use rumqttc::QoS;

pub async fn handler(
    client: &MqttClient,
    pipeline: Pipeline,
    topic: &str,
    ack_topic_prefix: Option<String>,
) -> Result<(), rumqttc::ClientError> {
    client.subscribe(topic, QoS::AtLeastOnce).await?;

    let ack_client = client.clone();

    client
        .add_topic_handler(topic, move |topic, payload| {
            let pipeline = pipeline.clone();
            let client = ack_client.clone();
            let ack_topic_prefix = ack_topic_prefix.clone();

            tokio::spawn(async move {
                let reading = ingest_message(&pipeline, &topic, &payload).await;

                if let Some(ack) = ack_topic(ack_topic_prefix.as_deref(), &reading) {
                    if let Err(e) = client
                        .publish(&ack, &IngestAck::from(&reading), QoS::AtMostOnce)
                        .await
                    {
                        log::error!("Error acknowledging reading {} (err: {})", reading.id, e);
                    }
                }
            });
        })
        .await;

    Ok(())
}

/// Ingests one broker message. Devices that omit their id are named after
/// the topic the message arrived on.
pub async fn ingest_message(pipeline: &Pipeline, topic: &str, payload: &str) -> CanonicalReading {
    let sender = format!("mqtt:{}", topic);
    pipeline
        .ingest_bytes(payload.as_bytes(), Channel::Mqtt, &sender)
        .await
}

fn ack_topic(prefix: Option<&str>, reading: &CanonicalReading) -> Option<String> {
    prefix.map(|prefix| format!("{}/{}", prefix, reading.device_id))
}
