use log::{error, info, warn};
use rumqttc::{AsyncClient, Event, MqttOptions, Packet, QoS};
use serde::Serialize;
use std::{collections::HashMap, sync::Arc, time::Duration};
use tokio::{
    sync::Mutex,
    task,
    time::sleep,
};

use crate::shared::config::MqttConfig;

/// Called with the concrete topic and the payload of each matching message.
type TopicHandler = Box<dyn FnMut(String, String) + Send + Sync + 'static>;

#[derive(Clone)]
pub struct MqttClient {
    client: AsyncClient,
    topic_handlers: Arc<Mutex<HashMap<String, TopicHandler>>>,
    disconnected: Arc<Mutex<bool>>,
}

impl MqttClient {
    pub async fn new(config: MqttConfig) -> Self {
        let mut options = MqttOptions::new(config.client_id, config.broker, config.port);
        options.set_keep_alive(Duration::from_secs(config.keep_alive.into()));
        options.set_clean_session(true);

        if let (Some(username), Some(password)) = (config.username, config.password) {
            options.set_credentials(username, password);
        }

        let (client, mut eventloop) = AsyncClient::new(options, 250);

        let topic_handlers: Arc<Mutex<HashMap<String, TopicHandler>>> =
            Arc::new(Mutex::new(HashMap::new()));
        let task_topic_handlers = Arc::clone(&topic_handlers);
        let disconnected = Arc::new(Mutex::new(false));
        let task_disconnected = Arc::clone(&disconnected);

        let mqtt_client = MqttClient {
            client,
            topic_handlers,
            disconnected,
        };

        let mqtt_client_clone = mqtt_client.clone();

        // Incoming messages
        task::spawn(async move {
            loop {
                match eventloop.poll().await {
                    Ok(Event::Incoming(Packet::Publish(publish))) => {
                        let topic = publish.topic.clone();
                        let payload = String::from_utf8_lossy(&publish.payload);
                        info!("Received message on topic '{}': {}", topic, payload);

                        let mut handlers = task_topic_handlers.lock().await;
                        match handlers
                            .iter_mut()
                            .find(|(filter, _)| rumqttc::matches(&topic, filter))
                        {
                            Some((_, handler)) => handler(topic, payload.to_string()),
                            None => warn!("No handler for topic '{}'", topic),
                        }
                    }
                    Ok(Event::Incoming(Packet::ConnAck(_))) => {
                        info!("Connection established with broker.");
                        *task_disconnected.lock().await = false;

                        // clean sessions drop subscriptions, so resubscribe on every connect
                        let handlers = task_topic_handlers.lock().await;
                        for topic in handlers.keys() {
                            let client = mqtt_client_clone.client.clone();
                            let topic = topic.clone();
                            tokio::spawn(async move {
                                info!("Resubscribing to topic: {}", topic);
                                if let Err(e) = client.subscribe(topic.clone(), QoS::AtLeastOnce).await
                                {
                                    error!("Failed to subscribe to topic '{}': {}", topic, e);
                                }
                            });
                        }
                    }
                    Ok(_) => (),
                    Err(e) => {
                        error!("MQTT event loop error: {}", e);
                        let mut is_disconnected = task_disconnected.lock().await;
                        if !*is_disconnected {
                            *is_disconnected = true;
                            warn!("Connection lost with broker.");
                        }
                        drop(is_disconnected);
                        sleep(Duration::from_secs(1)).await;
                    }
                }
            }
        });

        mqtt_client
    }

    pub async fn publish<T>(&self, topic: &str, payload: &T, qos: QoS) -> Result<(), String>
    where
        T: Serialize,
    {
        if *self.disconnected.lock().await {
            return Err(format!(
                "Not connected to broker, dropping message for topic '{}'",
                topic
            ));
        }

        let payload_str = serde_json::to_string(payload).map_err(|e| {
            error!("Failed to serialize payload to JSON: {}", e);
            format!("Failed to serialize payload to JSON: {}", e)
        })?;

        match self.client.publish(topic, qos, false, payload_str).await {
            Ok(_) => {
                info!("Data sent successfully to topic '{}'", topic);
                Ok(())
            }
            Err(e) => {
                error!("Failed to send data to topic '{}': {}", topic, e);
                Err(format!("Failed to send data to topic '{}': {}", topic, e))
            }
        }
    }

    pub async fn subscribe(&self, topic: &str, qos: QoS) -> Result<(), rumqttc::ClientError> {
        self.client.subscribe(topic, qos).await?;
        Ok(())
    }

    /// Registers `handler` for a topic filter; `+` and `#` wildcards match.
    pub async fn add_topic_handler<F>(&self, topic: &str, handler: F)
    where
        F: FnMut(String, String) + Send + Sync + 'static,
    {
        let mut handlers = self.topic_handlers.lock().await;
        handlers.insert(topic.to_string(), Box::new(handler));
    }
}
