use crate::shared::{
    config::UdpConfig,
    ingest::Pipeline,
    models::{CanonicalReading, Channel},
};
use log::{error, info, warn};
use serde::Serialize;
use std::{io, net::SocketAddr, sync::Arc};
use tokio::{net::UdpSocket, task::JoinHandle};

const MAX_DATAGRAM: usize = 2048;

/// Reply datagram sent to the device once its reading is stored.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DatagramAck {
    status: &'static str,
    health_score: u8,
    id: i64,
}

pub async fn start_udp(pipeline: Pipeline, config: UdpConfig) -> io::Result<JoinHandle<()>> {
    let socket = UdpSocket::bind((config.host.as_str(), config.port)).await?;
    info!("Listening for sensor datagrams on {}", socket.local_addr()?);

    Ok(spawn_listener(Arc::new(socket), pipeline, config.ack))
}

pub fn spawn_listener(socket: Arc<UdpSocket>, pipeline: Pipeline, ack: bool) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut buf = vec![0u8; MAX_DATAGRAM];

        loop {
            match socket.recv_from(&mut buf).await {
                Ok((len, peer)) => {
                    if len == buf.len() {
                        warn!("Datagram from {} may have been truncated at {} bytes", peer, len);
                    }

                    let sender = peer.ip().to_string();
                    let reading = pipeline.ingest_bytes(&buf[..len], Channel::Udp, &sender).await;

                    if ack {
                        send_ack(Arc::clone(&socket), peer, &reading);
                    }
                }
                Err(e) => {
                    // ICMP port-unreachable from a previous ack surfaces here on some platforms
                    error!("UDP receive error: {}", e);
                }
            }
        }
    })
}

/// Fire-and-forget: the receive loop never waits on the reply.
fn send_ack(socket: Arc<UdpSocket>, peer: SocketAddr, reading: &CanonicalReading) {
    let ack = DatagramAck {
        status: "ok",
        health_score: reading.health_score,
        id: reading.id,
    };

    let payload = match serde_json::to_vec(&ack) {
        Ok(payload) => payload,
        Err(e) => {
            error!("Failed to serialize ack for {}: {}", peer, e);
            return;
        }
    };

    tokio::spawn(async move {
        if let Err(e) = socket.send_to(&payload, peer).await {
            error!("Failed to send ack to {}: {}", peer, e);
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::{ingest::LivenessEvaluator, models::ReadingSource};
    use serde_json::Value;
    use std::time::Duration;
    use tokio::time::timeout;

    async fn listener(ack: bool) -> (Pipeline, SocketAddr) {
        let pipeline = Pipeline::new(100, LivenessEvaluator::default(), Some(8)).unwrap();
        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let addr = socket.local_addr().unwrap();
        spawn_listener(Arc::new(socket), pipeline.clone(), ack);
        (pipeline, addr)
    }

    #[tokio::test]
    async fn json_datagram_is_acknowledged() {
        let (pipeline, addr) = listener(true).await;
        let device = UdpSocket::bind("127.0.0.1:0").await.unwrap();

        device
            .send_to(br#"{"deviceId":"esp-7","pm25":15,"co2":450,"voc":0.5,"temperature":30,"humidity":65}"#, addr)
            .await
            .unwrap();

        let mut buf = [0u8; 256];
        let (len, _) = timeout(Duration::from_secs(2), device.recv_from(&mut buf))
            .await
            .unwrap()
            .unwrap();
        let ack: Value = serde_json::from_slice(&buf[..len]).unwrap();

        assert_eq!(ack["status"], "ok");
        assert_eq!(ack["healthScore"], 61);

        let latest = pipeline.latest().await.unwrap();
        assert_eq!(latest.device_id, "esp-7");
        assert_eq!(latest.source, ReadingSource::DeviceReported);
        assert_eq!(ack["id"], latest.id);
    }

    #[tokio::test]
    async fn free_text_datagram_uses_sender_address() {
        let (pipeline, addr) = listener(true).await;
        let device = UdpSocket::bind("127.0.0.1:0").await.unwrap();

        device
            .send_to(b"adc reading: 20, co2: (ppm) 12, temp: 28.28, humidity: 54.25", addr)
            .await
            .unwrap();

        let mut buf = [0u8; 256];
        timeout(Duration::from_secs(2), device.recv_from(&mut buf))
            .await
            .unwrap()
            .unwrap();

        let latest = pipeline.latest().await.unwrap();
        assert_eq!(latest.source, ReadingSource::FreeText);
        assert_eq!(latest.device_id, "127.0.0.1");
        assert_eq!(latest.humidity, 54.25);
    }

    #[tokio::test]
    async fn ack_can_be_disabled() {
        let (pipeline, addr) = listener(false).await;
        let device = UdpSocket::bind("127.0.0.1:0").await.unwrap();

        device.send_to(b"{\"co2\": 900}", addr).await.unwrap();

        let mut buf = [0u8; 256];
        let reply = timeout(Duration::from_millis(300), device.recv_from(&mut buf)).await;
        assert!(reply.is_err());
        assert_eq!(pipeline.latest().await.unwrap().co2, 900.0);
    }
}
