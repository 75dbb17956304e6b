use chrono::Utc;
use rand::{rngs::StdRng, SeedableRng};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

use super::{
    free_text::FreeTextParser,
    liveness::LivenessEvaluator,
    normalizer::normalize,
    payload::RawPayload,
    scoring,
    store::ReadingStore,
};
use crate::shared::models::{CanonicalReading, Channel, LivenessReport, ReadingSource};

/// Shared ingestion service handed to every transport. Cloning is cheap;
/// all clones see the same store.
#[derive(Clone)]
pub struct Pipeline {
    store: Arc<RwLock<ReadingStore>>,
    rng: Arc<Mutex<StdRng>>,
    parser: Arc<FreeTextParser>,
    liveness: LivenessEvaluator,
}

impl Pipeline {
    pub fn new(
        capacity: usize,
        liveness: LivenessEvaluator,
        seed: Option<u64>,
    ) -> Result<Self, regex::Error> {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let store = ReadingStore::new(capacity);
        log::debug!("Reading store holds the last {} readings", store.capacity());

        Ok(Pipeline {
            store: Arc::new(RwLock::new(store)),
            rng: Arc::new(Mutex::new(rng)),
            parser: Arc::new(FreeTextParser::new()?),
            liveness,
        })
    }

    /// Normalizes, scores and stores one message. Never fails.
    pub async fn ingest(
        &self,
        payload: RawPayload,
        channel: Channel,
        sender: &str,
    ) -> CanonicalReading {
        let normalized = {
            let mut rng = self.rng.lock().await;
            normalize(&payload, &self.parser, &mut *rng, sender)
        };
        let source = source_for(&payload, channel);
        let penalties = scoring::penalties(&normalized.fields);
        let health_score = scoring::score(&normalized.fields);

        log::debug!("Score penalties for {}: {:?}", normalized.device_id, penalties);

        let reading = {
            let mut store = self.store.write().await;
            let now = Utc::now();
            let reading = CanonicalReading {
                id: store.next_id(now),
                pm25: normalized.fields.pm25,
                co2: normalized.fields.co2,
                voc: normalized.fields.voc,
                temperature: normalized.fields.temperature,
                humidity: normalized.fields.humidity,
                health_score,
                timestamp: now,
                source,
                device_id: normalized.device_id,
            };
            store.append(reading.clone(), channel);
            reading
        };

        log::info!(
            "Reading {} accepted via {} from '{}' ({:?}), health score {}",
            reading.id,
            channel,
            reading.device_id,
            reading.source,
            reading.health_score
        );

        reading
    }

    pub async fn ingest_bytes(&self, bytes: &[u8], channel: Channel, sender: &str) -> CanonicalReading {
        self.ingest(RawPayload::from_bytes(bytes), channel, sender).await
    }

    pub async fn latest(&self) -> Option<CanonicalReading> {
        self.store.read().await.latest().cloned()
    }

    pub async fn history(&self, n: usize) -> Vec<CanonicalReading> {
        self.store.read().await.history(n)
    }

    pub async fn recent(&self, n: usize) -> Vec<CanonicalReading> {
        self.store.read().await.recent(n)
    }

    pub async fn liveness(&self) -> LivenessReport {
        let last = self.store.read().await.last_accepted();
        self.liveness.evaluate(last, Utc::now())
    }

    pub async fn total_readings(&self) -> usize {
        self.store.read().await.len()
    }
}

fn source_for(payload: &RawPayload, channel: Channel) -> ReadingSource {
    match (payload, channel) {
        (RawPayload::FreeText(_), _) => ReadingSource::FreeText,
        (RawPayload::Structured(_), Channel::Http) => ReadingSource::Structured,
        (RawPayload::Structured(_), _) => ReadingSource::DeviceReported,
    }
}
