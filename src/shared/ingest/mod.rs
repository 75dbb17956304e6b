//! Ingestion core: payload → normalized fields → health score → store.

pub mod free_text;
pub mod liveness;
pub mod normalizer;
pub mod payload;
pub mod pipeline;
pub mod scoring;
pub mod store;

pub use liveness::LivenessEvaluator;
pub use payload::RawPayload;
pub use pipeline::Pipeline;
