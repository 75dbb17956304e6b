pub mod config;
pub mod errors;
pub mod ingest;
pub mod models;
