//! Request handlers.

mod health;
mod ingestion;

pub use health::{Health, health};
pub use ingestion::ingest_sbom;
