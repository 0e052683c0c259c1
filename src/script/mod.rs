/// Lenient JSON ingestion.
pub mod ingest;
/// Script data model.
pub mod model;
