// Document ingestion: multipart intake, dual-scope upload, readiness polling.
// All remote calls go through llm_client.

pub mod ingest;
pub mod readiness;
