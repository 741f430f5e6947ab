// Discount extraction: band resolution, prompt chains, aggregation.
// All model calls go through llm_client — no direct API calls here.

pub mod aggregate;
pub mod band;
pub mod chains;
pub mod handlers;
pub mod prompts;
pub mod schema;
pub mod templates;
