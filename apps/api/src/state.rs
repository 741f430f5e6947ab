use crate::config::Config;
use crate::llm_client::LlmClient;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub llm: LlmClient,
    pub config: Config,
}

impl AppState {
    pub fn new(llm: LlmClient, config: Config) -> Self {
        Self { llm, config }
    }
}
