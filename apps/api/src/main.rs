use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use contract_discounts_api::llm_client::gemini::GeminiBackend;
use contract_discounts_api::llm_client::{CredentialScope, LlmClient};
use contract_discounts_api::{build_router, AppState, Config};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing API_KEY)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={}",
                env!("CARGO_PKG_NAME").replace('-', "_"),
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting contract discounts API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize LLM client
    let backend = GeminiBackend::from_config(&config)?;
    let llm = LlmClient::new(
        Arc::new(backend),
        config.gemini_model.clone(),
        config.gemini_pro_model.clone(),
    );
    info!(
        "LLM client initialized (baseline: {}, advanced: {})",
        config.gemini_model, config.gemini_pro_model
    );
    if !llm.supports_scope(CredentialScope::Alternate) {
        warn!("ALTERNATE_API_KEY not set; documents will be uploaded to the primary scope only");
    }

    let state = AppState::new(llm, config.clone());

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
