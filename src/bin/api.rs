use merchant_lending_assistant::{
    agent::Orchestrator,
    api::{start_server, ApiState},
    config::AssistantConfig,
};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = AssistantConfig::from_env()?;

    info!("🚀 Merchant Lending Assistant - API Server");
    info!(
        port = config.port,
        use_llm = config.use_llm,
        model = %config.gemini_model,
        policy_backend = ?config.policy_backend,
        "Configuration loaded"
    );

    let orchestrator = Arc::new(Orchestrator::from_config(&config)?);
    let state = ApiState::new(orchestrator, config.database_url.is_some());

    info!("✅ Orchestrator initialized");

    start_server(state, config.port).await?;

    Ok(())
}
