use cost_of_living_advisor::{advisor::Advisor, api::start_server, config::AdvisorConfig};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load environment variables
    dotenv::dotenv().ok();
    let config = AdvisorConfig::from_env()?;

    for (name, key) in [
        ("GROQ_API_KEY", &config.providers.groq_api_key),
        ("GEMINI_API_KEY", &config.providers.gemini_api_key),
        ("CLAUDE_API_KEY", &config.providers.claude_api_key),
    ] {
        if key.is_empty() {
            eprintln!("⚠️  {} not set in .env", name);
        }
    }

    info!("🚀 Cost of Living Advisor - API Server");
    info!("📍 Port: {}", config.api_port);

    // Missing dataset or model is fatal here
    let advisor = Arc::new(Advisor::from_config(&config)?);

    info!(
        cities = advisor.dataset().len(),
        logging = advisor.logger().is_online(),
        "✅ Advisor initialized"
    );
    info!("📡 Starting API server...");

    start_server(advisor, config.api_port).await?;

    Ok(())
}
